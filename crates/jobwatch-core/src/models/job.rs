//! Project and job data models

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A monitored project on the compute platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Platform-assigned identifier (e.g. `project-G1234`)
    pub id: String,

    /// Display name
    pub name: String,
}

impl ProjectRef {
    /// Create a new project reference
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// The identifier with its type prefix removed (`project-G1234` -> `G1234`).
    ///
    /// Identifiers without a hyphen are returned unchanged.
    pub fn id_suffix(&self) -> &str {
        self.id.split_once('-').map_or(self.id.as_str(), |(_, rest)| rest)
    }
}

impl PartialEq for ProjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ProjectRef {}

impl Hash for ProjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Lifecycle state of a job execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    /// Created, not yet scheduled
    Idle,
    /// Ready to be scheduled
    Runnable,
    /// Executing
    Running,
    /// Waiting for inputs from other jobs
    WaitingOnInput,
    /// Waiting for subjobs to finish
    WaitingOnOutput,
    /// Completed successfully
    Done,
    /// Failed
    Failed,
    /// Being terminated
    Terminating,
    /// Terminated by a user
    Terminated,
    /// Held for debugging after a failure
    DebugHold,
    /// Can be restarted after a failure
    Restartable,
    /// A state this version does not know about, kept verbatim
    Other(String),
}

impl JobState {
    /// Wire representation used by the platform
    pub fn as_str(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::Runnable => "runnable",
            Self::Running => "running",
            Self::WaitingOnInput => "waiting_on_input",
            Self::WaitingOnOutput => "waiting_on_output",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Terminating => "terminating",
            Self::Terminated => "terminated",
            Self::DebugHold => "debug_hold",
            Self::Restartable => "restartable",
            Self::Other(s) => s,
        }
    }

    /// Whether this is the failed state
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<&str> for JobState {
    fn from(s: &str) -> Self {
        match s {
            "idle" => Self::Idle,
            "runnable" => Self::Runnable,
            "running" => Self::Running,
            "waiting_on_input" => Self::WaitingOnInput,
            "waiting_on_output" => Self::WaitingOnOutput,
            "done" | "completed" => Self::Done,
            "failed" => Self::Failed,
            "terminating" => Self::Terminating,
            "terminated" => Self::Terminated,
            "debug_hold" => Self::DebugHold,
            "restartable" => Self::Restartable,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single job execution observed in the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Owning project identifier
    pub project_id: String,

    /// Job name; repeated executions share a name
    pub name: String,

    /// Current state
    pub state: JobState,
}

impl JobRecord {
    /// Create a new job record
    pub fn new(project_id: impl Into<String>, name: impl Into<String>, state: JobState) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            state,
        }
    }
}
