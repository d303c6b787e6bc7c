//! Per-project summary data models

use serde::{Deserialize, Serialize};

use super::job::{JobState, ProjectRef};

/// One distinct job name within a state, with its multiplicity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTally {
    /// Job name
    pub name: String,
    /// Executions with this name
    pub count: usize,
}

/// All tallies observed for one state, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBucket {
    /// State shared by every tallied job
    pub state: JobState,
    /// Tallies in first-seen order
    pub jobs: Vec<JobTally>,
}

impl StateBucket {
    /// Total executions in this bucket
    pub fn total(&self) -> usize {
        self.jobs.iter().map(|j| j.count).sum()
    }
}

/// Jobs of one project grouped by state
///
/// Buckets and the tallies inside them keep first-observed order so
/// rendered messages are stable for a given input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    buckets: Vec<StateBucket>,
}

impl ProjectSummary {
    /// Count one more execution of `name` in `state`
    pub fn record(&mut self, state: &JobState, name: &str) {
        let bucket = match self.buckets.iter().position(|b| &b.state == state) {
            Some(idx) => &mut self.buckets[idx],
            None => {
                self.buckets.push(StateBucket {
                    state: state.clone(),
                    jobs: Vec::new(),
                });
                let last = self.buckets.len() - 1;
                &mut self.buckets[last]
            }
        };

        match bucket.jobs.iter_mut().find(|j| j.name == name) {
            Some(tally) => tally.count += 1,
            None => bucket.jobs.push(JobTally {
                name: name.to_string(),
                count: 1,
            }),
        }
    }

    /// State buckets in first-observed order
    pub fn buckets(&self) -> &[StateBucket] {
        &self.buckets
    }

    /// Bucket for a given state, if any job was seen in it
    pub fn bucket(&self, state: &JobState) -> Option<&StateBucket> {
        self.buckets.iter().find(|b| &b.state == state)
    }

    /// Whether at least one job failed
    pub fn has_failures(&self) -> bool {
        self.bucket(&JobState::Failed).is_some_and(|b| !b.jobs.is_empty())
    }

    /// Total number of executions summarized
    pub fn total(&self) -> usize {
        self.buckets.iter().map(StateBucket::total).sum()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Outcome category of a project for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectOutcome {
    /// At least one job failed
    HasFailures,
    /// Jobs ran and none failed
    CleanRun,
    /// No jobs were created in the window
    NoActivity,
}

/// A fetched project with its summary and classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReport {
    /// The project
    pub project: ProjectRef,
    /// Jobs grouped by state
    pub summary: ProjectSummary,
    /// Classification for this run
    pub outcome: ProjectOutcome,
}
