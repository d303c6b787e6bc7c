//! Concurrent per-project job fetching

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::PlatformConfig;
use crate::error::{Error, Result};
use crate::models::{JobRecord, ProjectRef};

use super::JobSource;

/// Jobs fetched for one project
#[derive(Debug, Clone)]
pub struct ProjectJobs {
    /// The project
    pub project: ProjectRef,
    /// Jobs created in the window, possibly none
    pub jobs: Vec<JobRecord>,
}

/// Result of fetching a set of projects
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Successfully fetched projects, in input order
    pub fetched: Vec<ProjectJobs>,
    /// Projects whose fetch failed or timed out
    pub skipped: Vec<ProjectRef>,
}

/// Fetches the jobs of many projects, isolating per-project failures
pub struct JobFetcher {
    source: Arc<dyn JobSource>,
    window: chrono::Duration,
    timeout: Duration,
    concurrency: usize,
}

impl JobFetcher {
    /// Create a new fetcher
    pub fn new(
        source: Arc<dyn JobSource>,
        window: chrono::Duration,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            window,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Create a fetcher from the platform section of the configuration
    pub fn from_config(source: Arc<dyn JobSource>, config: &PlatformConfig) -> Self {
        Self::new(
            source,
            chrono::Duration::hours(i64::from(config.window_hours)),
            config.fetch_timeout(),
            config.max_concurrent_fetches,
        )
    }

    async fn fetch_since(
        &self,
        project: &ProjectRef,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>> {
        debug!(project = %project.name, "Fetching jobs");

        tokio::time::timeout(self.timeout, self.source.find_jobs(&project.id, created_after))
            .await
            .map_err(|_| Error::Timeout {
                operation: format!("fetching jobs for {}", project.id),
                after: self.timeout,
            })?
    }

    /// Fetch every project. Results keep the input order regardless of
    /// completion order; failed projects are logged and skipped.
    pub async fn fetch_all(&self, projects: Vec<ProjectRef>) -> FetchOutcome {
        let created_after = Utc::now() - self.window;
        info!(
            projects = projects.len(),
            since = %created_after,
            "Fetching jobs per project"
        );

        let results: Vec<(ProjectRef, Result<Vec<JobRecord>>)> = stream::iter(projects)
            .map(|project| async move {
                let result = self.fetch_since(&project, created_after).await;
                (project, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut outcome = FetchOutcome::default();
        for (project, result) in results {
            match result {
                Ok(jobs) => {
                    debug!(project = %project.name, jobs = jobs.len(), "Fetched jobs");
                    outcome.fetched.push(ProjectJobs { project, jobs });
                }
                Err(e) => {
                    warn!(
                        project = %project.name,
                        project_id = %project.id,
                        error = %e,
                        "Skipping project after failed fetch"
                    );
                    outcome.skipped.push(project);
                }
            }
        }

        outcome
    }
}
