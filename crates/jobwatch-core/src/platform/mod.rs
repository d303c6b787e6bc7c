//! Compute platform access
//!
//! [`JobSource`] is the read-only view of the platform the monitor needs:
//! an identity check, project discovery and job listing. [`DnanexusClient`]
//! implements it over HTTP; [`JobFetcher`] fans job listing out across
//! projects.

mod client;
mod fetcher;

pub use client::DnanexusClient;
pub use fetcher::{FetchOutcome, JobFetcher, ProjectJobs};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{JobRecord, ProjectRef};

/// Read access to projects and jobs on the compute platform
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Verify the session credential; returns the authenticated user id.
    async fn whoami(&self) -> Result<String>;

    /// List projects whose name matches the glob `pattern`.
    async fn find_projects(&self, pattern: &str) -> Result<Vec<ProjectRef>>;

    /// List every job in `project_id` created after `created_after`.
    async fn find_jobs(
        &self,
        project_id: &str,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>>;
}
