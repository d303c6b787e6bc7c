//! Monitoring run orchestration
//!
//! One run: verify the platform credential, discover projects, fetch their
//! jobs, classify, then post the alert batch.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::alerting::{aggregator, AlertBatch, AlertDispatcher, MessageTemplates, Notifier};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{ProjectOutcome, ProjectReport};
use crate::platform::{JobFetcher, JobSource};

/// Counts describing a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Projects matching the name pattern
    pub projects_discovered: usize,
    /// Projects whose job fetch failed
    pub projects_skipped: usize,
    /// Projects with at least one failed job
    pub with_failures: usize,
    /// Projects whose jobs ran without failures
    pub clean: usize,
    /// Projects with no jobs in the window
    pub no_activity: usize,
    /// Messages delivered
    pub messages_sent: usize,
    /// Messages that could not be delivered
    pub messages_failed: usize,
    /// Set when project discovery failed and nothing was scanned
    pub discovery_error: Option<String>,
}

/// Ties the platform, aggregation and notification together
pub struct Monitor {
    source: Arc<dyn JobSource>,
    fetcher: JobFetcher,
    dispatcher: AlertDispatcher,
    templates: MessageTemplates,
    project_pattern: String,
}

impl Monitor {
    /// Create a monitor over explicit collaborators
    pub fn new(config: &Config, source: Arc<dyn JobSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            fetcher: JobFetcher::from_config(source.clone(), &config.platform),
            source,
            dispatcher: AlertDispatcher::new(notifier),
            templates: MessageTemplates::from_config(config),
            project_pattern: config.platform.project_pattern.clone(),
        }
    }

    /// Check the platform credential.
    ///
    /// On failure a best-effort alert goes to the alerts channel before the
    /// error is returned.
    pub async fn verify_credentials(&self) -> Result<()> {
        match self.source.whoami().await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!(error = %e, "Platform credential check failed");
                let alert = self.templates.startup_failure(&e.to_string());
                self.dispatcher.send(&alert).await;
                Err(Error::auth(e.to_string()))
            }
        }
    }

    /// Perform one full monitoring run
    pub async fn run(&self) -> Result<RunReport> {
        self.verify_credentials().await?;

        let projects = match self.source.find_projects(&self.project_pattern).await {
            Ok(projects) => projects,
            Err(e) => return Ok(self.report_discovery_failure(&e).await),
        };
        let projects_discovered = projects.len();

        let fetched = self.fetcher.fetch_all(projects).await;
        let reports: Vec<ProjectReport> = fetched
            .fetched
            .into_iter()
            .map(|p| aggregator::report(p.project, &p.jobs))
            .collect();

        let batch = AlertBatch::build(&reports, &self.templates);
        let dispatched = self.dispatcher.dispatch(&batch).await;

        let count = |outcome: ProjectOutcome| {
            reports.iter().filter(|r| r.outcome == outcome).count()
        };
        let report = RunReport {
            projects_discovered,
            projects_skipped: fetched.skipped.len(),
            with_failures: count(ProjectOutcome::HasFailures),
            clean: count(ProjectOutcome::CleanRun),
            no_activity: count(ProjectOutcome::NoActivity),
            messages_sent: dispatched.delivered(),
            messages_failed: dispatched.failed(),
            discovery_error: None,
        };

        info!(
            discovered = report.projects_discovered,
            skipped = report.projects_skipped,
            with_failures = report.with_failures,
            clean = report.clean,
            no_activity = report.no_activity,
            messages_failed = report.messages_failed,
            "Monitoring run complete"
        );

        Ok(report)
    }

    /// Alert that the project list could not be fetched; the run ends with
    /// nothing scanned.
    async fn report_discovery_failure(&self, e: &Error) -> RunReport {
        error!(pattern = %self.project_pattern, error = %e, "Project discovery failed");

        let alert = self
            .templates
            .discovery_failure(&self.project_pattern, &e.to_string());
        let result = self.dispatcher.send(&alert).await;

        RunReport {
            messages_sent: usize::from(result.success),
            messages_failed: usize::from(!result.success),
            discovery_error: Some(e.to_string()),
            ..RunReport::default()
        }
    }
}
