//! Alert message construction and routing
//!
//! [`AlertBatch::build`] turns classified project reports into the full list
//! of outgoing messages without any I/O. [`AlertDispatcher`] then hands each
//! message to a [`Notifier`] in batch order.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ProjectOutcome, ProjectReport};

use super::notifier::{NotificationResult, Notifier};

/// Which part of the report a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Per-project failure alert
    Failure,
    /// Projects that ran without failures
    CleanSummary,
    /// Projects with no jobs in the window
    NoActivitySummary,
    /// Startup credential check failed
    StartupFailure,
    /// Project discovery failed
    DiscoveryFailure,
}

/// A message ready to be sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    /// Report section
    pub kind: MessageKind,
    /// Destination channel, without `#`
    pub channel: String,
    /// Message body
    pub text: String,
}

/// Routing and wording inputs for message construction
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    /// Channel for actionable failures
    pub alerts_channel: String,
    /// Channel for informational summaries
    pub logs_channel: String,
    /// Web console base URL for deep links
    pub console_url: String,
    /// Trailing window in hours, quoted in summaries
    pub window_hours: u32,
}

impl MessageTemplates {
    /// Build templates from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            alerts_channel: config.slack.alerts_channel.clone(),
            logs_channel: config.slack.logs_channel.clone(),
            console_url: config.platform.console_url.trim_end_matches('/').to_string(),
            window_hours: config.platform.window_hours,
        }
    }

    /// Alert for a project with at least one failed job.
    ///
    /// Lists every (job, state) tally of the project, not just the failed
    /// ones, so the reader sees what else ran alongside the failures.
    pub fn failure(&self, report: &ProjectReport) -> OutgoingMessage {
        let jobs = report
            .summary
            .buckets()
            .iter()
            .flat_map(|bucket| bucket.jobs.iter())
            .map(|tally| format!("- {} {}", tally.count, tally.name))
            .collect::<Vec<_>>()
            .join("\n");

        let text = format!(
            ":x: The following jobs failed in {} with project ID: {}.\n\n{}\n\nLink: {}/projects/{}/monitor?state.values=failed",
            report.project.name,
            report.project.id,
            jobs,
            self.console_url,
            report.project.id_suffix(),
        );

        OutgoingMessage {
            kind: MessageKind::Failure,
            channel: self.alerts_channel.clone(),
            text,
        }
    }

    /// Summary of projects that ran with zero failures
    pub fn clean_summary(&self, project_names: &[&str]) -> OutgoingMessage {
        OutgoingMessage {
            kind: MessageKind::CleanSummary,
            channel: self.logs_channel.clone(),
            text: format!(
                ":heavy_check_mark: Jobs have been run in the last {}h and none have failed for: {}",
                self.window_hours,
                project_names.join(", ")
            ),
        }
    }

    /// Summary of how many projects had no jobs at all
    pub fn no_activity_summary(&self, count: usize) -> OutgoingMessage {
        OutgoingMessage {
            kind: MessageKind::NoActivitySummary,
            channel: self.logs_channel.clone(),
            text: format!(
                ":heavy_check_mark: No jobs have been ran in the last {}h for {} projects",
                self.window_hours, count
            ),
        }
    }

    /// Alert sent when the platform credential check fails at startup
    pub fn startup_failure(&self, error: &str) -> OutgoingMessage {
        OutgoingMessage {
            kind: MessageKind::StartupFailure,
            channel: self.alerts_channel.clone(),
            text: format!("jobwatch: Error with platform token! Error code: \n`{error}`"),
        }
    }

    /// Alert sent when the monitored projects could not be listed
    pub fn discovery_failure(&self, pattern: &str, error: &str) -> OutgoingMessage {
        OutgoingMessage {
            kind: MessageKind::DiscoveryFailure,
            channel: self.alerts_channel.clone(),
            text: format!(
                ":x: jobwatch could not list projects matching `{pattern}`; no jobs were checked. Error code: \n`{error}`"
            ),
        }
    }
}

/// Every message produced by one run, in sending order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertBatch {
    /// Messages in sending order
    pub messages: Vec<OutgoingMessage>,
}

impl AlertBatch {
    /// Build the batch: failures in input order, then the clean-run summary,
    /// then the no-activity summary. Empty categories produce no message.
    pub fn build(reports: &[ProjectReport], templates: &MessageTemplates) -> Self {
        let mut messages = Vec::new();
        let mut clean = Vec::new();
        let mut idle = 0usize;

        for report in reports {
            match report.outcome {
                ProjectOutcome::HasFailures => messages.push(templates.failure(report)),
                ProjectOutcome::CleanRun => clean.push(report.project.name.as_str()),
                ProjectOutcome::NoActivity => idle += 1,
            }
        }

        if !clean.is_empty() {
            messages.push(templates.clean_summary(&clean));
        }
        if idle > 0 {
            messages.push(templates.no_activity_summary(idle));
        }

        Self { messages }
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there is nothing to send
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Outcome of dispatching a batch
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// One result per message, in sending order
    pub results: Vec<NotificationResult>,
}

impl DispatchReport {
    /// Messages delivered
    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Messages that could not be delivered
    pub fn failed(&self) -> usize {
        self.results.len() - self.delivered()
    }
}

/// Sends alert batches through a notifier
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    /// Create a new dispatcher
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Send a single message
    pub async fn send(&self, message: &OutgoingMessage) -> NotificationResult {
        debug!(kind = ?message.kind, channel = %message.channel, "Dispatching message");
        self.notifier.send(&message.channel, &message.text).await
    }

    /// Send every message once, in order. A failed send never stops the rest.
    pub async fn dispatch(&self, batch: &AlertBatch) -> DispatchReport {
        info!(messages = batch.len(), "Dispatching alert batch");

        let mut results = Vec::with_capacity(batch.len());
        for message in &batch.messages {
            let result = self.send(message).await;
            if !result.success {
                warn!(
                    kind = ?message.kind,
                    channel = %message.channel,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "Continuing after failed notification"
                );
            }
            results.push(result);
        }

        DispatchReport { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::aggregator::report;
    use crate::models::{JobRecord, JobState, ProjectRef};
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    /// Records every send; fails sends to channels listed in `failing`.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, channel: &str, text: &str) -> NotificationResult {
            self.sent.lock().push((channel.to_string(), text.to_string()));
            let fail = self.failing.iter().any(|c| c == channel);
            NotificationResult {
                channel: channel.to_string(),
                success: !fail,
                error: fail.then(|| "invalid_auth".to_string()),
                sent_at: Utc::now(),
            }
        }
    }

    fn templates() -> MessageTemplates {
        MessageTemplates {
            alerts_channel: "egg-alerts".to_string(),
            logs_channel: "egg-logs".to_string(),
            console_url: "https://platform.dnanexus.com".to_string(),
            window_hours: 24,
        }
    }

    fn project_report(id: &str, name: &str, jobs: &[(&str, JobState)]) -> ProjectReport {
        let records: Vec<_> = jobs
            .iter()
            .map(|(job, state)| JobRecord::new(id, *job, state.clone()))
            .collect();
        report(ProjectRef::new(id, name), &records)
    }

    fn mixed_reports() -> Vec<ProjectReport> {
        vec![
            project_report("project-A", "002_A", &[("qc", JobState::Failed)]),
            project_report("project-B", "002_B", &[("qc", JobState::Done)]),
            project_report("project-C", "002_C", &[]),
            project_report("project-D", "002_D", &[("align", JobState::Failed)]),
        ]
    }

    #[test]
    fn test_failure_message_lists_all_states() {
        let report = project_report(
            "project-G123",
            "002_test",
            &[
                ("job1", JobState::Failed),
                ("job1", JobState::Failed),
                ("job2", JobState::Done),
            ],
        );

        let message = templates().failure(&report);

        assert_eq!(message.channel, "egg-alerts");
        assert_eq!(
            message.text,
            ":x: The following jobs failed in 002_test with project ID: project-G123.\n\n\
             - 2 job1\n- 1 job2\n\n\
             Link: https://platform.dnanexus.com/projects/G123/monitor?state.values=failed"
        );
    }

    #[test]
    fn test_batch_order() {
        let batch = AlertBatch::build(&mixed_reports(), &templates());
        let kinds: Vec<_> = batch.messages.iter().map(|m| m.kind).collect();

        assert_eq!(
            kinds,
            vec![
                MessageKind::Failure,
                MessageKind::Failure,
                MessageKind::CleanSummary,
                MessageKind::NoActivitySummary,
            ]
        );
        assert!(batch.messages[0].text.contains("002_A"));
        assert!(batch.messages[1].text.contains("002_D"));
    }

    #[test]
    fn test_summaries() {
        let reports = vec![
            project_report("project-1", "002_one", &[("a", JobState::Done)]),
            project_report("project-2", "002_two", &[("b", JobState::Running)]),
            project_report("project-3", "002_three", &[]),
            project_report("project-4", "002_four", &[]),
        ];

        let batch = AlertBatch::build(&reports, &templates());

        assert_eq!(
            batch.messages,
            vec![
                OutgoingMessage {
                    kind: MessageKind::CleanSummary,
                    channel: "egg-logs".to_string(),
                    text: ":heavy_check_mark: Jobs have been run in the last 24h and none have failed for: 002_one, 002_two".to_string(),
                },
                OutgoingMessage {
                    kind: MessageKind::NoActivitySummary,
                    channel: "egg-logs".to_string(),
                    text: ":heavy_check_mark: No jobs have been ran in the last 24h for 2 projects".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_discovery_failure_goes_to_alerts() {
        let message = templates().discovery_failure("002_*", "Platform error (503): down");

        assert_eq!(message.kind, MessageKind::DiscoveryFailure);
        assert_eq!(message.channel, "egg-alerts");
        assert_eq!(
            message.text,
            ":x: jobwatch could not list projects matching `002_*`; no jobs were checked. Error code: \n`Platform error (503): down`"
        );
    }

    #[test]
    fn test_empty_input_builds_empty_batch() {
        assert!(AlertBatch::build(&[], &templates()).is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_preserves_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = AlertDispatcher::new(notifier.clone());
        let batch = AlertBatch::build(&mixed_reports(), &templates());

        let report = dispatcher.dispatch(&batch).await;

        assert_eq!(report.delivered(), 4);
        let sent = notifier.sent.lock();
        let channels: Vec<_> = sent.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(channels, vec!["egg-alerts", "egg-alerts", "egg-logs", "egg-logs"]);
        assert_eq!(sent[2].1, batch.messages[2].text);
    }

    #[tokio::test]
    async fn test_failed_send_does_not_stop_dispatch() {
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            failing: vec!["egg-logs".to_string()],
        });
        let dispatcher = AlertDispatcher::new(notifier.clone());
        let batch = AlertBatch::build(&mixed_reports(), &templates());

        let report = dispatcher.dispatch(&batch).await;

        assert_eq!(notifier.sent.lock().len(), 4);
        assert_eq!(report.failed(), 2);
        assert!(report.results[3].error.is_some());
        assert_eq!(
            batch.messages[3].kind,
            MessageKind::NoActivitySummary
        );
    }
}
