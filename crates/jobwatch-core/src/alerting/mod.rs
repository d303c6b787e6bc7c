//! Alerting system for jobwatch
//!
//! Summarizes per-project job states, decides which alerts apply and
//! delivers them to Slack.

pub mod aggregator;
mod dispatcher;
mod notifier;

pub use aggregator::{classify, summarize};
pub use dispatcher::{
    AlertBatch, AlertDispatcher, DispatchReport, MessageKind, MessageTemplates, OutgoingMessage,
};
pub use notifier::{NotificationError, NotificationResult, Notifier, SlackNotifier};
