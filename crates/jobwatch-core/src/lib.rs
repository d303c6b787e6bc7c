//! # jobwatch
//!
//! Daily job monitor for DNAnexus `002_*` projects.
//!
//! Each run lists the jobs created in the last 24 hours in every monitored
//! project, tallies them by state and posts to Slack:
//!
//! - one alert per project with failed jobs (`egg-alerts`)
//! - one summary of projects whose jobs all succeeded (`egg-logs`)
//! - one count of projects with no jobs at all (`egg-logs`)
//!
//! Separately, [`metrics::MetricEmitter`] lets a finished job drop a
//! Prometheus textfile completion metric.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the monitor
//! DNANEXUS_TOKEN=... SLACK_TOKEN=... jobwatch check
//!
//! # Record a completion metric
//! PROM_PATH=/var/lib/node_exporter jobwatch record-completion nightly_ingest
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alerting;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod platform;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{AlertBatch, AlertDispatcher, Notifier, SlackNotifier};
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::metrics::MetricEmitter;
    pub use crate::models::*;
    pub use crate::monitor::{Monitor, RunReport};
    pub use crate::platform::{DnanexusClient, JobFetcher, JobSource};
}
