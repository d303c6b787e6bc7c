//! Configuration management for jobwatch
//!
//! Values are layered, lowest precedence first: built-in defaults, an optional
//! config file, `JOBWATCH__`-prefixed environment variables (`__` separates
//! sections, e.g. `JOBWATCH__SLACK__LOGS_CHANNEL`), and finally the
//! deployment variables `DNANEXUS_TOKEN`, `SLACK_TOKEN` and `PROM_PATH`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Platform auth token variable
pub const ENV_DNANEXUS_TOKEN: &str = "DNANEXUS_TOKEN";
/// Slack bot token variable
pub const ENV_SLACK_TOKEN: &str = "SLACK_TOKEN";
/// Output directory for metric files
pub const ENV_PROM_PATH: &str = "PROM_PATH";

const ENV_PREFIX: &str = "JOBWATCH";

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compute platform configuration
    pub platform: PlatformConfig,

    /// Slack configuration
    pub slack: SlackConfig,

    /// Metric file configuration
    pub metrics: MetricsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env is the normal case in production.
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("platform.token", env_non_empty(ENV_DNANEXUS_TOKEN))?
            .set_override_option("slack.token", env_non_empty(ENV_SLACK_TOKEN))?
            .set_override_option("metrics.prom_path", env_non_empty(ENV_PROM_PATH))?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Fail unless both the platform and the Slack tokens are present.
    pub fn require_tokens(&self) -> Result<()> {
        if self.slack.token.is_none() {
            return Err(Error::config(format!("{ENV_SLACK_TOKEN} is not set")));
        }
        if self.platform.token.is_none() {
            return Err(Error::config(format!("{ENV_DNANEXUS_TOKEN} is not set")));
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Compute platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// API server base URL
    pub api_url: String,
    /// Web console base URL, used for deep links in alerts
    pub console_url: String,
    /// Bearer token
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Glob selecting the monitored projects
    pub project_pattern: String,
    /// Trailing window in hours
    pub window_hours: u32,
    /// Per-project fetch timeout in seconds
    pub fetch_timeout_secs: u64,
    /// Maximum number of projects fetched at once
    pub max_concurrent_fetches: usize,
}

impl PlatformConfig {
    /// Per-project fetch timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.dnanexus.com".to_string(),
            console_url: "https://platform.dnanexus.com".to_string(),
            token: None,
            project_pattern: "002_*".to_string(),
            window_hours: 24,
            fetch_timeout_secs: 120,
            max_concurrent_fetches: 8,
        }
    }
}

/// Slack configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// `chat.postMessage` endpoint
    pub api_url: String,
    /// Bot token
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Channel for actionable failures
    pub alerts_channel: String,
    /// Channel for informational summaries
    pub logs_channel: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_url: "https://slack.com/api/chat.postMessage".to_string(),
            token: None,
            alerts_channel: "egg-alerts".to_string(),
            logs_channel: "egg-logs".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Metric file configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Directory scraped by the node exporter textfile collector
    pub prom_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const LOGS_CHANNEL_VAR: &str = "JOBWATCH__SLACK__LOGS_CHANNEL";
    const WINDOW_VAR: &str = "JOBWATCH__PLATFORM__WINDOW_HOURS";

    /// Sets (or unsets) environment variables and restores the previous
    /// values on drop. Tests using it run under `#[serial]`.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(key, value)| {
                    let previous = std::env::var(key).ok();
                    match value {
                        Some(v) => std::env::set_var(key, v),
                        None => std::env::remove_var(key),
                    }
                    (*key, previous)
                })
                .collect();
            Self { saved }
        }

        /// Clear every variable `Config::load` reads
        fn clean() -> Self {
            Self::new(&[
                (LOGS_CHANNEL_VAR, None),
                (WINDOW_VAR, None),
                (ENV_DNANEXUS_TOKEN, None),
                (ENV_SLACK_TOKEN, None),
                (ENV_PROM_PATH, None),
            ])
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, previous) in self.saved.iter().rev() {
                match previous {
                    Some(v) => std::env::set_var(key, v),
                    None => std::env::remove_var(key),
                }
            }
        }
    }

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.platform.project_pattern, "002_*");
        assert_eq!(config.platform.window_hours, 24);
        assert_eq!(config.slack.alerts_channel, "egg-alerts");
        assert_eq!(config.slack.logs_channel, "egg-logs");
        assert!(config.metrics.prom_path.is_none());
    }

    #[test]
    fn test_require_tokens() {
        let mut config = Config::default();
        assert!(matches!(config.require_tokens(), Err(Error::Config(_))));

        config.slack.token = Some("xoxb-1".to_string());
        let err = config.require_tokens().unwrap_err();
        assert!(err.to_string().contains(ENV_DNANEXUS_TOKEN));

        config.platform.token = Some("dx".to_string());
        assert!(config.require_tokens().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_file_overrides_defaults() {
        let _env = EnvGuard::clean();
        let file = toml_file("[platform]\nwindow_hours = 12\n\n[slack]\nlogs_channel = \"ops-logs\"");

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.platform.window_hours, 12);
        assert_eq!(config.slack.logs_channel, "ops-logs");
        assert_eq!(config.slack.alerts_channel, "egg-alerts");
    }

    #[test]
    fn test_tokens_are_not_serialized() {
        let mut config = Config::default();
        config.platform.token = Some("secret".to_string());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    #[serial]
    fn test_prefixed_env_overrides_file() {
        let _clean = EnvGuard::clean();
        let _env = EnvGuard::new(&[(LOGS_CHANNEL_VAR, Some("ops-logs")), (WINDOW_VAR, Some("6"))]);
        let file = toml_file("[platform]\nwindow_hours = 12\n\n[slack]\nlogs_channel = \"file-logs\"");

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.slack.logs_channel, "ops-logs");
        assert_eq!(config.platform.window_hours, 6);
        assert_eq!(config.slack.alerts_channel, "egg-alerts");
    }

    #[test]
    #[serial]
    fn test_deployment_vars_override_everything() {
        let _clean = EnvGuard::clean();
        let _env = EnvGuard::new(&[
            (ENV_DNANEXUS_TOKEN, Some("dx-token")),
            (ENV_SLACK_TOKEN, Some("xoxb-token")),
            (ENV_PROM_PATH, Some("/var/lib/node_exporter")),
        ]);
        let file = toml_file("[metrics]\nprom_path = \"/tmp/from-file\"");

        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.platform.token.as_deref(), Some("dx-token"));
        assert_eq!(config.slack.token.as_deref(), Some("xoxb-token"));
        assert_eq!(
            config.metrics.prom_path,
            Some(PathBuf::from("/var/lib/node_exporter"))
        );
        assert!(config.require_tokens().is_ok());
    }

    #[test]
    #[serial]
    fn test_blank_token_is_missing() {
        let _clean = EnvGuard::clean();
        let _env = EnvGuard::new(&[(ENV_DNANEXUS_TOKEN, Some("  ")), (ENV_SLACK_TOKEN, Some("x"))]);

        let config = Config::load(None).unwrap();

        assert!(config.platform.token.is_none());
        assert!(matches!(config.require_tokens(), Err(Error::Config(_))));
    }
}
