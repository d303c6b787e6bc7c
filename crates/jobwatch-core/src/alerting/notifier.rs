//! Notification delivery to Slack

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::SlackConfig;
use crate::error::{Error, Result};

/// Result of sending a notification
#[derive(Debug, Clone)]
pub struct NotificationResult {
    /// Channel the message was addressed to
    pub channel: String,
    /// Whether the backend accepted the message
    pub success: bool,
    /// Transport or backend error, when not delivered
    pub error: Option<String>,
    /// When the send was attempted
    pub sent_at: DateTime<Utc>,
}

/// Sink accepting a channel name and message text.
///
/// Implementations never fail the caller: delivery problems are logged and
/// reported through [`NotificationResult`].
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `text` to `channel`
    async fn send(&self, channel: &str, text: &str) -> NotificationResult;
}

/// Posts messages through the Slack Web API (`chat.postMessage`)
pub struct SlackNotifier {
    client: Client,
    api_url: String,
    token: String,
}

impl SlackNotifier {
    /// Create a new Slack notifier
    pub fn new(api_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            token: token.into(),
        })
    }

    /// Create a notifier from the Slack section of the configuration
    pub fn from_config(config: &SlackConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::config("Slack token is not configured"))?;

        Self::new(
            config.api_url.clone(),
            token,
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn post_message(&self, channel: &str, text: &str) -> std::result::Result<(), NotificationError> {
        let payload = SlackPayload {
            channel: format!("#{channel}"),
            text,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::HttpError(format!(
                "Slack returned {}: {}",
                status, body
            )));
        }

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::SerializationError(e.to_string()))?;

        if body.ok {
            Ok(())
        } else {
            Err(NotificationError::ApiError(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ))
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, channel: &str, text: &str) -> NotificationResult {
        let sent_at = Utc::now();

        info!(channel = %channel, "Sending Slack message");
        let result = self.post_message(channel, text).await;

        match &result {
            Ok(()) => info!(channel = %channel, "Slack message delivered"),
            Err(e) => error!(channel = %channel, error = %e, "Slack message failed"),
        }

        NotificationResult {
            channel: channel.to_string(),
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
            sent_at,
        }
    }
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Request failed or returned a non-success status
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Slack answered `ok: false`
    #[error("Slack API error: {0}")]
    ApiError(String),

    /// Response body could not be decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    channel: String,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}
