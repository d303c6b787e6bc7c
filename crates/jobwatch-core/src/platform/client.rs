//! DNAnexus API client

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::PlatformConfig;
use crate::error::{Error, Result};
use crate::models::{JobRecord, JobState, ProjectRef};

use super::JobSource;

/// Authenticated session against the DNAnexus API server
///
/// Holds its own token; nothing is read from process-wide state.
#[derive(Clone)]
pub struct DnanexusClient {
    client: Client,
    api_url: String,
    token: String,
}

impl DnanexusClient {
    /// Create a new client
    pub fn new(api_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create a client from the platform section of the configuration
    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::config("Platform token is not configured"))?;

        Self::new(config.api_url.clone(), token, config.fetch_timeout())
    }

    /// Call an API route with a JSON body
    async fn call<T: DeserializeOwned>(&self, route: &str, body: &Value) -> Result<T> {
        let url = format!("{}/{}", self.api_url, route.trim_start_matches('/'));
        debug!(route = %route, "Calling platform API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| format!("{}: {}", b.error.kind, b.error.message))
                .unwrap_or(text);
            return Err(Error::Platform {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Run a `find*` route to exhaustion, following the `next` cursor
    async fn find_all<T: DeserializeOwned>(&self, route: &str, mut query: Value) -> Result<Vec<T>> {
        let mut results = Vec::new();

        loop {
            let page: FindPage<T> = self.call(route, &query).await?;
            results.extend(page.results);

            match page.next {
                Some(next) if !next.is_null() => query["starting"] = next,
                _ => break,
            }
        }

        Ok(results)
    }
}

#[async_trait]
impl JobSource for DnanexusClient {
    async fn whoami(&self) -> Result<String> {
        let who: WhoAmI = self.call("system/whoami", &json!({})).await?;
        info!(user = %who.id, "Platform credential verified");
        Ok(who.id)
    }

    async fn find_projects(&self, pattern: &str) -> Result<Vec<ProjectRef>> {
        let query = json!({
            "name": {"glob": pattern},
            "describe": {"fields": {"name": true}},
        });

        let found: Vec<FoundProject> = self.find_all("system/findProjects", query).await?;
        let projects: Vec<ProjectRef> = found
            .into_iter()
            .map(|p| {
                let name = p.describe.map_or_else(|| p.id.clone(), |d| d.name);
                ProjectRef::new(p.id, name)
            })
            .collect();

        info!(pattern = %pattern, count = projects.len(), "Discovered projects");
        Ok(projects)
    }

    async fn find_jobs(
        &self,
        project_id: &str,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>> {
        let query = json!({
            "project": project_id,
            "created": {"after": created_after.timestamp_millis()},
            "describe": {"fields": {"name": true, "state": true}},
        });

        let found: Vec<FoundJob> = self.find_all("system/findJobs", query).await?;
        let jobs = found
            .into_iter()
            .map(|j| {
                let describe = j.describe.unwrap_or_default();
                JobRecord::new(
                    project_id,
                    describe.name.unwrap_or(j.id),
                    describe.state.map_or(JobState::Other("unknown".to_string()), JobState::from),
                )
            })
            .collect();

        Ok(jobs)
    }
}

// API response types
#[derive(Debug, Deserialize)]
struct WhoAmI {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FindPage<T> {
    results: Vec<T>,
    #[serde(default)]
    next: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FoundProject {
    id: String,
    describe: Option<ProjectDescribe>,
}

#[derive(Debug, Deserialize)]
struct ProjectDescribe {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FoundJob {
    id: String,
    describe: Option<JobDescribe>,
}

#[derive(Debug, Default, Deserialize)]
struct JobDescribe {
    name: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}
