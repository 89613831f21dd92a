//! Polled build status sources.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;

use super::auth::TokenProvider;
use super::snapshot::BuildSnapshot;
use crate::errors::SourceError;

pub const CLOUD_BUILD_API: &str = "https://cloudbuild.googleapis.com";

/// Upper bound on one fetch, token request included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Provides point-in-time build status. Polled, never pushed.
/// Real implementation: `CloudBuildSource`. Tests script their own.
#[async_trait]
pub trait StatusSource: Send {
    async fn fetch(&mut self, build_id: &str) -> Result<BuildSnapshot, SourceError>;
}

/// Reads builds from the Cloud Build v1 REST API.
pub struct CloudBuildSource {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    tokens: TokenProvider,
    timeout: Duration,
}

impl CloudBuildSource {
    pub fn new(project_id: impl Into<String>, tokens: TokenProvider) -> Self {
        Self::with_base_url(CLOUD_BUILD_API, project_id, tokens)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        tokens: TokenProvider,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            tokens,
            timeout: FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_url(&self, build_id: &str) -> String {
        format!(
            "{}/v1/projects/{}/builds/{}",
            self.base_url, self.project_id, build_id
        )
    }
}

/// Server-side trouble and throttling are worth retrying; other client
/// errors (bad id, missing permission) will not fix themselves.
fn classify_status(status: reqwest::StatusCode, body: &str) -> SourceError {
    let msg = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        SourceError::Transient(msg)
    } else {
        SourceError::Fatal(msg)
    }
}

impl CloudBuildSource {
    async fn fetch_once(&self, build_id: &str) -> Result<BuildSnapshot, SourceError> {
        let token = self.tokens.token(&self.client).await?;
        let resp = self
            .client
            .get(self.build_url(build_id))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(|e| SourceError::Transient(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        resp.json::<BuildSnapshot>()
            .await
            .map_err(|e| SourceError::Fatal(format!("undecodable build payload: {e}")))
    }
}

#[async_trait]
impl StatusSource for CloudBuildSource {
    async fn fetch(&mut self, build_id: &str) -> Result<BuildSnapshot, SourceError> {
        match timeout(self.timeout, self.fetch_once(build_id)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Transient(format!(
                "no response from Cloud Build within {:?}",
                self.timeout
            ))),
        }
    }
}
