//! Access tokens for the Cloud Build API.

use serde::Deserialize;

use crate::errors::SourceError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Where the bearer token for status fetches comes from.
#[derive(Debug, Clone)]
pub enum TokenProvider {
    /// A token supplied up front (flag or environment).
    Static(String),
    /// The GCE metadata server of the build worker.
    Metadata { url: String },
}

impl TokenProvider {
    pub fn metadata() -> Self {
        TokenProvider::Metadata {
            url: METADATA_TOKEN_URL.to_string(),
        }
    }

    /// Resolve a bearer token. Metadata tokens are fetched fresh each call so
    /// long sessions never hold an expired one.
    pub async fn token(&self, client: &reqwest::Client) -> Result<String, SourceError> {
        match self {
            TokenProvider::Static(token) => Ok(token.clone()),
            TokenProvider::Metadata { url } => {
                let resp = client
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| SourceError::Transient(format!("metadata server: {e}")))?;
                if !resp.status().is_success() {
                    return Err(SourceError::Transient(format!(
                        "metadata server returned HTTP {}",
                        resp.status()
                    )));
                }
                let token = resp
                    .json::<MetadataToken>()
                    .await
                    .map_err(|e| SourceError::Fatal(format!("metadata token response: {e}")))?;
                Ok(token.access_token)
            }
        }
    }
}
