//! reqwest-based client for the platform API.

use super::{UpstreamApi, UpstreamFailure};
use crate::config::UpstreamConfig;
use crate::error::{Error, Result};
use crate::types::{Credential, UpstreamArticle};
use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

/// Error payload returned by the platform on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

/// HTTP implementation of [`UpstreamApi`]
///
/// Requests `GET {base_url}/api/v2/platform/mps/{source_id}/articles?page={page}`
/// with the credential attached as `Authorization: Bearer <token>` and `xid: <id>`.
pub struct HttpUpstream {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpUpstream {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns error if the base URL is invalid or the HTTP client cannot be created
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid upstream base URL '{}': {}", config.base_url, e),
            key: Some("upstream.base_url".to_string()),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("feedsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn articles_url(&self, source_id: &str) -> std::result::Result<Url, UpstreamFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamFailure::transport("upstream base URL cannot be a base"))?
            .pop_if_empty()
            .extend(["api", "v2", "platform", "mps", source_id, "articles"]);
        Ok(url)
    }
}

#[async_trait]
impl UpstreamApi for HttpUpstream {
    async fn fetch_articles(
        &self,
        credential: &Credential,
        source_id: &str,
        page: u32,
    ) -> std::result::Result<Vec<UpstreamArticle>, UpstreamFailure> {
        let url = self.articles_url(source_id)?;
        tracing::debug!(%url, source_id, page, credential_id = %credential.id, "Fetching article page");

        let response = self
            .http_client
            .get(url)
            .query(&[("page", page)])
            .bearer_auth(&credential.token)
            .header("xid", &credential.id)
            .send()
            .await
            .map_err(|e| UpstreamFailure::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorPayload>(&body)
                .map(|payload| payload.message)
                .unwrap_or(body);
            return Err(UpstreamFailure::with_status(status.as_u16(), message));
        }

        response
            .json::<Vec<UpstreamArticle>>()
            .await
            .map_err(|e| UpstreamFailure::transport(format!("invalid article payload: {}", e)))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
