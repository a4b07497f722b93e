//! Upstream platform API seam
//!
//! [`UpstreamApi`] fetches one page of articles for a source with a given
//! credential. [`HttpUpstream`] is the reqwest implementation; tests plug in
//! scripted fakes.

use crate::types::{Credential, UpstreamArticle};
use async_trait::async_trait;

mod http;

pub use http::HttpUpstream;

/// Raw failure of one upstream call, before classification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpstreamFailure {
    /// HTTP status, if a response was received
    pub status: Option<u16>,
    /// Message from the response payload, or the transport error text
    pub message: String,
}

impl UpstreamFailure {
    /// Failure carrying an HTTP status
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Failure with no response (connect error, timeout, decode error)
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Client for the upstream article listing
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Fetch one page of a source's articles, newest first
    async fn fetch_articles(
        &self,
        credential: &Credential,
        source_id: &str,
        page: u32,
    ) -> std::result::Result<Vec<UpstreamArticle>, UpstreamFailure>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
