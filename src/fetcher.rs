//! Single-page article fetching with credential rotation and retry.

use crate::accounts::{AccountPool, ErrorClassifier};
use crate::config::RetryConfig;
use crate::error::{Error, Result, UpstreamError};
use crate::retry::fetch_with_retry;
use crate::types::UpstreamArticle;
use crate::upstream::UpstreamApi;
use std::sync::Arc;

/// Fetches one page of one source through the credential pool
///
/// Every attempt draws a fresh credential from the [`AccountPool`], so a
/// retry does not reuse a credential that just failed unless it is the only
/// one left. Failed calls go through the [`ErrorClassifier`] before the next
/// attempt.
pub struct ArticlePageFetcher {
    pool: Arc<AccountPool>,
    classifier: Arc<ErrorClassifier>,
    upstream: Arc<dyn UpstreamApi>,
    retry: RetryConfig,
}

impl ArticlePageFetcher {
    /// Create a fetcher
    pub fn new(
        pool: Arc<AccountPool>,
        classifier: Arc<ErrorClassifier>,
        upstream: Arc<dyn UpstreamApi>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            pool,
            classifier,
            upstream,
            retry,
        }
    }

    /// Fetch page `page` of `source_id`
    ///
    /// # Errors
    /// - [`Error::NoAvailableCredential`] as soon as the pool is empty
    /// - [`UpstreamError::FetchFailed`] once every attempt has failed
    pub async fn fetch_page(&self, source_id: &str, page: u32) -> Result<Vec<UpstreamArticle>> {
        let result = fetch_with_retry(&self.retry, |attempt| async move {
            let credential = self.pool.select_account().await?;
            tracing::debug!(
                source_id,
                page,
                attempt,
                credential_id = %credential.id,
                upstream = self.upstream.name(),
                "Requesting article page"
            );

            match self
                .upstream
                .fetch_articles(&credential, source_id, page)
                .await
            {
                Ok(articles) => Ok::<_, Error>(articles),
                Err(failure) => {
                    let kind = self.classifier.classify(&credential, &failure).await;
                    Err(Error::Upstream(kind))
                }
            }
        })
        .await;

        match result {
            Ok(articles) => Ok(articles),
            Err(exhausted) => match exhausted.error {
                Error::Upstream(e) => Err(Error::Upstream(UpstreamError::FetchFailed {
                    source_id: source_id.to_string(),
                    page,
                    attempts: exhausted.attempts,
                    reason: e.to_string(),
                })),
                other => Err(other),
            },
        }
    }
}
