//! Storage collaborator used by the sync orchestrator
//!
//! The orchestrator never talks to a database directly. It reads credentials
//! and sources and writes articles through [`SyncStore`], which
//! [`Database`](crate::db::Database) implements over SQLite.

use crate::error::Result;
use crate::types::{Credential, CredentialStatus, NewArticle, Source, SourceStatus};
use async_trait::async_trait;

/// Credential query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialFilter {
    /// Only credentials with this status
    pub status: CredentialStatus,
    /// Credentials to leave out (e.g. today's quarantine list)
    pub exclude_ids: Vec<String>,
    /// Maximum number of rows
    pub limit: usize,
}

/// Source query
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceFilter {
    /// Only sources with this status (None = all)
    pub status: Option<SourceStatus>,
}

/// Bookkeeping written after every page fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSyncUpdate {
    /// Unix timestamp of the refresh attempt
    pub sync_time: i64,
    /// Whether older pages may exist
    pub has_history: bool,
}

/// Record store consumed by the orchestrator
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Credentials matching `filter`
    async fn get_credentials(&self, filter: &CredentialFilter) -> Result<Vec<Credential>>;

    /// Change a credential's status
    async fn set_credential_status(&self, id: &str, status: CredentialStatus) -> Result<()>;

    /// Insert an article, or refresh title and publish time of an existing one
    async fn upsert_article(&self, article: &NewArticle) -> Result<()>;

    /// Upsert several articles as one atomic batch
    ///
    /// The default implementation upserts sequentially without atomicity;
    /// stores with transactions should override it.
    async fn upsert_articles(&self, articles: &[NewArticle]) -> Result<()> {
        for article in articles {
            self.upsert_article(article).await?;
        }
        Ok(())
    }

    /// Whether [`bulk_insert_articles`](Self::bulk_insert_articles) is available
    fn supports_bulk_insert(&self) -> bool {
        false
    }

    /// Insert many articles at once, returning the number of rows written
    async fn bulk_insert_articles(
        &self,
        articles: &[NewArticle],
        skip_duplicates: bool,
    ) -> Result<u64>;

    /// Number of stored articles for a source
    async fn count_articles(&self, source_id: &str) -> Result<u64>;

    /// Source by ID
    async fn get_source(&self, id: &str) -> Result<Option<Source>>;

    /// Record a refresh attempt for a source
    async fn update_source(&self, id: &str, update: SourceSyncUpdate) -> Result<()>;

    /// Sources matching `filter`, in stable order
    async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<Source>>;
}
