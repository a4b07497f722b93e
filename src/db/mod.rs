//! Database layer for feedsync
//!
//! Handles SQLite persistence for credentials, sources and articles, and
//! implements [`SyncStore`] on top of it.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`credentials`] - Credential CRUD and selection queries
//! - [`sources`] - Source CRUD and sync bookkeeping
//! - [`articles`] - Article upsert, bulk insert and counting

use crate::error::Result;
use crate::store::{CredentialFilter, SourceFilter, SourceSyncUpdate, SyncStore};
use crate::types::{Credential, CredentialStatus, NewArticle, Source};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

mod articles;
mod credentials;
mod migrations;
mod sources;

/// Credential to be inserted or replaced
#[derive(Debug, Clone)]
pub struct NewCredential {
    /// Upstream account ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Bearer token
    pub token: String,
    /// Initial status
    pub status: CredentialStatus,
}

/// Source to be inserted or replaced
#[derive(Debug, Clone)]
pub struct NewSource {
    /// Upstream-assigned source ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether the source takes part in bulk refreshes
    pub enabled: bool,
}

/// Database handle for feedsync
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl SyncStore for Database {
    async fn get_credentials(&self, filter: &CredentialFilter) -> Result<Vec<Credential>> {
        self.find_credentials(filter).await
    }

    async fn set_credential_status(&self, id: &str, status: CredentialStatus) -> Result<()> {
        self.update_credential_status(id, status).await
    }

    async fn upsert_article(&self, article: &NewArticle) -> Result<()> {
        Database::upsert_article(self, article).await
    }

    async fn upsert_articles(&self, articles: &[NewArticle]) -> Result<()> {
        self.upsert_articles_atomic(articles).await
    }

    fn supports_bulk_insert(&self) -> bool {
        true
    }

    async fn bulk_insert_articles(
        &self,
        articles: &[NewArticle],
        skip_duplicates: bool,
    ) -> Result<u64> {
        self.insert_articles_batch(articles, skip_duplicates).await
    }

    async fn count_articles(&self, source_id: &str) -> Result<u64> {
        self.count_articles_for_source(source_id).await
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>> {
        Database::get_source(self, id).await
    }

    async fn update_source(&self, id: &str, update: SourceSyncUpdate) -> Result<()> {
        self.update_source_sync(id, update).await
    }

    async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<Source>> {
        Database::list_sources(self, filter).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
