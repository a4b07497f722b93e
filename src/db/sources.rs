//! Source CRUD and sync bookkeeping.

use crate::error::DatabaseError;
use crate::store::{SourceFilter, SourceSyncUpdate};
use crate::types::{Source, SourceStatus};
use crate::{Error, Result};

use super::{Database, NewSource};

impl Database {
    /// Insert a source, updating name and status if it already exists
    ///
    /// Sync bookkeeping (`sync_time`, `has_history`) of an existing source is kept.
    pub async fn upsert_source(&self, source: &NewSource) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let status = if source.enabled {
            SourceStatus::Enabled
        } else {
            SourceStatus::Disabled
        };

        sqlx::query(
            r#"
            INSERT INTO sources (id, name, status, sync_time, has_history, created_at, updated_at)
            VALUES (?, ?, ?, 0, 1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&source.id)
        .bind(&source.name)
        .bind(status.to_i32())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert source: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get source by ID
    pub async fn get_source(&self, id: &str) -> Result<Option<Source>> {
        let source = sqlx::query_as::<_, Source>(
            "SELECT id, name, status, sync_time, has_history FROM sources WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get source: {}",
                e
            )))
        })?;

        Ok(source)
    }

    /// List sources, optionally restricted to one status, in insertion order
    pub async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<Source>> {
        let sources = match filter.status {
            Some(status) => {
                sqlx::query_as::<_, Source>(
                    r#"
                    SELECT id, name, status, sync_time, has_history
                    FROM sources
                    WHERE status = ?
                    ORDER BY created_at ASC, rowid ASC
                    "#,
                )
                .bind(status.to_i32())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Source>(
                    r#"
                    SELECT id, name, status, sync_time, has_history
                    FROM sources
                    ORDER BY created_at ASC, rowid ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list sources: {}",
                e
            )))
        })?;

        Ok(sources)
    }

    /// Record a refresh attempt
    pub async fn update_source_sync(&self, id: &str, update: SourceSyncUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sources
            SET sync_time = ?, has_history = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.sync_time)
        .bind(i32::from(update.has_history))
        .bind(chrono::Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update source sync state: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "source {}",
                id
            ))));
        }

        Ok(())
    }

    /// Enable or disable a source
    pub async fn set_source_status(&self, id: &str, status: SourceStatus) -> Result<()> {
        let result = sqlx::query("UPDATE sources SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_i32())
            .bind(chrono::Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update source status: {}",
                    e
                )))
            })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "source {}",
                id
            ))));
        }

        Ok(())
    }
}
