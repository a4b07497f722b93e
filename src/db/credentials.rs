//! Credential CRUD and selection queries.

use crate::error::DatabaseError;
use crate::store::CredentialFilter;
use crate::types::{Credential, CredentialStatus};
use crate::{Error, Result};

use super::{Database, NewCredential};

impl Database {
    /// Insert a credential, replacing token, name and status if it already exists
    pub async fn upsert_credential(&self, credential: &NewCredential) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO credentials (id, name, token, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                token = excluded.token,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&credential.id)
        .bind(&credential.name)
        .bind(&credential.token)
        .bind(credential.status.to_i32())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert credential: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get credential by ID
    pub async fn get_credential(&self, id: &str) -> Result<Option<Credential>> {
        let credential = sqlx::query_as::<_, Credential>(
            "SELECT id, name, token, status FROM credentials WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get credential: {}",
                e
            )))
        })?;

        Ok(credential)
    }

    /// Credentials with the filter's status, minus the excluded IDs, up to the limit
    pub async fn find_credentials(&self, filter: &CredentialFilter) -> Result<Vec<Credential>> {
        let mut query_builder: sqlx::QueryBuilder<'_, sqlx::Sqlite> = sqlx::QueryBuilder::new(
            "SELECT id, name, token, status FROM credentials WHERE status = ",
        );
        query_builder.push_bind(filter.status.to_i32());

        if !filter.exclude_ids.is_empty() {
            query_builder.push(" AND id NOT IN (");
            let mut separated = query_builder.separated(", ");
            for id in &filter.exclude_ids {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
        }

        query_builder.push(" ORDER BY created_at ASC, id ASC LIMIT ");
        query_builder.push_bind(filter.limit as i64);

        let credentials = query_builder
            .build_query_as::<Credential>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to query credentials: {}",
                    e
                )))
            })?;

        Ok(credentials)
    }

    /// Change a credential's status
    pub async fn update_credential_status(&self, id: &str, status: CredentialStatus) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("UPDATE credentials SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_i32())
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to update credential status: {}",
                    e
                )))
            })?;

        if result.rows_affected() == 0 {
            return Err(Error::Database(DatabaseError::NotFound(format!(
                "credential {}",
                id
            ))));
        }

        Ok(())
    }
}
