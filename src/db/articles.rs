//! Article upsert, bulk insert and counting.

use crate::error::DatabaseError;
use crate::types::{Article, NewArticle};
use crate::{Error, Result};

use super::Database;

const UPSERT_ARTICLE_SQL: &str = r#"
    INSERT INTO articles (id, source_id, title, pic_url, publish_time, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        publish_time = excluded.publish_time,
        updated_at = excluded.updated_at
"#;

impl Database {
    /// Insert an article, or refresh title and publish time of an existing one
    ///
    /// The image URL and owning source of an existing article are never changed.
    pub async fn upsert_article(&self, article: &NewArticle) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(UPSERT_ARTICLE_SQL)
            .bind(&article.id)
            .bind(&article.source_id)
            .bind(&article.title)
            .bind(&article.pic_url)
            .bind(article.publish_time)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to upsert article: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Upsert every article inside a single transaction
    ///
    /// Either all articles are written or none are.
    pub async fn upsert_articles_atomic(&self, articles: &[NewArticle]) -> Result<()> {
        if articles.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        for article in articles {
            sqlx::query(UPSERT_ARTICLE_SQL)
                .bind(&article.id)
                .bind(&article.source_id)
                .bind(&article.title)
                .bind(&article.pic_url)
                .bind(article.publish_time)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to upsert article {}: {}",
                        article.id, e
                    )))
                })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit article batch: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Insert multiple articles in a batch
    ///
    /// With `skip_duplicates`, articles whose ID already exists are left untouched;
    /// without it a duplicate fails the batch. Returns the number of inserted rows.
    /// Input is chunked to stay within SQLite's bind variable limit.
    pub async fn insert_articles_batch(
        &self,
        articles: &[NewArticle],
        skip_duplicates: bool,
    ) -> Result<u64> {
        if articles.is_empty() {
            return Ok(0);
        }

        // SQLite default SQLITE_MAX_VARIABLE_NUMBER is 999.
        // Each article uses 7 bind variables, so max 142 articles per batch.
        const MAX_ARTICLES_PER_BATCH: usize = 142;

        let now = chrono::Utc::now().timestamp();
        let mut inserted = 0;

        for chunk in articles.chunks(MAX_ARTICLES_PER_BATCH) {
            let mut query_builder: sqlx::QueryBuilder<'_, sqlx::Sqlite> = sqlx::QueryBuilder::new(
                "INSERT INTO articles (id, source_id, title, pic_url, publish_time, created_at, updated_at) ",
            );

            query_builder.push_values(chunk, |mut b, article| {
                b.push_bind(&article.id)
                    .push_bind(&article.source_id)
                    .push_bind(&article.title)
                    .push_bind(&article.pic_url)
                    .push_bind(article.publish_time)
                    .push_bind(now)
                    .push_bind(now);
            });

            if skip_duplicates {
                query_builder.push(" ON CONFLICT(id) DO NOTHING");
            }

            let result = query_builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to insert articles batch: {}",
                        e
                    )))
                })?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Number of stored articles for a source
    pub async fn count_articles_for_source(&self, source_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE source_id = ?")
            .bind(source_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count articles: {}",
                    e
                )))
            })?;

        Ok(count as u64)
    }

    /// Get article by ID
    pub async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(
            "SELECT id, source_id, title, pic_url, publish_time FROM articles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get article: {}",
                e
            )))
        })?;

        Ok(article)
    }

    /// Newest articles of a source, most recent first
    pub async fn list_articles(&self, source_id: &str, limit: i64) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(
            r#"
            SELECT id, source_id, title, pic_url, publish_time
            FROM articles
            WHERE source_id = ?
            ORDER BY publish_time DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(source_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list articles: {}",
                e
            )))
        })?;

        Ok(articles)
    }
}
