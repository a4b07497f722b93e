//! Single-page refresh of one source.

use crate::config::ArticleWriteMode;
use crate::error::Result;
use crate::store::SourceSyncUpdate;
use crate::types::{Event, NewArticle, RefreshResult};

use super::FeedSyncer;

impl FeedSyncer {
    /// Fetch one page of a source and store it
    ///
    /// Articles are upserted by ID, so refreshing the same page twice leaves one
    /// row per article. The source's `sync_time` is set to now, and `has_history`
    /// is cleared when the page holds fewer than `sync.page_size` articles.
    ///
    /// Never fails: fetch or storage errors become a failure-shaped
    /// [`RefreshResult`] with `has_history` left at "possibly more".
    pub async fn refresh_source(&self, source_id: &str, page: u32) -> RefreshResult {
        let page = page.max(1);

        match self.try_refresh(source_id, page).await {
            Ok((has_history, articles)) => {
                tracing::info!(source_id, page, articles, has_history, "Source refreshed");
                self.emit_event(Event::SourceRefreshed {
                    source_id: source_id.to_string(),
                    page,
                    articles,
                    has_history,
                });
                RefreshResult::succeeded(source_id, has_history, articles)
            }
            Err(e) => {
                tracing::warn!(source_id, page, error = %e, "Source refresh failed");
                self.touch_source(source_id).await;
                self.emit_event(Event::SourceRefreshFailed {
                    source_id: source_id.to_string(),
                    page,
                    error: e.to_string(),
                });
                RefreshResult::failed(source_id, &e)
            }
        }
    }

    async fn try_refresh(&self, source_id: &str, page: u32) -> Result<(bool, usize)> {
        let fetched = self.fetcher.fetch_page(source_id, page).await?;
        let count = fetched.len();
        let has_history = count >= self.config.sync.page_size;

        if count > 0 {
            let articles: Vec<NewArticle> = fetched
                .into_iter()
                .map(|article| article.into_new_article(source_id))
                .collect();
            self.store_articles(&articles).await?;
        }

        self.store
            .update_source(
                source_id,
                SourceSyncUpdate {
                    sync_time: chrono::Utc::now().timestamp(),
                    has_history,
                },
            )
            .await?;

        Ok((has_history, count))
    }

    async fn store_articles(&self, articles: &[NewArticle]) -> Result<()> {
        match self.config.sync.article_write_mode {
            ArticleWriteMode::BulkInsert if self.store.supports_bulk_insert() => {
                let inserted = self.store.bulk_insert_articles(articles, true).await?;
                tracing::debug!(
                    received = articles.len(),
                    inserted,
                    "Articles bulk inserted"
                );
            }
            ArticleWriteMode::BulkInsert => {
                tracing::warn!("Store does not support bulk insert, falling back to upsert");
                self.store.upsert_articles(articles).await?;
            }
            ArticleWriteMode::Upsert => {
                self.store.upsert_articles(articles).await?;
            }
        }
        Ok(())
    }

    /// Record a failed attempt's time, keeping the stored history flag
    async fn touch_source(&self, source_id: &str) {
        let source = match self.store.get_source(source_id).await {
            Ok(Some(source)) => source,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(source_id, error = %e, "Could not load source to record sync time");
                return;
            }
        };

        let update = SourceSyncUpdate {
            sync_time: chrono::Utc::now().timestamp(),
            has_history: source.has_more_history(),
        };
        if let Err(e) = self.store.update_source(source_id, update).await {
            tracing::debug!(source_id, error = %e, "Could not record sync time");
        }
    }
}
