//! Single-flight history crawl with cooperative cancellation.

use crate::error::{Error, Result};
use crate::types::{CrawlEnd, CrawlOutcome, CrawlStart, CrawlStatus, Event};
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::{ActiveCrawl, ExclusiveState, FeedSyncer};

/// Ownership of the crawl slot; dropping it releases the slot it claimed
struct CrawlClaim {
    source_id: String,
    generation: u64,
    cancel: CancellationToken,
    state: ExclusiveState,
}

impl Drop for CrawlClaim {
    fn drop(&mut self) {
        let mut slot = self.state.crawl_slot();
        if slot
            .as_ref()
            .is_some_and(|active| active.generation == self.generation)
        {
            *slot = None;
        }
        drop(slot);
        self.state.running_crawls.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FeedSyncer {
    /// Start crawling a source's history in the background
    ///
    /// Only one crawl runs process-wide:
    /// - the same source already crawling: [`CrawlStart::AlreadyRunning`], nothing changes
    /// - another source crawling: [`CrawlStart::Busy`], the active crawl is untouched
    /// - an empty `source_id` stops the active crawl: [`CrawlStart::StopRequested`]
    ///
    /// Crawl failures after the slot is claimed (unknown source, storage errors)
    /// are logged. Every started crawl ends with [`Event::HistoryCrawlFinished`],
    /// carrying [`CrawlEnd::Failed`] in that case.
    pub async fn crawl_history(&self, source_id: &str) -> Result<CrawlStart> {
        if source_id.is_empty() {
            self.stop_history_crawl();
            return Ok(CrawlStart::StopRequested);
        }

        let claim = match self.claim_crawl(source_id)? {
            Ok(claim) => claim,
            Err(rejected) => return Ok(rejected),
        };

        let syncer = self.clone();
        tokio::spawn(async move {
            let source_id = claim.source_id.clone();
            if let Err(e) = syncer.run_claimed_crawl(claim).await {
                tracing::error!(source_id = %source_id, error = %e, "History crawl failed");
            }
        });

        Ok(CrawlStart::Started)
    }

    /// Crawl a source's history on the current task, returning when it ends
    ///
    /// # Errors
    /// - [`Error::CrawlInProgress`] if any crawl already owns the slot
    /// - [`Error::NotFound`] if the source does not exist
    /// - [`Error::ShuttingDown`] once shutdown has begun
    pub async fn run_history_crawl(&self, source_id: &str) -> Result<CrawlOutcome> {
        if source_id.is_empty() {
            return Err(Error::NotFound("empty source id".to_string()));
        }

        match self.claim_crawl(source_id)? {
            Ok(claim) => self.run_claimed_crawl(claim).await,
            Err(CrawlStart::Busy { active_source_id }) => {
                Err(Error::CrawlInProgress { active_source_id })
            }
            Err(_) => Err(Error::CrawlInProgress {
                active_source_id: source_id.to_string(),
            }),
        }
    }

    /// Stop the active crawl, if any
    ///
    /// The slot is cleared immediately. The crawl loop observes the stop at its
    /// next iteration boundary or while waiting between pages, so it ends within
    /// one `sync.history_page_delay`. Returns whether a crawl was active.
    pub fn stop_history_crawl(&self) -> bool {
        let stopped = self.state.crawl_slot().take();
        match stopped {
            Some(active) => {
                active.cancel.cancel();
                tracing::info!(
                    source_id = %active.source_id,
                    page = active.current_page,
                    "History crawl stop requested"
                );
                true
            }
            None => false,
        }
    }

    /// The running crawl's source and next page, or None when idle
    pub fn crawl_status(&self) -> Option<CrawlStatus> {
        self.state.crawl_slot().as_ref().map(|active| CrawlStatus {
            active_source_id: active.source_id.clone(),
            current_page: active.current_page,
        })
    }

    /// Atomically claim the crawl slot for `source_id`
    ///
    /// The inner `Err` carries the reason the slot was not claimed.
    fn claim_crawl(&self, source_id: &str) -> Result<std::result::Result<CrawlClaim, CrawlStart>> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        let mut slot = self.state.crawl_slot();
        if let Some(active) = slot.as_ref() {
            if active.source_id == source_id {
                tracing::debug!(source_id, "History crawl already running");
                return Ok(Err(CrawlStart::AlreadyRunning));
            }
            tracing::debug!(
                source_id,
                active_source_id = %active.source_id,
                "Another history crawl owns the slot"
            );
            return Ok(Err(CrawlStart::Busy {
                active_source_id: active.source_id.clone(),
            }));
        }

        let generation = self.state.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = self.state.shutdown.child_token();
        *slot = Some(ActiveCrawl {
            source_id: source_id.to_string(),
            current_page: 1,
            cancel: cancel.clone(),
            generation,
        });
        drop(slot);
        self.state.running_crawls.fetch_add(1, Ordering::SeqCst);

        Ok(Ok(CrawlClaim {
            source_id: source_id.to_string(),
            generation,
            cancel,
            state: self.state.clone(),
        }))
    }

    async fn run_claimed_crawl(&self, claim: CrawlClaim) -> Result<CrawlOutcome> {
        tracing::info!(source_id = %claim.source_id, "History crawl started");
        self.emit_event(Event::HistoryCrawlStarted {
            source_id: claim.source_id.clone(),
        });

        let outcome = match self.crawl_pages(&claim).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(source_id = %claim.source_id, error = %e, "History crawl aborted");
                self.emit_event(Event::HistoryCrawlFinished {
                    source_id: claim.source_id.clone(),
                    pages: 0,
                    end: CrawlEnd::Failed,
                });
                return Err(e);
            }
        };

        tracing::info!(
            source_id = %outcome.source_id,
            pages = outcome.pages_fetched,
            failed_pages = outcome.failed_pages,
            end = ?outcome.end,
            "History crawl finished"
        );
        self.emit_event(Event::HistoryCrawlFinished {
            source_id: outcome.source_id.clone(),
            pages: outcome.pages_fetched,
            end: outcome.end,
        });

        // Releases the slot
        drop(claim);
        Ok(outcome)
    }

    async fn crawl_pages(&self, claim: &CrawlClaim) -> Result<CrawlOutcome> {
        let source_id = claim.source_id.as_str();
        let mut outcome = CrawlOutcome {
            source_id: source_id.to_string(),
            pages_fetched: 0,
            failed_pages: 0,
            end: CrawlEnd::PageLimit,
        };

        let source = self
            .store
            .get_source(source_id)
            .await?
            .ok_or_else(|| Error::NotFound(source_id.to_string()))?;

        if !source.has_more_history() {
            tracing::debug!(source_id, "Source has no more history");
            outcome.end = CrawlEnd::NothingToCrawl;
            return Ok(outcome);
        }

        // Resume past pages already stored
        let stored = self.store.count_articles(source_id).await?;
        let page_size = self.config.sync.page_size.max(1) as u64;
        let mut page = u32::try_from(stored.div_ceil(page_size))
            .unwrap_or(u32::MAX)
            .max(1);
        self.set_crawl_page(claim.generation, page);

        for _ in 0..self.config.sync.max_history_pages {
            if claim.cancel.is_cancelled() {
                outcome.end = CrawlEnd::Cancelled;
                break;
            }

            let result = self.refresh_source(source_id, page).await;
            outcome.pages_fetched += 1;
            if result.error_count > 0 {
                outcome.failed_pages += 1;
            }
            self.emit_event(Event::HistoryCrawlPage {
                source_id: source_id.to_string(),
                page,
                articles: result.articles_count,
            });

            if result.has_history == Some(false) {
                outcome.end = CrawlEnd::Exhausted;
                break;
            }

            page = page.saturating_add(1);
            self.set_crawl_page(claim.generation, page);

            tokio::select! {
                _ = claim.cancel.cancelled() => {
                    outcome.end = CrawlEnd::Cancelled;
                    break;
                }
                _ = tokio::time::sleep(self.config.sync.history_page_delay) => {}
            }
        }

        Ok(outcome)
    }

    fn set_crawl_page(&self, generation: u64, page: u32) {
        let mut slot = self.state.crawl_slot();
        if let Some(active) = slot.as_mut()
            && active.generation == generation
        {
            active.current_page = page;
        }
    }
}
