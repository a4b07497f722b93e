//! Sync orchestrator split into focused submodules.
//!
//! The `FeedSyncer` struct and its methods are organized by domain:
//! - [`refresh`] - Single-page refresh of one source
//! - [`history`] - Single-flight history crawl with cancellation
//! - [`bulk`] - Multi-round refresh of every enabled source
//! - [`accounts`] - Credential quarantine administration
//! - [`lifecycle`] - Construction from configuration and shutdown

mod accounts;
mod bulk;
mod history;
mod lifecycle;
mod refresh;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::accounts::{AccountPool, ErrorClassifier, QuarantineLedger};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::ArticlePageFetcher;
use crate::store::SyncStore;
use crate::types::Event;
use crate::upstream::UpstreamApi;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};
use tokio_util::sync::CancellationToken;

/// The source currently owning the history crawl slot
#[derive(Debug)]
pub(crate) struct ActiveCrawl {
    pub(crate) source_id: String,
    pub(crate) current_page: u32,
    pub(crate) cancel: CancellationToken,
    /// Claim counter value; a finishing crawl only clears the slot it claimed
    pub(crate) generation: u64,
}

/// Process-wide exclusive operation state
#[derive(Clone)]
pub(crate) struct ExclusiveState {
    /// History crawl slot (None while no crawl runs)
    pub(crate) crawl: Arc<std::sync::Mutex<Option<ActiveCrawl>>>,
    /// Source of claim generations
    pub(crate) next_generation: Arc<AtomicU64>,
    /// Crawl tasks that have not yet wound down (may exceed 1 right after a stop)
    pub(crate) running_crawls: Arc<AtomicU64>,
    /// True exactly while a bulk refresh owns the flag
    pub(crate) bulk_running: Arc<AtomicBool>,
    /// Cancelled once shutdown begins; crawl tokens are its children
    pub(crate) shutdown: CancellationToken,
}

impl ExclusiveState {
    fn new() -> Self {
        Self {
            crawl: Arc::new(std::sync::Mutex::new(None)),
            next_generation: Arc::new(AtomicU64::new(1)),
            running_crawls: Arc::new(AtomicU64::new(0)),
            bulk_running: Arc::new(AtomicBool::new(false)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Lock the crawl slot, recovering the data if a holder panicked
    pub(crate) fn crawl_slot(&self) -> std::sync::MutexGuard<'_, Option<ActiveCrawl>> {
        self.crawl.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Main sync orchestrator (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct FeedSyncer {
    /// Storage collaborator
    pub(crate) store: Arc<dyn SyncStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Daily credential quarantine
    pub(crate) ledger: Arc<QuarantineLedger>,
    /// Page fetcher with credential rotation and retry
    pub(crate) fetcher: Arc<ArticlePageFetcher>,
    /// Crawl slot, bulk flag and shutdown signal
    pub(crate) state: ExclusiveState,
}

impl FeedSyncer {
    /// Create a syncer over the given storage and upstream
    ///
    /// The configuration is validated first. Use [`FeedSyncer::open`] to build the
    /// default SQLite store and HTTP upstream from configuration alone.
    pub fn new(
        config: Config,
        store: Arc<dyn SyncStore>,
        upstream: Arc<dyn UpstreamApi>,
    ) -> Result<Self> {
        config.validate()?;

        // Buffer up to 1000 events per subscriber
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let ledger = Arc::new(QuarantineLedger::new(&config.quarantine)?);
        let pool = Arc::new(AccountPool::new(
            store.clone(),
            ledger.clone(),
            config.sync.candidate_limit,
        ));
        let classifier = Arc::new(ErrorClassifier::new(
            store.clone(),
            ledger.clone(),
            config.upstream.markers.clone(),
            config.retry.bad_request_penalty,
            event_tx.clone(),
        ));

        tracing::info!(
            upstream = upstream.name(),
            page_size = config.sync.page_size,
            write_mode = ?config.sync.article_write_mode,
            "Feed syncer initialized"
        );

        let fetcher = Arc::new(ArticlePageFetcher::new(
            pool,
            classifier,
            upstream,
            config.retry.clone(),
        ));

        Ok(Self {
            store,
            event_tx,
            config: Arc::new(config),
            ledger,
            fetcher,
            state: ExclusiveState::new(),
        })
    }

    /// Subscribe to sync events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Whether shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        self.state.shutdown.is_cancelled()
    }

    /// Emit an event to all subscribers
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Sleep for `delay`, returning early (false) if shutdown begins
    pub(crate) async fn pause(&self, delay: std::time::Duration) -> bool {
        tokio::select! {
            _ = self.state.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
