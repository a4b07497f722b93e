//! Construction from configuration and shutdown coordination.

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::types::Event;
use crate::upstream::HttpUpstream;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::FeedSyncer;

impl FeedSyncer {
    /// Create a syncer backed by SQLite and the HTTP upstream
    ///
    /// Opens (or creates) the database at `persistence.database_path`, runs
    /// migrations and builds an [`HttpUpstream`] from `upstream`.
    pub async fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        let upstream = HttpUpstream::new(&config.upstream)?;

        tracing::info!(
            database = %config.persistence.database_path.display(),
            base_url = %config.upstream.base_url,
            "Opening feed syncer"
        );

        Self::new(config, Arc::new(db), Arc::new(upstream))
    }

    /// Gracefully shut down the syncer
    ///
    /// 1. Stops accepting history crawls and bulk refreshes
    /// 2. Cancels the active history crawl and interrupts inter-step delays
    /// 3. Waits (up to 30 seconds) for running crawls and bulk refreshes to wind down
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// A page fetch already in flight is allowed to finish.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.state.shutdown.cancel();
        self.stop_history_crawl();
        tracing::info!("Stopped accepting new sync operations");

        let shutdown_timeout = Duration::from_secs(30);
        match tokio::time::timeout(shutdown_timeout, self.wait_for_exclusive_operations()).await {
            Ok(()) => tracing::info!("All sync operations wound down"),
            Err(_) => tracing::warn!("Timeout waiting for sync operations, proceeding with shutdown"),
        }

        let _ = self.event_tx.send(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_exclusive_operations(&self) {
        loop {
            let crawls = self.state.running_crawls.load(Ordering::SeqCst);
            let bulk = self.is_bulk_refresh_running();
            if crawls == 0 && !bulk {
                return;
            }

            tracing::debug!(crawls, bulk, "Waiting for sync operations to complete");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
