//! Periodic bulk refresh
//!
//! This module provides background scheduling for bulk refreshes. When
//! `sync.refresh_interval` is set, the scheduler calls
//! [`FeedSyncer::refresh_all_sources`] once per interval until shutdown.
//!
//! # Example
//!
//! ```no_run
//! use feedsync::{FeedSyncer, Config};
//! use feedsync::refresh_scheduler::RefreshScheduler;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.sync.refresh_interval = Some(Duration::from_secs(3600));
//! let syncer = FeedSyncer::open(config).await?;
//!
//! let scheduler = RefreshScheduler::new(syncer.clone());
//!
//! // Run scheduler (returns after shutdown)
//! tokio::spawn(async move {
//!     scheduler.run().await;
//! });
//! # Ok(())
//! # }
//! ```

use crate::FeedSyncer;
use tracing::{debug, info, warn};

/// Scheduler that periodically refreshes every enabled source
pub struct RefreshScheduler {
    /// Syncer performing the refreshes and providing config and shutdown status
    syncer: FeedSyncer,
}

impl RefreshScheduler {
    /// Creates a new refresh scheduler
    pub fn new(syncer: FeedSyncer) -> Self {
        Self { syncer }
    }

    /// Starts the periodic refresh loop
    ///
    /// Returns immediately if no interval is configured. Otherwise waits one
    /// interval, runs a bulk refresh, and repeats until shutdown begins. A run
    /// that finds another bulk refresh in progress is skipped.
    pub async fn run(self) {
        let Some(interval) = self.syncer.config.sync.refresh_interval else {
            info!("Periodic refresh disabled");
            return;
        };

        info!(interval_secs = interval.as_secs(), "Refresh scheduler started");

        loop {
            if !self.syncer.pause(interval).await {
                break;
            }

            debug!("Starting scheduled bulk refresh");
            let result = self.syncer.refresh_all_sources().await;

            if result.is_already_running() {
                debug!("Bulk refresh already running, skipping scheduled run");
            } else if result.error_count > 0 {
                warn!(
                    success_count = result.success_count,
                    error_count = result.error_count,
                    failed_sources = ?result.failed_sources,
                    "Scheduled bulk refresh finished with failures"
                );
            } else {
                info!(
                    success_count = result.success_count,
                    "Scheduled bulk refresh finished"
                );
            }
        }

        info!("Refresh scheduler shutting down");
    }
}
