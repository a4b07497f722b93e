//! Multi-round refresh of every enabled source.

use crate::store::SourceFilter;
use crate::types::{Event, RefreshResult, SourceStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::FeedSyncer;

/// Ownership of the bulk refresh flag; dropping it clears the flag
struct BulkRefreshGuard {
    flag: Arc<AtomicBool>,
}

impl BulkRefreshGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for BulkRefreshGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl FeedSyncer {
    /// Refresh page 1 of every enabled source until the set converges
    ///
    /// Round 1 covers all enabled sources in storage order; each later round
    /// covers only the sources whose previous refresh failed or returned no
    /// articles. Stops when a round leaves nothing to retry or after
    /// `sync.max_refresh_rounds` rounds. Every source is followed by
    /// `sync.refresh_delay`.
    ///
    /// Returns the "already running" sentinel (`-1`/`-1`) without touching any
    /// source if another bulk refresh holds the flag. A failure to load the
    /// source list is reported with `error_count = 1` and no failed sources.
    pub async fn refresh_all_sources(&self) -> RefreshResult {
        if self.is_shutting_down() {
            return RefreshResult::shutting_down();
        }

        let Some(_guard) = BulkRefreshGuard::acquire(&self.state.bulk_running) else {
            tracing::info!("Bulk refresh already running");
            return RefreshResult::already_running();
        };

        let filter = SourceFilter {
            status: Some(SourceStatus::Enabled),
        };
        let sources = match self.store.list_sources(&filter).await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load sources for bulk refresh");
                return RefreshResult {
                    message: format!("failed to load sources: {e}"),
                    error_count: 1,
                    ..RefreshResult::default()
                };
            }
        };

        if sources.is_empty() {
            tracing::info!("No enabled sources to refresh");
            return RefreshResult {
                message: "no enabled sources".to_string(),
                ..RefreshResult::default()
            };
        }

        let total = sources.len();
        let mut pending: Vec<String> = sources.into_iter().map(|source| source.id).collect();
        let mut rounds = 0;

        tracing::info!(sources = total, "Bulk refresh started");

        for round in 1..=self.config.sync.max_refresh_rounds {
            if self.is_shutting_down() {
                break;
            }
            rounds = round;

            tracing::info!(round, pending = pending.len(), "Bulk refresh round");
            self.emit_event(Event::BulkRefreshRound {
                round,
                pending: pending.len(),
            });

            let mut failed = Vec::new();
            for source_id in &pending {
                if self.is_shutting_down() {
                    failed.push(source_id.clone());
                    continue;
                }

                let result = self.refresh_source(source_id, 1).await;
                if result.needs_retry() {
                    tracing::debug!(
                        source_id = %source_id,
                        round,
                        articles = result.articles_count,
                        errors = result.error_count,
                        "Source will be retried"
                    );
                    failed.push(source_id.clone());
                }

                self.pause(self.config.sync.refresh_delay).await;
            }

            pending = failed;
            if pending.is_empty() {
                break;
            }
        }

        let error_count = pending.len() as i64;
        let success_count = total as i64 - error_count;

        tracing::info!(
            success_count,
            error_count,
            rounds,
            failed_sources = ?pending,
            "Bulk refresh finished"
        );
        self.emit_event(Event::BulkRefreshFinished {
            success_count,
            error_count,
            rounds,
        });

        RefreshResult {
            message: format!(
                "refreshed {success_count} of {total} sources in {rounds} rounds"
            ),
            success_count,
            error_count,
            failed_sources: pending,
            has_history: None,
            articles_count: 0,
        }
    }

    /// Whether a bulk refresh currently holds the flag
    pub fn is_bulk_refresh_running(&self) -> bool {
        self.state.bulk_running.load(Ordering::SeqCst)
    }
}
