//! # feedsync
//!
//! Synchronization orchestrator for ingesting articles from a rate-limited
//! upstream platform API.
//!
//! ## Design Philosophy
//!
//! feedsync is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Pluggable** - Storage and upstream are traits; SQLite and HTTP implementations are included
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Overview
//!
//! Each upstream call draws a random credential from the [`accounts::AccountPool`],
//! skipping credentials quarantined for the day. Failures are classified:
//! expired credentials are disabled, and failing credentials are quarantined
//! once the day's quarantine list is open. On top of that, [`FeedSyncer`] offers
//! single-page refreshes, a single-flight history crawl that can be stopped,
//! and a multi-round bulk refresh that converges on the failing sources.
//!
//! ## Quick Start
//!
//! ```no_run
//! use feedsync::{FeedSyncer, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.upstream.base_url = "http://platform.internal:3000".to_string();
//!
//!     let syncer = FeedSyncer::open(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = syncer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let result = syncer.refresh_all_sources().await;
//!     println!("{} ok, {} failed", result.success_count, result.error_count);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Credential selection, quarantine and failure classification
pub mod accounts;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Single-page article fetching
pub mod fetcher;
/// Periodic bulk refresh
pub mod refresh_scheduler;
/// Retry logic with exponential backoff
pub mod retry;
/// Storage collaborator trait
pub mod store;
/// Sync orchestrator (decomposed into focused submodules)
pub mod syncer;
/// Core types and events
pub mod types;
/// Upstream platform API client
pub mod upstream;

// Re-export commonly used types
pub use config::{ArticleWriteMode, Config};
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus, UpstreamError};
pub use store::SyncStore;
pub use syncer::FeedSyncer;
pub use types::{
    CrawlEnd, CrawlOutcome, CrawlStart, CrawlStatus, Credential, CredentialStatus, Event,
    RefreshResult, Source, SourceStatus,
};
pub use upstream::{HttpUpstream, UpstreamApi, UpstreamFailure};

/// Helper function to run the syncer with graceful signal handling.
///
/// Starts the periodic [`refresh_scheduler::RefreshScheduler`] (a no-op when
/// `sync.refresh_interval` is unset), waits for a termination signal and then
/// calls the syncer's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use feedsync::{FeedSyncer, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let syncer = FeedSyncer::open(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(syncer).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(syncer: FeedSyncer) -> Result<()> {
    let scheduler = refresh_scheduler::RefreshScheduler::new(syncer.clone());
    let scheduler_handle = tokio::spawn(scheduler.run());

    wait_for_signal().await;
    let result = syncer.shutdown().await;

    if let Err(e) = scheduler_handle.await {
        tracing::warn!(error = %e, "Refresh scheduler task ended abnormally");
    }
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
