//! Core types for feedsync

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Credential status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    /// Rejected by the upstream; never selected again
    Invalid,
    /// Eligible for selection
    Enabled,
    /// Switched off by an operator
    Disabled,
}

impl CredentialStatus {
    /// Convert integer status code to CredentialStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => CredentialStatus::Invalid,
            1 => CredentialStatus::Enabled,
            _ => CredentialStatus::Disabled,
        }
    }

    /// Convert CredentialStatus enum to integer for database storage
    pub fn to_i32(&self) -> i32 {
        match self {
            CredentialStatus::Invalid => 0,
            CredentialStatus::Enabled => 1,
            CredentialStatus::Disabled => 2,
        }
    }
}

/// Source (feed) status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    /// Not refreshed
    Disabled,
    /// Included in bulk refreshes
    Enabled,
}

impl SourceStatus {
    /// Convert integer status code to SourceStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            1 => SourceStatus::Enabled,
            _ => SourceStatus::Disabled,
        }
    }

    /// Convert SourceStatus enum to integer for database storage
    pub fn to_i32(&self) -> i32 {
        match self {
            SourceStatus::Disabled => 0,
            SourceStatus::Enabled => 1,
        }
    }
}

/// Authentication token used to call the upstream on behalf of one account
#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct Credential {
    /// Upstream account ID, sent alongside the token
    pub id: String,
    /// Display name
    pub name: String,
    /// Bearer token
    pub token: String,
    /// Status code (see [`CredentialStatus`])
    pub status: i32,
}

impl Credential {
    /// Decoded status
    pub fn status(&self) -> CredentialStatus {
        CredentialStatus::from_i32(self.status)
    }
}

/// External account whose articles are ingested
#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct Source {
    /// Upstream-assigned source ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Status code (see [`SourceStatus`])
    pub status: i32,
    /// Unix timestamp of the last refresh attempt
    pub sync_time: i64,
    /// 1 while older pages may exist, 0 once history is exhausted
    pub has_history: i32,
}

impl Source {
    /// Whether a history crawl can find anything more
    pub fn has_more_history(&self) -> bool {
        self.has_history != 0
    }

    /// Decoded status
    pub fn status(&self) -> SourceStatus {
        SourceStatus::from_i32(self.status)
    }
}

/// Article row as stored
#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct Article {
    /// Upstream-assigned, globally unique ID
    pub id: String,
    /// Source this article belongs to
    pub source_id: String,
    /// Title (refreshed on upsert)
    pub title: String,
    /// Cover image URL (immutable once stored)
    pub pic_url: String,
    /// Unix timestamp of publication (refreshed on upsert)
    pub publish_time: i64,
}

/// Article to be written to storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewArticle {
    /// Upstream-assigned, globally unique ID
    pub id: String,
    /// Source this article belongs to
    pub source_id: String,
    /// Title
    pub title: String,
    /// Cover image URL
    pub pic_url: String,
    /// Unix timestamp of publication
    pub publish_time: i64,
}

/// Article as returned by one upstream page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamArticle {
    /// Upstream-assigned ID
    pub id: String,
    /// Title
    pub title: String,
    /// Cover image URL
    #[serde(default)]
    pub pic_url: String,
    /// Unix timestamp of publication
    pub publish_time: i64,
}

impl UpstreamArticle {
    /// Attach the owning source for storage
    pub fn into_new_article(self, source_id: &str) -> NewArticle {
        NewArticle {
            id: self.id,
            source_id: source_id.to_string(),
            title: self.title,
            pic_url: self.pic_url,
            publish_time: self.publish_time,
        }
    }
}

/// Outcome of a refresh operation
///
/// Refresh operations never return errors to their callers; failures are
/// reported through `error_count` and `failed_sources`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResult {
    /// Human-readable summary
    pub message: String,
    /// Number of sources refreshed successfully (-1 when another bulk refresh is running)
    pub success_count: i64,
    /// Number of sources that failed (-1 when another bulk refresh is running)
    pub error_count: i64,
    /// IDs of the sources that failed
    pub failed_sources: Vec<String>,
    /// Whether older pages may exist (single-source refreshes only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_history: Option<bool>,
    /// Number of articles on the fetched page
    pub articles_count: usize,
}

impl RefreshResult {
    /// Single-source success
    pub fn succeeded(source_id: &str, has_history: bool, articles_count: usize) -> Self {
        Self {
            message: format!("refreshed source {source_id}: {articles_count} articles"),
            success_count: 1,
            error_count: 0,
            failed_sources: vec![],
            has_history: Some(has_history),
            articles_count,
        }
    }

    /// Single-source failure; history defaults to "possibly more" so a retry is not starved
    pub fn failed(source_id: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            message: format!("failed to refresh source {source_id}: {reason}"),
            success_count: 0,
            error_count: 1,
            failed_sources: vec![source_id.to_string()],
            has_history: Some(true),
            articles_count: 0,
        }
    }

    /// Sentinel returned when a bulk refresh is already in flight
    pub fn already_running() -> Self {
        Self {
            message: "bulk refresh already running".to_string(),
            success_count: -1,
            error_count: -1,
            failed_sources: vec![],
            has_history: None,
            articles_count: 0,
        }
    }

    /// Result of a bulk refresh requested after shutdown began
    pub fn shutting_down() -> Self {
        Self {
            message: "shutdown in progress".to_string(),
            ..Self::default()
        }
    }

    /// Whether this result is the "already running" sentinel
    pub fn is_already_running(&self) -> bool {
        self.success_count < 0 && self.error_count < 0
    }

    /// Whether the refresh should be repeated in the next bulk round
    pub fn needs_retry(&self) -> bool {
        self.error_count > 0 || self.articles_count == 0
    }
}

/// Snapshot of the running history crawl
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStatus {
    /// Source being crawled
    pub active_source_id: String,
    /// Page the crawl will fetch next
    pub current_page: u32,
}

/// What a history crawl request did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CrawlStart {
    /// The slot was claimed and the crawl began
    Started,
    /// A crawl for the same source is already running
    AlreadyRunning,
    /// A crawl for another source owns the slot
    Busy {
        /// Source currently being crawled
        active_source_id: String,
    },
    /// A stop request was issued
    StopRequested,
}

/// Why a history crawl ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlEnd {
    /// The source already had no history when the crawl started
    NothingToCrawl,
    /// A short page marked the end of history
    Exhausted,
    /// A stop request was observed
    Cancelled,
    /// The page budget ran out
    PageLimit,
    /// The crawl could not run (unknown source, storage error)
    Failed,
}

/// Summary of a finished history crawl
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlOutcome {
    /// Source that was crawled
    pub source_id: String,
    /// Number of pages refreshed
    pub pages_fetched: u32,
    /// Number of refreshed pages that failed
    pub failed_pages: u32,
    /// Why the crawl stopped
    pub end: CrawlEnd,
}

/// Event emitted during sync operations
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// One page of a source was stored
    SourceRefreshed {
        /// Source ID
        source_id: String,
        /// Requested page
        page: u32,
        /// Articles on the page
        articles: usize,
        /// Whether older pages may exist
        has_history: bool,
    },

    /// Refreshing a source failed
    SourceRefreshFailed {
        /// Source ID
        source_id: String,
        /// Requested page
        page: u32,
        /// Error message
        error: String,
    },

    /// A credential was permanently disabled
    CredentialDisabled {
        /// Credential ID
        credential_id: String,
    },

    /// A credential was quarantined for the rest of the day
    CredentialQuarantined {
        /// Credential ID
        credential_id: String,
    },

    /// A history crawl claimed the slot
    HistoryCrawlStarted {
        /// Source ID
        source_id: String,
    },

    /// A history crawl refreshed one page
    HistoryCrawlPage {
        /// Source ID
        source_id: String,
        /// Page that was refreshed
        page: u32,
        /// Articles on the page
        articles: usize,
    },

    /// A history crawl released the slot
    HistoryCrawlFinished {
        /// Source ID
        source_id: String,
        /// Pages refreshed
        pages: u32,
        /// Why the crawl stopped
        end: CrawlEnd,
    },

    /// A bulk refresh round is starting
    BulkRefreshRound {
        /// Round number, starting at 1
        round: u32,
        /// Sources to process this round
        pending: usize,
    },

    /// A bulk refresh released the flag
    BulkRefreshFinished {
        /// Sources refreshed successfully
        success_count: i64,
        /// Sources still failing
        error_count: i64,
        /// Rounds run
        rounds: u32,
    },

    /// Syncer is shutting down
    Shutdown,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_status_codes_round_trip() {
        for status in [
            CredentialStatus::Invalid,
            CredentialStatus::Enabled,
            CredentialStatus::Disabled,
        ] {
            assert_eq!(CredentialStatus::from_i32(status.to_i32()), status);
        }
        assert_eq!(CredentialStatus::from_i32(7), CredentialStatus::Disabled);
    }

    #[test]
    fn failed_result_keeps_history_open() {
        let result = RefreshResult::failed("MP_1", "timeout");

        assert_eq!(result.success_count, 0);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.failed_sources, vec!["MP_1".to_string()]);
        assert_eq!(result.has_history, Some(true));
        assert_eq!(result.articles_count, 0);
        assert!(result.needs_retry());
    }

    #[test]
    fn zero_article_success_still_needs_retry() {
        let empty = RefreshResult::succeeded("MP_1", false, 0);
        assert_eq!(empty.error_count, 0);
        assert!(empty.needs_retry());

        let full = RefreshResult::succeeded("MP_1", true, 20);
        assert!(!full.needs_retry());
    }

    #[test]
    fn already_running_sentinel_uses_negative_counts() {
        let result = RefreshResult::already_running();
        assert_eq!(result.success_count, -1);
        assert_eq!(result.error_count, -1);
        assert!(result.is_already_running());
        assert!(!RefreshResult::default().is_already_running());
    }

    #[test]
    fn upstream_article_reads_camel_case_payload() {
        let json = r#"{"id":"a1","title":"Hello","picUrl":"https://img/1.png","publishTime":1700000000}"#;
        let article: UpstreamArticle = serde_json::from_str(json).unwrap();

        let stored = article.into_new_article("MP_1");
        assert_eq!(stored.source_id, "MP_1");
        assert_eq!(stored.pic_url, "https://img/1.png");
        assert_eq!(stored.publish_time, 1_700_000_000);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::HistoryCrawlFinished {
            source_id: "MP_1".into(),
            pages: 3,
            end: CrawlEnd::Cancelled,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "history_crawl_finished");
        assert_eq!(json["end"], "cancelled");
    }
}
