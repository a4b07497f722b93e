//! Shared test helpers for creating FeedSyncer instances in tests.

use crate::config::Config;
use crate::db::{Database, NewCredential, NewSource};
use crate::syncer::FeedSyncer;
use crate::types::{Credential, CredentialStatus, UpstreamArticle};
use crate::upstream::{UpstreamApi, UpstreamFailure};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Articles per full page in test configurations
pub(crate) const PAGE_SIZE: usize = 5;

/// Upstream whose responses are scripted per source
#[derive(Default)]
pub(crate) struct ScriptedUpstream {
    /// Article counts per (source, page)
    pages: Mutex<HashMap<(String, u32), usize>>,
    /// Article counts returned by successive calls, last value repeating
    sequences: Mutex<HashMap<String, VecDeque<usize>>>,
    /// Sources returning a full page for every page number
    endless: Mutex<HashSet<String>>,
    /// Sources whose calls always fail
    failing: Mutex<HashSet<String>>,
    /// Every call made, in order
    calls: Mutex<Vec<(String, u32)>>,
    /// Delay before each response
    latency: Mutex<Duration>,
}

impl ScriptedUpstream {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_page(&self, source_id: &str, page: u32, articles: usize) {
        self.pages
            .lock()
            .unwrap()
            .insert((source_id.to_string(), page), articles);
    }

    pub(crate) fn set_sequence(&self, source_id: &str, counts: &[usize]) {
        self.sequences
            .lock()
            .unwrap()
            .insert(source_id.to_string(), counts.iter().copied().collect());
    }

    pub(crate) fn set_endless(&self, source_id: &str) {
        self.endless.lock().unwrap().insert(source_id.to_string());
    }

    pub(crate) fn set_failing(&self, source_id: &str) {
        self.failing.lock().unwrap().insert(source_id.to_string());
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub(crate) fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, source_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == source_id)
            .count()
    }

    fn article_count(&self, source_id: &str, page: u32) -> usize {
        if let Some(sequence) = self.sequences.lock().unwrap().get_mut(source_id) {
            let count = if sequence.len() > 1 {
                sequence.pop_front()
            } else {
                sequence.front().copied()
            };
            return count.unwrap_or(0);
        }
        if self.endless.lock().unwrap().contains(source_id) {
            return PAGE_SIZE;
        }
        self.pages
            .lock()
            .unwrap()
            .get(&(source_id.to_string(), page))
            .copied()
            .unwrap_or(0)
    }
}

/// Article IDs are stable per (source, page, index) so repeated pages upsert
pub(crate) fn scripted_articles(source_id: &str, page: u32, count: usize) -> Vec<UpstreamArticle> {
    (0..count)
        .map(|i| UpstreamArticle {
            id: format!("{source_id}-p{page}-{i}"),
            title: format!("{source_id} page {page} article {i}"),
            pic_url: format!("https://img.example/{source_id}/{page}/{i}.jpg"),
            publish_time: 1_700_000_000 - i64::from(page) * 1000 - i as i64,
        })
        .collect()
}

#[async_trait]
impl UpstreamApi for ScriptedUpstream {
    async fn fetch_articles(
        &self,
        _credential: &Credential,
        source_id: &str,
        page: u32,
    ) -> std::result::Result<Vec<UpstreamArticle>, UpstreamFailure> {
        self.calls
            .lock()
            .unwrap()
            .push((source_id.to_string(), page));

        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.failing.lock().unwrap().contains(source_id) {
            return Err(UpstreamFailure::with_status(500, "scripted failure"));
        }

        let count = self.article_count(source_id, page);
        Ok(scripted_articles(source_id, page, count))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Config with short delays and no retries
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.sync.page_size = PAGE_SIZE;
    config.sync.history_page_delay = Duration::from_millis(20);
    config.sync.refresh_delay = Duration::from_millis(1);
    config.retry.max_attempts = 0;
    config.retry.jitter = false;
    config.retry.bad_request_penalty = Duration::ZERO;
    config
}

/// Helper to create a test FeedSyncer over a temporary database with one enabled credential.
/// Returns the syncer, the database and the tempdir (which must be kept alive).
pub(crate) async fn create_test_syncer(
    config: Config,
    upstream: Arc<ScriptedUpstream>,
) -> (FeedSyncer, Arc<Database>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let db = Database::new(&temp_dir.path().join("test.db"))
        .await
        .unwrap();
    db.upsert_credential(&NewCredential {
        id: "acc-1".to_string(),
        name: "Test account".to_string(),
        token: "token-1".to_string(),
        status: CredentialStatus::Enabled,
    })
    .await
    .unwrap();

    let db = Arc::new(db);
    let syncer = FeedSyncer::new(config, db.clone(), upstream).unwrap();
    (syncer, db, temp_dir)
}

pub(crate) async fn add_source(db: &Database, source_id: &str, enabled: bool) {
    db.upsert_source(&NewSource {
        id: source_id.to_string(),
        name: format!("Source {source_id}"),
        enabled,
    })
    .await
    .unwrap();
}

/// Poll `condition` every 5ms until it holds or `timeout` elapses
pub(crate) async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
