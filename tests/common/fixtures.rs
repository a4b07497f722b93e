//! Fixtures wiring a FeedSyncer to a temporary database and a mock upstream

use feedsync::db::{NewCredential, NewSource};
use feedsync::{Config, CredentialStatus, Database, FeedSyncer, HttpUpstream};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Articles per full page in end-to-end configurations
pub const PAGE_SIZE: usize = 3;

/// A syncer talking to a wiremock upstream over a temporary SQLite database
pub struct TestEnv {
    pub syncer: FeedSyncer,
    pub db: Arc<Database>,
    pub server: MockServer,
    _temp_dir: TempDir,
}

/// Config with short delays, no retries and the given upstream
pub fn e2e_config(base_url: &str, database: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = base_url.to_string();
    config.upstream.request_timeout = Duration::from_secs(5);
    config.sync.page_size = PAGE_SIZE;
    config.sync.history_page_delay = Duration::from_millis(10);
    config.sync.refresh_delay = Duration::from_millis(1);
    config.retry.max_attempts = 0;
    config.retry.jitter = false;
    config.retry.bad_request_penalty = Duration::ZERO;
    config.persistence.database_path = database.to_path_buf();
    config
}

/// Start a mock upstream and build a syncer against it
pub async fn setup_with(customize: impl FnOnce(&mut Config)) -> TestEnv {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let mut config = e2e_config(&server.uri(), &temp_dir.path().join("e2e.db"));
    customize(&mut config);

    let db = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .expect("open database"),
    );
    let upstream = Arc::new(HttpUpstream::new(&config.upstream).expect("http upstream"));
    let syncer = FeedSyncer::new(config, db.clone(), upstream).expect("syncer");

    TestEnv {
        syncer,
        db,
        server,
        _temp_dir: temp_dir,
    }
}

pub async fn setup() -> TestEnv {
    setup_with(|_| {}).await
}

pub async fn add_credential(db: &Database, id: &str) {
    db.upsert_credential(&NewCredential {
        id: id.to_string(),
        name: format!("Account {id}"),
        token: format!("token-{id}"),
        status: CredentialStatus::Enabled,
    })
    .await
    .expect("insert credential");
}

pub async fn add_source(db: &Database, id: &str) {
    db.upsert_source(&NewSource {
        id: id.to_string(),
        name: format!("Source {id}"),
        enabled: true,
    })
    .await
    .expect("insert source");
}

/// JSON payload of one upstream page
pub fn articles_json(source_id: &str, page: u32, count: usize) -> serde_json::Value {
    let articles: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": format!("{source_id}-{page}-{i}"),
                "title": format!("Article {i} of page {page}"),
                "picUrl": format!("https://img.example/{source_id}/{page}/{i}.jpg"),
                "publishTime": 1_700_000_000_i64 - i64::from(page) * 100 - i as i64,
            })
        })
        .collect();
    serde_json::Value::Array(articles)
}

fn articles_path(source_id: &str) -> String {
    format!("/api/v2/platform/mps/{source_id}/articles")
}

/// Serve `count` articles for one page of a source
pub async fn mount_page(server: &MockServer, source_id: &str, page: u32, count: usize) {
    Mock::given(method("GET"))
        .and(path(articles_path(source_id)))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles_json(source_id, page, count)))
        .mount(server)
        .await;
}

/// Fail every request for a source with the given status and message
pub async fn mount_error(server: &MockServer, source_id: &str, status: u16, message: &str) {
    Mock::given(method("GET"))
        .and(path(articles_path(source_id)))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(serde_json::json!({ "message": message })),
        )
        .mount(server)
        .await;
}

/// Fail every request made with one credential
pub async fn mount_credential_error(server: &MockServer, credential_id: &str, status: u16, message: &str) {
    Mock::given(method("GET"))
        .and(header("xid", credential_id))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(serde_json::json!({ "message": message })),
        )
        .with_priority(1)
        .mount(server)
        .await;
}

/// Number of requests the mock upstream received for a source
pub async fn requests_for(server: &MockServer, source_id: &str) -> usize {
    let wanted = articles_path(source_id);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == wanted)
        .count()
}
