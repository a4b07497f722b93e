use super::*;
use crate::error::Error;
use crate::types::Event;

#[tokio::test]
async fn invalid_config_is_rejected() {
    let mut config = test_config();
    config.sync.page_size = 0;
    let temp = tempfile::NamedTempFile::new().unwrap();
    let db = std::sync::Arc::new(crate::db::Database::new(temp.path()).await.unwrap());

    let result = FeedSyncer::new(config, db, ScriptedUpstream::new());

    assert!(matches!(result, Err(Error::Config { .. })));
}

#[tokio::test]
async fn open_builds_sqlite_store_from_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.persistence.database_path = temp_dir.path().join("nested").join("feedsync.db");

    let syncer = FeedSyncer::open(config).await.unwrap();

    assert!(temp_dir.path().join("nested").join("feedsync.db").exists());
    assert_eq!(syncer.get_config().sync.page_size, PAGE_SIZE);
    assert!(syncer.crawl_status().is_none());
}

#[tokio::test]
async fn shutdown_cancels_crawl_and_rejects_new_work() {
    let upstream = ScriptedUpstream::new();
    upstream.set_endless("MP_1");
    let mut config = test_config();
    config.sync.history_page_delay = Duration::from_secs(60);
    let (syncer, db, _temp) = create_test_syncer(config, upstream.clone()).await;
    add_source(&db, "MP_1", true).await;
    let mut events = syncer.subscribe();

    syncer.crawl_history("MP_1").await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || upstream.calls_for("MP_1") == 1).await);

    let started = tokio::time::Instant::now();
    syncer.shutdown().await.unwrap();

    // The 60 second page delay was interrupted
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(syncer.is_shutting_down());
    assert!(syncer.crawl_status().is_none());
    assert!(matches!(
        syncer.crawl_history("MP_1").await,
        Err(Error::ShuttingDown)
    ));
    let bulk = syncer.refresh_all_sources().await;
    assert_eq!(bulk.success_count, 0);
    assert!(bulk.message.contains("shutdown"));

    let mut saw_shutdown = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, Event::Shutdown) {
            saw_shutdown = true;
        }
    }
    assert!(saw_shutdown);
}

#[tokio::test]
async fn shutdown_interrupts_bulk_refresh() {
    let upstream = ScriptedUpstream::new();
    upstream.set_failing("MP_1");
    let mut config = test_config();
    config.sync.refresh_delay = Duration::from_secs(60);
    let (syncer, db, _temp) = create_test_syncer(config, upstream.clone()).await;
    add_source(&db, "MP_1", true).await;

    let background = syncer.clone();
    let bulk = tokio::spawn(async move { background.refresh_all_sources().await });
    assert!(wait_until(Duration::from_secs(2), || upstream.calls_for("MP_1") == 1).await);

    syncer.shutdown().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), bulk)
        .await
        .expect("bulk refresh did not stop")
        .unwrap();
    assert_eq!(result.failed_sources, vec!["MP_1".to_string()]);
    assert_eq!(upstream.calls_for("MP_1"), 1);
    assert!(!syncer.is_bulk_refresh_running());
}
