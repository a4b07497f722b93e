use super::*;
use crate::types::Event;

async fn finished_rounds(events: &mut tokio::sync::broadcast::Receiver<Event>) -> u32 {
    loop {
        if let Event::BulkRefreshFinished { rounds, .. } = events.recv().await.unwrap() {
            return rounds;
        }
    }
}

#[tokio::test]
async fn all_succeeding_sources_converge_in_first_round() {
    let upstream = ScriptedUpstream::new();
    for id in ["MP_1", "MP_2", "MP_3"] {
        upstream.set_page(id, 1, 2);
    }
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    for id in ["MP_1", "MP_2", "MP_3"] {
        add_source(&db, id, true).await;
    }
    let mut events = syncer.subscribe();

    let result = syncer.refresh_all_sources().await;

    assert_eq!(result.success_count, 3);
    assert_eq!(result.error_count, 0);
    assert!(result.failed_sources.is_empty());
    assert_eq!(finished_rounds(&mut events).await, 1);
    for id in ["MP_1", "MP_2", "MP_3"] {
        assert_eq!(upstream.calls_for(id), 1);
    }
    assert!(!syncer.is_bulk_refresh_running());
}

#[tokio::test]
async fn persistent_failure_runs_every_round() {
    let upstream = ScriptedUpstream::new();
    upstream.set_page("MP_A", 1, 3);
    upstream.set_failing("MP_B");
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    add_source(&db, "MP_A", true).await;
    add_source(&db, "MP_B", true).await;
    let mut events = syncer.subscribe();

    let result = syncer.refresh_all_sources().await;

    assert_eq!(result.failed_sources, vec!["MP_B".to_string()]);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.error_count, 1);
    assert_eq!(finished_rounds(&mut events).await, 8);
    assert_eq!(upstream.calls_for("MP_A"), 1);
    assert_eq!(upstream.calls_for("MP_B"), 8);
    assert!(!syncer.is_bulk_refresh_running());
}

#[tokio::test]
async fn zero_article_refresh_is_retried_next_round() {
    let upstream = ScriptedUpstream::new();
    upstream.set_page("MP_A", 1, 3);
    upstream.set_sequence("MP_C", &[0, 2]);
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    add_source(&db, "MP_A", true).await;
    add_source(&db, "MP_C", true).await;
    let mut events = syncer.subscribe();

    let result = syncer.refresh_all_sources().await;

    assert_eq!(result.success_count, 2);
    assert_eq!(result.error_count, 0);
    assert_eq!(finished_rounds(&mut events).await, 2);
    assert_eq!(upstream.calls_for("MP_A"), 1);
    assert_eq!(upstream.calls_for("MP_C"), 2);
}

#[tokio::test]
async fn sources_are_refreshed_in_storage_order() {
    let upstream = ScriptedUpstream::new();
    upstream.set_sequence("MP_z", &[0, 1]);
    upstream.set_sequence("MP_m", &[0, 1]);
    upstream.set_page("MP_a", 1, 1);
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    for id in ["MP_z", "MP_a", "MP_m"] {
        add_source(&db, id, true).await;
    }

    syncer.refresh_all_sources().await;

    let order: Vec<String> = upstream.calls().into_iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec!["MP_z", "MP_a", "MP_m", "MP_z", "MP_m"]);
}

#[tokio::test]
async fn disabled_sources_are_skipped() {
    let upstream = ScriptedUpstream::new();
    upstream.set_page("MP_on", 1, 1);
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    add_source(&db, "MP_on", true).await;
    add_source(&db, "MP_off", false).await;

    let result = syncer.refresh_all_sources().await;

    assert_eq!(result.success_count, 1);
    assert_eq!(upstream.calls_for("MP_off"), 0);
}

#[tokio::test]
async fn no_enabled_sources_returns_zero_result() {
    let upstream = ScriptedUpstream::new();
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    add_source(&db, "MP_off", false).await;
    db.set_source_status("MP_off", SourceStatus::Disabled)
        .await
        .unwrap();

    let result = syncer.refresh_all_sources().await;

    assert_eq!(result.success_count, 0);
    assert_eq!(result.error_count, 0);
    assert!(result.failed_sources.is_empty());
    assert!(upstream.calls().is_empty());
    assert!(!syncer.is_bulk_refresh_running());
}

#[tokio::test]
async fn concurrent_refresh_returns_already_running() {
    let upstream = ScriptedUpstream::new();
    upstream.set_page("MP_1", 1, 1);
    upstream.set_latency(Duration::from_millis(200));
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    add_source(&db, "MP_1", true).await;

    let background = syncer.clone();
    let first = tokio::spawn(async move { background.refresh_all_sources().await });

    assert!(
        wait_until(Duration::from_secs(2), || syncer.is_bulk_refresh_running()).await,
        "bulk refresh never started"
    );
    let second = syncer.refresh_all_sources().await;

    assert_eq!(second.success_count, -1);
    assert_eq!(second.error_count, -1);
    assert!(second.is_already_running());

    let first = first.await.unwrap();
    assert_eq!(first.success_count, 1);
    assert_eq!(upstream.calls_for("MP_1"), 1);
    assert!(!syncer.is_bulk_refresh_running());
}

#[tokio::test]
async fn source_listing_failure_is_counted_as_error() {
    let upstream = ScriptedUpstream::new();
    let (syncer, db, _temp) = create_test_syncer(test_config(), upstream.clone()).await;
    add_source(&db, "MP_1", true).await;
    db.pool().close().await;

    let result = syncer.refresh_all_sources().await;

    assert_eq!(result.success_count, 0);
    assert_eq!(result.error_count, 1);
    assert!(result.failed_sources.is_empty());
    assert!(result.message.contains("failed to load sources"));
    assert!(upstream.calls().is_empty());
    assert!(!syncer.is_bulk_refresh_running());
}
