use crate::db::*;
use crate::store::{CredentialFilter, SyncStore};
use crate::types::CredentialStatus;
use tempfile::NamedTempFile;

/// Helper: create a fresh database with migrations applied
async fn setup_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

async fn insert_credential(db: &Database, id: &str, status: CredentialStatus) {
    db.upsert_credential(&NewCredential {
        id: id.to_string(),
        name: format!("account {id}"),
        token: format!("token-{id}"),
        status,
    })
    .await
    .unwrap();
}

fn enabled_filter(exclude: &[&str], limit: usize) -> CredentialFilter {
    CredentialFilter {
        status: CredentialStatus::Enabled,
        exclude_ids: exclude.iter().map(|s| s.to_string()).collect(),
        limit,
    }
}

#[tokio::test]
async fn test_find_credentials_filters_by_status() {
    let (db, _temp) = setup_db().await;
    insert_credential(&db, "a", CredentialStatus::Enabled).await;
    insert_credential(&db, "b", CredentialStatus::Invalid).await;
    insert_credential(&db, "c", CredentialStatus::Disabled).await;
    insert_credential(&db, "d", CredentialStatus::Enabled).await;

    let found = db.find_credentials(&enabled_filter(&[], 10)).await.unwrap();
    let ids: Vec<_> = found.iter().map(|c| c.id.as_str()).collect();

    assert_eq!(ids, vec!["a", "d"]);
    assert!(found.iter().all(|c| c.status() == CredentialStatus::Enabled));
}

#[tokio::test]
async fn test_find_credentials_excludes_ids_and_respects_limit() {
    let (db, _temp) = setup_db().await;
    for id in ["a", "b", "c", "d"] {
        insert_credential(&db, id, CredentialStatus::Enabled).await;
    }

    let found = db
        .find_credentials(&enabled_filter(&["a", "c"], 10))
        .await
        .unwrap();
    let ids: Vec<_> = found.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "d"]);

    let limited = db.find_credentials(&enabled_filter(&[], 2)).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_find_credentials_when_all_excluded_is_empty() {
    let (db, _temp) = setup_db().await;
    insert_credential(&db, "a", CredentialStatus::Enabled).await;

    let found = db.find_credentials(&enabled_filter(&["a"], 10)).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_set_credential_status_through_store_trait() {
    let (db, _temp) = setup_db().await;
    insert_credential(&db, "a", CredentialStatus::Enabled).await;

    let store: &dyn SyncStore = &db;
    store
        .set_credential_status("a", CredentialStatus::Invalid)
        .await
        .unwrap();

    let credential = db.get_credential("a").await.unwrap().unwrap();
    assert_eq!(credential.status(), CredentialStatus::Invalid);
    assert_eq!(credential.token, "token-a");
}

#[tokio::test]
async fn test_set_status_of_unknown_credential_is_not_found() {
    let (db, _temp) = setup_db().await;

    let result = db
        .update_credential_status("ghost", CredentialStatus::Invalid)
        .await;

    assert!(matches!(
        result,
        Err(crate::Error::Database(crate::error::DatabaseError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_upsert_credential_replaces_token() {
    let (db, _temp) = setup_db().await;
    insert_credential(&db, "a", CredentialStatus::Invalid).await;

    db.upsert_credential(&NewCredential {
        id: "a".to_string(),
        name: "renewed".to_string(),
        token: "fresh-token".to_string(),
        status: CredentialStatus::Enabled,
    })
    .await
    .unwrap();

    let credential = db.get_credential("a").await.unwrap().unwrap();
    assert_eq!(credential.token, "fresh-token");
    assert_eq!(credential.name, "renewed");
    assert_eq!(credential.status(), CredentialStatus::Enabled);
}
