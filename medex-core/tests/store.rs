use chrono::{TimeZone, Utc};
use medex_core::CatalogStore;
use medex_model::{FileType, NewCatalogRecord, SortField, SortOrder};
use tempfile::TempDir;

async fn open_store(dir: &TempDir) -> CatalogStore {
    CatalogStore::open(&dir.path().join("catalog.sqlite"))
        .await
        .unwrap()
}

fn record(name: &str, id: &str, path: &str) -> NewCatalogRecord {
    NewCatalogRecord {
        patient_name: name.to_string(),
        patient_id: id.to_string(),
        file_path: path.to_string(),
        file_type: FileType::Pdf,
        file_size: Some(1024),
        file_created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        file_modified_at: Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap()),
        parsing_confidence: 0.95,
    }
}

#[tokio::test]
async fn test_insert_and_find_by_path() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let inserted = store
        .insert(&record("홍길동", "1234567", "/nas/홍길동_1234567_검사.pdf"))
        .await
        .unwrap()
        .unwrap();
    assert!(inserted.id > 0);
    assert_eq!(inserted.patient_name, "홍길동");
    assert_eq!(inserted.file_type, FileType::Pdf);
    assert_eq!(inserted.created_at, inserted.modified_at);

    let found = store
        .find_by_path("/nas/홍길동_1234567_검사.pdf")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, inserted);

    assert!(store.find_by_path("/nas/missing.pdf").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_path_insert_is_ignored() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let first = store
        .insert(&record("홍길동", "1234567", "/nas/a.pdf"))
        .await
        .unwrap();
    assert!(first.is_some());

    // Same path again, even with a different identity.
    let second = store
        .insert(&record("김민준", "7654321", "/nas/a.pdf"))
        .await
        .unwrap();
    assert!(second.is_none());

    assert_eq!(store.count().await.unwrap(), 1);
    let kept = store.find_by_path("/nas/a.pdf").await.unwrap().unwrap();
    assert_eq!(kept.patient_name, "홍길동");
}

#[tokio::test]
async fn test_update_path_moves_record_and_touches_modified_at() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let original = store
        .insert(&record("홍길동", "1234567", "/nas/a.pdf"))
        .await
        .unwrap()
        .unwrap();

    let moved = store
        .update_path("/nas/a.pdf", "/nas/archive/a.pdf")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.id, original.id);
    assert_eq!(moved.patient_name, "홍길동");
    assert_eq!(moved.patient_id, "1234567");
    assert_eq!(moved.file_path, "/nas/archive/a.pdf");
    assert!(moved.modified_at >= original.modified_at);
    assert_eq!(moved.created_at, original.created_at);

    assert!(store.find_by_path("/nas/a.pdf").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_path_unknown_source_returns_none() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let result = store.update_path("/nas/ghost.pdf", "/nas/b.pdf").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_update_path_replaces_stale_destination() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store
        .insert(&record("홍길동", "1234567", "/nas/a.pdf"))
        .await
        .unwrap();
    store
        .insert(&record("김민준", "7654321", "/nas/b.pdf"))
        .await
        .unwrap();

    // The move overwrote b.pdf on disk; its old record is stale.
    let moved = store.update_path("/nas/a.pdf", "/nas/b.pdf").await.unwrap().unwrap();
    assert_eq!(moved.patient_name, "홍길동");
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_by_path() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store
        .insert(&record("홍길동", "1234567", "/nas/a.pdf"))
        .await
        .unwrap();

    assert!(store.delete_by_path("/nas/a.pdf").await.unwrap());
    assert!(!store.delete_by_path("/nas/a.pdf").await.unwrap());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_search_dispatches_on_digit_terms() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store
        .insert(&record("홍길동", "1234567", "/nas/a.pdf"))
        .await
        .unwrap();
    store
        .insert(&record("홍길순", "7654321", "/nas/b.pdf"))
        .await
        .unwrap();
    store
        .insert(&record("김민준", "1239999", "/nas/c.pdf"))
        .await
        .unwrap();

    // Digit query matches registration-number substrings.
    let by_id = store
        .search("123", SortField::PatientName, SortOrder::Asc, 50, 0)
        .await
        .unwrap();
    assert_eq!(by_id.total, 2);
    let names: Vec<&str> = by_id.results.iter().map(|r| r.patient_name.as_str()).collect();
    assert_eq!(names, vec!["김민준", "홍길동"]);

    // Name query matches name substrings.
    let by_name = store
        .search("홍길", SortField::PatientName, SortOrder::Desc, 50, 0)
        .await
        .unwrap();
    assert_eq!(by_name.total, 2);
    let names: Vec<&str> = by_name.results.iter().map(|r| r.patient_name.as_str()).collect();
    assert_eq!(names, vec!["홍길순", "홍길동"]);
}

#[tokio::test]
async fn test_search_pagination() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    for i in 0..5 {
        store
            .insert(&record("홍길동", "1234567", &format!("/nas/{i}.pdf")))
            .await
            .unwrap();
    }

    let page = store
        .search("홍길동", SortField::CreatedAt, SortOrder::Desc, 2, 2)
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.limit, 2);
    assert_eq!(page.offset, 2);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    for i in 0..3 {
        store
            .insert(&record("홍길동", "1234567", &format!("/nas/{i}.pdf")))
            .await
            .unwrap();
    }

    let page = store.list(10, 0).await.unwrap();
    assert_eq!(page.total, 3);
    // Equal timestamps fall back to id order, newest insert first.
    let ids: Vec<i64> = page.results.iter().map(|r| r.id).collect();
    let mut sorted = ids.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(ids, sorted);
}

#[tokio::test]
async fn test_update_thumbnail_path() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let inserted = store
        .insert(&record("홍길동", "1234567", "/nas/a.pdf"))
        .await
        .unwrap()
        .unwrap();
    assert!(inserted.thumbnail_path.is_none());

    assert!(store
        .update_thumbnail_path(inserted.id, "/cache/thumbnails/1.png")
        .await
        .unwrap());
    let updated = store.get(inserted.id).await.unwrap().unwrap();
    assert_eq!(
        updated.thumbnail_path.as_deref(),
        Some("/cache/thumbnails/1.png")
    );
}
