use bytes::Bytes;
use exam_manager::object_store::{LocalStore, ObjectStore, ObjectStoreError};

fn document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[tokio::test]
async fn test_local_store_put_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let id = document_id();
    let data = Bytes::from_static(b"%PDF-1.4 question paper");
    store.put(&id, data.clone()).await.unwrap();

    assert_eq!(store.get(&id).await.unwrap(), data);
    assert!(store.exists(&id).await.unwrap());
}

#[tokio::test]
async fn test_local_store_overwrite_leaves_no_staging_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let id = document_id();
    store.put(&id, Bytes::from_static(b"first")).await.unwrap();
    store.put(&id, Bytes::from_static(b"second")).await.unwrap();

    assert_eq!(store.get(&id).await.unwrap(), Bytes::from_static(b"second"));
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_local_store_delete_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let id = document_id();
    store.put(&id, Bytes::from_static(b"sheet")).await.unwrap();
    store.delete(&id).await.unwrap();
    assert!(!store.exists(&id).await.unwrap());

    store.delete(&id).await.unwrap();
}

#[tokio::test]
async fn test_local_store_get_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    match store.get(&document_id()).await {
        Err(ObjectStoreError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_local_store_rejects_path_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("blobs")).unwrap();

    for key in ["", "../escape", "a/b", "name.txt"] {
        assert!(
            matches!(
                store.put(key, Bytes::from_static(b"x")).await,
                Err(ObjectStoreError::InvalidKey(_))
            ),
            "key {key:?} should be rejected"
        );
    }
    assert!(!dir.path().join("escape").exists());
}
