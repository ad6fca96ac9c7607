use bytes::Bytes;
use gcs_upload_storage::object_store::{ByteStream, LocalStore, ObjectStore, ObjectStoreError};
use gcs_upload_storage::WriteOptions;

fn body(chunks: &[&'static str]) -> ByteStream {
    let chunks: Vec<std::io::Result<Bytes>> =
        chunks.iter().map(|c| Ok(Bytes::from_static((*c).as_bytes()))).collect();
    Box::pin(futures::stream::iter(chunks))
}

#[tokio::test]
async fn test_local_store_write_streams_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .write("test-key", &WriteOptions::default(), body(&["hello ", "world"]))
        .await
        .unwrap();

    let data = std::fs::read(dir.path().join("test-key")).unwrap();
    assert_eq!(data, b"hello world");
}

#[tokio::test]
async fn test_local_store_write_creates_prefix_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .write("uploads/2024/a.txt", &WriteOptions::default(), body(&["data"]))
        .await
        .unwrap();

    assert!(dir.path().join("uploads/2024/a.txt").exists());
}

#[tokio::test]
async fn test_local_store_write_propagates_stream_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let chunks: Vec<std::io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"partial")),
        Err(std::io::Error::other("client went away")),
    ];
    let result = store
        .write(
            "broken",
            &WriteOptions::default(),
            Box::pin(futures::stream::iter(chunks)),
        )
        .await;

    assert!(matches!(result, Err(ObjectStoreError::Io(_))));
}

#[tokio::test]
async fn test_local_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .write("key", &WriteOptions::default(), body(&["first"]))
        .await
        .unwrap();
    store
        .write("key", &WriteOptions::default(), body(&["second"]))
        .await
        .unwrap();

    let data = std::fs::read(dir.path().join("key")).unwrap();
    assert_eq!(data, b"second");
}

#[tokio::test]
async fn test_local_store_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .write("to-delete", &WriteOptions::default(), body(&["data"]))
        .await
        .unwrap();
    store.delete("to-delete").await.unwrap();

    assert!(!dir.path().join("to-delete").exists());
}

#[tokio::test]
async fn test_local_store_delete_nonexistent() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let result = store.delete("nonexistent").await;
    assert!(matches!(result, Err(ObjectStoreError::NotFound(ref key)) if key == "nonexistent"));
}

#[tokio::test]
async fn test_local_store_write_rejects_parent_dir_key() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("bucket");
    let store = LocalStore::new(&base).unwrap();

    for key in ["../escaped.txt", "a/../../escaped.txt", "/../escaped.txt"] {
        let result = store
            .write(key, &WriteOptions::default(), body(&["data"]))
            .await;
        assert!(matches!(result, Err(ObjectStoreError::Backend(_))), "{key}");
    }

    assert!(!root.path().join("escaped.txt").exists());
}

#[tokio::test]
async fn test_local_store_write_rejects_empty_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    for key in ["", ".", "/"] {
        let result = store
            .write(key, &WriteOptions::default(), body(&["data"]))
            .await;
        assert!(matches!(result, Err(ObjectStoreError::Backend(_))), "{key:?}");
    }
}

#[tokio::test]
async fn test_local_store_write_keeps_leading_slash_inside_base() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .write("/uploads/a.txt", &WriteOptions::default(), body(&["data"]))
        .await
        .unwrap();

    assert!(dir.path().join("uploads/a.txt").exists());
}

#[tokio::test]
async fn test_local_store_delete_rejects_parent_dir_key() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("bucket");
    let store = LocalStore::new(&base).unwrap();
    let victim = root.path().join("victim.txt");
    std::fs::write(&victim, "keep me").unwrap();

    let result = store.delete("../victim.txt").await;

    assert!(matches!(result, Err(ObjectStoreError::NotFound(ref key)) if key == "../victim.txt"));
    assert!(victim.exists());
}
