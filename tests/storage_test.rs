//! Integration tests for bucket listing, fetching and output sinks.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use object_store::memory::InMemory;
use reducepdf::sink::LocalSink;
use reducepdf::{
    Bucket, BucketObject, Error, ErrorKind, LocalLayout, ObjectFetcher, ObjectLister,
    ObjectStoreBucket, OutputSink, OutputTarget,
};

const PDF: &[u8] = b"%PDF-1.4\n% small\n";

async fn bucket_with(keys: &[&str]) -> Arc<ObjectStoreBucket> {
    let bucket = Arc::new(ObjectStoreBucket::new("docs", Arc::new(InMemory::new())));
    for key in keys {
        bucket
            .put(key, Bytes::from_static(PDF))
            .await
            .unwrap();
    }
    bucket
}

async fn listed_keys(lister: &ObjectLister) -> Vec<String> {
    let mut keys: Vec<String> = lister
        .objects()
        .map(|item| item.unwrap().key)
        .collect()
        .await;
    keys.sort();
    keys
}

// ==================== Listing ====================

#[tokio::test]
async fn test_lister_yields_pdfs_in_all_folders() {
    let bucket = bucket_with(&[
        "a.pdf",
        "folder/b.pdf",
        "folder/sub/c.pdf",
        "notes.txt",
        "scans/x.PDF",
    ])
    .await;

    let lister = ObjectLister::new(bucket);
    assert_eq!(
        listed_keys(&lister).await,
        vec!["a.pdf", "folder/b.pdf", "folder/sub/c.pdf", "scans/x.PDF"]
    );
}

#[tokio::test]
async fn test_lister_prefix() {
    let bucket = bucket_with(&["a.pdf", "folder/b.pdf", "folder/sub/c.pdf"]).await;

    let lister = ObjectLister::new(bucket).with_prefix("folder");
    assert_eq!(
        listed_keys(&lister).await,
        vec!["folder/b.pdf", "folder/sub/c.pdf"]
    );
}

#[tokio::test]
async fn test_listed_objects_carry_bucket_and_size() {
    let bucket = bucket_with(&["folder/b.pdf"]).await;
    let objects: Vec<BucketObject> = ObjectLister::new(bucket)
        .objects()
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].bucket, "docs");
    assert_eq!(objects[0].size, PDF.len() as u64);
    assert_eq!(objects[0].folders(), vec!["folder"]);
}

#[tokio::test]
async fn test_empty_bucket_lists_nothing() {
    let bucket = bucket_with(&[]).await;
    assert!(listed_keys(&ObjectLister::new(bucket)).await.is_empty());
}

// ==================== Fetching ====================

#[tokio::test]
async fn test_fetch_returns_bytes() {
    let bucket = bucket_with(&["folder/b.pdf"]).await;
    let fetcher = ObjectFetcher::new(bucket);
    let object = BucketObject::new("docs", "folder/b.pdf", PDF.len() as u64);

    let data = fetcher.fetch(&object).await.unwrap();
    assert_eq!(&data[..], PDF);
}

#[tokio::test]
async fn test_fetch_rejects_large_listing_size() {
    let bucket = bucket_with(&["big.pdf"]).await;
    let fetcher = ObjectFetcher::new(bucket).with_max_object_size(Some(4));
    let object = BucketObject::new("docs", "big.pdf", PDF.len() as u64);

    let err = fetcher.fetch(&object).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TooLarge);
}

#[tokio::test]
async fn test_fetch_rejects_large_download() {
    // The listing under-reports the size; the downloaded body is checked too
    let bucket = bucket_with(&["big.pdf"]).await;
    let fetcher = ObjectFetcher::new(bucket).with_max_object_size(Some(4));
    let object = BucketObject::new("docs", "big.pdf", 1);

    let err = fetcher.fetch(&object).await.unwrap_err();
    assert!(matches!(err, Error::TooLarge { size, limit: 4, .. } if size == PDF.len() as u64));
}

#[tokio::test]
async fn test_fetch_unlimited() {
    let bucket = bucket_with(&["big.pdf"]).await;
    let fetcher = ObjectFetcher::new(bucket).with_max_object_size(None);
    let object = BucketObject::new("docs", "big.pdf", u64::MAX);
    assert!(fetcher.fetch(&object).await.is_ok());
}

#[tokio::test]
async fn test_fetch_missing_object() {
    let bucket = bucket_with(&[]).await;
    let fetcher = ObjectFetcher::new(bucket);
    let object = BucketObject::new("docs", "gone.pdf", 10);

    let err = fetcher.fetch(&object).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert!(!err.is_fatal());
}

// ==================== Sinks ====================

#[tokio::test]
async fn test_bucket_overwrite_replaces_bytes() {
    let bucket = bucket_with(&["folder/b.pdf"]).await;
    let sink = OutputSink::from_target(&OutputTarget::BucketOverwrite, bucket.clone());
    assert!(sink.is_destructive());

    let object = BucketObject::new("docs", "folder/b.pdf", PDF.len() as u64);
    let receipt = sink
        .write(&object, Bytes::from_static(b"%PDF-1.4\n"))
        .await
        .unwrap();
    assert_eq!(receipt.bytes_written, 9);
    assert_eq!(receipt.location, "docs/folder/b.pdf");

    let stored = bucket.get("folder/b.pdf").await.unwrap();
    assert_eq!(&stored[..], b"%PDF-1.4\n");
}

#[tokio::test]
async fn test_local_mirror_layout() {
    let dir = tempfile::tempdir().unwrap();
    let bucket = bucket_with(&[]).await;
    let sink = OutputSink::from_target(&OutputTarget::local(dir.path()), bucket);
    assert!(!sink.is_destructive());

    let object = BucketObject::new("docs", "folder/sub/c.pdf", 3);
    let receipt = sink.write(&object, Bytes::from_static(PDF)).await.unwrap();

    let expected = dir.path().join("folder").join("sub").join("c.pdf");
    assert_eq!(receipt.location, expected.display().to_string());
    assert_eq!(std::fs::read(&expected).unwrap(), PDF);
}

#[tokio::test]
async fn test_local_flatten_layout() {
    let dir = tempfile::tempdir().unwrap();
    let sink = LocalSink::new(dir.path(), LocalLayout::Flatten);

    let object = BucketObject::new("docs", "folder/sub/c.pdf", 3);
    sink.write(&object, Bytes::from_static(PDF)).await.unwrap();

    assert_eq!(
        std::fs::read(dir.path().join("folder_sub_c.pdf")).unwrap(),
        PDF
    );
}

#[tokio::test]
async fn test_local_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let sink = LocalSink::new(dir.path(), LocalLayout::Mirror);
    let object = BucketObject::new("docs", "a.pdf", 3);

    sink.write(&object, Bytes::from_static(b"old contents"))
        .await
        .unwrap();
    sink.write(&object, Bytes::from_static(PDF)).await.unwrap();

    assert_eq!(std::fs::read(dir.path().join("a.pdf")).unwrap(), PDF);
    // No temporary files are left behind
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_local_rejects_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("out");
    let sink = LocalSink::new(&root, LocalLayout::Mirror);

    for key in ["../escape.pdf", "folder/../../escape.pdf", "folder//b.pdf"] {
        let object = BucketObject::new("docs", key, 3);
        let err = sink
            .write(&object, Bytes::from_static(PDF))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Write, "key {}", key);
    }
    assert!(!dir.path().join("escape.pdf").exists());
}
