use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use bytes::Bytes;
use chrono::Utc;
use futures::stream;
use tokio::sync::mpsc;

use super::*;
use crate::blobstore::BlobProvider;
use crate::transfer::DownloadMessage;

/// Mock repository for testing.
struct MockAttachmentRepository {
    attachments: Mutex<HashMap<Uuid, AttachmentInfo>>,
    feedbacks: Mutex<HashSet<Uuid>>,
}

impl MockAttachmentRepository {
    fn new() -> Self {
        Self {
            attachments: Mutex::new(HashMap::new()),
            feedbacks: Mutex::new(HashSet::new()),
        }
    }

    fn add_feedback(&self, id: Uuid) {
        self.feedbacks.lock().unwrap().insert(id);
    }

    fn record_count(&self) -> usize {
        self.attachments.lock().unwrap().len()
    }
}

impl AttachmentRepository for MockAttachmentRepository {
    async fn create(&self, input: CreateAttachmentInput) -> Result<AttachmentInfo, AttachmentError> {
        let record = AttachmentInfo {
            id: input.id,
            feedback_id: input.feedback_id,
            filename: input.filename,
            content_type: input.content_type,
            size: input.size,
            created_at: Utc::now(),
        };
        self.attachments
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_filename(
        &self,
        feedback_id: Uuid,
        filename: &str,
    ) -> Result<Option<AttachmentInfo>, AttachmentError> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .values()
            .find(|a| a.feedback_id == feedback_id && a.filename == filename)
            .cloned())
    }

    async fn update_blob_meta(
        &self,
        id: Uuid,
        content_type: String,
        size: i64,
    ) -> Result<AttachmentInfo, AttachmentError> {
        let mut attachments = self.attachments.lock().unwrap();
        let record = attachments
            .get_mut(&id)
            .ok_or_else(|| AttachmentError::not_found(id.to_string()))?;
        record.content_type = content_type;
        record.size = size;
        Ok(record.clone())
    }

    async fn count_by_feedback(&self, feedback_id: Uuid) -> Result<u64, AttachmentError> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.feedback_id == feedback_id)
            .count() as u64)
    }

    async fn list_by_feedback(
        &self,
        feedback_id: Uuid,
    ) -> Result<Vec<AttachmentInfo>, AttachmentError> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.feedback_id == feedback_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AttachmentError> {
        Ok(self.attachments.lock().unwrap().remove(&id).is_some())
    }

    async fn feedback_exists(&self, feedback_id: Uuid) -> Result<bool, AttachmentError> {
        Ok(self.feedbacks.lock().unwrap().contains(&feedback_id))
    }
}

fn temp_store() -> (BlobStore, PathBuf) {
    let root = std::env::temp_dir().join(format!("critique-attach-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp root");
    let store =
        BlobStore::from_provider(&BlobProvider::local_fs(&root)).expect("create local store");
    (store, root)
}

fn service(store: &BlobStore) -> (AttachmentService<MockAttachmentRepository>, Uuid) {
    let repo = Arc::new(MockAttachmentRepository::new());
    let feedback_id = Uuid::new_v4();
    repo.add_feedback(feedback_id);
    (
        AttachmentService::new(store.clone(), repo, UploadLimits::default()),
        feedback_id,
    )
}

fn metadata_message(feedback_id: Uuid, filename: &str, declared_size: u64) -> UploadMessage {
    UploadMessage::Metadata(UploadMetadata {
        feedback_id,
        filename: filename.to_string(),
        content_type: "application/pdf".to_string(),
        declared_size,
    })
}

fn chunk_message(bytes: &[u8]) -> UploadMessage {
    UploadMessage::Chunk(Bytes::copy_from_slice(bytes))
}

fn messages(
    items: Vec<Result<UploadMessage, TransferError>>,
) -> impl Stream<Item = Result<UploadMessage, TransferError>> + Send + Unpin {
    stream::iter(items)
}

#[tokio::test]
async fn test_upload_creates_record_and_object() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    let record = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "report.pdf", 8)),
                Ok(chunk_message(b"feed")),
                Ok(chunk_message(b"back")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(record.filename, "report.pdf");
    assert_eq!(record.size, 8);

    let key = asset_key(feedback_id, "report.pdf");
    assert_eq!(store.read(&key).await.unwrap(), Bytes::from_static(b"feedback"));
    assert_eq!(service.list(feedback_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_upload_requires_metadata_first() {
    let (store, _root) = temp_store();
    let (service, _feedback_id) = service(&store);

    let err = service
        .upload(
            messages(vec![Ok(chunk_message(b"bytes-before-metadata"))]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttachmentError::Transfer(TransferError::Validation(_))
    ));
}

#[tokio::test]
async fn test_upload_empty_stream_is_validation_error() {
    let (store, _root) = temp_store();
    let (service, _feedback_id) = service(&store);

    let err = service
        .upload(messages(vec![]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttachmentError::Transfer(TransferError::Validation(_))
    ));
}

#[tokio::test]
async fn test_upload_to_missing_feedback() {
    let (store, _root) = temp_store();
    let (service, _feedback_id) = service(&store);
    let other = Uuid::new_v4();

    let err = service
        .upload(
            messages(vec![
                Ok(metadata_message(other, "report.pdf", 4)),
                Ok(chunk_message(b"data")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AttachmentError::FeedbackNotFound(id) if id == other));
}

#[tokio::test]
async fn test_upload_past_ceiling_fails_and_object_absent() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    for i in 0..5 {
        service
            .upload(
                messages(vec![
                    Ok(metadata_message(feedback_id, &format!("file-{i}.pdf"), 4)),
                    Ok(chunk_message(b"data")),
                ]),
                CancellationToken::new(),
            )
            .await
            .unwrap();
    }

    let err = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "file-5.pdf", 4)),
                Ok(chunk_message(b"data")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AttachmentError::LimitExceeded { limit: 5 }));

    // The sixth object does not appear in a subsequent list call.
    let listed = service.list(feedback_id).await.unwrap();
    assert_eq!(listed.len(), 5);
    assert!(listed.iter().all(|a| a.filename != "file-5.pdf"));
    assert!(!store.exists(&asset_key(feedback_id, "file-5.pdf")).await);
}

#[tokio::test]
async fn test_upload_stream_error_compensates_record() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    let err = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "cut.bin", 1024)),
                Ok(chunk_message(&[7u8; 512])),
                Err(TransferError::Cancelled),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AttachmentError::Transfer(TransferError::Cancelled)));
    // Compensating delete removed the metadata-first record; no object either.
    assert_eq!(service.list(feedback_id).await.unwrap().len(), 0);
    assert!(!store.exists(&asset_key(feedback_id, "cut.bin")).await);
}

#[tokio::test]
async fn test_upload_under_delivery_compensates_record() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    let err = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "short.bin", 10)),
                Ok(chunk_message(b"onlysix")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttachmentError::Transfer(TransferError::SizeMismatch { .. })
    ));
    assert_eq!(service.list(feedback_id).await.unwrap().len(), 0);
    assert!(!store.exists(&asset_key(feedback_id, "short.bin")).await);
}

#[tokio::test]
async fn test_upload_overflow_compensates_record() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    let err = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "big.bin", 4)),
                Ok(chunk_message(b"data")),
                Ok(chunk_message(b"x")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttachmentError::Transfer(TransferError::Overflow { .. })
    ));
    assert_eq!(service.list(feedback_id).await.unwrap().len(), 0);
    assert!(!store.exists(&asset_key(feedback_id, "big.bin")).await);
}

#[tokio::test]
async fn test_upload_overwrite_updates_existing_record() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    let first = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "notes.md", 5)),
                Ok(chunk_message(b"draft")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let second = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "notes.md", 8)),
                Ok(chunk_message(b"final v2")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    // Same record, refreshed metadata, overwritten object.
    assert_eq!(second.id, first.id);
    assert_eq!(second.size, 8);
    assert_eq!(service.list(feedback_id).await.unwrap().len(), 1);
    let key = asset_key(feedback_id, "notes.md");
    assert_eq!(store.read(&key).await.unwrap(), Bytes::from_static(b"final v2"));
}

#[tokio::test]
async fn test_failed_overwrite_restores_previous_record() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "notes.md", 5)),
                Ok(chunk_message(b"draft")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let err = service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "notes.md", 100)),
                Ok(chunk_message(b"partial")),
                Err(TransferError::Cancelled),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AttachmentError::Transfer(TransferError::Cancelled)));

    // The record still exists and its metadata was restored.
    let listed = service.list(feedback_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].size, 5);
}

#[tokio::test]
async fn test_download_round_trip() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);
    let payload: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();

    let mut upload: Vec<Result<UploadMessage, TransferError>> = vec![Ok(metadata_message(
        feedback_id,
        "large.bin",
        payload.len() as u64,
    ))];
    upload.extend(payload.chunks(9_000).map(|c| Ok(chunk_message(c))));
    service
        .upload(messages(upload), CancellationToken::new())
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::channel(32);
    let mut sink = tx;
    let sent = service
        .download(feedback_id, "large.bin", &mut sink)
        .await
        .unwrap();
    drop(sink);
    assert_eq!(sent, payload.len() as u64);

    let Some(DownloadMessage::Info(info)) = rx.recv().await else {
        panic!("first message must be the info record");
    };
    assert_eq!(info.filename, "large.bin");
    assert_eq!(info.size, payload.len() as u64);
    assert_eq!(info.content_type, "application/pdf");

    let mut received = Vec::new();
    while let Some(DownloadMessage::Chunk(bytes)) = rx.recv().await {
        received.extend_from_slice(&bytes);
    }
    assert_eq!(received, payload);
}

#[tokio::test]
async fn test_download_missing_attachment() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    let (tx, _rx) = mpsc::channel(4);
    let mut sink = tx;
    let err = service
        .download(feedback_id, "nope.bin", &mut sink)
        .await
        .unwrap_err();
    assert!(matches!(err, AttachmentError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_removes_record_and_object() {
    let (store, _root) = temp_store();
    let (service, feedback_id) = service(&store);

    service
        .upload(
            messages(vec![
                Ok(metadata_message(feedback_id, "gone.bin", 4)),
                Ok(chunk_message(b"data")),
            ]),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    service.delete(feedback_id, "gone.bin").await.unwrap();

    assert_eq!(service.list(feedback_id).await.unwrap().len(), 0);
    assert!(!store.exists(&asset_key(feedback_id, "gone.bin")).await);

    let err = service.delete(feedback_id, "gone.bin").await.unwrap_err();
    assert!(matches!(err, AttachmentError::NotFound(_)));
}

#[tokio::test]
async fn test_list_missing_feedback() {
    let (store, _root) = temp_store();
    let (service, _feedback_id) = service(&store);

    let err = service.list(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AttachmentError::FeedbackNotFound(_)));
}
