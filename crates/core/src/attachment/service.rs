//! Attachment upload coordinator.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use critique_shared::config::UploadSettings;

use super::error::AttachmentError;
use super::types::{AttachmentInfo, CreateAttachmentInput};
use crate::blobstore::{BlobStore, asset_key};
use crate::saga::Saga;
use crate::transfer::{
    ChunkSink, InboundTransfer, ObjectInfo, TransferError, TransferOptions, UploadMessage,
    UploadMetadata, stream_outbound,
};

/// Repository trait for attachment metadata persistence.
///
/// Implemented by the db crate against the relational store.
pub trait AttachmentRepository: Send + Sync {
    /// Create a new attachment record.
    fn create(
        &self,
        input: CreateAttachmentInput,
    ) -> impl Future<Output = Result<AttachmentInfo, AttachmentError>> + Send;

    /// Find an attachment by owning feedback and filename.
    fn find_by_filename(
        &self,
        feedback_id: Uuid,
        filename: &str,
    ) -> impl Future<Output = Result<Option<AttachmentInfo>, AttachmentError>> + Send;

    /// Update the stored content type and size of an attachment record.
    fn update_blob_meta(
        &self,
        id: Uuid,
        content_type: String,
        size: i64,
    ) -> impl Future<Output = Result<AttachmentInfo, AttachmentError>> + Send;

    /// Count attachments for a feedback entry.
    fn count_by_feedback(
        &self,
        feedback_id: Uuid,
    ) -> impl Future<Output = Result<u64, AttachmentError>> + Send;

    /// List attachments for a feedback entry.
    fn list_by_feedback(
        &self,
        feedback_id: Uuid,
    ) -> impl Future<Output = Result<Vec<AttachmentInfo>, AttachmentError>> + Send;

    /// Delete an attachment record by ID.
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, AttachmentError>> + Send;

    /// Check whether a feedback entry exists.
    fn feedback_exists(
        &self,
        feedback_id: Uuid,
    ) -> impl Future<Output = Result<bool, AttachmentError>> + Send;
}

/// Limits and budgets applied to uploads.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum attachments per feedback entry.
    pub max_attachments: usize,
    /// How long to wait for the blob-store write after the last chunk.
    pub wait_budget: Duration,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_attachments: 5,
            wait_budget: Duration::from_secs(30),
        }
    }
}

impl From<&UploadSettings> for UploadLimits {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            max_attachments: settings.max_attachments_per_feedback,
            wait_budget: Duration::from_secs(settings.commit_wait_secs),
        }
    }
}

/// Coordinates attachment uploads, downloads, listing, and deletion.
pub struct AttachmentService<R: AttachmentRepository> {
    store: BlobStore,
    repo: Arc<R>,
    limits: UploadLimits,
}

impl<R: AttachmentRepository + 'static> AttachmentService<R> {
    /// Create a new attachment service.
    #[must_use]
    pub fn new(store: BlobStore, repo: Arc<R>, limits: UploadLimits) -> Self {
        Self {
            store,
            repo,
            limits,
        }
    }

    /// Run one chunked upload from start to terminal outcome.
    ///
    /// The first message must carry the transfer metadata; every later
    /// message carries a chunk. Metadata-first ordering: the attachment
    /// record is created (or updated, when the filename already exists)
    /// before any byte moves, and compensated if the transfer fails for any
    /// reason - overflow, size mismatch, store failure, cancellation, or
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad metadata, `FeedbackNotFound` for a
    /// missing parent, `LimitExceeded` past the attachment ceiling, or the
    /// transfer's own terminal error.
    pub async fn upload<S>(
        &self,
        mut messages: S,
        cancel: CancellationToken,
    ) -> Result<AttachmentInfo, AttachmentError>
    where
        S: Stream<Item = Result<UploadMessage, TransferError>> + Send + Unpin,
    {
        let Some(first) = messages.next().await else {
            return Err(TransferError::validation("no metadata received").into());
        };
        let UploadMessage::Metadata(metadata) = first? else {
            return Err(
                TransferError::validation("metadata is required in the first message").into(),
            );
        };
        let metadata = validate_metadata(metadata)?;

        if !self.repo.feedback_exists(metadata.feedback_id).await? {
            return Err(AttachmentError::feedback_not_found(metadata.feedback_id));
        }

        let existing = self
            .repo
            .find_by_filename(metadata.feedback_id, &metadata.filename)
            .await?;

        // Overwrites do not change the count, so the ceiling only gates new
        // filenames. The check and the transfer are not one transaction: two
        // concurrent uploads can transiently exceed the ceiling by one.
        if existing.is_none() {
            let count = self.repo.count_by_feedback(metadata.feedback_id).await?;
            if count >= self.limits.max_attachments as u64 {
                return Err(AttachmentError::limit_exceeded(self.limits.max_attachments));
            }
        }

        let declared = i64::try_from(metadata.declared_size)
            .map_err(|_| TransferError::validation("declared size too large"))?;
        let is_new = existing.is_none();

        let mut saga = Saga::new();
        let record = match existing {
            None => {
                let record = self
                    .repo
                    .create(CreateAttachmentInput {
                        id: Uuid::new_v4(),
                        feedback_id: metadata.feedback_id,
                        filename: metadata.filename.clone(),
                        content_type: metadata.content_type.clone(),
                        size: declared,
                    })
                    .await?;
                let repo = Arc::clone(&self.repo);
                let id = record.id;
                saga.push_compensation(
                    format!(
                        "delete attachment record {}/{}",
                        metadata.feedback_id, metadata.filename
                    ),
                    move || {
                        Box::pin(async move {
                            repo.delete(id).await.map(|_| ()).map_err(|e| e.to_string())
                        })
                    },
                );
                record
            }
            Some(previous) => {
                let record = self
                    .repo
                    .update_blob_meta(previous.id, metadata.content_type.clone(), declared)
                    .await?;
                let repo = Arc::clone(&self.repo);
                saga.push_compensation(
                    format!(
                        "restore attachment record {}/{}",
                        metadata.feedback_id, metadata.filename
                    ),
                    move || {
                        Box::pin(async move {
                            repo.update_blob_meta(
                                previous.id,
                                previous.content_type,
                                previous.size,
                            )
                            .await
                            .map(|_| ())
                            .map_err(|e| e.to_string())
                        })
                    },
                );
                record
            }
        };

        let key = asset_key(metadata.feedback_id, &metadata.filename);
        let options = TransferOptions {
            wait_budget: self.limits.wait_budget,
            cancel,
            ..TransferOptions::default()
        };
        let mut transfer = match InboundTransfer::begin(
            &self.store,
            &key,
            &metadata.content_type,
            metadata.declared_size,
            options,
        ) {
            Ok(transfer) => transfer,
            Err(e) => {
                saga.unwind(&e).await;
                return Err(e.into());
            }
        };

        if let Err(e) = pump(&mut transfer, &mut messages).await {
            transfer.abort().await;
            if is_new {
                self.store.discard(&key).await;
            }
            saga.unwind(&e).await;
            return Err(e.into());
        }

        match transfer.finish().await {
            Ok(written) => {
                saga.commit();
                info!(
                    feedback_id = %metadata.feedback_id,
                    filename = %metadata.filename,
                    size = written,
                    "attachment upload committed"
                );
                Ok(record)
            }
            Err(e) => {
                // The writer cleans up after itself; for a brand-new
                // attachment, sweep the key once more so a write that settled
                // after the wait budget cannot linger as an orphan.
                if is_new {
                    self.store.discard(&key).await;
                }
                saga.unwind(&e).await;
                Err(e.into())
            }
        }
    }

    /// Stream an attachment out: the info record first, then ordered chunks.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the record or the blob is missing, or the
    /// transfer's error when the stream fails mid-way.
    pub async fn download<S: ChunkSink>(
        &self,
        feedback_id: Uuid,
        filename: &str,
        sink: &mut S,
    ) -> Result<u64, AttachmentError> {
        let record = self
            .repo
            .find_by_filename(feedback_id, filename)
            .await?
            .ok_or_else(|| AttachmentError::not_found(filename))?;

        let key = asset_key(feedback_id, &record.filename);
        let stat = self
            .store
            .stat(&key)
            .await
            .map_err(|e| AttachmentError::Transfer(TransferError::from_blob(e, &key)))?;

        let blob_info = ObjectInfo {
            filename: record.filename.clone(),
            size: stat.size,
            content_type: record.content_type.clone(),
            uploaded_at: stat.uploaded_at.unwrap_or(record.created_at),
        };

        Ok(stream_outbound(&self.store, &key, blob_info, sink).await?)
    }

    /// List attachments for a feedback entry.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackNotFound` for a missing parent or a repository error.
    pub async fn list(&self, feedback_id: Uuid) -> Result<Vec<AttachmentInfo>, AttachmentError> {
        if !self.repo.feedback_exists(feedback_id).await? {
            return Err(AttachmentError::feedback_not_found(feedback_id));
        }
        self.repo.list_by_feedback(feedback_id).await
    }

    /// Delete an attachment: payload first (best effort), then the record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no record exists, or a repository error.
    pub async fn delete(&self, feedback_id: Uuid, filename: &str) -> Result<(), AttachmentError> {
        let record = self
            .repo
            .find_by_filename(feedback_id, filename)
            .await?
            .ok_or_else(|| AttachmentError::not_found(filename))?;

        self.store
            .discard(&asset_key(feedback_id, &record.filename))
            .await;
        self.repo.delete(record.id).await?;

        Ok(())
    }
}

/// Drive the message stream into the transfer session until the caller
/// closes it or a terminal error occurs.
async fn pump<S>(transfer: &mut InboundTransfer, messages: &mut S) -> Result<(), TransferError>
where
    S: Stream<Item = Result<UploadMessage, TransferError>> + Send + Unpin,
{
    loop {
        match messages.next().await {
            // End of stream; finish() settles the size contract.
            None => return Ok(()),
            Some(Err(e)) => return Err(e),
            // A stray metadata packet mid-stream is a no-op, like any other
            // contentless message.
            Some(Ok(UploadMessage::Metadata(_))) => {
                debug!(key = %transfer.key(), "skipping metadata packet mid-stream");
            }
            Some(Ok(UploadMessage::Chunk(bytes))) => transfer.feed_chunk(bytes).await?,
        }
    }
}

/// Normalize and validate upload metadata before any side effect.
fn validate_metadata(mut metadata: UploadMetadata) -> Result<UploadMetadata, TransferError> {
    if metadata.filename.trim().is_empty() {
        return Err(TransferError::validation("filename is required"));
    }
    if metadata.declared_size == 0 {
        return Err(TransferError::validation("declared size must be positive"));
    }
    if metadata.content_type.is_empty() {
        metadata.content_type = "application/octet-stream".to_string();
    }
    Ok(metadata)
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
