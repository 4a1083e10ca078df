//! Feedback service implementation.

use std::sync::Arc;

use bytes::Bytes;
use tracing::error;
use uuid::Uuid;

use critique_shared::types::PageRequest;

use super::error::FeedbackError;
use super::types::{
    CreateFeedbackInput, CreateFeedbackRecord, Feedback, FeedbackFilter, UpdateFeedbackInput,
};
use crate::blobstore::{BlobStore, content_key, feedback_prefix};
use crate::saga::Saga;

/// Repository trait for feedback persistence.
///
/// Implemented by the db crate to provide actual database operations.
pub trait FeedbackRepository: Send + Sync {
    /// Create a new feedback row.
    fn create(
        &self,
        record: CreateFeedbackRecord,
    ) -> impl Future<Output = Result<Feedback, FeedbackError>> + Send;

    /// Find a feedback entry by ID.
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Feedback>, FeedbackError>> + Send;

    /// Update the title of a feedback entry.
    fn update_title(
        &self,
        id: Uuid,
        title: String,
    ) -> impl Future<Output = Result<Option<Feedback>, FeedbackError>> + Send;

    /// Delete a feedback row (attachment records and comments go with it).
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<bool, FeedbackError>> + Send;

    /// List feedback entries matching a filter, newest first, with the total
    /// match count.
    fn list(
        &self,
        filter: &FeedbackFilter,
        page: &PageRequest,
    ) -> impl Future<Output = Result<(Vec<Feedback>, u64), FeedbackError>> + Send;
}

/// Feedback service: CRUD over the relational row plus the stored body.
pub struct FeedbackService<R: FeedbackRepository> {
    store: BlobStore,
    repo: Arc<R>,
}

impl<R: FeedbackRepository + 'static> FeedbackService<R> {
    /// Create a new feedback service.
    #[must_use]
    pub fn new(store: BlobStore, repo: Arc<R>) -> Self {
        Self { store, repo }
    }

    /// Create a feedback entry together with its body.
    ///
    /// Metadata-first: the row is inserted, then the body is written to the
    /// blob store; if the body write fails the row is deleted again so no
    /// reader ever observes an entry without content.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad ids or an empty title, or a
    /// storage/repository error.
    pub async fn create(&self, input: CreateFeedbackInput) -> Result<Feedback, FeedbackError> {
        if input.reviewer_id <= 0 {
            return Err(FeedbackError::validation("invalid reviewer id"));
        }
        if input.student_id <= 0 {
            return Err(FeedbackError::validation("invalid student id"));
        }
        if input.submission_id <= 0 {
            return Err(FeedbackError::validation("invalid submission id"));
        }
        if input.title.trim().is_empty() {
            return Err(FeedbackError::validation("title is required"));
        }

        let id = Uuid::new_v4();
        let feedback = self
            .repo
            .create(CreateFeedbackRecord {
                id,
                reviewer_id: input.reviewer_id,
                student_id: input.student_id,
                submission_id: input.submission_id,
                title: input.title,
            })
            .await?;

        let mut saga = Saga::new();
        let repo = Arc::clone(&self.repo);
        saga.push_compensation(format!("delete feedback row {id}"), move || {
            Box::pin(async move { repo.delete(id).await.map(|_| ()).map_err(|e| e.to_string()) })
        });

        if let Err(e) = self
            .store
            .put(&content_key(id), Bytes::from(input.content), "text/markdown")
            .await
        {
            let e = FeedbackError::from(e);
            saga.unwind(&e).await;
            return Err(e);
        }

        saga.commit();
        Ok(feedback)
    }

    /// Get a feedback entry by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry does not exist.
    pub async fn get(&self, id: Uuid) -> Result<Feedback, FeedbackError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| FeedbackError::not_found(id))
    }

    /// Read the stored body of a feedback entry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry does not exist, or a storage error.
    pub async fn get_content(&self, id: Uuid) -> Result<Bytes, FeedbackError> {
        self.get(id).await?;
        self.store
            .read(&content_key(id))
            .await
            .map_err(FeedbackError::from)
    }

    /// Update a feedback entry's title and/or body. Only the author may
    /// modify it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `AccessDenied` for a foreign caller, or a
    /// storage/repository error.
    pub async fn update(
        &self,
        id: Uuid,
        reviewer_id: i64,
        input: UpdateFeedbackInput,
    ) -> Result<Feedback, FeedbackError> {
        let mut feedback = self.get(id).await?;
        if feedback.reviewer_id != reviewer_id {
            return Err(FeedbackError::access_denied(
                "only the feedback author can update it",
            ));
        }

        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(FeedbackError::validation("title is required"));
            }
            feedback = self
                .repo
                .update_title(id, title)
                .await?
                .ok_or_else(|| FeedbackError::not_found(id))?;
        }

        if let Some(content) = input.content {
            self.store
                .put(&content_key(id), Bytes::from(content), "text/markdown")
                .await?;
        }

        Ok(feedback)
    }

    /// Delete a feedback entry with everything it owns: the row (attachment
    /// records and comments cascade with it) and the whole blob prefix.
    /// Only the author may delete it.
    ///
    /// A blob cleanup failure after the row is gone is logged for manual
    /// reconciliation instead of masking the completed delete.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `AccessDenied` for a foreign caller, or a
    /// repository error.
    pub async fn delete(&self, id: Uuid, reviewer_id: i64) -> Result<(), FeedbackError> {
        let feedback = self.get(id).await?;
        if feedback.reviewer_id != reviewer_id {
            return Err(FeedbackError::access_denied(
                "only the feedback author can delete it",
            ));
        }

        if !self.repo.delete(id).await? {
            return Err(FeedbackError::not_found(id));
        }

        if let Err(e) = self.store.remove_prefix(&feedback_prefix(id)).await {
            error!(
                feedback_id = %id,
                error = %e,
                "failed to remove stored objects of deleted feedback"
            );
        }

        Ok(())
    }

    /// List feedback entries matching a filter.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the query fails.
    pub async fn list(
        &self,
        filter: &FeedbackFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Feedback>, u64), FeedbackError> {
        self.repo.list(filter, page).await
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
