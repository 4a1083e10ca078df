//! Feedback error types.

use thiserror::Error;
use uuid::Uuid;

use critique_shared::AppError;

use crate::blobstore::BlobError;

/// Feedback operation errors.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Feedback entry not found.
    #[error("feedback not found: {0}")]
    NotFound(Uuid),

    /// Invalid input.
    #[error("invalid feedback: {0}")]
    Validation(String),

    /// Caller is not the feedback author.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Blob store failure.
    #[error("storage error: {0}")]
    Storage(#[from] BlobError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl FeedbackError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(id: Uuid) -> Self {
        Self::NotFound(id)
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an access denied error.
    #[must_use]
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::NotFound(_) => Self::NotFound(err.to_string()),
            FeedbackError::Validation(_) => Self::Validation(err.to_string()),
            FeedbackError::AccessDenied(msg) => Self::Forbidden(msg),
            FeedbackError::Storage(e) => Self::Storage(e.to_string()),
            FeedbackError::Repository(msg) => Self::Database(msg),
        }
    }
}
