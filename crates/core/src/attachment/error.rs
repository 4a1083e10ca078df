//! Attachment error types.

use thiserror::Error;
use uuid::Uuid;

use critique_shared::AppError;

use crate::transfer::TransferError;

/// Attachment operation errors.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// Attachment not found.
    #[error("attachment not found: {0}")]
    NotFound(String),

    /// Owning feedback entry not found.
    #[error("feedback not found: {0}")]
    FeedbackNotFound(Uuid),

    /// Attachment cardinality ceiling reached.
    #[error("maximum {limit} attachments allowed per feedback")]
    LimitExceeded {
        /// The configured ceiling.
        limit: usize,
    },

    /// Transfer pipeline failure.
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl AttachmentError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(filename: impl Into<String>) -> Self {
        Self::NotFound(filename.into())
    }

    /// Create a feedback not found error.
    #[must_use]
    pub fn feedback_not_found(id: Uuid) -> Self {
        Self::FeedbackNotFound(id)
    }

    /// Create a limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: usize) -> Self {
        Self::LimitExceeded { limit }
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<AttachmentError> for AppError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::NotFound(_) | AttachmentError::FeedbackNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            AttachmentError::LimitExceeded { .. } => Self::PreconditionFailed(err.to_string()),
            AttachmentError::Transfer(t) => t.into(),
            AttachmentError::Repository(msg) => Self::Database(msg),
        }
    }
}
