//! Comment error types.

use thiserror::Error;
use uuid::Uuid;

use critique_shared::AppError;

/// Comment operation errors.
#[derive(Debug, Error)]
pub enum CommentError {
    /// Comment not found.
    #[error("comment not found: {0}")]
    NotFound(Uuid),

    /// Invalid input.
    #[error("invalid comment: {0}")]
    Validation(String),

    /// Reply target is missing or belongs to another feedback entry.
    #[error("invalid parent comment: {0}")]
    InvalidParent(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl CommentError {
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

    /// Create an invalid parent error.
    #[must_use]
    pub fn invalid_parent(msg: impl Into<String>) -> Self {
        Self::InvalidParent(msg.into())
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<CommentError> for AppError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::NotFound(_) => Self::NotFound(err.to_string()),
            CommentError::Validation(_) | CommentError::InvalidParent(_) => {
                Self::Validation(err.to_string())
            }
            CommentError::Repository(msg) => Self::Database(msg),
        }
    }
}
