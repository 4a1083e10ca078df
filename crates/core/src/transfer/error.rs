//! Transfer pipeline error types.

use std::time::Duration;

use thiserror::Error;

use critique_shared::AppError;

use crate::blobstore::BlobError;

/// Errors surfaced by the transfer pipeline.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Bad or missing transfer metadata.
    #[error("invalid transfer request: {0}")]
    Validation(String),

    /// More bytes fed than the declared size permits.
    #[error("declared size exceeded: {received} + {chunk} > {declared} bytes")]
    Overflow {
        /// Declared total size.
        declared: u64,
        /// Bytes accepted so far.
        received: u64,
        /// Size of the rejected chunk.
        chunk: u64,
    },

    /// Fewer bytes than declared at close time.
    #[error("size mismatch at close: received {received} of {declared} declared bytes")]
    SizeMismatch {
        /// Declared total size.
        declared: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// The caller disconnected or cancelled the request.
    #[error("transfer cancelled")]
    Cancelled,

    /// The blob-store write did not settle within the wait budget.
    #[error("blob store write did not finish within {budget:?}")]
    Timeout {
        /// The exhausted wait budget.
        budget: Duration,
    },

    /// Referenced object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Wrapped blob store failure.
    #[error("blob store failure: {0}")]
    Store(#[from] BlobError),

    /// The writer task died without reporting a result.
    #[error("writer task terminated unexpectedly")]
    WriterLost,
}

impl TransferError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    /// Map a blob error, keeping "does not exist" distinct from other
    /// store failures.
    #[must_use]
    pub fn from_blob(err: BlobError, key: &str) -> Self {
        if err.is_not_found() {
            Self::NotFound(key.to_string())
        } else {
            Self::Store(err)
        }
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        let message = err.to_string();
        match err {
            TransferError::Validation(_)
            | TransferError::Overflow { .. }
            | TransferError::SizeMismatch { .. } => Self::Validation(message),
            TransferError::Cancelled => Self::Cancelled(message),
            TransferError::Timeout { .. } => Self::Timeout(message),
            TransferError::NotFound(_) => Self::NotFound(message),
            TransferError::Store(_) => Self::Storage(message),
            TransferError::WriterLost => Self::Internal(message),
        }
    }
}
