//! Attachment upload coordination and metadata.
//!
//! The upload coordinator sequences precondition checks, the transfer
//! pipeline, and compensating actions so a failed request is fully invisible
//! afterwards: no metadata record without committed bytes, no orphaned blob
//! without a record.

mod error;
mod service;
mod types;

pub use error::AttachmentError;
pub use service::{AttachmentRepository, AttachmentService, UploadLimits};
pub use types::{AttachmentInfo, CreateAttachmentInput};
