//! Attachment types and data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attachment metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentInfo {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning feedback entry.
    pub feedback_id: Uuid,
    /// Original filename, unique per feedback.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Payload size in bytes.
    pub size: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for creating an attachment record.
#[derive(Debug, Clone)]
pub struct CreateAttachmentInput {
    /// Attachment ID.
    pub id: Uuid,
    /// Owning feedback entry.
    pub feedback_id: Uuid,
    /// Original filename.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Declared payload size in bytes.
    pub size: i64,
}
