//! Wire-level message types for chunked transfers.
//!
//! The inbound framing is a tagged union, not optional fields: the first
//! message of an upload must be [`UploadMessage::Metadata`], everything after
//! it [`UploadMessage::Chunk`]. Frames that decode to neither are dropped at
//! the transport and never reach the pipeline.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata carried by the first message of an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMetadata {
    /// Feedback entry the attachment belongs to.
    pub feedback_id: Uuid,
    /// Original filename.
    pub filename: String,
    /// MIME type of the payload.
    #[serde(default)]
    pub content_type: String,
    /// Total payload size the caller commits to sending.
    pub declared_size: u64,
}

/// One inbound message of a chunked upload.
#[derive(Debug, Clone)]
pub enum UploadMessage {
    /// Transfer metadata; must be the first message.
    Metadata(UploadMetadata),
    /// A payload chunk. Empty chunks are no-ops.
    Chunk(Bytes),
}

/// Descriptor sent as the first message of a download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object filename.
    pub filename: String,
    /// Object size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: String,
    /// When the object was stored.
    pub uploaded_at: DateTime<Utc>,
}

/// One outbound message of a chunked download.
#[derive(Debug, Clone)]
pub enum DownloadMessage {
    /// Object descriptor; always the first message.
    Info(ObjectInfo),
    /// A payload chunk, in blob order.
    Chunk(Bytes),
}
