//! Object storage access for feedback content and attachments.
//!
//! Built on Apache OpenDAL so the backing store is vendor-agnostic:
//! - S3-compatible: MinIO, Cloudflare R2, AWS S3
//! - Azure Blob Storage
//! - Local filesystem (development only)
//!
//! Key layout inside the bucket:
//!
//! ```text
//! feedback/{feedback_id}/content.md
//! feedback/{feedback_id}/assets/{filename}
//! ```

mod config;
mod error;
mod service;

pub use config::BlobProvider;
pub use error::BlobError;
pub use service::{
    BlobStore, ListedObject, ObjectStat, asset_key, asset_prefix, content_key, feedback_prefix,
    sanitize_filename,
};
