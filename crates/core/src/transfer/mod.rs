//! Chunked transfer pipeline between a message channel and the blob store.
//!
//! An inbound transfer bridges a caller-paced sequence of byte chunks to a
//! single blob-store write through a bounded handoff buffer:
//!
//! ```text
//! caller ──feed_chunk──▶ [bounded mpsc] ──▶ writer task ──▶ blob store
//!    │                                           │
//!    └───────────finish / abort ◀──oneshot───────┘
//! ```
//!
//! The declared size is the safety contract: a chunk that would cross it is
//! rejected wholesale before touching the buffer, and a close with fewer
//! bytes than declared fails. Either way no partial object stays visible.
//!
//! The outbound direction reads the blob in fixed 32 KiB chunks and forwards
//! them in order; a mid-stream failure terminates the stream early.

mod contract;
mod error;
mod message;
mod pipeline;

pub use contract::SizeContract;
pub use error::TransferError;
pub use message::{DownloadMessage, ObjectInfo, UploadMessage, UploadMetadata};
pub use pipeline::{
    ChunkSink, DOWNLOAD_CHUNK_SIZE, InboundTransfer, SessionState, TransferOptions,
    stream_outbound,
};
