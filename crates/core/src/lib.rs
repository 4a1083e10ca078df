//! Core business logic for Critique.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and the transfer
//! pipeline live here.
//!
//! # Modules
//!
//! - `blobstore` - Object storage access via OpenDAL
//! - `transfer` - Chunked transfer pipeline between a message channel and the blob store
//! - `saga` - Compensating-action bookkeeping for multi-store operations
//! - `attachment` - Attachment upload coordination and metadata
//! - `comment` - Threaded comments and subtree deletion
//! - `feedback` - Feedback entries and their stored content

pub mod attachment;
pub mod blobstore;
pub mod comment;
pub mod feedback;
pub mod saga;
pub mod transfer;
