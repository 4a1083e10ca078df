//! Threaded comments on feedback entries.
//!
//! Comments form a forest per feedback entry: each node has at most one
//! parent and the parent must already exist when a reply is created, so the
//! relation is acyclic by construction. Deleting a comment removes its whole
//! reply subtree in one logically atomic step.

mod error;
mod service;
mod types;

pub use error::CommentError;
pub use service::{CommentRepository, CommentService};
pub use types::{CommentNode, CreateCommentInput};
