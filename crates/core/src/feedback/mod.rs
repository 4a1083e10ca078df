//! Feedback entries and their stored content.
//!
//! A feedback entry's metadata lives in the relational store; its free-text
//! body lives in the blob store under `feedback/{id}/content.md`. Creation is
//! a two-store operation guarded by a compensating delete.

mod error;
mod service;
mod types;

pub use error::FeedbackError;
pub use service::{FeedbackRepository, FeedbackService};
pub use types::{CreateFeedbackInput, CreateFeedbackRecord, Feedback, FeedbackFilter, UpdateFeedbackInput};
