//! Feedback types and data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A feedback entry a reviewer left on a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    /// Unique identifier.
    pub id: Uuid,
    /// Reviewer who authored the feedback (external user id).
    pub reviewer_id: i64,
    /// Student receiving the feedback (external user id).
    pub student_id: i64,
    /// Submission the feedback refers to (external id).
    pub submission_id: i64,
    /// Feedback title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a feedback entry, body included.
#[derive(Debug, Clone)]
pub struct CreateFeedbackInput {
    /// Reviewer authoring the feedback.
    pub reviewer_id: i64,
    /// Student receiving the feedback.
    pub student_id: i64,
    /// Submission the feedback refers to.
    pub submission_id: i64,
    /// Feedback title.
    pub title: String,
    /// Free-text body, stored in the blob store.
    pub content: String,
}

/// Row-level input handed to the repository.
#[derive(Debug, Clone)]
pub struct CreateFeedbackRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Reviewer authoring the feedback.
    pub reviewer_id: i64,
    /// Student receiving the feedback.
    pub student_id: i64,
    /// Submission the feedback refers to.
    pub submission_id: i64,
    /// Feedback title.
    pub title: String,
}

/// Partial update of a feedback entry.
#[derive(Debug, Clone, Default)]
pub struct UpdateFeedbackInput {
    /// New title, if changing.
    pub title: Option<String>,
    /// New body, if changing.
    pub content: Option<String>,
}

/// Filter for feedback listing.
#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    /// Restrict to one reviewer.
    pub reviewer_id: Option<i64>,
    /// Restrict to one student.
    pub student_id: Option<i64>,
    /// Restrict to one submission.
    pub submission_id: Option<i64>,
}
