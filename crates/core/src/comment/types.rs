//! Comment types and data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One node of a comment tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNode {
    /// Unique identifier.
    pub id: Uuid,
    /// Feedback entry the forest is scoped to.
    pub feedback_id: Uuid,
    /// Comment author (external user id).
    pub author_id: i64,
    /// Parent comment; `None` marks a root comment.
    pub parent_id: Option<Uuid>,
    /// Comment text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a comment.
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    /// Feedback entry to comment on.
    pub feedback_id: Uuid,
    /// Comment author (external user id).
    pub author_id: i64,
    /// Parent comment for replies; `None` for a root comment.
    pub parent_id: Option<Uuid>,
    /// Comment text.
    pub content: String,
}
