//! Comment service and subtree deletion.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use critique_shared::types::PageRequest;

use super::error::CommentError;
use super::types::{CommentNode, CreateCommentInput};

/// Repository trait for comment persistence.
///
/// Implemented by the db crate to provide actual database operations.
pub trait CommentRepository: Send + Sync {
    /// Create a new comment.
    fn create(
        &self,
        input: CreateCommentInput,
    ) -> impl Future<Output = Result<CommentNode, CommentError>> + Send;

    /// Find a comment by ID.
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<CommentNode>, CommentError>> + Send;

    /// Update a comment's content.
    fn update_content(
        &self,
        id: Uuid,
        content: String,
    ) -> impl Future<Output = Result<Option<CommentNode>, CommentError>> + Send;

    /// IDs of the direct children of a comment.
    fn children_of(&self, id: Uuid) -> impl Future<Output = Result<Vec<Uuid>, CommentError>> + Send;

    /// Remove a set of comments in one bulk operation. Returns the number of
    /// rows removed.
    fn delete_many(&self, ids: &[Uuid])
    -> impl Future<Output = Result<u64, CommentError>> + Send;

    /// List root comments of a feedback entry, newest first, with the total
    /// root count.
    fn list_roots(
        &self,
        feedback_id: Uuid,
        page: &PageRequest,
    ) -> impl Future<Output = Result<(Vec<CommentNode>, u64), CommentError>> + Send;

    /// List direct replies of a comment, oldest first, with the total reply
    /// count.
    fn list_replies(
        &self,
        parent_id: Uuid,
        page: &PageRequest,
    ) -> impl Future<Output = Result<(Vec<CommentNode>, u64), CommentError>> + Send;
}

/// Comment service for threaded discussion on feedback entries.
pub struct CommentService<R: CommentRepository> {
    repo: Arc<R>,
}

impl<R: CommentRepository> CommentService<R> {
    /// Create a new comment service.
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Create a comment or a reply.
    ///
    /// A reply's parent must already exist and belong to the same feedback
    /// entry; together with the absence of any re-parenting operation this
    /// keeps the comment relation acyclic.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty content or a bad author id, and
    /// `InvalidParent` for a missing or foreign parent.
    pub async fn create(&self, input: CreateCommentInput) -> Result<CommentNode, CommentError> {
        if input.content.trim().is_empty() {
            return Err(CommentError::validation("content is required"));
        }
        if input.author_id <= 0 {
            return Err(CommentError::validation("invalid author id"));
        }

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .repo
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| CommentError::invalid_parent(format!("{parent_id} not found")))?;
            if parent.feedback_id != input.feedback_id {
                return Err(CommentError::invalid_parent(format!(
                    "{parent_id} belongs to another feedback entry"
                )));
            }
        }

        self.repo.create(input).await
    }

    /// Get a comment by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the comment does not exist.
    pub async fn get(&self, id: Uuid) -> Result<CommentNode, CommentError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CommentError::not_found(id))
    }

    /// Update a comment's content.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty content and `NotFound` if the
    /// comment does not exist.
    pub async fn update(&self, id: Uuid, content: String) -> Result<CommentNode, CommentError> {
        if content.trim().is_empty() {
            return Err(CommentError::validation("content is required"));
        }
        self.repo
            .update_content(id, content)
            .await?
            .ok_or_else(|| CommentError::not_found(id))
    }

    /// Delete a comment and its entire reply subtree.
    ///
    /// Discovery first, deletion second: the full descendant set is collected
    /// with a worklist over `children_of` queries before anything is removed,
    /// so the traversal never mutates the structure it walks. The removal
    /// itself is one bulk operation. Returns the number of removed comments.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the root comment does not exist.
    pub async fn delete_subtree(&self, root_id: Uuid) -> Result<u64, CommentError> {
        self.repo
            .find_by_id(root_id)
            .await?
            .ok_or_else(|| CommentError::not_found(root_id))?;

        // Explicit worklist instead of recursion: tree depth must not become
        // a stack-depth risk. Terminates because the relation is acyclic and
        // leaves contribute empty steps.
        let mut subtree = vec![root_id];
        let mut worklist = VecDeque::from([root_id]);
        while let Some(next) = worklist.pop_front() {
            for child in self.repo.children_of(next).await? {
                subtree.push(child);
                worklist.push_back(child);
            }
        }

        let removed = self.repo.delete_many(&subtree).await?;
        info!(
            root_id = %root_id,
            discovered = subtree.len(),
            removed,
            "comment subtree deleted"
        );
        Ok(removed)
    }

    /// List root comments of a feedback entry.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the query fails.
    pub async fn list_roots(
        &self,
        feedback_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<CommentNode>, u64), CommentError> {
        self.repo.list_roots(feedback_id, page).await
    }

    /// List direct replies of a comment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the parent comment does not exist.
    pub async fn list_replies(
        &self,
        parent_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<CommentNode>, u64), CommentError> {
        self.repo
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| CommentError::not_found(parent_id))?;
        self.repo.list_replies(parent_id, page).await
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
