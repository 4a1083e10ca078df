//! Comment repository for database operations.
//!
//! Implements comment persistence and the parent/child adjacency queries the
//! subtree deleter walks. The bulk removal is a single `DELETE ... WHERE id
//! IN` statement, so a discovered subtree disappears atomically.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use critique_shared::types::PageRequest;

use crate::entities::comments;
use critique_core::comment::{
    CommentError, CommentNode, CommentRepository as CommentRepoTrait, CreateCommentInput,
};

/// Comment repository implementation.
#[derive(Debug, Clone)]
pub struct CommentRepository {
    db: DatabaseConnection,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl CommentRepoTrait for CommentRepository {
    async fn create(&self, input: CreateCommentInput) -> Result<CommentNode, CommentError> {
        let now = Utc::now();
        let active_model = comments::ActiveModel {
            id: Set(Uuid::new_v4()),
            feedback_id: Set(input.feedback_id),
            author_id: Set(input.author_id),
            parent_id: Set(input.parent_id),
            content: Set(input.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentNode>, CommentError> {
        let model = comments::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }

    async fn update_content(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<CommentNode>, CommentError> {
        let Some(model) = comments::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut active_model: comments::ActiveModel = model.into();
        active_model.content = Set(content);
        active_model.updated_at = Set(Utc::now().into());

        let model = active_model
            .update(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        Ok(Some(to_domain(model)))
    }

    async fn children_of(&self, id: Uuid) -> Result<Vec<Uuid>, CommentError> {
        let models = comments::Entity::find()
            .filter(comments::Column::ParentId.eq(id))
            .all(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        Ok(models.into_iter().map(|model| model.id).collect())
    }

    async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, CommentError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = comments::Entity::delete_many()
            .filter(comments::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        Ok(result.rows_affected)
    }

    async fn list_roots(
        &self,
        feedback_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<CommentNode>, u64), CommentError> {
        let query = comments::Entity::find()
            .filter(comments::Column::FeedbackId.eq(feedback_id))
            .filter(comments::Column::ParentId.is_null());

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        let models = query
            .order_by_desc(comments::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        Ok((models.into_iter().map(to_domain).collect(), total))
    }

    async fn list_replies(
        &self,
        parent_id: Uuid,
        page: &PageRequest,
    ) -> Result<(Vec<CommentNode>, u64), CommentError> {
        let query = comments::Entity::find().filter(comments::Column::ParentId.eq(parent_id));

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        let models = query
            .order_by_asc(comments::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(|e| CommentError::repository(e.to_string()))?;

        Ok((models.into_iter().map(to_domain).collect(), total))
    }
}

/// Convert database model to domain model.
fn to_domain(model: comments::Model) -> CommentNode {
    CommentNode {
        id: model.id,
        feedback_id: model.feedback_id,
        author_id: model.author_id,
        parent_id: model.parent_id,
        content: model.content,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
