//! Attachment repository for database operations.
//!
//! Implements attachment metadata persistence using SeaORM.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{attachments, feedbacks};
use critique_core::attachment::{
    AttachmentError, AttachmentInfo, AttachmentRepository as AttachmentRepoTrait,
    CreateAttachmentInput,
};

/// Attachment repository implementation.
#[derive(Debug, Clone)]
pub struct AttachmentRepository {
    db: DatabaseConnection,
}

impl AttachmentRepository {
    /// Create a new attachment repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl AttachmentRepoTrait for AttachmentRepository {
    async fn create(&self, input: CreateAttachmentInput) -> Result<AttachmentInfo, AttachmentError> {
        let active_model = attachments::ActiveModel {
            id: Set(input.id),
            feedback_id: Set(input.feedback_id),
            file_name: Set(input.filename),
            content_type: Set(input.content_type),
            file_size: Set(input.size),
            created_at: Set(Utc::now().into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn find_by_filename(
        &self,
        feedback_id: Uuid,
        filename: &str,
    ) -> Result<Option<AttachmentInfo>, AttachmentError> {
        let model = attachments::Entity::find()
            .filter(attachments::Column::FeedbackId.eq(feedback_id))
            .filter(attachments::Column::FileName.eq(filename))
            .one(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }

    async fn update_blob_meta(
        &self,
        id: Uuid,
        content_type: String,
        size: i64,
    ) -> Result<AttachmentInfo, AttachmentError> {
        let model = attachments::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))?
            .ok_or_else(|| AttachmentError::not_found(id.to_string()))?;

        let mut active_model: attachments::ActiveModel = model.into();
        active_model.content_type = Set(content_type);
        active_model.file_size = Set(size);

        let model = active_model
            .update(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn count_by_feedback(&self, feedback_id: Uuid) -> Result<u64, AttachmentError> {
        attachments::Entity::find()
            .filter(attachments::Column::FeedbackId.eq(feedback_id))
            .count(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))
    }

    async fn list_by_feedback(
        &self,
        feedback_id: Uuid,
    ) -> Result<Vec<AttachmentInfo>, AttachmentError> {
        let models = attachments::Entity::find()
            .filter(attachments::Column::FeedbackId.eq(feedback_id))
            .order_by_desc(attachments::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))?;

        Ok(models.into_iter().map(to_domain).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AttachmentError> {
        let result = attachments::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn feedback_exists(&self, feedback_id: Uuid) -> Result<bool, AttachmentError> {
        let count: u64 = feedbacks::Entity::find_by_id(feedback_id)
            .count(&self.db)
            .await
            .map_err(|e| AttachmentError::repository(e.to_string()))?;

        Ok(count > 0)
    }
}

/// Convert database model to domain model.
fn to_domain(model: attachments::Model) -> AttachmentInfo {
    AttachmentInfo {
        id: model.id,
        feedback_id: model.feedback_id,
        filename: model.file_name,
        content_type: model.content_type,
        size: model.file_size,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
