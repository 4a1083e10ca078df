//! Feedback repository for database operations.
//!
//! Implements feedback CRUD operations using SeaORM.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use critique_shared::types::PageRequest;

use crate::entities::feedbacks;
use critique_core::feedback::{
    CreateFeedbackRecord, Feedback, FeedbackError, FeedbackFilter,
    FeedbackRepository as FeedbackRepoTrait,
};

/// Feedback repository implementation.
#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    db: DatabaseConnection,
}

impl FeedbackRepository {
    /// Create a new feedback repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl FeedbackRepoTrait for FeedbackRepository {
    async fn create(&self, record: CreateFeedbackRecord) -> Result<Feedback, FeedbackError> {
        let now = Utc::now();
        let active_model = feedbacks::ActiveModel {
            id: Set(record.id),
            reviewer_id: Set(record.reviewer_id),
            student_id: Set(record.student_id),
            submission_id: Set(record.submission_id),
            title: Set(record.title),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = active_model
            .insert(&self.db)
            .await
            .map_err(|e| FeedbackError::repository(e.to_string()))?;

        Ok(to_domain(model))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Feedback>, FeedbackError> {
        let model = feedbacks::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| FeedbackError::repository(e.to_string()))?;

        Ok(model.map(to_domain))
    }

    async fn update_title(&self, id: Uuid, title: String) -> Result<Option<Feedback>, FeedbackError> {
        let Some(model) = feedbacks::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| FeedbackError::repository(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut active_model: feedbacks::ActiveModel = model.into();
        active_model.title = Set(title);
        active_model.updated_at = Set(Utc::now().into());

        let model = active_model
            .update(&self.db)
            .await
            .map_err(|e| FeedbackError::repository(e.to_string()))?;

        Ok(Some(to_domain(model)))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, FeedbackError> {
        let result = feedbacks::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| FeedbackError::repository(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    async fn list(
        &self,
        filter: &FeedbackFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Feedback>, u64), FeedbackError> {
        let mut query = feedbacks::Entity::find();
        if let Some(reviewer_id) = filter.reviewer_id {
            query = query.filter(feedbacks::Column::ReviewerId.eq(reviewer_id));
        }
        if let Some(student_id) = filter.student_id {
            query = query.filter(feedbacks::Column::StudentId.eq(student_id));
        }
        if let Some(submission_id) = filter.submission_id {
            query = query.filter(feedbacks::Column::SubmissionId.eq(submission_id));
        }

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(|e| FeedbackError::repository(e.to_string()))?;

        let models = query
            .order_by_desc(feedbacks::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(|e| FeedbackError::repository(e.to_string()))?;

        Ok((models.into_iter().map(to_domain).collect(), total))
    }
}

/// Convert database model to domain model.
fn to_domain(model: feedbacks::Model) -> Feedback {
    Feedback {
        id: model.id,
        reviewer_id: model.reviewer_id,
        student_id: model.student_id,
        submission_id: model.submission_id,
        title: model.title,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
