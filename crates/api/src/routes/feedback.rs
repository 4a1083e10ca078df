//! Feedback management routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;
use critique_core::feedback::{
    CreateFeedbackInput, Feedback, FeedbackError, FeedbackFilter, FeedbackService,
    UpdateFeedbackInput,
};
use critique_db::FeedbackRepository;
use critique_shared::AppError;
use critique_shared::types::{PageRequest, PageResponse};

/// Creates the feedback routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feedback", post(create_feedback))
        .route("/feedback", get(list_feedback))
        .route("/feedback/{feedback_id}", get(get_feedback))
        .route("/feedback/{feedback_id}", patch(update_feedback))
        .route("/feedback/{feedback_id}", delete(delete_feedback))
        .route("/feedback/{feedback_id}/content", get(get_feedback_content))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a feedback entry.
#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    /// Reviewer authoring the feedback.
    pub reviewer_id: i64,
    /// Student receiving the feedback.
    pub student_id: i64,
    /// Submission the feedback refers to.
    pub submission_id: i64,
    /// Feedback title.
    pub title: String,
    /// Free-text body (markdown).
    #[serde(default)]
    pub content: String,
}

/// Request body for updating a feedback entry.
#[derive(Debug, Deserialize)]
pub struct UpdateFeedbackRequest {
    /// Caller identity (authorization happens upstream).
    pub reviewer_id: i64,
    /// New title, if changing.
    #[serde(default)]
    pub title: Option<String>,
    /// New body, if changing.
    #[serde(default)]
    pub content: Option<String>,
}

/// Query parameters for deleting a feedback entry.
#[derive(Debug, Deserialize)]
pub struct DeleteFeedbackQuery {
    /// Caller identity (authorization happens upstream).
    pub reviewer_id: i64,
}

/// Query parameters for listing feedback.
#[derive(Debug, Deserialize)]
pub struct ListFeedbackQuery {
    /// Restrict to one reviewer.
    pub reviewer_id: Option<i64>,
    /// Restrict to one student.
    pub student_id: Option<i64>,
    /// Restrict to one submission.
    pub submission_id: Option<i64>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page (clamped server-side).
    pub per_page: Option<u32>,
}

/// Response body for a feedback entry.
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    /// Feedback ID.
    pub id: Uuid,
    /// Reviewer who authored the feedback.
    pub reviewer_id: i64,
    /// Student receiving the feedback.
    pub student_id: i64,
    /// Submission the feedback refers to.
    pub submission_id: i64,
    /// Feedback title.
    pub title: String,
    /// Created at timestamp (ISO 8601).
    pub created_at: String,
    /// Updated at timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<Feedback> for FeedbackResponse {
    fn from(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            reviewer_id: feedback.reviewer_id,
            student_id: feedback.student_id,
            submission_id: feedback.submission_id,
            title: feedback.title,
            created_at: feedback.created_at.to_rfc3339(),
            updated_at: feedback.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn feedback_service(state: &AppState) -> FeedbackService<FeedbackRepository> {
    FeedbackService::new(
        state.blobs.clone(),
        Arc::new(FeedbackRepository::new((*state.db).clone())),
    )
}

pub(super) fn page_request(page: Option<u32>, per_page: Option<u32>) -> PageRequest {
    let default = PageRequest::default();
    PageRequest {
        page: page.unwrap_or(default.page),
        per_page: per_page.unwrap_or(default.per_page),
    }
}

fn error_response(e: FeedbackError) -> Response {
    let app = AppError::from(e);
    let status =
        StatusCode::from_u16(app.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %app, "feedback request failed");
    }
    (
        status,
        Json(json!({
            "error": app.error_code(),
            "message": app.to_string()
        })),
    )
        .into_response()
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/feedback`
/// Create a feedback entry together with its body.
async fn create_feedback(
    State(state): State<AppState>,
    Json(payload): Json<CreateFeedbackRequest>,
) -> Response {
    let service = feedback_service(&state);

    let input = CreateFeedbackInput {
        reviewer_id: payload.reviewer_id,
        student_id: payload.student_id,
        submission_id: payload.submission_id,
        title: payload.title,
        content: payload.content,
    };

    match service.create(input).await {
        Ok(feedback) => {
            info!(feedback_id = %feedback.id, reviewer_id = feedback.reviewer_id, "feedback created");
            (StatusCode::CREATED, Json(FeedbackResponse::from(feedback))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/feedback`
/// List feedback entries with optional filters and pagination.
async fn list_feedback(
    State(state): State<AppState>,
    Query(query): Query<ListFeedbackQuery>,
) -> Response {
    let service = feedback_service(&state);

    let filter = FeedbackFilter {
        reviewer_id: query.reviewer_id,
        student_id: query.student_id,
        submission_id: query.submission_id,
    };
    let page = page_request(query.page, query.per_page);

    match service.list(&filter, &page).await {
        Ok((entries, total)) => {
            let data: Vec<FeedbackResponse> =
                entries.into_iter().map(FeedbackResponse::from).collect();
            Json(PageResponse::new(data, page.page(), page.per_page(), total)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/feedback/{feedback_id}`
async fn get_feedback(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
) -> Response {
    match feedback_service(&state).get(feedback_id).await {
        Ok(feedback) => Json(FeedbackResponse::from(feedback)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/feedback/{feedback_id}/content`
/// Return the stored markdown body.
async fn get_feedback_content(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
) -> Response {
    match feedback_service(&state).get_content(feedback_id).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/markdown")],
            content,
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// PATCH `/feedback/{feedback_id}`
/// Update title and/or body (author only).
async fn update_feedback(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
    Json(payload): Json<UpdateFeedbackRequest>,
) -> Response {
    let input = UpdateFeedbackInput {
        title: payload.title,
        content: payload.content,
    };

    match feedback_service(&state)
        .update(feedback_id, payload.reviewer_id, input)
        .await
    {
        Ok(feedback) => Json(FeedbackResponse::from(feedback)).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE `/feedback/{feedback_id}`
/// Remove the entry, its comments and attachment records, and every stored
/// object under its prefix (author only).
async fn delete_feedback(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
    Query(query): Query<DeleteFeedbackQuery>,
) -> Response {
    match feedback_service(&state)
        .delete(feedback_id, query.reviewer_id)
        .await
    {
        Ok(()) => {
            info!(feedback_id = %feedback_id, "feedback deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}
