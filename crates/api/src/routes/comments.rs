//! Threaded comment routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;
use critique_core::comment::{CommentError, CommentNode, CommentService, CreateCommentInput};
use critique_db::CommentRepository;
use critique_shared::AppError;
use critique_shared::types::PageResponse;

use super::feedback::page_request;

/// Creates the comment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feedback/{feedback_id}/comments", post(create_comment))
        .route("/feedback/{feedback_id}/comments", get(list_comments))
        .route("/comments/{comment_id}", get(get_comment))
        .route("/comments/{comment_id}", patch(update_comment))
        .route("/comments/{comment_id}", delete(delete_comment))
        .route("/comments/{comment_id}/replies", get(list_replies))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a comment.
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    /// Comment author.
    pub author_id: i64,
    /// Parent comment for replies.
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Comment text.
    pub content: String,
}

/// Request body for updating a comment.
#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    /// New comment text.
    pub content: String,
}

/// Query parameters for comment listing.
#[derive(Debug, Deserialize)]
pub struct ListCommentsQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page (clamped server-side).
    pub per_page: Option<u32>,
}

/// Response body for a comment.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    /// Comment ID.
    pub id: Uuid,
    /// Feedback entry the comment belongs to.
    pub feedback_id: Uuid,
    /// Comment author.
    pub author_id: i64,
    /// Parent comment, if this is a reply.
    pub parent_id: Option<Uuid>,
    /// Comment text.
    pub content: String,
    /// Created at timestamp (ISO 8601).
    pub created_at: String,
    /// Updated at timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<CommentNode> for CommentResponse {
    fn from(node: CommentNode) -> Self {
        Self {
            id: node.id,
            feedback_id: node.feedback_id,
            author_id: node.author_id,
            parent_id: node.parent_id,
            content: node.content,
            created_at: node.created_at.to_rfc3339(),
            updated_at: node.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn comment_service(state: &AppState) -> CommentService<CommentRepository> {
    CommentService::new(Arc::new(CommentRepository::new((*state.db).clone())))
}

fn error_response(e: CommentError) -> Response {
    let app = AppError::from(e);
    let status =
        StatusCode::from_u16(app.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %app, "comment request failed");
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

/// POST `/feedback/{feedback_id}/comments`
/// Create a comment or a reply.
async fn create_comment(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Response {
    let input = CreateCommentInput {
        feedback_id,
        author_id: payload.author_id,
        parent_id: payload.parent_id,
        content: payload.content,
    };

    match comment_service(&state).create(input).await {
        Ok(node) => {
            info!(comment_id = %node.id, feedback_id = %feedback_id, "comment created");
            (StatusCode::CREATED, Json(CommentResponse::from(node))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/feedback/{feedback_id}/comments`
/// List root comments of a feedback entry, newest first.
async fn list_comments(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
    Query(query): Query<ListCommentsQuery>,
) -> Response {
    let page = page_request(query.page, query.per_page);

    match comment_service(&state).list_roots(feedback_id, &page).await {
        Ok((nodes, total)) => {
            let data: Vec<CommentResponse> =
                nodes.into_iter().map(CommentResponse::from).collect();
            Json(PageResponse::new(data, page.page(), page.per_page(), total)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/comments/{comment_id}`
async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Response {
    match comment_service(&state).get(comment_id).await {
        Ok(node) => Json(CommentResponse::from(node)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/comments/{comment_id}/replies`
/// List direct replies of a comment, oldest first.
async fn list_replies(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Query(query): Query<ListCommentsQuery>,
) -> Response {
    let page = page_request(query.page, query.per_page);

    match comment_service(&state).list_replies(comment_id, &page).await {
        Ok((nodes, total)) => {
            let data: Vec<CommentResponse> =
                nodes.into_iter().map(CommentResponse::from).collect();
            Json(PageResponse::new(data, page.page(), page.per_page(), total)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// PATCH `/comments/{comment_id}`
async fn update_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Response {
    match comment_service(&state)
        .update(comment_id, payload.content)
        .await
    {
        Ok(node) => Json(CommentResponse::from(node)).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE `/comments/{comment_id}`
/// Remove the comment and its entire reply subtree.
async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Response {
    match comment_service(&state).delete_subtree(comment_id).await {
        Ok(removed) => {
            info!(comment_id = %comment_id, removed, "comment subtree deleted");
            Json(json!({ "removed": removed })).into_response()
        }
        Err(e) => error_response(e),
    }
}
