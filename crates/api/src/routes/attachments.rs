//! Attachment routes: listing, deletion, and the chunked WebSocket
//! upload/download endpoints.
//!
//! Upload framing over the socket: the first message is a JSON text frame
//! with `{filename, content_type, declared_size}`; every binary frame after
//! it carries a payload chunk; closing the socket ends the stream. Frames
//! that are neither (pings, pongs) are skipped. The server answers with one
//! terminal JSON frame per request.
//!
//! Download framing mirrors it: a JSON info frame first, then binary chunks
//! in blob order.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use futures::{SinkExt, StreamExt, future};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::AppState;
use critique_core::attachment::{AttachmentError, AttachmentInfo, AttachmentService};
use critique_core::transfer::{
    ChunkSink, DownloadMessage, TransferError, UploadMessage, UploadMetadata,
};
use critique_db::AttachmentRepository;
use critique_shared::AppError;

/// Per-message ceiling at the transport, independent of any declared size.
const MAX_FRAME_BYTES: usize = 32 * 1024 * 1024;

/// Creates the attachment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feedback/{feedback_id}/attachments", get(list_attachments))
        .route(
            "/feedback/{feedback_id}/attachments/upload",
            get(upload_attachment),
        )
        .route(
            "/feedback/{feedback_id}/attachments/{filename}",
            delete(delete_attachment),
        )
        .route(
            "/feedback/{feedback_id}/attachments/{filename}/download",
            get(download_attachment),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Metadata frame of a WebSocket upload.
#[derive(Debug, Deserialize)]
pub struct WsUploadMetadata {
    /// Original filename.
    pub filename: String,
    /// MIME type of the payload.
    #[serde(default)]
    pub content_type: String,
    /// Total payload size the caller commits to sending.
    pub declared_size: u64,
}

/// Response body for an attachment.
#[derive(Debug, Serialize)]
pub struct AttachmentResponse {
    /// Attachment ID.
    pub id: Uuid,
    /// Owning feedback entry.
    pub feedback_id: Uuid,
    /// Original filename.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Payload size in bytes.
    pub size: i64,
    /// Created at timestamp (ISO 8601).
    pub created_at: String,
}

impl From<AttachmentInfo> for AttachmentResponse {
    fn from(info: AttachmentInfo) -> Self {
        Self {
            id: info.id,
            feedback_id: info.feedback_id,
            filename: info.filename,
            content_type: info.content_type,
            size: info.size,
            created_at: info.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn attachment_service(state: &AppState) -> AttachmentService<AttachmentRepository> {
    AttachmentService::new(
        state.blobs.clone(),
        Arc::new(AttachmentRepository::new((*state.db).clone())),
        state.upload_limits.clone(),
    )
}

fn error_response(e: AttachmentError) -> Response {
    let app = AppError::from(e);
    let status =
        StatusCode::from_u16(app.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %app, "attachment request failed");
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

/// Decode one WebSocket frame into an upload message.
///
/// Returns `None` for contentless frames (pings, pongs, close), which are
/// skipped rather than treated as errors.
fn decode_upload_frame(
    feedback_id: Uuid,
    frame: Result<Message, axum::Error>,
) -> Option<Result<UploadMessage, TransferError>> {
    match frame {
        Ok(Message::Text(text)) => match serde_json::from_str::<WsUploadMetadata>(text.as_str()) {
            Ok(metadata) => Some(Ok(UploadMessage::Metadata(UploadMetadata {
                feedback_id,
                filename: metadata.filename,
                content_type: metadata.content_type,
                declared_size: metadata.declared_size,
            }))),
            Err(e) => Some(Err(TransferError::validation(format!(
                "bad metadata frame: {e}"
            )))),
        },
        Ok(Message::Binary(bytes)) => Some(Ok(UploadMessage::Chunk(bytes))),
        Ok(_) => None,
        // The transport failing mid-request is a client disconnect.
        Err(_) => Some(Err(TransferError::Cancelled)),
    }
}

/// Forwards download messages onto the socket: info as JSON text, chunks as
/// binary frames.
struct WsDownloadSink {
    socket: WebSocket,
}

impl ChunkSink for WsDownloadSink {
    async fn deliver(&mut self, message: DownloadMessage) -> Result<(), TransferError> {
        let frame = match message {
            DownloadMessage::Info(info) => {
                let body = serde_json::to_string(&info)
                    .map_err(|e| TransferError::validation(e.to_string()))?;
                Message::Text(body.into())
            }
            DownloadMessage::Chunk(bytes) => Message::Binary(bytes),
        };
        self.socket
            .send(frame)
            .await
            .map_err(|_| TransferError::Cancelled)
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/feedback/{feedback_id}/attachments`
/// List attachments of a feedback entry.
async fn list_attachments(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
) -> Response {
    match attachment_service(&state).list(feedback_id).await {
        Ok(attachments) => {
            let data: Vec<AttachmentResponse> = attachments
                .into_iter()
                .map(AttachmentResponse::from)
                .collect();
            Json(data).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE `/feedback/{feedback_id}/attachments/{filename}`
async fn delete_attachment(
    State(state): State<AppState>,
    Path((feedback_id, filename)): Path<(Uuid, String)>,
) -> Response {
    match attachment_service(&state)
        .delete(feedback_id, &filename)
        .await
    {
        Ok(()) => {
            info!(feedback_id = %feedback_id, filename = %filename, "attachment deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET `/feedback/{feedback_id}/attachments/upload`
/// Upgrade to a WebSocket carrying one chunked upload.
async fn upload_attachment(
    State(state): State<AppState>,
    Path(feedback_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_upload(state, feedback_id, socket))
}

async fn handle_upload(state: AppState, feedback_id: Uuid, socket: WebSocket) {
    let service = attachment_service(&state);
    let (mut sender, receiver) = socket.split();

    let messages =
        receiver.filter_map(move |frame| future::ready(decode_upload_frame(feedback_id, frame)));

    let terminal = match service.upload(messages, CancellationToken::new()).await {
        Ok(record) => {
            info!(
                feedback_id = %feedback_id,
                filename = %record.filename,
                size = record.size,
                "attachment uploaded"
            );
            json!({
                "success": true,
                "filename": record.filename,
                "size": record.size
            })
        }
        Err(e) => {
            warn!(feedback_id = %feedback_id, error = %e, "attachment upload failed");
            let app = AppError::from(e);
            json!({
                "success": false,
                "error": app.error_code(),
                "message": app.to_string()
            })
        }
    };

    // The client may already be gone; nothing to do about a failed send.
    let _ = sender.send(Message::Text(terminal.to_string().into())).await;
    let _ = sender.close().await;
}

/// GET `/feedback/{feedback_id}/attachments/{filename}/download`
/// Upgrade to a WebSocket streaming one attachment out.
async fn download_attachment(
    State(state): State<AppState>,
    Path((feedback_id, filename)): Path<(Uuid, String)>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_download(state, feedback_id, filename, socket))
}

async fn handle_download(
    state: AppState,
    feedback_id: Uuid,
    filename: String,
    socket: WebSocket,
) {
    let service = attachment_service(&state);
    let mut sink = WsDownloadSink { socket };

    match service.download(feedback_id, &filename, &mut sink).await {
        Ok(sent) => {
            debug!(feedback_id = %feedback_id, filename = %filename, sent, "attachment streamed");
            let _ = sink.socket.send(Message::Close(None)).await;
        }
        Err(e) => {
            warn!(feedback_id = %feedback_id, filename = %filename, error = %e, "attachment download failed");
            let app = AppError::from(e);
            let body = json!({
                "error": app.error_code(),
                "message": app.to_string()
            });
            let _ = sink.socket.send(Message::Text(body.to_string().into())).await;
            let _ = sink.socket.send(Message::Close(None)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_decode_metadata_frame() {
        let feedback_id = Uuid::new_v4();
        let frame = Ok(Message::Text(
            r#"{"filename":"report.pdf","content_type":"application/pdf","declared_size":42}"#
                .into(),
        ));

        let Some(Ok(UploadMessage::Metadata(metadata))) =
            decode_upload_frame(feedback_id, frame)
        else {
            panic!("expected a metadata message");
        };
        assert_eq!(metadata.feedback_id, feedback_id);
        assert_eq!(metadata.filename, "report.pdf");
        assert_eq!(metadata.declared_size, 42);
    }

    #[test]
    fn test_decode_binary_frame() {
        let frame = Ok(Message::Binary(Bytes::from_static(b"chunk")));
        let Some(Ok(UploadMessage::Chunk(bytes))) = decode_upload_frame(Uuid::new_v4(), frame)
        else {
            panic!("expected a chunk message");
        };
        assert_eq!(bytes, Bytes::from_static(b"chunk"));
    }

    #[test]
    fn test_decode_bad_metadata_is_validation_error() {
        let frame = Ok(Message::Text("not json".into()));
        assert!(matches!(
            decode_upload_frame(Uuid::new_v4(), frame),
            Some(Err(TransferError::Validation(_)))
        ));
    }

    #[test]
    fn test_decode_contentless_frames_are_skipped() {
        let ping = Ok(Message::Ping(Bytes::new()));
        assert!(decode_upload_frame(Uuid::new_v4(), ping).is_none());

        let pong = Ok(Message::Pong(Bytes::new()));
        assert!(decode_upload_frame(Uuid::new_v4(), pong).is_none());
    }

    #[test]
    fn test_transport_error_maps_to_cancelled() {
        let frame = Err(axum::Error::new(std::io::Error::other("reset")));
        assert!(matches!(
            decode_upload_frame(Uuid::new_v4(), frame),
            Some(Err(TransferError::Cancelled))
        ));
    }
}
