//! API error type and the response envelope shared by all endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use topic_sync::{SyncError, SyncErrorKind};
use uuid::Uuid;

/// Message returned when the roster owner denies the caller.
pub const NO_ACCESS_MESSAGE: &str = "User doesn't have access to the project";

/// Message returned for any other failed sync.
pub const SYNC_FAILED_MESSAGE: &str = "Error sync users";

/// Response body: `{id, version, result: {success, status, content}}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub id: Uuid,
    pub version: &'static str,
    pub result: EnvelopeResult<T>,
}

#[derive(Debug, Serialize)]
pub struct EnvelopeResult<T: Serialize> {
    pub success: bool,
    pub status: u16,
    pub content: T,
}

/// Content of a message-only response.
#[derive(Debug, Serialize)]
pub struct MessageContent {
    pub message: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, content: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: "v4",
            result: EnvelopeResult {
                success: status.is_success(),
                status: status.as_u16(),
                content,
            },
        }
    }
}

/// Build a message-only envelope response.
pub fn message_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Envelope::new(
        status,
        MessageContent {
            message: message.into(),
        },
    );
    (status, Json(body)).into_response()
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed or rejected bearer token.
    #[error("{0}")]
    InvalidToken(String),

    /// The caller may not sync the reference entity.
    #[error("{0}")]
    Forbidden(String),

    /// The request body is unusable.
    #[error("{0}")]
    BadRequest(String),

    /// The sync run failed.
    #[error("{0}")]
    Internal(String),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err.kind() {
            SyncErrorKind::Forbidden => Self::Forbidden(err.to_string()),
            SyncErrorKind::BadRequest => Self::BadRequest(err.to_string()),
            SyncErrorKind::Internal => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details stay in the logs.
        let (status, message) = match self {
            ApiError::InvalidToken(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, NO_ACCESS_MESSAGE.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SYNC_FAILED_MESSAGE.to_string(),
            ),
        };
        message_response(status, message)
    }
}
