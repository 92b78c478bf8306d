//! HTTP handlers for topic membership sync.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Extension, Json,
};
use serde::Deserialize;
use topic_sync::SyncRequest;

use crate::auth::{CallerClaims, CallerToken};
use crate::error::{message_response, ApiError};
use crate::state::AppState;

/// Message returned after a successful sync.
pub const SYNCED_MESSAGE: &str = "Users synced";

/// Body of `PUT /v4/topics/syncUsers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUsersBody {
    pub reference: String,
    pub reference_id: i64,
    #[serde(default)]
    pub is_user_leaving: bool,
}

impl SyncUsersBody {
    fn validate(&self) -> Result<(), ApiError> {
        if self.reference.trim().is_empty() {
            return Err(ApiError::BadRequest("\"reference\" is required".to_string()));
        }
        if self.reference_id <= 0 {
            return Err(ApiError::BadRequest(
                "\"referenceId\" must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reconcile every topic of a reference entity with its roster.
pub async fn sync_users(
    State(state): State<AppState>,
    Extension(claims): Extension<CallerClaims>,
    Extension(CallerToken(authorization)): Extension<CallerToken>,
    body: Result<Json<SyncUsersBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    body.validate()?;

    let mut request =
        SyncRequest::new(body.reference.trim(), body.reference_id).with_authorization(authorization);

    if body.is_user_leaving {
        let member = claims.member_id().ok_or_else(|| {
            ApiError::BadRequest("Caller token carries no numeric userId".to_string())
        })?;
        request = request.leaving(member);
    }

    let report = state
        .orchestrator
        .sync_reference_topics(&request)
        .await?;

    tracing::info!(
        run_id = %report.run_id,
        reference = %report.reference,
        reference_id = report.reference_id,
        granted = report.granted_count(),
        revoked = report.revoked_count(),
        "Users synced"
    );

    Ok(message_response(StatusCode::OK, SYNCED_MESSAGE))
}

/// Liveness probe.
pub async fn health() -> Response {
    message_response(StatusCode::OK, "OK")
}
