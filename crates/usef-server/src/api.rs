//! The signed-message endpoint.

use crate::dispatch::DispatchError;
use crate::AppState;
use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use usef_ingress::RejectionReason;
use usef_types::{SignedEnvelope, SUPPORTED_SPEC_VERSION};

/// Path signed messages are posted to, `/USEF/<version>/SignedMessage`.
pub fn signed_message_path() -> String {
    format!("/USEF/{SUPPORTED_SPEC_VERSION}/SignedMessage")
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("message rejected: {0}")]
    Rejected(#[from] RejectionReason),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("verification task failed: {0}")]
    Task(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            ApiError::Rejected(reason) if reason.is_infrastructure() => (
                StatusCode::SERVICE_UNAVAILABLE,
                reason.code(),
                reason.to_string(),
            ),
            ApiError::Rejected(reason) => {
                (StatusCode::BAD_REQUEST, reason.code(), reason.to_string())
            }
            ApiError::Dispatch(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DispatchFailed",
                e.to_string(),
            ),
            ApiError::Task(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal",
                e.clone(),
            ),
        };
        (
            status,
            Json(serde_json::json!({ "error": code, "message": message })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: &'static str,
    pub message_id: String,
    pub delivery: u64,
}

/// Handler for `POST /USEF/2015/SignedMessage`.
pub async fn signed_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(envelope): Json<SignedEnvelope>,
) -> Result<Json<AcceptedResponse>, ApiError> {
    let delivery = state.sequence.next();
    tracing::debug!(
        delivery,
        domain = %envelope.sender_domain,
        role = %envelope.sender_role,
        "inbound delivery"
    );

    let state_clone = state.clone();
    let message_id = tokio::task::spawn_blocking(move || {
        let verified = state_clone.verifier.verify_incoming(&envelope)?;
        state_clone.dispatcher.dispatch(&verified)?;
        Ok::<_, ApiError>(verified.metadata.message_id)
    })
    .await
    .map_err(|e| ApiError::Task(e.to_string()))?
    .inspect_err(|e| tracing::debug!(delivery, error = %e, "delivery refused"))?;

    Ok(Json(AcceptedResponse {
        status: "accepted",
        message_id,
        delivery,
    }))
}
