//! USEF secure-ingress server library logic.

pub mod api;
pub mod config;
pub mod dispatch;
pub mod keys;
pub mod retention;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use dispatch::MessageDispatcher;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use usef_ingress::IngressVerifier;
use usef_types::SequenceGenerator;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Inbound verification pipeline.
    pub verifier: IngressVerifier,
    /// Receives every accepted message.
    pub dispatcher: Arc<dyn MessageDispatcher>,
    /// Numbers deliveries for log correlation.
    pub sequence: Arc<SequenceGenerator>,
}

/// Maximum request body size (2 MiB). Protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            &api::signed_message_path(),
            post(api::signed_message_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}
