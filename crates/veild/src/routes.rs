//! API routes for veild
//!
//! `/` and `/test` report liveness; `/sanitize` runs the pipeline.

use crate::error::SanitizeError;
use crate::pipeline;
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderValue},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;
use veil_common::{SanitizeRequest, SanitizeResult};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(health_check))
        .route("/test", get(backend_check))
}

async fn health_check() -> Json<&'static str> {
    Json("Hi it is working perfectly")
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub status: &'static str,
    pub message: String,
    pub ollama_available: bool,
}

async fn backend_check(State(state): State<AppStateArc>) -> Json<TestResponse> {
    let ollama_available = state.supervisor.is_reachable().await;

    Json(TestResponse {
        status: "ok",
        message: format!(
            "Sanitizer running for {}s, model {}",
            state.start_time.elapsed().as_secs(),
            state.config.ollama.model
        ),
        ollama_available,
    })
}

// ============================================================================
// Sanitize Routes
// ============================================================================

pub fn sanitize_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/sanitize", post(sanitize).options(preflight))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .route_layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
}

/// CORS preflight; never touches the pipeline
async fn preflight() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn sanitize(
    State(state): State<AppStateArc>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SanitizeResult>, SanitizeError> {
    let body = body.map_err(|rejection| SanitizeError::Rejected {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let request = SanitizeRequest::from_body(&body)?;
    info!("  Sanitizing {} bytes of text", request.text.len());

    let result = pipeline::sanitize(&state, &request.text).await?;
    Ok(Json(result))
}
