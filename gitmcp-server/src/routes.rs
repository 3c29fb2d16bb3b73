//! HTTP routes

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub tools: usize,
}

pub fn mcp_routes() -> Router<AppState> {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health_check))
}

/// One JSON-RPC message per request, authenticated with the caller's headers
async fn handle_mcp(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    // Dropping the request future cancels the invocation
    let cancellation = CancellationToken::new();
    let _guard = cancellation.clone().drop_guard();

    match state
        .handler()
        .handle_text(&body, &headers, &cancellation)
        .await
    {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tools: state.handler().tools().len(),
    })
}
