//! gitmcp server - MCP front end for permission gated GitHub tools
//!
//! Serves the tool registry over stdio or HTTP. Both transports feed the same
//! [`McpHandler`], so authentication behaves identically on either.

pub mod protocol;
pub mod routes;
pub mod server;
pub mod state;
pub mod stdio;
pub mod tools;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, McpHandler, RpcError};
pub use server::GitMcpServer;
pub use state::AppState;
pub use tools::{CallToolResult, ToolDefinition, ToolRegistry};

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use gitmcp_core::GitMcpError;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Largest accepted JSON-RPC message
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Create the HTTP application router
pub fn create_app(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config()
        .security
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable allowed origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .merge(routes::mcp_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Error types for the server
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] GitMcpError),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;
