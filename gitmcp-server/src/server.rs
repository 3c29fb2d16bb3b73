//! Transport selection and the HTTP listener

use gitmcp_core::{AppConfig, TransportKind};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{create_app, stdio, AppState, ServerError, ServerResult};

pub struct GitMcpServer {
    state: AppState,
}

impl GitMcpServer {
    pub fn new(config: AppConfig) -> ServerResult<Self> {
        Ok(Self {
            state: AppState::from_config(config)?,
        })
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve the configured transport until it ends or `shutdown` fires
    pub async fn run(self, shutdown: CancellationToken) -> ServerResult<()> {
        let server = &self.state.config().server;
        match server.transport {
            TransportKind::Stdio => {
                let auth_token = server.auth_token.clone();
                stdio::run(self.state.handler().clone(), auth_token.as_deref(), shutdown).await
            }
            TransportKind::Http => self.serve_http(shutdown).await,
        }
    }

    async fn serve_http(self, shutdown: CancellationToken) -> ServerResult<()> {
        let address = self.state.config().server.address();
        let listener = TcpListener::bind(&address).await?;
        info!("Serving MCP on http://{}/mcp", address);

        let app = create_app(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| {
                error!("Server error: {}", e);
                ServerError::Io(e)
            })
    }
}
