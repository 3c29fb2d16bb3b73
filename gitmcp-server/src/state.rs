//! Shared application state

use gitmcp_auth::{ClaimsResolver, Dispatcher};
use gitmcp_core::AppConfig;
use gitmcp_repo::{ApiClientConfig, GitHubApiClient, IssueTracker};
use std::sync::Arc;
use tracing::info;

use crate::protocol::McpHandler;
use crate::tools::ToolRegistry;
use crate::ServerResult;

#[derive(Clone)]
pub struct AppState {
    handler: McpHandler,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(handler: McpHandler, config: AppConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }

    /// Wire the GitHub client, claims resolver and tool registry from config
    pub fn from_config(config: AppConfig) -> ServerResult<Self> {
        let tracker: Arc<dyn IssueTracker> = Arc::new(GitHubApiClient::new(
            ApiClientConfig::from_github_config(&config.github),
        )?);
        let resolver = Arc::new(ClaimsResolver::from_config(&config.security)?);

        let state = Self::with_parts(config, resolver, tracker);
        info!(
            tools = state.handler.tools().len(),
            realm = %state.config.security.keycloak_realm,
            "Tool registry ready"
        );
        Ok(state)
    }

    /// Assemble state around an explicit resolver and tracker
    pub fn with_parts(
        config: AppConfig,
        resolver: Arc<ClaimsResolver>,
        tracker: Arc<dyn IssueTracker>,
    ) -> Self {
        let dispatcher = Dispatcher::new(resolver);
        let registry = Arc::new(ToolRegistry::new(&dispatcher, tracker));
        Self::new(McpHandler::new(registry), config)
    }

    pub fn handler(&self) -> &McpHandler {
        &self.handler
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
