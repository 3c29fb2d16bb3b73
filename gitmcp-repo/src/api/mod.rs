//! API clients for issue trackers
//!
//! This module defines the [`IssueTracker`] abstraction used by the repository
//! operations and the shared HTTP plumbing for its implementations.

use async_trait::async_trait;
use gitmcp_core::{ErrorContext, GitMcpError, GitMcpResult};

use crate::types::{Issue, ItemState, NewIssue, PullRequest, Review};

pub mod github;

#[cfg(test)]
mod tests;

pub use github::GitHubApiClient;

/// Largest page size the hosting API accepts
pub const MAX_PER_PAGE: u32 = 100;

/// Configuration for API clients
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Access token for authentication
    pub access_token: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: None,
            timeout_seconds: 30,
            user_agent: concat!("gitmcp/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiClientConfig {
    /// Build from the process configuration
    pub fn from_github_config(config: &gitmcp_core::GitHubConfig) -> Self {
        Self {
            base_url: config.api_url.clone(),
            access_token: config.token.clone(),
            timeout_seconds: config.timeout_secs,
            ..Default::default()
        }
    }
}

/// Read and write access to a repository's issues and pull requests
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// List issues in a repository; the result may include pull requests
    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: ItemState,
        per_page: u32,
    ) -> GitMcpResult<Vec<Issue>>;

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: ItemState,
        per_page: u32,
    ) -> GitMcpResult<Vec<PullRequest>>;

    /// Run a raw search query against the issue search endpoint
    async fn search_issues(&self, query: &str, per_page: u32) -> GitMcpResult<Vec<Issue>>;

    async fn list_reviews(&self, owner: &str, repo: &str, number: u64)
        -> GitMcpResult<Vec<Review>>;

    async fn create_issue(&self, owner: &str, repo: &str, issue: &NewIssue)
        -> GitMcpResult<Issue>;
}

/// Helper function to create HTTP client with common configuration
pub(crate) fn create_http_client(config: &ApiClientConfig) -> GitMcpResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            GitMcpError::Repository {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| GitMcpError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

/// Helper function to turn an unsuccessful HTTP response into an error
pub(crate) async fn handle_response_error(
    response: reqwest::Response,
    operation: &str,
) -> GitMcpError {
    let status = response.status();
    let url = response.url().clone();
    let retry_after_ms = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(|secs| secs * 1000);

    let error_body = response.text().await.unwrap_or_default();
    let message = format!(
        "HTTP {} error for {}: {}",
        status.as_u16(),
        url,
        if error_body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error")
        } else {
            &error_body
        }
    );

    let context = ErrorContext::new("api_client")
        .with_operation(operation)
        .with_metadata("status", &status.as_u16().to_string());

    match status.as_u16() {
        404 => GitMcpError::NotFound {
            resource: url.to_string(),
            context: context.with_suggestion("Repository not found or not accessible"),
        },
        429 => GitMcpError::RateLimit {
            message,
            retry_after_ms,
            context: context.with_suggestion("Wait before retrying"),
        },
        code => GitMcpError::Repository {
            message,
            source: None,
            context: context.with_suggestion(match code {
                401 => "Check your access token",
                403 => "Check repository permissions or rate limits",
                422 => "Check the request fields",
                _ => "Check network connectivity and API status",
            }),
        },
    }
}
