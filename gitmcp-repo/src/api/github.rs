//! GitHub API client implementation

use async_trait::async_trait;
use gitmcp_core::{ErrorContext, GitMcpError, GitMcpResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::{create_http_client, handle_response_error, ApiClientConfig, IssueTracker};
use crate::types::{Issue, ItemState, NewIssue, PullRequest, Review};

/// GitHub API client
pub struct GitHubApiClient {
    client: reqwest::Client,
    config: ApiClientConfig,
}

/// GitHub search response
#[derive(Debug, Deserialize)]
struct GitHubSearchResponse {
    #[serde(default)]
    total_count: u64,
    items: Vec<Issue>,
}

impl GitHubApiClient {
    /// Create a new GitHub API client
    pub fn new(config: ApiClientConfig) -> GitMcpResult<Self> {
        let client = create_http_client(&config)?;

        info!("Created GitHub API client for {}", config.base_url);

        Ok(Self { client, config })
    }

    /// Create authorization headers
    fn create_auth_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(ref token) = self.config.access_token {
            if let Ok(auth_value) =
                reqwest::header::HeaderValue::from_str(&format!("token {}", token))
            {
                headers.insert(reqwest::header::AUTHORIZATION, auth_value);
            }
        }

        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );

        headers
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// Make a GET request to the GitHub API and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        operation: &str,
    ) -> GitMcpResult<T> {
        let url = self.endpoint_url(endpoint);

        debug!("Making GitHub API request to: {}", url);

        let request = self
            .client
            .get(&url)
            .headers(self.create_auth_headers())
            .query(query);

        self.send(request, operation).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> GitMcpResult<T> {
        let response = request.send().await.map_err(|e| GitMcpError::Network {
            message: format!("Failed to make request to GitHub API: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("github_api_client").with_operation(operation),
        })?;

        if !response.status().is_success() {
            return Err(handle_response_error(response, operation).await);
        }

        response.json().await.map_err(|e| GitMcpError::Repository {
            message: format!("Failed to parse GitHub response: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("github_api_client").with_operation(operation),
        })
    }
}

#[async_trait]
impl IssueTracker for GitHubApiClient {
    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        state: ItemState,
        per_page: u32,
    ) -> GitMcpResult<Vec<Issue>> {
        info!("Listing {} issues for {}/{}", state, owner, repo);

        self.get_json(
            &format!("repos/{}/{}/issues", owner, repo),
            &[
                ("state", state.to_string()),
                ("per_page", per_page.to_string()),
            ],
            "list_issues",
        )
        .await
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: ItemState,
        per_page: u32,
    ) -> GitMcpResult<Vec<PullRequest>> {
        info!("Listing {} pull requests for {}/{}", state, owner, repo);

        self.get_json(
            &format!("repos/{}/{}/pulls", owner, repo),
            &[
                ("state", state.to_string()),
                ("per_page", per_page.to_string()),
            ],
            "list_pull_requests",
        )
        .await
    }

    async fn search_issues(&self, query: &str, per_page: u32) -> GitMcpResult<Vec<Issue>> {
        info!("Searching issues: {}", query);

        let response: GitHubSearchResponse = self
            .get_json(
                "search/issues",
                &[("q", query.to_string()), ("per_page", per_page.to_string())],
                "search_issues",
            )
            .await?;

        debug!(
            "Search matched {} issues, returning {}",
            response.total_count,
            response.items.len()
        );

        Ok(response.items)
    }

    async fn list_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> GitMcpResult<Vec<Review>> {
        debug!("Fetching reviews for {}/{}#{}", owner, repo, number);

        self.get_json(
            &format!("repos/{}/{}/pulls/{}/reviews", owner, repo, number),
            &[],
            "list_reviews",
        )
        .await
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &NewIssue,
    ) -> GitMcpResult<Issue> {
        info!("Creating issue in {}/{}: {}", owner, repo, issue.title);

        let request = self
            .client
            .post(self.endpoint_url(&format!("repos/{}/{}/issues", owner, repo)))
            .headers(self.create_auth_headers())
            .json(issue);

        self.send(request, "create_issue").await
    }
}
