//! Tool handlers
//!
//! Handlers only run after the gates have attached an identity. They parse
//! their arguments, call the repository operations and render text.

use async_trait::async_trait;
use gitmcp_auth::{ExecutionContext, RolePermissionRegistry, ToolError, ToolHandler, ToolOutput};
use gitmcp_core::GitMcpError;
use gitmcp_repo::{operations, IssueTracker, ItemState, NewIssue, RepoRef};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::format;

fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Validation failures are the caller's fault, everything else is upstream
fn operation_error(error: GitMcpError) -> ToolError {
    match error {
        GitMcpError::Validation { message, .. } => ToolError::InvalidArguments(message),
        other => {
            other.log();
            ToolError::Upstream(other)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepoArgs {
    #[serde(default)]
    owner: String,
    #[serde(default)]
    repo: String,
    #[serde(default)]
    state: Option<String>,
}

impl RepoArgs {
    fn repo_ref(&self) -> Result<RepoRef, ToolError> {
        RepoRef::new(self.owner.as_str(), self.repo.as_str()).map_err(operation_error)
    }

    fn state(&self) -> Result<ItemState, ToolError> {
        self.state
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(ToolError::InvalidArguments)
    }
}

/// `labels` may be a comma separated string or an array of strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelsArg {
    List(Vec<String>),
    Csv(String),
}

impl LabelsArg {
    fn into_labels(self) -> Vec<String> {
        match self {
            LabelsArg::Csv(raw) => operations::split_labels(&raw),
            LabelsArg::List(labels) => labels
                .into_iter()
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect(),
        }
    }
}

pub struct ListIssuesTool {
    tracker: Arc<dyn IssueTracker>,
}

impl ListIssuesTool {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl ToolHandler for ListIssuesTool {
    async fn call(
        &self,
        _ctx: &ExecutionContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: RepoArgs = parse_arguments(arguments)?;
        let repo = args.repo_ref()?;

        let issues = operations::list_issues(self.tracker.as_ref(), &repo, args.state()?)
            .await
            .map_err(operation_error)?;

        Ok(ToolOutput::text(format::issue_list(&issues)))
    }
}

pub struct ListPullRequestsTool {
    tracker: Arc<dyn IssueTracker>,
}

impl ListPullRequestsTool {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl ToolHandler for ListPullRequestsTool {
    async fn call(
        &self,
        _ctx: &ExecutionContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: RepoArgs = parse_arguments(arguments)?;
        let repo = args.repo_ref()?;

        let pulls = operations::list_pull_requests(self.tracker.as_ref(), &repo, args.state()?)
            .await
            .map_err(operation_error)?;

        Ok(ToolOutput::text(format::pull_request_list(&pulls)))
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(flatten)]
    repo: RepoArgs,
    #[serde(default)]
    query: String,
    #[serde(default)]
    prioritize: bool,
}

pub struct SearchIssuesTool {
    tracker: Arc<dyn IssueTracker>,
}

impl SearchIssuesTool {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl ToolHandler for SearchIssuesTool {
    async fn call(
        &self,
        _ctx: &ExecutionContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: SearchArgs = parse_arguments(arguments)?;
        let repo = args.repo.repo_ref()?;

        let mut issues =
            operations::search_issues(self.tracker.as_ref(), &repo, &args.query, args.repo.state()?)
                .await
                .map_err(operation_error)?;
        if args.prioritize {
            operations::rank_by_engagement(&mut issues);
        }

        Ok(ToolOutput::text(format::search_results(
            &args.query,
            &issues,
            args.prioritize,
        )))
    }
}

pub struct PendingReviewsTool {
    tracker: Arc<dyn IssueTracker>,
}

impl PendingReviewsTool {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl ToolHandler for PendingReviewsTool {
    async fn call(
        &self,
        _ctx: &ExecutionContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: RepoArgs = parse_arguments(arguments)?;
        let repo = args.repo_ref()?;

        let pulls = operations::pending_reviews(self.tracker.as_ref(), &repo)
            .await
            .map_err(operation_error)?;

        Ok(ToolOutput::text(format::pending_reviews(&pulls)))
    }
}

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    #[serde(flatten)]
    repo: RepoArgs,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    labels: Option<LabelsArg>,
    #[serde(default)]
    assignee: Option<String>,
}

pub struct CreateIssueTool {
    tracker: Arc<dyn IssueTracker>,
}

impl CreateIssueTool {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl ToolHandler for CreateIssueTool {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: CreateIssueArgs = parse_arguments(arguments)?;
        let repo = args.repo.repo_ref()?;
        let new_issue = NewIssue {
            title: args.title,
            body: args.body,
            labels: args.labels.map(LabelsArg::into_labels).unwrap_or_default(),
            assignee: args.assignee.filter(|assignee| !assignee.trim().is_empty()),
        };

        let issue = operations::create_issue(self.tracker.as_ref(), &repo, new_issue)
            .await
            .map_err(operation_error)?;

        tracing::info!(
            repo = %repo,
            number = issue.number,
            subject = ctx.identity().map(|identity| identity.subject.as_str()).unwrap_or_default(),
            "Issue created"
        );

        Ok(ToolOutput::text(format::created_issue(&issue)).with_structured(json!({
            "number": issue.number,
            "title": issue.title,
            "url": issue.html_url,
            "state": issue.state,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeArgs {
    #[serde(flatten)]
    repo: RepoArgs,
    #[serde(default)]
    limit: Option<f64>,
}

impl AnalyzeArgs {
    /// Numbers arrive as JSON floats; non-positive values mean the default
    fn limit(&self) -> Option<u32> {
        self.limit
            .filter(|limit| limit.is_finite() && *limit >= 1.0)
            .map(|limit| limit.min(u32::MAX as f64) as u32)
    }
}

pub struct AnalyzePriorityTool {
    tracker: Arc<dyn IssueTracker>,
}

impl AnalyzePriorityTool {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl ToolHandler for AnalyzePriorityTool {
    async fn call(
        &self,
        _ctx: &ExecutionContext,
        arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let args: AnalyzeArgs = parse_arguments(arguments)?;
        let repo = args.repo.repo_ref()?;

        let report = operations::analyze_issue_priority(self.tracker.as_ref(), &repo, args.limit())
            .await
            .map_err(operation_error)?;
        let structured = serde_json::to_value(&report).map_err(|e| ToolError::Upstream(e.into()))?;

        Ok(ToolOutput::text(format::priority_report(&report)).with_structured(structured))
    }
}

/// Describes the caller's own access
pub struct MyPermissionsTool {
    registry: &'static RolePermissionRegistry,
}

impl MyPermissionsTool {
    pub fn new(registry: &'static RolePermissionRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ToolHandler for MyPermissionsTool {
    async fn call(
        &self,
        ctx: &ExecutionContext,
        _arguments: Value,
    ) -> Result<ToolOutput, ToolError> {
        let identity = ctx.identity().ok_or_else(|| {
            ToolError::InvalidArguments("failed to get user information".to_string())
        })?;

        let permissions: Vec<String> = self
            .registry
            .permissions_for(&identity.roles)
            .into_iter()
            .map(|permission| permission.to_string())
            .collect();

        Ok(
            ToolOutput::text(format::access_details(identity, self.registry)).with_structured(
                json!({
                    "subject": identity.subject,
                    "username": identity.username,
                    "roles": identity.roles,
                    "permissions": permissions,
                }),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_accept_string_or_array() {
        let csv: CreateIssueArgs =
            parse_arguments(json!({"owner": "o", "repo": "r", "labels": "bug, p1,,"})).unwrap();
        assert_eq!(csv.labels.unwrap().into_labels(), vec!["bug", "p1"]);

        let list: CreateIssueArgs =
            parse_arguments(json!({"owner": "o", "repo": "r", "labels": ["bug", " "]})).unwrap();
        assert_eq!(list.labels.unwrap().into_labels(), vec!["bug"]);
    }

    #[test]
    fn test_state_defaults_to_open_and_rejects_unknown() {
        let args: RepoArgs = parse_arguments(json!({"owner": "o", "repo": "r"})).unwrap();
        assert_eq!(args.state().unwrap(), ItemState::Open);

        let args: RepoArgs =
            parse_arguments(json!({"owner": "o", "repo": "r", "state": "merged"})).unwrap();
        assert!(matches!(args.state(), Err(ToolError::InvalidArguments(_))));
    }

    #[test]
    fn test_missing_repository_is_invalid() {
        let args: RepoArgs = parse_arguments(Value::Null).unwrap();
        let err = args.repo_ref().unwrap_err();

        assert!(matches!(
            err,
            ToolError::InvalidArguments(message) if message == "owner is required"
        ));
    }

    #[test]
    fn test_limit_accepts_float_numbers() {
        let args: AnalyzeArgs =
            parse_arguments(json!({"owner": "o", "repo": "r", "limit": 5.0})).unwrap();
        assert_eq!(args.limit(), Some(5));

        let args: AnalyzeArgs =
            parse_arguments(json!({"owner": "o", "repo": "r", "limit": -3})).unwrap();
        assert_eq!(args.limit(), None);
    }

    #[test]
    fn test_wrong_argument_types_are_rejected() {
        let result: Result<SearchArgs, _> =
            parse_arguments(json!({"owner": "o", "repo": "r", "prioritize": "yes"}));
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
