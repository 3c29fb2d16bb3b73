//! Repository operations exposed as tools
//!
//! Each operation takes the tracker as a trait object so the tool layer can
//! inject a real client or an in-memory one.

use chrono::Utc;
use gitmcp_core::{validation_error, GitMcpResult};
use tracing::{debug, warn};

use crate::api::{IssueTracker, MAX_PER_PAGE};
use crate::priority::{self, PriorityReport};
use crate::types::{Issue, ItemState, NewIssue, PullRequest};

/// Default number of issues fetched for priority analysis
pub const DEFAULT_ANALYSIS_LIMIT: u32 = 20;

/// Repository coordinates shared by every operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> GitMcpResult<Self> {
        let owner = owner.into();
        let repo = repo.into();

        if owner.trim().is_empty() {
            return Err(validation_error!("owner is required", "owner", "operations"));
        }
        if repo.trim().is_empty() {
            return Err(validation_error!("repo is required", "repo", "operations"));
        }

        Ok(Self { owner, repo })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Issues in the given state, pull requests filtered out
pub async fn list_issues(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    state: ItemState,
) -> GitMcpResult<Vec<Issue>> {
    let issues = tracker
        .list_issues(&repo.owner, &repo.repo, state, MAX_PER_PAGE)
        .await?;

    Ok(issues
        .into_iter()
        .filter(|issue| !issue.is_pull_request())
        .collect())
}

pub async fn list_pull_requests(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    state: ItemState,
) -> GitMcpResult<Vec<PullRequest>> {
    tracker
        .list_pull_requests(&repo.owner, &repo.repo, state, MAX_PER_PAGE)
        .await
}

/// Search query scoped to issues of one repository
pub fn search_query(query: &str, repo: &RepoRef, state: ItemState) -> String {
    format!("{} repo:{} type:issue state:{}", query, repo, state)
}

pub async fn search_issues(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    query: &str,
    state: ItemState,
) -> GitMcpResult<Vec<Issue>> {
    if query.trim().is_empty() {
        return Err(validation_error!("query is required", "query", "operations"));
    }

    tracker
        .search_issues(&search_query(query, repo, state), MAX_PER_PAGE)
        .await
}

/// Sort search results by engagement, most active first
pub fn rank_by_engagement(issues: &mut [Issue]) {
    issues.sort_by_key(|issue| std::cmp::Reverse(priority::engagement_score(issue)));
}

/// Open pull requests that still need review
///
/// A pull request is pending when no review approved it or when it is a
/// draft. A pull request whose reviews cannot be fetched counts as pending.
pub async fn pending_reviews(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
) -> GitMcpResult<Vec<PullRequest>> {
    let pulls = tracker
        .list_pull_requests(&repo.owner, &repo.repo, ItemState::Open, MAX_PER_PAGE)
        .await?;

    let mut pending = Vec::new();
    for pull in pulls {
        let approved = match tracker.list_reviews(&repo.owner, &repo.repo, pull.number).await {
            Ok(reviews) => reviews.iter().any(|review| review.is_approval()),
            Err(e) => {
                warn!(
                    repo = %repo,
                    number = pull.number,
                    error = %e,
                    "Could not fetch reviews, treating pull request as pending"
                );
                false
            }
        };

        if !approved || pull.draft {
            pending.push(pull);
        }
    }

    debug!(repo = %repo, pending = pending.len(), "Computed pending reviews");
    Ok(pending)
}

/// Split a comma separated label list, dropping blanks
pub fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(String::from)
        .collect()
}

pub async fn create_issue(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    issue: NewIssue,
) -> GitMcpResult<Issue> {
    if issue.title.trim().is_empty() {
        return Err(validation_error!("title is required", "title", "operations"));
    }

    tracker.create_issue(&repo.owner, &repo.repo, &issue).await
}

/// Score and bucket up to `limit` open issues
pub async fn analyze_issue_priority(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    limit: Option<u32>,
) -> GitMcpResult<PriorityReport> {
    let limit = limit
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_ANALYSIS_LIMIT)
        .min(MAX_PER_PAGE);

    let issues: Vec<Issue> = tracker
        .list_issues(&repo.owner, &repo.repo, ItemState::Open, limit)
        .await?
        .into_iter()
        .filter(|issue| !issue.is_pull_request())
        .collect();

    Ok(priority::analyze(&issues, Utc::now()))
}
