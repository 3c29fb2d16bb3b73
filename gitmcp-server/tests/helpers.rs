//! Shared fixtures for the server integration tests
//!
//! Tokens are plain strings naming the caller's roles, for example
//! `"viewer"` or `"user,viewer"`. `"none"` yields a roleless identity and
//! `"garbage"` is rejected as malformed.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gitmcp_auth::{AuthError, Claims, ClaimsResolver, ClaimsSource, ExecutionContext};
use gitmcp_core::{AppConfig, GitMcpResult};
use gitmcp_repo::{IssueTracker, ItemState, Label, NewIssue, PullRequest, Reactions, Review};
use gitmcp_server::AppState;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

// Tracing is initialised once per test binary
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let level = if std::env::var("TEST_LOG").is_ok() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
});

/// Claims source that reads roles straight out of the token
pub struct RolesInToken;

#[async_trait]
impl ClaimsSource for RolesInToken {
    fn name(&self) -> &'static str {
        "roles-in-token"
    }

    async fn fetch(&self, _ctx: &ExecutionContext, token: &str) -> Result<Claims, AuthError> {
        if token == "garbage" {
            return Err(AuthError::InvalidTokenFormat);
        }

        let roles = token
            .split(',')
            .filter(|role| *role != "none")
            .map(String::from)
            .collect();
        Ok(Claims {
            sub: Some(format!("sub-{}", token)),
            preferred_username: Some("ada".to_string()),
            email: Some("ada@example.com".to_string()),
            roles: Some(roles),
            ..Default::default()
        })
    }
}

pub fn issue(number: u64, title: &str, comments: u64, reactions: u64) -> gitmcp_repo::Issue {
    gitmcp_repo::Issue {
        number,
        title: title.to_string(),
        body: None,
        state: "open".to_string(),
        html_url: format!("https://github.com/octo/cat/issues/{}", number),
        comments,
        reactions: Some(Reactions {
            total_count: reactions,
        }),
        labels: Vec::new(),
        created_at: Utc::now(),
        user: None,
        pull_request: None,
    }
}

fn pull(number: u64, title: &str, draft: bool) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        state: "open".to_string(),
        html_url: format!("https://github.com/octo/cat/pull/{}", number),
        draft,
        created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()),
        user: None,
    }
}

/// In-memory tracker with a small fixed repository
pub struct FakeTracker {
    pub created: Mutex<Vec<NewIssue>>,
    pub queries: Mutex<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FakeTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn list_issues(
        &self,
        _owner: &str,
        _repo: &str,
        _state: ItemState,
        _per_page: u32,
    ) -> GitMcpResult<Vec<gitmcp_repo::Issue>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut critical = issue(1, "Crash when saving", 12, 3);
        critical.labels.push(Label {
            name: "P0".to_string(),
        });
        let mut pr_backed = issue(2, "Add feature", 0, 0);
        pr_backed.pull_request = Some(json!({"url": "https://api.github.com/pulls/2"}));

        Ok(vec![critical, pr_backed, issue(3, "Typo in README", 0, 0)])
    }

    async fn list_pull_requests(
        &self,
        _owner: &str,
        _repo: &str,
        _state: ItemState,
        _per_page: u32,
    ) -> GitMcpResult<Vec<PullRequest>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            pull(10, "Refactor parser", false),
            pull(11, "Approved change", false),
            pull(12, "Work in progress", true),
        ])
    }

    async fn search_issues(
        &self,
        query: &str,
        _per_page: u32,
    ) -> GitMcpResult<Vec<gitmcp_repo::Issue>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        Ok(vec![issue(5, "Minor crash", 1, 0), issue(6, "Crash on start", 9, 6)])
    }

    async fn list_reviews(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> GitMcpResult<Vec<Review>> {
        let state = if number == 11 { "APPROVED" } else { "COMMENTED" };
        Ok(vec![Review {
            id: number * 100,
            state: state.to_string(),
            user: None,
        }])
    }

    async fn create_issue(
        &self,
        _owner: &str,
        _repo: &str,
        new_issue: &NewIssue,
    ) -> GitMcpResult<gitmcp_repo::Issue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(new_issue.clone());
        Ok(issue(99, &new_issue.title, 0, 0))
    }
}

/// Application state backed by [`RolesInToken`] and a [`FakeTracker`]
pub fn test_state() -> (AppState, Arc<FakeTracker>) {
    LazyLock::force(&TRACING);

    let sources: Vec<Arc<dyn ClaimsSource>> = vec![Arc::new(RolesInToken)];
    let resolver = Arc::new(ClaimsResolver::new(sources, "mcp-client"));
    let tracker = FakeTracker::new();

    let mut config = AppConfig::default();
    config.security.allowed_origins = vec!["http://localhost:8081".to_string()];

    (AppState::with_parts(config, resolver, tracker.clone()), tracker)
}

pub fn rpc(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

pub fn call(id: u64, tool: &str, arguments: Value) -> Value {
    rpc(id, "tools/call", json!({"name": tool, "arguments": arguments}))
}
