//! Tests for API clients

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::types::{ItemState, NewIssue};
    use axum::{
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> GitHubApiClient {
        let config = ApiClientConfig {
            base_url,
            access_token: Some("ghp_test".to_string()),
            ..Default::default()
        };
        GitHubApiClient::new(config).unwrap()
    }

    #[test]
    fn test_api_client_config_from_process_config() {
        let github = gitmcp_core::GitHubConfig {
            token: Some("test_token".to_string()),
            api_url: "https://github.example.com/api/v3".to_string(),
            timeout_secs: 5,
        };

        let config = ApiClientConfig::from_github_config(&github);

        assert_eq!(config.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.access_token, Some("test_token".to_string()));
        assert_eq!(config.timeout_seconds, 5);
        assert!(config.user_agent.starts_with("gitmcp/"));
    }

    #[test]
    fn test_invalid_user_agent_is_rejected() {
        let config = ApiClientConfig {
            user_agent: "gitmcp\n".to_string(),
            ..Default::default()
        };
        assert!(GitHubApiClient::new(config).is_err());
    }

    #[tokio::test]
    async fn test_list_issues_sends_state_and_token() {
        let router = Router::new().route(
            "/repos/{owner}/{repo}/issues",
            get(
                |Path((owner, repo)): Path<(String, String)>,
                 Query(params): Query<HashMap<String, String>>,
                 headers: HeaderMap| async move {
                    assert_eq!(owner, "octo");
                    assert_eq!(repo, "cat");
                    assert_eq!(params.get("state").map(String::as_str), Some("closed"));
                    assert_eq!(
                        headers.get("authorization").and_then(|v| v.to_str().ok()),
                        Some("token ghp_test")
                    );
                    Json(json!([
                        {"number": 1, "title": "One", "created_at": "2024-01-01T00:00:00Z"}
                    ]))
                },
            ),
        );
        let client = client_for(spawn_stub(router).await);

        let issues = client
            .list_issues("octo", "cat", ItemState::Closed, 100)
            .await
            .unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "One");
    }

    #[tokio::test]
    async fn test_search_unwraps_items() {
        let router = Router::new().route(
            "/search/issues",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                assert_eq!(
                    params.get("q").map(String::as_str),
                    Some("flaky repo:octo/cat type:issue state:open")
                );
                Json(json!({
                    "total_count": 1,
                    "items": [
                        {"number": 9, "title": "Flaky test", "created_at": "2024-01-01T00:00:00Z"}
                    ]
                }))
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let issues = client
            .search_issues("flaky repo:octo/cat type:issue state:open", 100)
            .await
            .unwrap();

        assert_eq!(issues[0].number, 9);
    }

    #[tokio::test]
    async fn test_create_issue_posts_payload() {
        let router = Router::new().route(
            "/repos/{owner}/{repo}/issues",
            axum::routing::post(|Json(body): Json<Value>| async move {
                assert_eq!(body["title"], "Broken build");
                assert_eq!(body["labels"], json!(["ci"]));
                (
                    StatusCode::CREATED,
                    Json(json!({
                        "number": 77,
                        "title": "Broken build",
                        "state": "open",
                        "html_url": "https://github.com/octo/cat/issues/77",
                        "created_at": "2024-01-01T00:00:00Z"
                    })),
                )
            }),
        );
        let client = client_for(spawn_stub(router).await);

        let created = client
            .create_issue(
                "octo",
                "cat",
                &NewIssue {
                    title: "Broken build".to_string(),
                    labels: vec!["ci".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(created.number, 77);
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let router = Router::new()
            .route(
                "/repos/{owner}/{repo}/pulls",
                get(|| async { (StatusCode::NOT_FOUND, "missing") }),
            )
            .route(
                "/repos/{owner}/{repo}/pulls/{number}/reviews",
                get(|| async { (StatusCode::UNAUTHORIZED, "") }),
            );
        let client = client_for(spawn_stub(router).await);

        let err = client
            .list_pull_requests("octo", "cat", ItemState::Open, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, gitmcp_core::GitMcpError::NotFound { .. }));

        let err = client.list_reviews("octo", "cat", 1).await.unwrap_err();
        match err {
            gitmcp_core::GitMcpError::Repository { context, .. } => {
                assert_eq!(
                    context.recovery_suggestions,
                    vec!["Check your access token".to_string()]
                );
            }
            other => panic!("Expected Repository error, got {other:?}"),
        }
    }
}
