//! Integration tests for gitmcp-core infrastructure

use gitmcp_core::{
    config_error, repository_error, validation_error, AppConfig, ErrorContext, GitMcpError,
    LogFormat, TransportKind,
};
use std::io::Write;

#[test]
fn test_error_handling() {
    let error = repository_error!("Test repository error", "test_component");

    match &error {
        GitMcpError::Repository {
            message, context, ..
        } => {
            assert_eq!(message, "Test repository error");
            assert_eq!(context.component, "test_component");
            assert!(!context.error_id.is_empty());
        }
        _ => panic!("Expected Repository error"),
    }

    // Should not panic without a subscriber
    error.log();

    let rate_limited = GitMcpError::RateLimit {
        message: "Slow down".to_string(),
        retry_after_ms: Some(1000),
        context: ErrorContext::new("test"),
    };
    rate_limited.log();
    assert!(rate_limited.context().is_some());

    let config_error = config_error!("Invalid config", "test");
    assert!(config_error.to_string().starts_with("Configuration error"));
    assert!(GitMcpError::Io(std::io::Error::other("boom")).context().is_none());
}

#[test]
fn test_validation_error_keeps_field() {
    let error = validation_error!("Bad owner", "owner", "tools");

    match error {
        GitMcpError::Validation { field, context, .. } => {
            assert_eq!(field.as_deref(), Some("owner"));
            assert!(!context.recovery_suggestions.is_empty());
        }
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_error_context_builder() {
    let context = ErrorContext::new("github")
        .with_operation("list_issues")
        .with_metadata("repo", "octo/cat")
        .with_suggestion("Check the token");

    assert_eq!(context.component, "github");
    assert_eq!(context.operation.as_deref(), Some("list_issues"));
    assert_eq!(context.metadata.get("repo").map(String::as_str), Some("octo/cat"));
    assert_eq!(context.recovery_suggestions.len(), 1);
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[security]
keycloak_url = "https://sso.example.com"
keycloak_realm = "engineering"
oauth_client_id = "gitmcp"
oauth_client_secret = "s3cret"
identity_cache_ttl_secs = 60

[server]
transport = "http"
port = 9100

[logging]
level = "debug"
format = "json"
"#
    )
    .unwrap();

    let config = AppConfig::from_file(file.path()).unwrap();

    assert_eq!(config.security.keycloak_realm, "engineering");
    assert_eq!(config.security.claims_client_id, "mcp-client");
    assert_eq!(config.server.transport, TransportKind::Http);
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.github.api_url, "https://api.github.com");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_missing_file() {
    let error = AppConfig::from_file("/definitely/not/here.toml").unwrap_err();

    match error {
        GitMcpError::Config { context, .. } => {
            assert_eq!(context.operation.as_deref(), Some("read_file"));
        }
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[test]
fn test_config_from_invalid_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[security\nbroken").unwrap();

    let error = AppConfig::from_file(file.path()).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config"));
}
