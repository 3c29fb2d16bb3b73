//! Configuration management
//!
//! Configuration comes from environment variables, an optional TOML file, and
//! command line overrides applied by the binary.

use crate::error::{ErrorContext, GitMcpError, GitMcpResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Identity provider and token verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Base URL of the identity provider (Keycloak compatible)
    pub keycloak_url: String,
    /// Realm (tenant) on the identity provider
    pub keycloak_realm: String,
    /// OAuth client id, used by the token issuance flow
    pub oauth_client_id: String,
    /// OAuth client secret, used by the token issuance flow
    pub oauth_client_secret: String,
    /// Client identifier under which roles are nested in `resource_access`
    pub claims_client_id: String,
    /// Timeout for the userinfo fallback request
    pub userinfo_timeout_secs: u64,
    /// Lifetime of cached identities, 0 disables the cache
    pub identity_cache_ttl_secs: u64,
    /// Origins allowed by the HTTP transport
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            keycloak_url: "http://localhost:8080".to_string(),
            keycloak_realm: "mcp-realm".to_string(),
            oauth_client_id: String::new(),
            oauth_client_secret: String::new(),
            claims_client_id: "mcp-client".to_string(),
            userinfo_timeout_secs: 10,
            identity_cache_ttl_secs: 0,
            allowed_origins: vec!["http://localhost:8081".to_string()],
        }
    }
}

impl SecurityConfig {
    /// Userinfo endpoint of the configured realm
    pub fn userinfo_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/userinfo",
            self.keycloak_url.trim_end_matches('/'),
            self.keycloak_realm
        )
    }

    pub fn userinfo_timeout(&self) -> Duration {
        Duration::from_secs(self.userinfo_timeout_secs)
    }

    pub fn identity_cache_ttl(&self) -> Option<Duration> {
        (self.identity_cache_ttl_secs > 0)
            .then(|| Duration::from_secs(self.identity_cache_ttl_secs))
    }
}

/// GitHub API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Access token for the GitHub API
    pub token: Option<String>,
    /// Base URL for the API
    pub api_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Transport the server speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Newline delimited JSON-RPC over stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Stdio => write!(f, "stdio"),
            TransportKind::Http => write!(f, "http"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "http" => Ok(TransportKind::Http),
            _ => Err(format!("Unknown transport: {}", s)),
        }
    }
}

/// Server process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
    /// Bearer token presented on every stdio tool call
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Stdio,
            host: "127.0.0.1".to_string(),
            port: 8081,
            auth_token: None,
        }
    }
}

impl ServerConfig {
    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Complete process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub security: SecurityConfig,
    pub github: GitHubConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> GitMcpResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Empty values count as unset. A value that does not parse is an error
    /// naming the variable.
    pub fn from_lookup<F>(lookup: F) -> GitMcpResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config = Self::default();

        if let Some(value) = get("KEYCLOAK_URL") {
            config.security.keycloak_url = value;
        }
        if let Some(value) = get("KEYCLOAK_REALM") {
            config.security.keycloak_realm = value;
        }
        if let Some(value) = get("OAUTH_CLIENT_ID") {
            config.security.oauth_client_id = value;
        }
        if let Some(value) = get("OAUTH_CLIENT_SECRET") {
            config.security.oauth_client_secret = value;
        }
        if let Some(value) = get("GITMCP_CLAIMS_CLIENT_ID") {
            config.security.claims_client_id = value;
        }
        if let Some(value) = get("GITMCP_USERINFO_TIMEOUT_SECS") {
            config.security.userinfo_timeout_secs =
                Self::parse_var("GITMCP_USERINFO_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("GITMCP_IDENTITY_CACHE_TTL_SECS") {
            config.security.identity_cache_ttl_secs =
                Self::parse_var("GITMCP_IDENTITY_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = get("ALLOWED_ORIGINS") {
            config.security.allowed_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect();
        }

        config.github.token = get("GITHUB_TOKEN");
        if let Some(value) = get("GITHUB_API_URL") {
            config.github.api_url = value;
        }

        if let Some(value) = get("GITMCP_TRANSPORT") {
            config.server.transport = Self::parse_var("GITMCP_TRANSPORT", &value)?;
        }
        if let Some(value) = get("SERVER_HOST") {
            config.server.host = value;
        }
        if let Some(value) = get("SERVER_PORT") {
            config.server.port = Self::parse_var("SERVER_PORT", &value)?;
        }
        config.server.auth_token = get("MCP_AUTH_TOKEN");

        Ok(config)
    }

    fn parse_var<T>(key: &str, value: &str) -> GitMcpResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        value.parse().map_err(|e| GitMcpError::Config {
            message: format!("Invalid value '{}' for {}: {}", value, key, e),
            source: None,
            context: ErrorContext::new("config")
                .with_operation("from_env")
                .with_metadata("variable", key)
                .with_suggestion(&format!("Fix or unset {}", key)),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> GitMcpResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GitMcpError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        toml::from_str(&content).map_err(|e| GitMcpError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> GitMcpResult<()> {
        if self.security.oauth_client_id.is_empty() {
            return Err(Self::invalid(
                "OAuth client ID is required",
                "Set OAUTH_CLIENT_ID",
            ));
        }

        if self.security.oauth_client_secret.is_empty() {
            return Err(Self::invalid(
                "OAuth client secret is required",
                "Set OAUTH_CLIENT_SECRET",
            ));
        }

        if self.security.keycloak_realm.trim().is_empty() {
            return Err(Self::invalid(
                "Identity provider realm must not be empty",
                "Set KEYCLOAK_REALM",
            ));
        }

        if self.security.userinfo_timeout_secs == 0 {
            return Err(Self::invalid(
                "Userinfo timeout must be greater than 0",
                "Set GITMCP_USERINFO_TIMEOUT_SECS to a positive value",
            ));
        }

        if self.github.timeout_secs == 0 {
            return Err(Self::invalid(
                "GitHub timeout must be greater than 0",
                "Set github.timeout_secs to a positive value",
            ));
        }

        for (field, value) in [
            ("security.keycloak_url", &self.security.keycloak_url),
            ("github.api_url", &self.github.api_url),
        ] {
            url::Url::parse(value).map_err(|e| GitMcpError::Config {
                message: format!("Invalid URL for {}: {}", field, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_metadata("field", field),
            })?;
        }

        Ok(())
    }

    fn invalid(message: &str, suggestion: &str) -> GitMcpError {
        GitMcpError::Config {
            message: message.to_string(),
            source: None,
            context: ErrorContext::new("config")
                .with_operation("validate")
                .with_suggestion(suggestion),
        }
    }
}
