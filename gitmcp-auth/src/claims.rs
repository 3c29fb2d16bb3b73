//! Bearer token to identity resolution
//!
//! Claims are gathered by a fixed sequence of [`ClaimsSource`]s. The inline
//! source decodes the token payload; the userinfo source asks the identity
//! provider. Later sources run only while no roles have been found, and the
//! claims they return overwrite earlier values field by field.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE, Engine};
use gitmcp_core::{ErrorContext, GitMcpError, GitMcpResult, SecurityConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::context::ExecutionContext;
use crate::error::AuthError;
use crate::identity::{Claims, Identity};

/// Client identifier roles are nested under when none is configured
pub const DEFAULT_CLAIMS_CLIENT_ID: &str = "mcp-client";

/// One strategy for obtaining claims for a bearer token
#[async_trait]
pub trait ClaimsSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, ctx: &ExecutionContext, token: &str) -> Result<Claims, AuthError>;
}

/// Decodes the payload segment of a three segment signed token
///
/// The signature is not checked here.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineTokenSource;

impl InlineTokenSource {
    pub fn decode(token: &str) -> Result<Claims, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(AuthError::InvalidTokenFormat);
        };

        let mut payload = payload.to_string();
        let remainder = payload.len() % 4;
        if remainder > 0 {
            payload.push_str(&"=".repeat(4 - remainder));
        }

        let bytes = URL_SAFE
            .decode(payload.as_bytes())
            .map_err(|e| AuthError::MalformedClaims {
                reason: format!("failed to decode token payload: {}", e),
            })?;

        serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedClaims {
            reason: format!("failed to parse token payload: {}", e),
        })
    }
}

#[async_trait]
impl ClaimsSource for InlineTokenSource {
    fn name(&self) -> &'static str {
        "inline"
    }

    async fn fetch(&self, _ctx: &ExecutionContext, token: &str) -> Result<Claims, AuthError> {
        Self::decode(token)
    }
}

/// Queries the identity provider's userinfo endpoint with the caller's token
#[derive(Debug, Clone)]
pub struct UserInfoSource {
    client: reqwest::Client,
    url: String,
}

impl UserInfoSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> GitMcpResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GitMcpError::Network {
                message: format!("Failed to create userinfo client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("claims").with_operation("create_userinfo_client"),
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &SecurityConfig) -> GitMcpResult<Self> {
        Self::new(config.userinfo_url(), config.userinfo_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, token: &str) -> Result<Claims, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::ClaimsUnavailable {
                reason: format!("failed to get user info: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ClaimsUnavailable {
                reason: format!("userinfo endpoint returned {}", status),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::ClaimsUnavailable {
                reason: format!("failed to read user info: {}", e),
            })?;

        serde_json::from_slice(&body).map_err(|e| AuthError::MalformedClaims {
            reason: format!("failed to decode user info: {}", e),
        })
    }
}

#[async_trait]
impl ClaimsSource for UserInfoSource {
    fn name(&self) -> &'static str {
        "userinfo"
    }

    async fn fetch(&self, ctx: &ExecutionContext, token: &str) -> Result<Claims, AuthError> {
        let cancelled = || AuthError::ClaimsUnavailable {
            reason: "request cancelled".to_string(),
        };

        if ctx.is_cancelled() {
            return Err(cancelled());
        }

        tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => Err(cancelled()),
            result = self.request(token) => result,
        }
    }
}

struct CachedIdentity {
    identity: Identity,
    expires_at: Instant,
}

/// Short lived map from token to resolved identity
pub struct IdentityCache {
    entries: Mutex<HashMap<String, CachedIdentity>>,
    ttl: Duration,
}

impl IdentityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, token: &str) -> Option<Identity> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(token) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.identity.clone()),
            Some(_) => {
                entries.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, token: &str, identity: Identity) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            token.to_string(),
            CachedIdentity {
                identity,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the claims sources in order and produces an [`Identity`]
pub struct ClaimsResolver {
    sources: Vec<Arc<dyn ClaimsSource>>,
    client_id: String,
    cache: Option<IdentityCache>,
}

impl ClaimsResolver {
    pub fn new(sources: Vec<Arc<dyn ClaimsSource>>, client_id: impl Into<String>) -> Self {
        Self {
            sources,
            client_id: client_id.into(),
            cache: None,
        }
    }

    /// Inline decoding followed by the userinfo fallback, as configured
    pub fn from_config(config: &SecurityConfig) -> GitMcpResult<Self> {
        let sources: Vec<Arc<dyn ClaimsSource>> = vec![
            Arc::new(InlineTokenSource),
            Arc::new(UserInfoSource::from_config(config)?),
        ];

        let resolver = Self::new(sources, config.claims_client_id.clone());
        Ok(match config.identity_cache_ttl() {
            Some(ttl) => resolver.with_cache(ttl),
            None => resolver,
        })
    }

    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(IdentityCache::new(ttl));
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub async fn resolve(
        &self,
        ctx: &ExecutionContext,
        token: &str,
    ) -> Result<Identity, AuthError> {
        if let Some(identity) = self.cache.as_ref().and_then(|cache| cache.get(token)) {
            debug!(subject = %identity.subject, "Identity served from cache");
            return Ok(identity);
        }

        let mut claims = Claims::default();
        for source in &self.sources {
            if !claims.roles_for(&self.client_id).is_empty() {
                break;
            }

            debug!(source = source.name(), request_id = %ctx.request_id(), "Fetching claims");
            match source.fetch(ctx, token).await {
                Ok(fetched) => claims.merge(fetched),
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Claims source failed");
                    return Err(e);
                }
            }
        }

        let identity = claims.into_identity(&self.client_id);
        if identity.roles.is_empty() {
            return Err(AuthError::NoRolesFound);
        }

        if let Some(cache) = &self.cache {
            cache.insert(token, identity.clone());
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{token_with, StaticSource};
    use reqwest::header::HeaderMap;
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(HeaderMap::new())
    }

    fn userinfo_roles(roles: &[&str]) -> Claims {
        Claims {
            sub: Some("from-userinfo".to_string()),
            roles: Some(roles.iter().map(|r| r.to_string()).collect()),
            ..Default::default()
        }
    }

    fn resolver_with(fallback: Arc<StaticSource>) -> ClaimsResolver {
        let sources: Vec<Arc<dyn ClaimsSource>> = vec![Arc::new(InlineTokenSource), fallback];
        ClaimsResolver::new(sources, DEFAULT_CLAIMS_CLIENT_ID)
    }

    #[test]
    fn test_segment_count_is_enforced() {
        for token in ["", "opaque-token", "a.b", "a.b.c.d"] {
            assert_eq!(
                InlineTokenSource::decode(token),
                Err(AuthError::InvalidTokenFormat),
                "token {token:?}"
            );
        }
    }

    #[test]
    fn test_payload_must_decode_to_claims() {
        assert!(matches!(
            InlineTokenSource::decode("a.%%%%.c"),
            Err(AuthError::MalformedClaims { .. })
        ));

        let not_json = format!("a.{}.c", URL_SAFE.encode("not json"));
        assert!(matches!(
            InlineTokenSource::decode(&not_json),
            Err(AuthError::MalformedClaims { .. })
        ));

        let not_object = token_with(json!([1, 2, 3]));
        assert!(matches!(
            InlineTokenSource::decode(&not_object),
            Err(AuthError::MalformedClaims { .. })
        ));
    }

    #[test]
    fn test_unpadded_payload_is_repadded() {
        // Payload lengths needing zero, one and two padding characters
        for sub in ["a", "ab", "abc"] {
            let claims = InlineTokenSource::decode(&token_with(json!({"sub": sub}))).unwrap();
            assert_eq!(claims.sub.as_deref(), Some(sub));
        }
    }

    #[tokio::test]
    async fn test_in_token_roles_skip_fallback() {
        let fallback = StaticSource::new(Ok(userinfo_roles(&["viewer"])));
        let resolver = resolver_with(fallback.clone());
        let token = token_with(json!({
            "sub": "u-1",
            "preferred_username": "ada",
            "email": "ada@example.com",
            "resource_access": {"mcp-client": {"roles": ["admin"]}}
        }));

        let identity = resolver.resolve(&ctx(), &token).await.unwrap();

        assert_eq!(identity.subject, "u-1");
        assert_eq!(identity.username, "ada");
        assert!(identity.has_role("admin"));
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_runs_once_and_overwrites() {
        let fallback = StaticSource::new(Ok(userinfo_roles(&["user"])));
        let resolver = resolver_with(fallback.clone());
        let token = token_with(json!({"sub": "u-1", "email": "ada@example.com"}));

        let identity = resolver.resolve(&ctx(), &token).await.unwrap();

        assert_eq!(fallback.calls(), 1);
        assert_eq!(identity.subject, "from-userinfo");
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.has_role("user"));
    }

    #[tokio::test]
    async fn test_no_roles_anywhere() {
        let fallback = StaticSource::new(Ok(Claims::default()));
        let resolver = resolver_with(fallback);

        let err = resolver
            .resolve(&ctx(), &token_with(json!({"sub": "u-1"})))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::NoRolesFound);
    }

    #[tokio::test]
    async fn test_fallback_errors_propagate() {
        let fallback = StaticSource::new(Err(AuthError::ClaimsUnavailable {
            reason: "down".to_string(),
        }));
        let resolver = resolver_with(fallback);

        let err = resolver
            .resolve(&ctx(), &token_with(json!({"sub": "u-1"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ClaimsUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_bad_token_never_reaches_fallback() {
        let fallback = StaticSource::new(Ok(userinfo_roles(&["admin"])));
        let resolver = resolver_with(fallback.clone());

        let err = resolver.resolve(&ctx(), "opaque").await.unwrap_err();

        assert_eq!(err, AuthError::InvalidTokenFormat);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_short_circuits_sources() {
        let fallback = StaticSource::new(Ok(userinfo_roles(&["viewer"])));
        let resolver = resolver_with(fallback.clone()).with_cache(Duration::from_secs(60));
        let token = token_with(json!({"sub": "u-1"}));

        let first = resolver.resolve(&ctx(), &token).await.unwrap();
        let second = resolver.resolve(&ctx(), &token).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_entries_are_dropped() {
        let cache = IdentityCache::new(Duration::ZERO);
        cache.insert(
            "t",
            Identity {
                subject: "s".to_string(),
                username: String::new(),
                email: String::new(),
                roles: Default::default(),
            },
        );

        assert!(cache.get("t").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_userinfo_respects_cancellation() {
        let source = UserInfoSource::new("http://127.0.0.1:9/userinfo", Duration::from_secs(1))
            .unwrap();
        let ctx = ctx();
        ctx.cancellation().cancel();

        let err = source.fetch(&ctx, "a.b.c").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::ClaimsUnavailable {
                reason: "request cancelled".to_string()
            }
        );
    }

    #[test]
    fn test_userinfo_url_from_config() {
        let config = SecurityConfig {
            keycloak_url: "https://sso.example.com/".to_string(),
            keycloak_realm: "eng".to_string(),
            ..Default::default()
        };

        let source = UserInfoSource::from_config(&config).unwrap();
        assert_eq!(
            source.url(),
            "https://sso.example.com/realms/eng/protocol/openid-connect/userinfo"
        );
    }
}
