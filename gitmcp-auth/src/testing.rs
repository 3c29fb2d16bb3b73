//! Shared fixtures for unit tests

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::claims::{ClaimsResolver, ClaimsSource, DEFAULT_CLAIMS_CLIENT_ID};
use crate::context::ExecutionContext;
use crate::error::AuthError;
use crate::identity::Claims;

/// Unsigned three segment token carrying `payload`
pub(crate) fn token_with(payload: serde_json::Value) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload.to_string()),
    )
}

pub(crate) fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

/// Source returning canned claims and counting calls
pub(crate) struct StaticSource {
    claims: Result<Claims, AuthError>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn new(claims: Result<Claims, AuthError>) -> Arc<Self> {
        Arc::new(Self {
            claims,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn with_roles(roles: &[&str]) -> Arc<Self> {
        Self::new(Ok(Claims {
            sub: Some("subject-1".to_string()),
            preferred_username: Some("ada".to_string()),
            email: Some("ada@example.com".to_string()),
            roles: Some(roles.iter().map(|r| r.to_string()).collect()),
            ..Default::default()
        }))
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClaimsSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, _ctx: &ExecutionContext, _token: &str) -> Result<Claims, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.claims.clone()
    }
}

/// Resolver whose only source is `source`
pub(crate) fn resolver_from(source: Arc<StaticSource>) -> Arc<ClaimsResolver> {
    let sources: Vec<Arc<dyn ClaimsSource>> = vec![source];
    Arc::new(ClaimsResolver::new(sources, DEFAULT_CLAIMS_CLIENT_ID))
}
