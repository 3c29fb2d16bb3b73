//! Request scoped execution context
//!
//! One context is created per tool invocation and travels through the gate
//! pipeline by value. The identity slot can be filled once; later attempts are
//! refused.

use crate::identity::Identity;
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    request_id: Uuid,
    headers: HeaderMap,
    cancellation: CancellationToken,
    identity: OnceLock<Identity>,
    /// Free form annotations; never consulted for access decisions
    pub metadata: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new(headers: HeaderMap) -> Self {
        Self::with_cancellation(headers, CancellationToken::new())
    }

    /// Create a context tied to the transport's cancellation signal
    pub fn with_cancellation(headers: HeaderMap, cancellation: CancellationToken) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            headers,
            cancellation,
            identity: OnceLock::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Identity attached by the authentication gate, if any
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach the verified identity; hands it back if one is already present
    pub(crate) fn attach_identity(&self, identity: Identity) -> Result<(), Identity> {
        self.identity.set(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn identity(subject: &str) -> Identity {
        Identity {
            subject: subject.to_string(),
            username: String::new(),
            email: String::new(),
            roles: BTreeSet::from(["viewer".to_string()]),
        }
    }

    #[test]
    fn test_identity_is_write_once() {
        let ctx = ExecutionContext::new(HeaderMap::new());
        assert!(ctx.identity().is_none());

        ctx.attach_identity(identity("first")).unwrap();
        let rejected = ctx.attach_identity(identity("second")).unwrap_err();

        assert_eq!(rejected.subject, "second");
        assert_eq!(ctx.identity().unwrap().subject, "first");
    }

    #[test]
    fn test_contexts_get_distinct_request_ids() {
        let a = ExecutionContext::new(HeaderMap::new());
        let b = ExecutionContext::new(HeaderMap::new());
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_cancellation_is_shared_with_transport() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::with_cancellation(HeaderMap::new(), token.clone());

        token.cancel();
        assert!(ctx.is_cancelled());
    }
}
