//! Pipeline stages guarding tool execution
//!
//! A [`Stage`] takes ownership of the context and either hands it on or
//! rejects the invocation. A [`Pipeline`] runs its stages left to right and
//! stops at the first rejection.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::claims::ClaimsResolver;
use crate::context::ExecutionContext;
use crate::error::{Forbidden, GateError, Unauthenticated};
use crate::permissions::{Permission, RolePermissionRegistry};

const BEARER_PREFIX: &str = "Bearer ";

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, ctx: ExecutionContext) -> Result<ExecutionContext, GateError>;
}

/// Ordered list of stages
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn run(&self, mut ctx: ExecutionContext) -> Result<ExecutionContext, GateError> {
        for stage in &self.stages {
            ctx = stage.apply(ctx).await?;
        }
        Ok(ctx)
    }
}

/// Extract the bearer token from request headers
pub fn bearer_token(ctx: &ExecutionContext) -> Result<&str, Unauthenticated> {
    let header = ctx
        .headers()
        .get(AUTHORIZATION)
        .ok_or(Unauthenticated::NoHeader)?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(Unauthenticated::BadFormat)
}

/// Verifies the bearer token and attaches the resulting identity
#[derive(Clone)]
pub struct AuthenticationGate {
    resolver: Arc<ClaimsResolver>,
}

impl AuthenticationGate {
    pub fn new(resolver: Arc<ClaimsResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Stage for AuthenticationGate {
    fn name(&self) -> &'static str {
        "authentication"
    }

    async fn apply(&self, ctx: ExecutionContext) -> Result<ExecutionContext, GateError> {
        // Identities only ever enter a context through this gate
        if ctx.identity().is_some() {
            return Ok(ctx);
        }

        let token = bearer_token(&ctx)?;
        let identity = self.resolver.resolve(&ctx, token).await.map_err(|e| {
            warn!(request_id = %ctx.request_id(), error = %e, "Token rejected");
            Unauthenticated::Claims(e)
        })?;

        debug!(
            request_id = %ctx.request_id(),
            subject = %identity.subject,
            roles = ?identity.roles,
            "Caller authenticated"
        );

        if ctx.attach_identity(identity).is_err() {
            warn!(request_id = %ctx.request_id(), "Identity already attached");
        }

        Ok(ctx)
    }
}

/// Requires the attached identity to hold one permission
#[derive(Clone, Copy)]
pub struct AuthorizationGate {
    required: Permission,
    registry: &'static RolePermissionRegistry,
}

impl AuthorizationGate {
    pub fn new(required: Permission) -> Self {
        Self::with_registry(required, RolePermissionRegistry::global())
    }

    pub fn with_registry(required: Permission, registry: &'static RolePermissionRegistry) -> Self {
        Self { required, registry }
    }

    pub fn required(&self) -> Permission {
        self.required
    }
}

#[async_trait]
impl Stage for AuthorizationGate {
    fn name(&self) -> &'static str {
        "authorization"
    }

    async fn apply(&self, ctx: ExecutionContext) -> Result<ExecutionContext, GateError> {
        let Some(identity) = ctx.identity() else {
            return Err(Forbidden::NotAuthenticated.into());
        };

        if !self.registry.has_permission(&identity.roles, self.required) {
            warn!(
                request_id = %ctx.request_id(),
                subject = %identity.subject,
                permission = %self.required,
                "Permission denied"
            );
            return Err(Forbidden::PermissionDenied {
                required: self.required,
                subject: identity.subject.clone(),
            }
            .into());
        }

        Ok(ctx)
    }
}
