//! Permission gated tool dispatch
//!
//! [`Dispatcher::protect`] wraps a [`ToolHandler`] in the fixed pipeline
//! authentication then authorization. Each invocation walks a small state
//! machine whose transitions are traced at debug level.

use async_trait::async_trait;
use gitmcp_core::{performance, GitMcpError};
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::claims::ClaimsResolver;
use crate::context::ExecutionContext;
use crate::error::GateError;
use crate::gates::{AuthenticationGate, AuthorizationGate, Pipeline};
use crate::permissions::{Permission, RolePermissionRegistry};

/// Inbound tool call
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub name: String,
    pub arguments: Value,
    pub headers: HeaderMap,
    pub cancellation: CancellationToken,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: Value, headers: HeaderMap) -> Self {
        Self {
            name: name.into(),
            arguments,
            headers,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Successful tool result
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Option<Value>,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
        }
    }

    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured = Some(value);
        self
    }
}

/// Failure raised by a tool handler itself
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Upstream(#[from] GitMcpError),
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &ExecutionContext, arguments: Value)
        -> Result<ToolOutput, ToolError>;
}

/// Why a protected invocation did not produce output
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Rejected(#[from] GateError),

    #[error("tool failed: {0}")]
    Handler(#[from] ToolError),
}

impl InvocationError {
    pub fn gate_error(&self) -> Option<&GateError> {
        match self {
            InvocationError::Rejected(e) => Some(e),
            InvocationError::Handler(_) => None,
        }
    }
}

/// Lifecycle of a single protected invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Start,
    Authenticating,
    AuthFailed,
    Authenticated,
    Authorizing,
    Forbidden,
    Authorized,
    Executing,
    HandlerError,
    Done,
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InvocationState::AuthFailed
                | InvocationState::Forbidden
                | InvocationState::HandlerError
                | InvocationState::Done
        )
    }

    /// Whether `next` directly follows `self`
    pub fn can_advance_to(&self, next: InvocationState) -> bool {
        use InvocationState::*;

        matches!(
            (self, next),
            (Start, Authenticating)
                | (Authenticating, AuthFailed)
                | (Authenticating, Authenticated)
                | (Authenticated, Authorizing)
                | (Authorizing, Forbidden)
                | (Authorizing, Authorized)
                | (Authorized, Executing)
                | (Executing, HandlerError)
                | (Executing, Done)
        )
    }
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InvocationState::Start => "START",
            InvocationState::Authenticating => "AUTHENTICATING",
            InvocationState::AuthFailed => "AUTH_FAILED",
            InvocationState::Authenticated => "AUTHENTICATED",
            InvocationState::Authorizing => "AUTHORIZING",
            InvocationState::Forbidden => "FORBIDDEN",
            InvocationState::Authorized => "AUTHORIZED",
            InvocationState::Executing => "EXECUTING",
            InvocationState::HandlerError => "HANDLER_ERROR",
            InvocationState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one invocation
struct Invocation<'a> {
    tool: &'a str,
    request_id: uuid::Uuid,
    state: InvocationState,
}

impl<'a> Invocation<'a> {
    fn new(tool: &'a str, request_id: uuid::Uuid) -> Self {
        Self {
            tool,
            request_id,
            state: InvocationState::Start,
        }
    }

    fn advance(&mut self, next: InvocationState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(
            tool = self.tool,
            request_id = %self.request_id,
            from = %self.state,
            state = %next,
            "Invocation transition"
        );
        self.state = next;
    }
}

/// A handler reachable only through the gate pipeline
#[derive(Clone)]
pub struct ProtectedTool {
    name: String,
    required: Permission,
    authentication: Pipeline,
    authorization: Pipeline,
    handler: Arc<dyn ToolHandler>,
}

impl ProtectedTool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_permission(&self) -> Permission {
        self.required
    }

    pub async fn invoke(&self, request: ToolRequest) -> Result<ToolOutput, InvocationError> {
        let ctx = ExecutionContext::with_cancellation(request.headers, request.cancellation);
        let mut invocation = Invocation::new(&self.name, ctx.request_id());

        invocation.advance(InvocationState::Authenticating);
        let ctx = match self.authentication.run(ctx).await {
            Ok(ctx) => ctx,
            Err(e) => {
                invocation.advance(InvocationState::AuthFailed);
                return Err(e.into());
            }
        };
        invocation.advance(InvocationState::Authenticated);

        invocation.advance(InvocationState::Authorizing);
        let ctx = match self.authorization.run(ctx).await {
            Ok(ctx) => ctx,
            Err(e) => {
                invocation.advance(InvocationState::Forbidden);
                return Err(e.into());
            }
        };
        invocation.advance(InvocationState::Authorized);

        invocation.advance(InvocationState::Executing);
        let subject = ctx
            .identity()
            .map(|identity| identity.subject.clone())
            .unwrap_or_default();
        let result =
            performance::measure_async(&self.name, self.handler.call(&ctx, request.arguments))
                .await;

        match result {
            Ok(output) => {
                invocation.advance(InvocationState::Done);
                info!(tool = %self.name, subject = %subject, "Tool call completed");
                Ok(output)
            }
            Err(e) => {
                invocation.advance(InvocationState::HandlerError);
                info!(tool = %self.name, subject = %subject, error = %e, "Tool call failed");
                Err(e.into())
            }
        }
    }
}

/// Builds protected tools that share one claims resolver
#[derive(Clone)]
pub struct Dispatcher {
    resolver: Arc<ClaimsResolver>,
    registry: &'static RolePermissionRegistry,
}

impl Dispatcher {
    pub fn new(resolver: Arc<ClaimsResolver>) -> Self {
        Self {
            resolver,
            registry: RolePermissionRegistry::global(),
        }
    }

    pub fn with_registry(mut self, registry: &'static RolePermissionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &'static RolePermissionRegistry {
        self.registry
    }

    /// Guard `handler` with authentication and a `required` permission check
    pub fn protect(
        &self,
        name: impl Into<String>,
        required: Permission,
        handler: Arc<dyn ToolHandler>,
    ) -> ProtectedTool {
        ProtectedTool {
            name: name.into(),
            required,
            authentication: Pipeline::new().then(AuthenticationGate::new(self.resolver.clone())),
            authorization: Pipeline::new()
                .then(AuthorizationGate::with_registry(required, self.registry)),
            handler,
        }
    }
}
