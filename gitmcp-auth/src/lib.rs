//! gitmcp auth - bearer token authentication and role based authorization
//!
//! The crate turns an inbound request's `Authorization` header into a verified
//! [`Identity`], checks it against the [`RolePermissionRegistry`], and only
//! then runs the tool handler:
//!
//! ```text
//! request -> AuthenticationGate -> AuthorizationGate(permission) -> handler
//! ```
//!
//! Any gate rejection short-circuits the invocation with a [`GateError`].

pub mod claims;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod gates;
pub mod identity;
pub mod permissions;

#[cfg(test)]
pub(crate) mod testing;

pub use claims::{
    ClaimsResolver, ClaimsSource, IdentityCache, InlineTokenSource, UserInfoSource,
    DEFAULT_CLAIMS_CLIENT_ID,
};
pub use context::ExecutionContext;
pub use dispatcher::{
    Dispatcher, InvocationError, InvocationState, ProtectedTool, ToolError, ToolHandler,
    ToolOutput, ToolRequest,
};
pub use error::{AuthError, Forbidden, GateError, RoleError, Unauthenticated};
pub use gates::{bearer_token, AuthenticationGate, AuthorizationGate, Pipeline, Stage};
pub use identity::{Claims, Identity};
pub use permissions::{
    has_permission, permissions_for, validate_roles, Permission, Role, RolePermissionRegistry,
};
