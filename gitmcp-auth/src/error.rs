//! Failure taxonomy of the authentication and authorization pipeline
//!
//! Every error here is terminal for the invocation that produced it.

use crate::permissions::Permission;
use gitmcp_core::{ErrorContext, GitMcpError};
use reqwest::StatusCode;
use thiserror::Error;

/// Why a bearer token could not be turned into an identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("malformed claims: {reason}")]
    MalformedClaims { reason: String },

    #[error("claims unavailable: {reason}")]
    ClaimsUnavailable { reason: String },

    #[error("no roles found in token or userinfo")]
    NoRolesFound,
}

/// Rejection raised by the authentication gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unauthenticated {
    #[error("no authorization header")]
    NoHeader,

    #[error("invalid authorization header format")]
    BadFormat,

    #[error(transparent)]
    Claims(#[from] AuthError),
}

impl Unauthenticated {
    /// Stable machine readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            Unauthenticated::NoHeader => "no_header",
            Unauthenticated::BadFormat => "bad_format",
            Unauthenticated::Claims(AuthError::InvalidTokenFormat) => "invalid_token_format",
            Unauthenticated::Claims(AuthError::MalformedClaims { .. }) => "malformed_claims",
            Unauthenticated::Claims(AuthError::ClaimsUnavailable { .. }) => "claims_unavailable",
            Unauthenticated::Claims(AuthError::NoRolesFound) => "no_roles_found",
        }
    }
}

/// Rejection raised by the authorization gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Forbidden {
    #[error("user not authenticated")]
    NotAuthenticated,

    #[error("permission denied: {required} required")]
    PermissionDenied {
        required: Permission,
        subject: String,
    },
}

impl Forbidden {
    pub fn reason(&self) -> &'static str {
        match self {
            Forbidden::NotAuthenticated => "not_authenticated",
            Forbidden::PermissionDenied { .. } => "permission_denied",
        }
    }
}

/// Any rejection produced by a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("authentication failed: {0}")]
    Unauthenticated(#[from] Unauthenticated),

    #[error("authorization failed: {0}")]
    Forbidden(#[from] Forbidden),
}

impl GateError {
    /// True when presenting a fresh token could change the outcome
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, GateError::Unauthenticated(_))
    }

    /// Stable error category, `unauthenticated` or `forbidden`
    pub fn error_code(&self) -> &'static str {
        match self {
            GateError::Unauthenticated(_) => "unauthenticated",
            GateError::Forbidden(_) => "forbidden",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            GateError::Unauthenticated(inner) => inner.reason(),
            GateError::Forbidden(inner) => inner.reason(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GateError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GateError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl From<AuthError> for GateError {
    fn from(error: AuthError) -> Self {
        GateError::Unauthenticated(Unauthenticated::Claims(error))
    }
}

impl From<GateError> for GitMcpError {
    fn from(error: GateError) -> Self {
        let context = ErrorContext::new("gates").with_metadata("reason", error.reason());
        match error {
            GateError::Unauthenticated(inner) => GitMcpError::Authentication {
                message: inner.to_string(),
                context: context.with_suggestion("Present a valid bearer token"),
            },
            GateError::Forbidden(inner) => {
                let permission = match &inner {
                    Forbidden::PermissionDenied { required, .. } => Some(required.to_string()),
                    Forbidden::NotAuthenticated => None,
                };
                GitMcpError::Authorization {
                    message: inner.to_string(),
                    permission,
                    context,
                }
            }
        }
    }
}

/// Role string with no entry in the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    #[error("invalid role: {0}")]
    InvalidRole(String),
}
