//! # Pipeline errors
//!
//! Every stage of the request pipeline fails with a `PipelineError`.
//! Core goals:
//! - consistent status codes + class names across transports
//! - can be carried through anyhow::Error (for middleware and handlers)
//! - transport-agnostic (the axum crate decides how to serialize)
//!
//! Two deliberate asymmetries in the taxonomy:
//! - `TenantNotFound` is returned for cancelled tenants too, so an
//!   unauthenticated caller cannot confirm that a deleted tenant ever
//!   existed.
//! - `TenantSuspended` is distinct from `TenantNotFound`, so a legitimate
//!   operator of a suspended tenant understands the cause.

use anyhow::Error as AnyError;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors produced by the tenant/auth/authorization pipeline.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// No resolvable tenant signal on a route that requires one.
    #[error("Tenant not specified")]
    TenantNotSpecified,

    /// The resolved subdomain label is reserved or empty.
    #[error("Invalid subdomain")]
    InvalidSubdomain,

    /// No non-cancelled tenant matches the resolved subdomain.
    #[error("Tenant not found")]
    TenantNotFound,

    /// The tenant exists but its account is suspended.
    #[error("Access to this account has been suspended. Contact the administrator.")]
    TenantSuspended,

    /// No bearer credential was provided.
    #[error("No credential provided, authorization denied")]
    Unauthenticated,

    /// Malformed or signature-invalid credential, or the subject no longer
    /// resolves to an active account.
    #[error("Invalid credential")]
    InvalidCredential,

    /// Structurally valid credential past its expiry.
    #[error("Credential expired")]
    ExpiredCredential,

    /// Authenticated identity belongs to a different tenant than the
    /// resolved context.
    #[error("You do not have access to this tenant")]
    TenantMismatch,

    /// Authorization predicate failed. Carries the token(s) that were
    /// required so callers can debug, without leaking anything else.
    #[error("Permission denied, required: {}", required.join(", "))]
    PermissionDenied {
        /// Permission tokens the caller was missing.
        required: Vec<String>,
    },

    /// A backing-store lookup failed. Surfaced as a 5xx; never retried by
    /// the pipeline.
    #[error("Store error: {0}")]
    Store(String),
}

impl PipelineError {
    pub fn permission_denied(required: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::PermissionDenied {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::TenantNotSpecified | Self::InvalidSubdomain => 400,
            Self::Unauthenticated | Self::InvalidCredential | Self::ExpiredCredential => 401,
            Self::TenantSuspended | Self::TenantMismatch | Self::PermissionDenied { .. } => 403,
            Self::TenantNotFound => 404,
            Self::Store(_) => 500,
        }
    }

    /// Error `name` (e.g. "TenantMismatch").
    pub fn name(&self) -> &'static str {
        match self {
            Self::TenantNotSpecified => "TenantNotSpecified",
            Self::InvalidSubdomain => "InvalidSubdomain",
            Self::TenantNotFound => "TenantNotFound",
            Self::TenantSuspended => "TenantSuspended",
            Self::Unauthenticated => "Unauthenticated",
            Self::InvalidCredential => "InvalidCredential",
            Self::ExpiredCredential => "ExpiredCredential",
            Self::TenantMismatch => "TenantMismatch",
            Self::PermissionDenied { .. } => "PermissionDenied",
            Self::Store(_) => "StoreError",
        }
    }

    /// Error `className` (kebab-cased).
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::TenantNotSpecified => "tenant-not-specified",
            Self::InvalidSubdomain => "invalid-subdomain",
            Self::TenantNotFound => "tenant-not-found",
            Self::TenantSuspended => "tenant-suspended",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidCredential => "invalid-credential",
            Self::ExpiredCredential => "expired-credential",
            Self::TenantMismatch => "tenant-mismatch",
            Self::PermissionDenied { .. } => "permission-denied",
            Self::Store(_) => "store-error",
        }
    }

    /// Client-safe JSON payload. Store errors keep only a generic message.
    pub fn to_json(&self) -> Value {
        let message = match self {
            Self::Store(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        let mut base = json!({
            "name": self.name(),
            "message": message,
            "code": self.status_code(),
            "className": self.class_name(),
        });

        if let Self::PermissionDenied { required } = self {
            base["data"] = json!({ "requiredPermissions": required });
        }

        base
    }

    /// Convert into `anyhow::Error` so it flows through the pipeline.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Downcast an `anyhow::Error` to a `PipelineError` if one is anywhere
    /// in its chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&PipelineError> {
        err.chain().find_map(|e| e.downcast_ref::<PipelineError>())
    }
}
