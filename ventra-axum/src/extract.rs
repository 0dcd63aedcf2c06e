//! Extractors for values the pipeline middleware placed in the request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ventra_core::errors::PipelineError;
use ventra_core::identity::Identity;
use ventra_core::tenant::TenantContext;

use crate::VentraAxumError;

/// The authenticated caller. Rejects when the auth middleware did not run
/// for this route.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = VentraAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| PipelineError::Unauthenticated.into())
    }
}

/// The resolved tenant context. Rejects on routes that resolved no tenant,
/// so handlers that need one state it in their signature.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub TenantContext);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = VentraAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .map(CurrentTenant)
            .ok_or_else(|| PipelineError::TenantNotSpecified.into())
    }
}

/// Optional tenant context, for routes a platform admin may call with no
/// tenant selected.
#[derive(Debug, Clone)]
pub struct MaybeTenant(pub Option<TenantContext>);

impl<S> FromRequestParts<S> for MaybeTenant
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeTenant(parts.extensions.get::<TenantContext>().cloned()))
    }
}
