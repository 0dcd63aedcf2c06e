//! The request pipeline: tenant resolution and authentication middleware.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use ventra_audit::AuditTrail;
use ventra_auth::{extract_bearer, AuthSessionGuard};
use ventra_core::engine::AccessControlEngine;
use ventra_core::identity::Identity;
use ventra_core::resolver::{RequestSignals, TenantResolver, TENANT_HEADER};
use ventra_core::tenant::TenantContext;

use crate::VentraAxumError;

/// Form bodies are buffered to look for a tenant field; anything larger
/// than this is not a form-style submission we care about.
const FORM_BODY_LIMIT: usize = 1024 * 1024;

/// Everything the pipeline middleware and the built-in handlers need.
#[derive(Clone)]
pub struct PipelineState {
    pub resolver: Arc<TenantResolver>,
    pub guard: Arc<AuthSessionGuard>,
    pub engine: AccessControlEngine,
    pub trail: AuditTrail,
}

fn headers_to_map(req: &Request) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (k, v) in req.headers() {
        if let Ok(s) = v.to_str() {
            out.insert(k.as_str().to_lowercase(), s.to_string());
        }
    }
    out
}

fn query_param(req: &Request, keys: &[&str]) -> Option<String> {
    let query = req.uri().query()?;
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;
    for key in keys {
        if let Some((_, v)) = pairs.iter().find(|(k, _)| k == key) {
            if !v.trim().is_empty() {
                return Some(v.clone());
            }
        }
    }
    None
}

fn is_form_request(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn declared_length(req: &Request) -> Option<usize> {
    req.headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn payload_too_large() -> Response {
    let body = json!({
        "name": "PayloadTooLarge",
        "message": "Request body too large",
        "code": 413,
        "className": "payload-too-large",
    });
    (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response()
}

/// Pull `tenantId` out of a form body, handing back a request whose body is
/// intact for the handler. `Err` carries the response for a body that
/// overflowed the buffering limit mid-read (the consumed body cannot be
/// restored, so the request cannot proceed).
async fn form_tenant(req: Request) -> Result<(Request, Option<String>), Response> {
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, FORM_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => return Err(payload_too_large()),
    };

    let tenant = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
        .ok()
        .and_then(|pairs| {
            pairs
                .into_iter()
                .find(|(k, _)| k == "tenantId")
                .map(|(_, v)| v)
        })
        .filter(|v| !v.trim().is_empty());

    Ok((Request::from_parts(parts, Body::from(bytes)), tenant))
}

/// Tenant-resolution middleware. Runs first on every request.
///
/// Exempt paths pass straight through. Otherwise the signals are collected
/// in precedence order and resolved against the tenant store; the resulting
/// context lands in the request extensions. A caller who verifies as a
/// platform admin and supplied no explicit signal skips resolution — a
/// platform admin must be able to operate with no tenant context.
pub async fn tenant_middleware(
    State(state): State<PipelineState>,
    req: Request,
    next: Next,
) -> Result<Response, VentraAxumError> {
    let path = req.uri().path().to_string();
    if state.resolver.is_exempt(&path) {
        return Ok(next.run(req).await);
    }

    let headers = headers_to_map(&req);
    let mut signals = RequestSignals::for_path(&path);
    if let Some(host) = headers.get("host") {
        signals = signals.with_host(host.clone());
    }
    if let Some(tenant) = headers.get(TENANT_HEADER).filter(|v| !v.trim().is_empty()) {
        signals = signals.with_header_tenant(tenant.clone());
    }
    if let Some(tenant) = query_param(&req, &["tenantId", "tenant"]) {
        signals = signals.with_query_tenant(tenant);
    }

    // Only form-style submissions may carry a body signal, and only when no
    // higher-precedence signal already decided. A body declared larger than
    // the buffering limit is not a form submission we take a signal from;
    // it passes through untouched and the host fallback still applies.
    let mut req = req;
    if !signals.has_explicit_signal()
        && is_form_request(&req)
        && !declared_length(&req).is_some_and(|n| n > FORM_BODY_LIMIT)
    {
        let (rebuilt, tenant) = match form_tenant(req).await {
            Ok(pair) => pair,
            Err(response) => return Ok(response),
        };
        req = rebuilt;
        if let Some(tenant) = tenant {
            signals = signals.with_form_tenant(tenant);
        }
    }

    if !signals.has_explicit_signal() {
        // Pre-check: a verified platform admin proceeds without a tenant
        // context unless one was deliberately selected above.
        if let Some(token) = extract_bearer(&headers) {
            if let Ok(identity) = state.guard.authenticate(Some(&token)).await {
                if identity.role.is_platform_admin() {
                    tracing::debug!(subject = %identity.id, "platform admin; tenant resolution skipped");
                    return Ok(next.run(req).await);
                }
            }
        }
    }

    let tenant = state.resolver.resolve(&signals).await?;
    if let Some(tenant) = tenant {
        req.extensions_mut().insert(tenant);
    }

    Ok(next.run(req).await)
}

/// Authentication middleware. Runs after tenant resolution on every
/// non-bootstrap request and enforces the tenant-mismatch check.
pub async fn auth_middleware(
    State(state): State<PipelineState>,
    mut req: Request,
    next: Next,
) -> Result<Response, VentraAxumError> {
    if state.resolver.is_bootstrap(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let headers = headers_to_map(&req);
    let bearer = extract_bearer(&headers);
    let tenant = req.extensions().get::<TenantContext>().cloned();

    let identity: Identity = state
        .guard
        .authenticate_for(bearer.as_deref(), tenant.as_ref())
        .await?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
