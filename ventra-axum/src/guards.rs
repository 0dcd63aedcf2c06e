//! Route-level authorization guards.
//!
//! Applied with `Router::route_layer` so they run after the pipeline
//! middleware has placed the caller's identity in the extensions. The
//! checks themselves are synchronous table lookups, so denial short-
//! circuits without touching the inner service.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};
use ventra_core::engine::AccessControlEngine;
use ventra_core::errors::PipelineError;
use ventra_core::identity::{Identity, Role};

use crate::VentraAxumError;

#[derive(Clone)]
enum AccessRule {
    Permission(String),
    All(Vec<String>),
    Any(Vec<String>),
    Roles(Vec<Role>),
}

/// Guard a route behind a single permission token.
pub fn require_permission(engine: &AccessControlEngine, permission: &str) -> RequireLayer {
    RequireLayer::new(engine, AccessRule::Permission(permission.to_string()))
}

/// Guard a route behind all of the given permission tokens.
pub fn require_all(engine: &AccessControlEngine, permissions: &[&str]) -> RequireLayer {
    let permissions = permissions.iter().map(|p| p.to_string()).collect();
    RequireLayer::new(engine, AccessRule::All(permissions))
}

/// Guard a route behind at least one of the given permission tokens.
pub fn require_any(engine: &AccessControlEngine, permissions: &[&str]) -> RequireLayer {
    let permissions = permissions.iter().map(|p| p.to_string()).collect();
    RequireLayer::new(engine, AccessRule::Any(permissions))
}

/// Guard a route behind a role allow-list.
pub fn require_role(engine: &AccessControlEngine, roles: &[Role]) -> RequireLayer {
    RequireLayer::new(engine, AccessRule::Roles(roles.to_vec()))
}

#[derive(Clone)]
pub struct RequireLayer {
    engine: AccessControlEngine,
    rule: AccessRule,
}

impl RequireLayer {
    fn new(engine: &AccessControlEngine, rule: AccessRule) -> Self {
        Self {
            engine: engine.clone(),
            rule,
        }
    }
}

impl<S> Layer<S> for RequireLayer {
    type Service = RequireService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireService {
            inner,
            engine: self.engine.clone(),
            rule: self.rule.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequireService<S> {
    inner: S,
    engine: AccessControlEngine,
    rule: AccessRule,
}

impl<S> RequireService<S> {
    fn check(&self, req: &Request) -> Result<(), PipelineError> {
        let Some(identity) = req.extensions().get::<Identity>() else {
            return Err(PipelineError::Unauthenticated);
        };
        match &self.rule {
            AccessRule::Permission(p) => self.engine.authorize(identity, p),
            AccessRule::All(ps) => {
                let refs: Vec<&str> = ps.iter().map(String::as_str).collect();
                self.engine.require_all(identity, &refs)
            }
            AccessRule::Any(ps) => {
                let refs: Vec<&str> = ps.iter().map(String::as_str).collect();
                self.engine.require_any(identity, &refs)
            }
            AccessRule::Roles(roles) => self.engine.require_role(identity, roles),
        }
    }
}

impl<S> Service<Request> for RequireService<S>
where
    S: Service<Request, Response = Response>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        match self.check(&req) {
            Ok(()) => Box::pin(self.inner.call(req)),
            Err(e) => {
                let response = VentraAxumError::from(e).into_response();
                Box::pin(std::future::ready(Ok(response)))
            }
        }
    }
}
