//! Tenant resolution.
//!
//! Maps an inbound request to exactly one `TenantContext`, or fails. The
//! signal precedence is an explicit ordered list rather than nested
//! conditionals so the contract stays visible and stable:
//!
//! 1. `X-Tenant-ID` header — operator-supplied, overrides topology.
//! 2. `tenantId` (or `tenant`) query parameter.
//! 3. `tenantId` form-body field (form-style submissions only).
//! 4. Leftmost host label, when the host has more than one label and the
//!    label is not reserved.
//!
//! Platform-level route prefixes and bootstrap paths are exempt and proceed
//! with no tenant context.

use std::sync::Arc;

use crate::errors::PipelineError;
use crate::tenant::{TenantContext, TenantStore};

/// Header carrying an explicit tenant identifier.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Subdomain labels never treated as tenant identifiers.
pub const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "admin"];

/// The tenant-identifying signals extracted from a request, already
/// transport-agnostic. The axum crate fills this in from headers, query
/// string and (for form submissions) the body.
#[derive(Debug, Clone, Default)]
pub struct RequestSignals {
    pub path: String,
    /// Raw `Host` header value, port included.
    pub host: Option<String>,
    pub header_tenant: Option<String>,
    pub query_tenant: Option<String>,
    pub form_tenant: Option<String>,
}

impl RequestSignals {
    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_header_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.header_tenant = Some(tenant.into());
        self
    }

    pub fn with_query_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.query_tenant = Some(tenant.into());
        self
    }

    pub fn with_form_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.form_tenant = Some(tenant.into());
        self
    }

    /// Whether the caller named a tenant explicitly (header, query or form),
    /// as opposed to the ambient subdomain fallback.
    pub fn has_explicit_signal(&self) -> bool {
        non_empty(self.header_tenant.as_deref()).is_some()
            || non_empty(self.query_tenant.as_deref()).is_some()
            || non_empty(self.form_tenant.as_deref()).is_some()
    }
}

/// Resolution policy knobs.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Path prefixes exempt from resolution (platform/infrastructure routes).
    pub exempt_prefixes: Vec<String>,
    /// Exact bootstrap paths exempt from resolution.
    pub bootstrap_paths: Vec<String>,
    pub reserved_subdomains: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            exempt_prefixes: vec![
                "/api/admin".to_string(),
                "/images/".to_string(),
                "/api/debug".to_string(),
                "/upload".to_string(),
            ],
            bootstrap_paths: vec![
                "/".to_string(),
                "/api/test".to_string(),
                "/health".to_string(),
            ],
            reserved_subdomains: RESERVED_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Derives a tenant context from request signals and validates tenant
/// lifecycle state against the store.
pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    options: ResolverOptions,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self {
            store,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether the path is a bootstrap path (root, health check). These are
    /// public infrastructure routes: no tenant context and no credential.
    pub fn is_bootstrap(&self, path: &str) -> bool {
        self.options.bootstrap_paths.iter().any(|p| p == path)
    }

    /// Whether the path skips tenant resolution entirely.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.is_bootstrap(path)
            || self
                .options
                .exempt_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Pick the tenant identifier from the signals, first match wins.
    ///
    /// Returns `Ok(None)` when no signal is present at all; the caller
    /// decides whether that is an error (it is, on tenant-required routes).
    pub fn select_signal(&self, signals: &RequestSignals) -> Result<Option<String>, PipelineError> {
        for candidate in [
            signals.header_tenant.as_deref(),
            signals.query_tenant.as_deref(),
            signals.form_tenant.as_deref(),
        ] {
            if let Some(value) = non_empty(candidate) {
                return self.validate_label(value).map(Some);
            }
        }

        if let Some(host) = non_empty(signals.host.as_deref()) {
            let host = host.split(':').next().unwrap_or(host);
            let labels: Vec<&str> = host.split('.').collect();
            if labels.len() > 1 {
                return self.validate_label(labels[0]).map(Some);
            }
        }

        Ok(None)
    }

    fn validate_label(&self, label: &str) -> Result<String, PipelineError> {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return Err(PipelineError::InvalidSubdomain);
        }
        if self
            .options
            .reserved_subdomains
            .iter()
            .any(|r| r == &label)
        {
            return Err(PipelineError::InvalidSubdomain);
        }
        Ok(label)
    }

    /// Resolve the request to a tenant context.
    ///
    /// `Ok(None)` means the path is exempt and proceeds with no tenant
    /// context. Every other outcome is either exactly one tenant or an
    /// error.
    pub async fn resolve(
        &self,
        signals: &RequestSignals,
    ) -> Result<Option<TenantContext>, PipelineError> {
        if self.is_exempt(&signals.path) {
            tracing::debug!(path = %signals.path, "path exempt from tenant resolution");
            return Ok(None);
        }

        let Some(subdomain) = self.select_signal(signals)? else {
            return Err(PipelineError::TenantNotSpecified);
        };

        let tenant = self
            .store
            .find_by_subdomain(&subdomain)
            .await
            .map_err(|e| PipelineError::store(e.to_string()))?
            .ok_or(PipelineError::TenantNotFound)?;

        tracing::debug!(tenant = %tenant.id, subdomain = %tenant.subdomain, "tenant resolved");
        Ok(Some(tenant))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::{MemoryTenantStore, TenantStatus};

    fn resolver_with(tenants: &[(&str, TenantStatus)]) -> TenantResolver {
        let store = MemoryTenantStore::new();
        for (sub, status) in tenants {
            store.insert(TenantContext::new(*sub, *sub, *sub, *status));
        }
        TenantResolver::new(Arc::new(store))
    }

    #[test]
    fn header_beats_query_beats_form_beats_host() {
        let resolver = resolver_with(&[]);
        let signals = RequestSignals::for_path("/api/products")
            .with_host("globex.example.com")
            .with_form_tenant("initech")
            .with_query_tenant("umbrella")
            .with_header_tenant("acme");
        assert_eq!(
            resolver.select_signal(&signals).unwrap(),
            Some("acme".to_string())
        );

        let signals = RequestSignals::for_path("/api/products")
            .with_host("globex.example.com")
            .with_form_tenant("initech")
            .with_query_tenant("umbrella");
        assert_eq!(
            resolver.select_signal(&signals).unwrap(),
            Some("umbrella".to_string())
        );

        let signals = RequestSignals::for_path("/api/products")
            .with_host("globex.example.com")
            .with_form_tenant("initech");
        assert_eq!(
            resolver.select_signal(&signals).unwrap(),
            Some("initech".to_string())
        );

        let signals =
            RequestSignals::for_path("/api/products").with_host("globex.example.com:8080");
        assert_eq!(
            resolver.select_signal(&signals).unwrap(),
            Some("globex".to_string())
        );
    }

    #[test]
    fn single_label_host_yields_no_signal() {
        let resolver = resolver_with(&[]);
        let signals = RequestSignals::for_path("/api/products").with_host("localhost:3000");
        assert_eq!(resolver.select_signal(&signals).unwrap(), None);
    }

    #[test]
    fn reserved_labels_are_rejected() {
        let resolver = resolver_with(&[]);
        for reserved in ["www", "api", "admin"] {
            let signals = RequestSignals::for_path("/api/products")
                .with_host(format!("{reserved}.example.com"));
            assert!(matches!(
                resolver.select_signal(&signals),
                Err(PipelineError::InvalidSubdomain)
            ));

            let signals =
                RequestSignals::for_path("/api/products").with_header_tenant(reserved);
            assert!(matches!(
                resolver.select_signal(&signals),
                Err(PipelineError::InvalidSubdomain)
            ));
        }
    }

    #[tokio::test]
    async fn missing_signal_on_required_route_fails() {
        let resolver = resolver_with(&[("acme", TenantStatus::Active)]);
        let signals = RequestSignals::for_path("/api/products").with_host("localhost");
        assert!(matches!(
            resolver.resolve(&signals).await,
            Err(PipelineError::TenantNotSpecified)
        ));
    }

    #[tokio::test]
    async fn exempt_and_bootstrap_paths_skip_resolution() {
        let resolver = resolver_with(&[]);
        for path in ["/api/admin/tenants", "/images/logo.png", "/api/debug/x", "/upload", "/", "/api/test", "/health"] {
            let signals = RequestSignals::for_path(path);
            assert!(resolver.resolve(&signals).await.unwrap().is_none(), "{path}");
        }
    }

    #[tokio::test]
    async fn cancelled_is_not_found() {
        let resolver = resolver_with(&[("acme", TenantStatus::Cancelled)]);
        let signals = RequestSignals::for_path("/api/products").with_header_tenant("acme");
        assert!(matches!(
            resolver.resolve(&signals).await,
            Err(PipelineError::TenantNotFound)
        ));
    }

    #[tokio::test]
    async fn suspended_resolves() {
        let resolver = resolver_with(&[("acme", TenantStatus::Suspended)]);
        let signals = RequestSignals::for_path("/api/products").with_header_tenant("acme");
        let tenant = resolver.resolve(&signals).await.unwrap().unwrap();
        assert!(tenant.is_suspended());
    }

    #[tokio::test]
    async fn signal_is_case_insensitive() {
        let resolver = resolver_with(&[("acme", TenantStatus::Active)]);
        let signals = RequestSignals::for_path("/api/products").with_header_tenant("  ACME ");
        let tenant = resolver.resolve(&signals).await.unwrap().unwrap();
        assert_eq!(tenant.subdomain, "acme");
    }
}
