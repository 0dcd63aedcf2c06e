//! Multi-tenant types for Ventra.
//!
//! A `TenantContext` is loaded fresh for every request and never cached
//! across requests, so lifecycle changes (e.g. a suspension) take effect on
//! the next request.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tenant lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Trial,
    Active,
    Suspended,
    Cancelled,
}

/// Context carried with every tenant-scoped operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantContext {
    pub id: TenantId,
    pub name: String,
    /// Unique, lowercase DNS label the tenant is addressed by.
    pub subdomain: String,
    pub status: TenantStatus,
}

impl TenantContext {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        subdomain: impl Into<String>,
        status: TenantStatus,
    ) -> Self {
        Self {
            id: TenantId::new(id),
            name: name.into(),
            subdomain: subdomain.into().to_lowercase(),
            status,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.status == TenantStatus::Suspended
    }
}

/// Backing store for tenant records.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Find a non-cancelled tenant by subdomain.
    ///
    /// Cancelled tenants must behave as nonexistent here, not merely
    /// inaccessible, so callers cannot confirm the past existence of a
    /// deleted tenant. Suspended tenants ARE returned; the suspension gate
    /// runs later in the pipeline where the caller's role is known.
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<TenantContext>>;
}

/// In-memory tenant store for tests and development.
#[derive(Default)]
pub struct MemoryTenantStore {
    tenants: RwLock<HashMap<String, TenantContext>>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant: TenantContext) {
        self.tenants
            .write()
            .insert(tenant.subdomain.clone(), tenant);
    }

    pub fn set_status(&self, subdomain: &str, status: TenantStatus) {
        if let Some(t) = self.tenants.write().get_mut(subdomain) {
            t.status = status;
        }
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<TenantContext>> {
        Ok(self
            .tenants
            .read()
            .get(subdomain)
            .filter(|t| t.status != TenantStatus::Cancelled)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_tenants_are_never_found() {
        let store = MemoryTenantStore::new();
        store.insert(TenantContext::new("t1", "Acme", "acme", TenantStatus::Active));
        assert!(store.find_by_subdomain("acme").await.unwrap().is_some());

        store.set_status("acme", TenantStatus::Cancelled);
        assert!(store.find_by_subdomain("acme").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn suspended_tenants_are_found() {
        let store = MemoryTenantStore::new();
        store.insert(TenantContext::new(
            "t1",
            "Acme",
            "acme",
            TenantStatus::Suspended,
        ));
        let found = store.find_by_subdomain("acme").await.unwrap().unwrap();
        assert!(found.is_suspended());
    }
}
