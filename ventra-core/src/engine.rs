//! Access-control engine: the final authorization gate.
//!
//! Combines the resolved identity, the tenant context, and a permission or
//! role predicate. Runs after tenant resolution and authentication; nothing
//! here performs IO.

use std::sync::Arc;

use crate::errors::PipelineError;
use crate::identity::{Identity, Role};
use crate::permissions::PermissionTable;
use crate::tenant::TenantContext;

/// Tenant-isolation check, mandatory on every request.
///
/// Platform admins are exempt: they carry no tenant id and may operate with
/// or without a deliberately selected tenant context, including a suspended
/// one. Everyone else is rejected when the tenant is suspended, or when
/// their tenant id differs from the resolved context.
pub fn check_tenant_access(
    identity: &Identity,
    tenant: Option<&TenantContext>,
) -> Result<(), PipelineError> {
    if identity.role.is_platform_admin() {
        return Ok(());
    }

    let Some(tenant) = tenant else {
        // Tenant-exempt route; nothing to isolate against.
        return Ok(());
    };

    if tenant.is_suspended() {
        return Err(PipelineError::TenantSuspended);
    }

    match &identity.tenant_id {
        Some(id) if *id == tenant.id => Ok(()),
        _ => Err(PipelineError::TenantMismatch),
    }
}

/// Evaluates permission and role predicates against the static table.
#[derive(Clone)]
pub struct AccessControlEngine {
    table: Arc<PermissionTable>,
}

impl AccessControlEngine {
    pub fn new(table: Arc<PermissionTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    /// Allow iff the identity's role holds `permission` (or the wildcard).
    /// Platform admins always pass.
    pub fn authorize(&self, identity: &Identity, permission: &str) -> Result<(), PipelineError> {
        if identity.role.is_platform_admin() {
            return Ok(());
        }
        if self.table.allows(identity.role, permission) {
            Ok(())
        } else {
            tracing::debug!(
                actor = %identity.id,
                role = %identity.role,
                permission,
                "permission denied"
            );
            Err(PipelineError::permission_denied([permission]))
        }
    }

    /// Allow iff every permission individually allows.
    ///
    /// The denial reports the full predicate so the caller sees everything
    /// the route demands, not just the first miss.
    pub fn require_all(&self, identity: &Identity, permissions: &[&str]) -> Result<(), PipelineError> {
        for permission in permissions {
            if self.authorize(identity, permission).is_err() {
                return Err(PipelineError::permission_denied(permissions.iter().copied()));
            }
        }
        Ok(())
    }

    /// Allow iff at least one permission allows.
    pub fn require_any(&self, identity: &Identity, permissions: &[&str]) -> Result<(), PipelineError> {
        for permission in permissions {
            if self.authorize(identity, permission).is_ok() {
                return Ok(());
            }
        }
        Err(PipelineError::permission_denied(permissions.iter().copied()))
    }

    /// Role-membership predicate for capabilities with no finer-grained
    /// token. Bypasses the permission table entirely.
    pub fn require_role(&self, identity: &Identity, roles: &[Role]) -> Result<(), PipelineError> {
        if roles.contains(&identity.role) {
            Ok(())
        } else {
            Err(PipelineError::permission_denied(
                roles.iter().map(|r| format!("role:{r}")),
            ))
        }
    }
}

impl Default for AccessControlEngine {
    fn default() -> Self {
        Self::new(Arc::new(PermissionTable::builtin()))
    }
}
