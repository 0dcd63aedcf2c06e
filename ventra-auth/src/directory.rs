//! User directory: the authoritative record behind identity resolution.
//!
//! The directory is the seam between the pipeline and whatever persistence
//! an application carries. Identity lookups only ever see active accounts.
//! Mutation paths invalidate the identity cache for the touched subject and
//! guard the last-admin invariant: a tenant must always keep at least one
//! active tenant admin, or it is permanently locked out of self-service
//! administration.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;
use ventra_core::identity::{Identity, Role};
use ventra_core::tenant::TenantId;

use crate::cache::IdentityCache;

/// Errors from directory mutations.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    /// Deactivating or demoting the sole active tenant admin is rejected
    /// before any mutation happens.
    #[error("Cannot remove the only active tenant admin of tenant {0}")]
    LastTenantAdmin(TenantId),
}

/// An account record.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    pub role: Role,
    pub tenant_id: Option<TenantId>,
    pub is_active: bool,
}

impl UserAccount {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        role: Role,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role,
            tenant_id,
            is_active: true,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(
            self.id.clone(),
            self.username.clone(),
            self.role,
            self.tenant_id.clone(),
        )
    }
}

/// Read seam used by the session guard.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve the identity for an active account. Unknown or deactivated
    /// subjects resolve to `None`.
    async fn find_identity(&self, subject_id: &str) -> Result<Option<Identity>>;
}

/// In-memory directory for tests and development.
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<String, UserAccount>>,
    cache: Arc<dyn IdentityCache>,
}

impl MemoryUserDirectory {
    pub fn new(cache: Arc<dyn IdentityCache>) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            cache,
        }
    }

    pub fn insert(&self, account: UserAccount) {
        self.users.write().insert(account.id.clone(), account);
    }

    /// Change a user's role. Invalidates the subject's cached identity.
    pub fn set_role(&self, subject_id: &str, role: Role) -> Result<(), DirectoryError> {
        let mut users = self.users.write();
        let user = users
            .get(subject_id)
            .ok_or_else(|| DirectoryError::UnknownSubject(subject_id.to_string()))?;

        // Demoting the last active tenant admin would lock the tenant out.
        if user.role == Role::TenantAdmin && role != Role::TenantAdmin {
            if let Some(tenant_id) = user.tenant_id.clone() {
                if Self::active_tenant_admins(&users, &tenant_id) <= 1 {
                    return Err(DirectoryError::LastTenantAdmin(tenant_id));
                }
            }
        }

        if let Some(user) = users.get_mut(subject_id) {
            user.role = role;
        }
        drop(users);
        self.cache.invalidate(subject_id);
        Ok(())
    }

    /// Activate or deactivate a user. Invalidates the subject's cached
    /// identity.
    pub fn set_active(&self, subject_id: &str, active: bool) -> Result<(), DirectoryError> {
        let mut users = self.users.write();
        let user = users
            .get(subject_id)
            .ok_or_else(|| DirectoryError::UnknownSubject(subject_id.to_string()))?;

        if !active && user.is_active && user.role == Role::TenantAdmin {
            if let Some(tenant_id) = user.tenant_id.clone() {
                if Self::active_tenant_admins(&users, &tenant_id) <= 1 {
                    return Err(DirectoryError::LastTenantAdmin(tenant_id));
                }
            }
        }

        if let Some(user) = users.get_mut(subject_id) {
            user.is_active = active;
        }
        drop(users);
        self.cache.invalidate(subject_id);
        Ok(())
    }

    /// Move a user to another tenant. Invalidates the subject's cached
    /// identity.
    pub fn set_tenant(
        &self,
        subject_id: &str,
        tenant_id: Option<TenantId>,
    ) -> Result<(), DirectoryError> {
        let mut users = self.users.write();
        let user = users
            .get(subject_id)
            .ok_or_else(|| DirectoryError::UnknownSubject(subject_id.to_string()))?;

        if user.role == Role::TenantAdmin && user.tenant_id != tenant_id {
            if let Some(current) = user.tenant_id.clone() {
                if Self::active_tenant_admins(&users, &current) <= 1 {
                    return Err(DirectoryError::LastTenantAdmin(current));
                }
            }
        }

        if let Some(user) = users.get_mut(subject_id) {
            user.tenant_id = tenant_id;
        }
        drop(users);
        self.cache.invalidate(subject_id);
        Ok(())
    }

    fn active_tenant_admins(users: &HashMap<String, UserAccount>, tenant: &TenantId) -> usize {
        users
            .values()
            .filter(|u| {
                u.is_active && u.role == Role::TenantAdmin && u.tenant_id.as_ref() == Some(tenant)
            })
            .count()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_identity(&self, subject_id: &str) -> Result<Option<Identity>> {
        Ok(self
            .users
            .read()
            .get(subject_id)
            .filter(|u| u.is_active)
            .map(UserAccount::identity))
    }
}
