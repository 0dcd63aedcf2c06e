//! Authenticated identity and role types.

use serde::{Deserialize, Serialize};

use crate::tenant::TenantId;

/// Caller roles, closed set.
///
/// `PlatformAdmin` operates across tenants (tenant_id is None) and is exempt
/// from tenant-isolation checks. The other three roles are always scoped to
/// exactly one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    // `superAdmin` / `superAdminLimited` are the legacy wire names still
    // present in older tokens.
    #[serde(
        rename = "platformAdmin",
        alias = "superAdmin",
        alias = "superAdminLimited"
    )]
    PlatformAdmin,
    #[serde(rename = "tenantAdmin")]
    TenantAdmin,
    #[serde(rename = "tenantManager")]
    TenantManager,
    #[serde(rename = "tenantUser")]
    TenantUser,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::PlatformAdmin => "platformAdmin",
            Role::TenantAdmin => "tenantAdmin",
            Role::TenantManager => "tenantManager",
            Role::TenantUser => "tenantUser",
        }
    }

    /// Parse a wire-format role name, accepting legacy aliases.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "platformAdmin" | "superAdmin" | "superAdminLimited" => Some(Role::PlatformAdmin),
            "tenantAdmin" => Some(Role::TenantAdmin),
            "tenantManager" => Some(Role::TenantManager),
            "tenantUser" => Some(Role::TenantUser),
            _ => None,
        }
    }

    pub fn is_platform_admin(&self) -> bool {
        matches!(self, Role::PlatformAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller, resolved from a bearer credential.
///
/// Immutable once resolved: created per request by the session guard and
/// discarded at request end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject id, the cache key for identity lookups.
    pub id: String,
    pub display_name: String,
    pub role: Role,
    /// None for platform admins, mandatory for tenant-scoped roles.
    pub tenant_id: Option<TenantId>,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        tenant_id: Option<TenantId>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_role_aliases_parse_to_platform_admin() {
        assert_eq!(Role::parse("superAdmin"), Some(Role::PlatformAdmin));
        assert_eq!(Role::parse("superAdminLimited"), Some(Role::PlatformAdmin));
        assert_eq!(Role::parse("platformAdmin"), Some(Role::PlatformAdmin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn role_round_trips_through_serde() {
        let json = serde_json::to_string(&Role::TenantManager).unwrap();
        assert_eq!(json, "\"tenantManager\"");
        let legacy: Role = serde_json::from_str("\"superAdmin\"").unwrap();
        assert_eq!(legacy, Role::PlatformAdmin);
    }
}
