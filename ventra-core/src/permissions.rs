//! Role → permission mapping.
//!
//! The table is built once at process start and never mutated. A role's
//! grants are an ordered set of string tokens; the wildcard token `*` grants
//! everything.

use std::collections::{BTreeSet, HashMap};

use crate::identity::Role;

/// Token granting every permission.
pub const WILDCARD: &str = "*";

/// Immutable role → permission-token table.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    grants: HashMap<Role, BTreeSet<String>>,
}

impl PermissionTable {
    /// The built-in grants.
    pub fn builtin() -> Self {
        let mut grants: HashMap<Role, BTreeSet<String>> = HashMap::new();

        grants.insert(Role::PlatformAdmin, to_set(&[WILDCARD]));

        grants.insert(
            Role::TenantAdmin,
            to_set(&[
                "manage_users",
                "manage_roles",
                "manage_products",
                "manage_inventory",
                "manage_sales",
                "manage_purchases",
                "manage_reports",
                "manage_settings",
                "view_audit",
                "export_data",
            ]),
        );

        grants.insert(
            Role::TenantManager,
            to_set(&[
                "view_users",
                "manage_products",
                "manage_inventory",
                "manage_sales",
                "manage_purchases",
                "view_reports",
                "view_settings",
                "export_data",
            ]),
        );

        grants.insert(
            Role::TenantUser,
            to_set(&[
                "view_products",
                "create_sales",
                "view_own_sales",
                "view_basic_reports",
            ]),
        );

        Self { grants }
    }

    /// Build a table from explicit grants, for deployments that extend the
    /// built-in token set.
    pub fn from_grants<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = (Role, Vec<S>)>,
        S: Into<String>,
    {
        Self {
            grants: grants
                .into_iter()
                .map(|(role, perms)| (role, perms.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// The tokens granted to a role. Empty set for unknown roles.
    pub fn grants(&self, role: Role) -> &BTreeSet<String> {
        static EMPTY: std::sync::OnceLock<BTreeSet<String>> = std::sync::OnceLock::new();
        self.grants
            .get(&role)
            .unwrap_or_else(|| EMPTY.get_or_init(BTreeSet::new))
    }

    /// Whether `role` holds `permission`, via the wildcard or an exact grant.
    pub fn allows(&self, role: Role, permission: &str) -> bool {
        let perms = self.grants(role);
        perms.contains(WILDCARD) || perms.contains(permission)
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn to_set(tokens: &[&str]) -> BTreeSet<String> {
    tokens.iter().map(|s| s.to_string()).collect()
}
