//! Audit record and query types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use ventra_core::identity::{Identity, Role};
use ventra_core::tenant::TenantId;

/// The audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
    Login,
    Logout,
    Impersonate,
    Suspend,
    Activate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::View => "view",
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::Impersonate => "impersonate",
            AuditAction::Suspend => "suspend",
            AuditAction::Activate => "activate",
        }
    }
}

/// One immutable audit entry. Created by business handlers after
/// authorization; never updated or deleted through normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub description: String,
    /// Free-form structured payload.
    #[serde(default)]
    pub details: Value,
    pub actor_id: String,
    pub actor_name: String,
    pub actor_role: Role,
    /// Original actor when the action ran under impersonation.
    pub impersonated_by: Option<String>,
    /// None for platform-level actions.
    pub tenant_id: Option<TenantId>,
    pub source_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        action: AuditAction,
        entity_type: impl Into<String>,
        description: impl Into<String>,
        actor: &Identity,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action,
            entity_type: entity_type.into(),
            entity_id: None,
            description: description.into(),
            details: Value::Null,
            actor_id: actor.id.clone(),
            actor_name: actor.display_name.clone(),
            actor_role: actor.role,
            impersonated_by: None,
            tenant_id: actor.tenant_id.clone(),
            source_address: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_source_address(mut self, addr: impl Into<String>) -> Self {
        self.source_address = Some(addr.into());
        self
    }

    pub fn with_impersonated_by(mut self, actor_id: impl Into<String>) -> Self {
        self.impersonated_by = Some(actor_id.into());
        self
    }
}

/// Retrieval filters, all optional and combined with AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditFilter {
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub tenant_id: Option<TenantId>,
    /// Case-insensitive substring match on actor name.
    pub actor_name: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound (use `with_end_date` for whole-day semantics).
    pub end: Option<DateTime<Utc>>,
}

impl AuditFilter {
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        self
    }

    /// End-of-day-inclusive upper bound for a calendar date.
    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end = date
            .and_hms_milli_opt(23, 59, 59, 999)
            .map(|dt| dt.and_utc());
        self
    }

    pub fn matches(&self, record: &AuditRecord) -> bool {
        if self.action.is_some_and(|a| a != record.action) {
            return false;
        }
        if self
            .entity_type
            .as_ref()
            .is_some_and(|t| *t != record.entity_type)
        {
            return false;
        }
        if self
            .entity_id
            .as_ref()
            .is_some_and(|id| record.entity_id.as_ref() != Some(id))
        {
            return false;
        }
        if self
            .actor_id
            .as_ref()
            .is_some_and(|id| *id != record.actor_id)
        {
            return false;
        }
        if self
            .tenant_id
            .as_ref()
            .is_some_and(|id| record.tenant_id.as_ref() != Some(id))
        {
            return false;
        }
        if self.actor_name.as_ref().is_some_and(|needle| {
            !record
                .actor_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        }) {
            return false;
        }
        if self.start.is_some_and(|start| record.timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| record.timestamp > end) {
            return false;
        }
        true
    }
}

/// Offset pagination, 1-based page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 50 }
    }
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.limit
    }
}

/// One page of audit records plus the pagination envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditPage {
    pub records: Vec<AuditRecord>,
    pub total: usize,
    pub total_pages: usize,
    pub page: usize,
    pub limit: usize,
}

/// Count grouped by action, sorted by count descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCount {
    pub action: AuditAction,
    pub count: usize,
}

/// Count grouped by entity type, sorted by count descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeCount {
    pub entity_type: String,
    pub count: usize,
}

/// Per-actor activity count, sorted by count descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorCount {
    pub actor_id: String,
    pub actor_name: String,
    pub count: usize,
}
