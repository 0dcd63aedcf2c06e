//! The audit trail service.

use std::sync::Arc;

use anyhow::Result;

use crate::record::{
    ActionCount, ActorCount, AuditFilter, AuditPage, AuditRecord, EntityTypeCount, PageRequest,
};
use crate::store::AuditStore;

/// Default group size for top-actor reporting.
pub const DEFAULT_TOP_ACTORS: usize = 10;

/// Records sensitive actions and serves filtered/aggregated retrieval.
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Record an action, best-effort.
    ///
    /// An audit write must never fail or roll back the business operation
    /// it describes, so persistence errors are logged and swallowed here.
    pub async fn log_action(&self, record: AuditRecord) {
        let action = record.action;
        let actor = record.actor_id.clone();
        if let Err(e) = self.store.append(record).await {
            tracing::warn!(
                action = action.as_str(),
                actor = %actor,
                error = %e,
                "audit write failed; business operation proceeds"
            );
        }
    }

    pub async fn query(&self, filter: &AuditFilter, page: PageRequest) -> Result<AuditPage> {
        self.store.query(filter, page).await
    }

    pub async fn aggregate_by_action(&self, filter: &AuditFilter) -> Result<Vec<ActionCount>> {
        self.store.count_by_action(filter).await
    }

    pub async fn aggregate_by_entity_type(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<EntityTypeCount>> {
        self.store.count_by_entity_type(filter).await
    }

    pub async fn aggregate_top_actors(
        &self,
        filter: &AuditFilter,
        top_n: usize,
    ) -> Result<Vec<ActorCount>> {
        self.store.top_actors(filter, top_n).await
    }
}
