//! Audit storage.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::record::{
    ActionCount, ActorCount, AuditFilter, AuditPage, AuditRecord, EntityTypeCount, PageRequest,
};

/// Append-only audit backend.
///
/// Aggregations live on the trait so database-backed implementations can
/// push them down instead of paging everything into memory.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, record: AuditRecord) -> Result<()>;

    /// Filtered retrieval, newest first, offset-paginated.
    async fn query(&self, filter: &AuditFilter, page: PageRequest) -> Result<AuditPage>;

    async fn count_by_action(&self, filter: &AuditFilter) -> Result<Vec<ActionCount>>;

    async fn count_by_entity_type(&self, filter: &AuditFilter) -> Result<Vec<EntityTypeCount>>;

    async fn top_actors(&self, filter: &AuditFilter, top_n: usize) -> Result<Vec<ActorCount>>;
}

/// In-memory backend for testing and development.
#[derive(Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn filtered(&self, filter: &AuditFilter) -> Vec<AuditRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        self.records.write().push(record);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter, page: PageRequest) -> Result<AuditPage> {
        let mut matched = self.filtered(filter);
        // Newest first; record id as a stable tie-break.
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));

        let total = matched.len();
        let limit = page.limit.max(1);
        let total_pages = total.div_ceil(limit);
        let records = matched
            .into_iter()
            .skip(page.offset())
            .take(limit)
            .collect();

        Ok(AuditPage {
            records,
            total,
            total_pages,
            page: page.page,
            limit,
        })
    }

    async fn count_by_action(&self, filter: &AuditFilter) -> Result<Vec<ActionCount>> {
        let mut counts = HashMap::new();
        for record in self.filtered(filter) {
            *counts.entry(record.action).or_insert(0usize) += 1;
        }

        let mut out: Vec<ActionCount> = counts
            .into_iter()
            .map(|(action, count)| ActionCount { action, count })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.action.cmp(&b.action)));
        Ok(out)
    }

    async fn count_by_entity_type(&self, filter: &AuditFilter) -> Result<Vec<EntityTypeCount>> {
        let mut counts = HashMap::new();
        for record in self.filtered(filter) {
            *counts.entry(record.entity_type).or_insert(0usize) += 1;
        }

        let mut out: Vec<EntityTypeCount> = counts
            .into_iter()
            .map(|(entity_type, count)| EntityTypeCount { entity_type, count })
            .collect();
        out.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.entity_type.cmp(&b.entity_type))
        });
        Ok(out)
    }

    async fn top_actors(&self, filter: &AuditFilter, top_n: usize) -> Result<Vec<ActorCount>> {
        let mut counts: HashMap<(String, String), usize> = HashMap::new();
        for record in self.filtered(filter) {
            *counts
                .entry((record.actor_id, record.actor_name))
                .or_insert(0) += 1;
        }

        let mut out: Vec<ActorCount> = counts
            .into_iter()
            .map(|((actor_id, actor_name), count)| ActorCount {
                actor_id,
                actor_name,
                count,
            })
            .collect();
        out.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.actor_id.cmp(&b.actor_id))
        });
        out.truncate(top_n);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AuditAction;
    use ventra_core::identity::{Identity, Role};
    use ventra_core::tenant::TenantId;

    fn actor(id: &str, name: &str) -> Identity {
        Identity::new(id, name, Role::TenantAdmin, Some(TenantId::new("t1")))
    }

    async fn seed(store: &MemoryAuditStore, action: AuditAction, n: usize, who: &Identity) {
        for i in 0..n {
            store
                .append(AuditRecord::new(
                    action,
                    "product",
                    format!("{} #{i}", action.as_str()),
                    who,
                ))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn aggregate_by_action_sorts_by_count_descending() {
        let store = MemoryAuditStore::new();
        let alice = actor("u1", "alice");
        seed(&store, AuditAction::Create, 3, &alice).await;
        seed(&store, AuditAction::Update, 5, &alice).await;
        seed(&store, AuditAction::Delete, 2, &alice).await;

        let counts = store.count_by_action(&AuditFilter::default()).await.unwrap();
        assert_eq!(
            counts,
            vec![
                ActionCount { action: AuditAction::Update, count: 5 },
                ActionCount { action: AuditAction::Create, count: 3 },
                ActionCount { action: AuditAction::Delete, count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn query_pages_newest_first() {
        let store = MemoryAuditStore::new();
        let alice = actor("u1", "alice");
        seed(&store, AuditAction::Create, 7, &alice).await;

        let page = store
            .query(&AuditFilter::default(), PageRequest { page: 1, limit: 3 })
            .await
            .unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.records.len(), 3);

        let last = store
            .query(&AuditFilter::default(), PageRequest { page: 3, limit: 3 })
            .await
            .unwrap();
        assert_eq!(last.records.len(), 1);

        for pair in page.records.windows(2) {
            assert!(pair[0].timestamp >= pair[1].timestamp);
        }
    }

    #[tokio::test]
    async fn top_actors_limits_and_orders() {
        let store = MemoryAuditStore::new();
        seed(&store, AuditAction::Update, 4, &actor("u1", "alice")).await;
        seed(&store, AuditAction::Update, 6, &actor("u2", "bob")).await;
        seed(&store, AuditAction::Update, 1, &actor("u3", "carla")).await;

        let top = store.top_actors(&AuditFilter::default(), 2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].actor_id, "u2");
        assert_eq!(top[0].count, 6);
        assert_eq!(top[1].actor_id, "u1");
    }

    #[tokio::test]
    async fn filters_compose_with_and() {
        let store = MemoryAuditStore::new();
        seed(&store, AuditAction::Create, 2, &actor("u1", "alice")).await;
        seed(&store, AuditAction::Delete, 3, &actor("u2", "bob")).await;

        let filter = AuditFilter {
            action: Some(AuditAction::Delete),
            actor_id: Some("u2".to_string()),
            ..AuditFilter::default()
        };
        let page = store.query(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 3);

        let filter = AuditFilter {
            action: Some(AuditAction::Delete),
            actor_id: Some("u1".to_string()),
            ..AuditFilter::default()
        };
        let page = store.query(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }
}
