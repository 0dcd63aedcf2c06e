//! ventra-audit: durable, queryable record of sensitive actions.
//!
//! Writes are best-effort by design: a failed audit write never rolls back
//! or fails the business operation it describes.

pub mod record;
pub mod store;
pub mod trail;

pub use record::{
    ActionCount, ActorCount, AuditAction, AuditFilter, AuditPage, AuditRecord, EntityTypeCount,
    PageRequest,
};
pub use store::{AuditStore, MemoryAuditStore};
pub use trail::{AuditTrail, DEFAULT_TOP_ACTORS};
