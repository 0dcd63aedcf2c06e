//! ventra-core: transport-agnostic core for the Ventra multi-tenant backend.
//!
//! Everything a request passes through before business logic lives here:
//! tenant resolution, identity/role types, the permission table and the
//! access-control engine. Credential handling and HTTP glue are in the
//! `ventra-auth` and `ventra-axum` crates.

pub mod engine;
pub mod errors;
pub mod identity;
pub mod permissions;
pub mod resolver;
pub mod tenant;

pub use engine::{check_tenant_access, AccessControlEngine};
pub use errors::PipelineError;
pub use identity::{Identity, Role};
pub use permissions::{PermissionTable, WILDCARD};
pub use resolver::{RequestSignals, ResolverOptions, TenantResolver};
pub use tenant::{MemoryTenantStore, TenantContext, TenantId, TenantStatus, TenantStore};
