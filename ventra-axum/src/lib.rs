//! ventra-axum: Axum adapter for the Ventra access-control pipeline.
//!
//! Exposes the tenant/auth middleware, extension extractors, the audit
//! router and the error → HTTP response mapping. Within a request the
//! stages always run tenant resolution → authentication → authorization;
//! handlers only ever see a request that passed all three.

pub mod app;
pub mod extract;
pub mod guards;
pub mod pipeline;
mod error;

pub use app::{audit_router, VentraApp};
pub use error::VentraAxumError;
pub use extract::{CurrentIdentity, CurrentTenant, MaybeTenant};
pub use guards::{require_all, require_any, require_permission, require_role};
pub use pipeline::PipelineState;
