//! Application assembly: router, pipeline layers and the audit endpoints.

use axum::extract::{Query, State};
use axum::http::HeaderName;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use ventra_audit::{
    ActionCount, ActorCount, AuditFilter, AuditPage, EntityTypeCount, PageRequest,
    DEFAULT_TOP_ACTORS,
};
use ventra_core::identity::Identity;
use ventra_core::tenant::{TenantContext, TenantId};

use crate::extract::{CurrentIdentity, MaybeTenant};
use crate::pipeline::{auth_middleware, tenant_middleware, PipelineState};
use crate::VentraAxumError;

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Builder wiring business routes into the access-control pipeline.
///
/// Every registered route runs behind tenant resolution and
/// authentication; route guards and handler-level checks provide the
/// authorization stage.
pub struct VentraApp {
    state: PipelineState,
    router: Router<PipelineState>,
}

impl VentraApp {
    pub fn new(state: PipelineState) -> Self {
        Self {
            state,
            router: Router::new().route("/health", get(health)),
        }
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter<PipelineState>) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn merge(mut self, other: Router<PipelineState>) -> Self {
        self.router = self.router.merge(other);
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Finalize the router. The pipeline layers are applied here so that a
    /// request passes request-id assignment, tracing, tenant resolution and
    /// authentication in that order before any route code runs.
    pub fn into_router(self) -> Router<()> {
        self.router
            .layer(from_fn_with_state(self.state.clone(), auth_middleware))
            .layer(from_fn_with_state(self.state.clone(), tenant_middleware))
            .with_state(self.state)
            .layer(PropagateRequestIdLayer::new(REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(REQUEST_ID, MakeRequestUuid))
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.into_router()).await?;
        Ok(())
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Audit retrieval endpoints, all behind `view_audit`.
pub fn audit_router() -> Router<PipelineState> {
    Router::new()
        .route("/api/audit", get(list_audit))
        .route("/api/audit/stats/actions", get(stats_by_action))
        .route("/api/audit/stats/entities", get(stats_by_entity_type))
        .route("/api/audit/stats/actors", get(stats_top_actors))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuditQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub action: Option<ventra_audit::AuditAction>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub tenant_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl AuditQuery {
    /// Translate the query into a store filter, scoped to the caller.
    ///
    /// Non-platform callers only ever see their own tenant's records no
    /// matter what they ask for; a platform admin may select any tenant
    /// (or none) through `tenantId`.
    fn filter_for(&self, identity: &Identity, tenant: Option<&TenantContext>) -> AuditFilter {
        let mut filter = AuditFilter {
            action: self.action,
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            actor_id: self.actor_id.clone(),
            actor_name: self.actor_name.clone(),
            ..AuditFilter::default()
        };
        if let Some(date) = self.start_date {
            filter = filter.with_start_date(date);
        }
        if let Some(date) = self.end_date {
            filter = filter.with_end_date(date);
        }

        filter.tenant_id = if identity.role.is_platform_admin() {
            self.tenant_id.clone().map(TenantId::new)
        } else {
            tenant
                .map(|t| t.id.clone())
                .or_else(|| identity.tenant_id.clone())
        };

        filter
    }

    fn page(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page).max(1),
            limit: self.limit.unwrap_or(defaults.limit).max(1),
        }
    }
}

async fn list_audit(
    State(state): State<PipelineState>,
    CurrentIdentity(identity): CurrentIdentity,
    MaybeTenant(tenant): MaybeTenant,
    Query(params): Query<AuditQuery>,
) -> Result<Json<AuditPage>, VentraAxumError> {
    state.engine.authorize(&identity, "view_audit")?;
    let filter = params.filter_for(&identity, tenant.as_ref());
    let page = state.trail.query(&filter, params.page()).await?;
    Ok(Json(page))
}

async fn stats_by_action(
    State(state): State<PipelineState>,
    CurrentIdentity(identity): CurrentIdentity,
    MaybeTenant(tenant): MaybeTenant,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<ActionCount>>, VentraAxumError> {
    state.engine.authorize(&identity, "view_audit")?;
    let filter = params.filter_for(&identity, tenant.as_ref());
    let counts = state.trail.aggregate_by_action(&filter).await?;
    Ok(Json(counts))
}

async fn stats_by_entity_type(
    State(state): State<PipelineState>,
    CurrentIdentity(identity): CurrentIdentity,
    MaybeTenant(tenant): MaybeTenant,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<EntityTypeCount>>, VentraAxumError> {
    state.engine.authorize(&identity, "view_audit")?;
    let filter = params.filter_for(&identity, tenant.as_ref());
    let counts = state.trail.aggregate_by_entity_type(&filter).await?;
    Ok(Json(counts))
}

async fn stats_top_actors(
    State(state): State<PipelineState>,
    CurrentIdentity(identity): CurrentIdentity,
    MaybeTenant(tenant): MaybeTenant,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<ActorCount>>, VentraAxumError> {
    state.engine.authorize(&identity, "view_audit")?;
    let filter = params.filter_for(&identity, tenant.as_ref());
    let top_n = params.limit.unwrap_or(DEFAULT_TOP_ACTORS).max(1);
    let actors = state.trail.aggregate_top_actors(&filter, top_n).await?;
    Ok(Json(actors))
}
