//! The caller's own tenant

use axum::{extract::State, Json};
use sso_core::{Tenant, TenantStats, TenantUpdate};

use crate::extract::{AdminUser, AuthUser};
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/v1/tenant
pub async fn current(State(state): State<AppState>, AuthUser(ctx): AuthUser) -> ApiResult<Tenant> {
    let tenant = state.core.tenants.find_by_id(ctx.tenant_id()).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// PATCH /api/v1/tenant
pub async fn update(
    State(state): State<AppState>,
    AdminUser(ctx): AdminUser,
    Json(payload): Json<TenantUpdate>,
) -> ApiResult<Tenant> {
    let tenant = state.core.tenants.update(ctx.tenant_id(), payload).await?;
    Ok(Json(ApiResponse::success(tenant)))
}

/// GET /api/v1/tenant/stats
pub async fn stats(State(state): State<AppState>, AdminUser(ctx): AdminUser) -> ApiResult<TenantStats> {
    let stats = state.core.tenants.stats(ctx.tenant_id()).await?;
    Ok(Json(ApiResponse::success(stats)))
}
