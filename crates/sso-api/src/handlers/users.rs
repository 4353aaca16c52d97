// ============================================================================
// SSO API - User Directory Handlers
// File: crates/sso-api/src/handlers/users.rs
// ============================================================================
//! Administrative user management inside the caller's tenant.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sso_core::{NewUser, User, UserStats, UserUpdate};
use sso_shared::constants::DEFAULT_PAGE_SIZE;
use sso_shared::Pagination;
use uuid::Uuid;

use crate::extract::AdminUser;
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<PageQuery> for Pagination {
    fn from(query: PageQuery) -> Self {
        Pagination::new(query.limit.unwrap_or(DEFAULT_PAGE_SIZE), query.offset.unwrap_or(0))
    }
}

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    AdminUser(ctx): AdminUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<UserPage> {
    let page = Pagination::from(query);
    let scope = ctx.scope();
    let users = state.core.users.list(&scope, page).await?;
    let total = state.core.users.count(&scope).await?;
    Ok(Json(ApiResponse::success(UserPage { users, total, limit: page.limit, offset: page.offset })))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    AdminUser(ctx): AdminUser,
    Json(payload): Json<NewUser>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let user = state.core.users.create(&ctx.scope(), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// PATCH /api/v1/users/{id}
pub async fn update(
    State(state): State<AppState>,
    AdminUser(ctx): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> ApiResult<User> {
    let user = state.core.users.update(&ctx.scope(), id, payload).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /api/v1/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    AdminUser(ctx): AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.core.users.delete(&ctx.scope(), id, ctx.user_id()).await?;
    Ok(Json(ApiResponse::success_with_message((), "User deleted")))
}

/// GET /api/v1/users/stats
pub async fn stats(State(state): State<AppState>, AdminUser(ctx): AdminUser) -> ApiResult<UserStats> {
    let stats = state.core.users.stats(&ctx.scope()).await?;
    Ok(Json(ApiResponse::success(stats)))
}
