//! Self-service profile endpoints

use axum::{extract::State, Json};
use serde::Deserialize;
use sso_core::{User, UserUpdate};

use crate::extract::AuthUser;
use crate::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Fields a user may change on their own account. Role and status are
/// administrative and not accepted here.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// GET /api/v1/profile
pub async fn show(State(state): State<AppState>, AuthUser(ctx): AuthUser) -> ApiResult<User> {
    let user = state.core.users.find(&ctx.scope(), ctx.user_id()).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PATCH /api/v1/profile
pub async fn update(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(payload): Json<ProfileUpdate>,
) -> ApiResult<User> {
    let update = UserUpdate { name: payload.name, email: payload.email, ..Default::default() };
    let user = state.core.users.update(&ctx.scope(), ctx.user_id(), update).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// POST /api/v1/profile/password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    state
        .core
        .auth
        .change_password(&ctx, &payload.current_password, &payload.new_password)
        .await?;
    Ok(Json(ApiResponse::success_with_message((), "Password changed; please sign in again")))
}
