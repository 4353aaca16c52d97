// ============================================================================
// SSO API - Auth Handlers
// File: crates/sso-api/src/handlers/auth.rs
// ============================================================================
//! Public authentication endpoints: register, login, refresh, logout and the
//! password reset flow.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sso_core::services::{AuthSession, RegisterRequest, Registration};
use sso_core::DomainError;

use crate::extract::PublicHint;
use crate::response::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

const RESET_REQUESTED: &str = "If the account exists, a password reset link has been sent";

/// Login request payload. Without `tenant_slug` the tenant comes from the
/// `X-Tenant-ID` header or the request host.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub tenant_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    #[serde(default)]
    pub tenant_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenStatus {
    pub valid: bool,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Registration>>), ApiError> {
    let registration = state.core.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(registration))))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    PublicHint(hint): PublicHint,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<AuthSession> {
    let auth = &state.core.auth;
    let session = match payload.tenant_slug.as_deref() {
        Some(slug) => auth.login_with_slug(&payload.email, &payload.password, slug).await?,
        None => {
            let tenant = match state.core.guard.resolve_public_tenant(&hint).await {
                Ok(tenant) => tenant,
                Err(DomainError::TenantNotFound) => return Err(DomainError::InvalidCredentials.into()),
                Err(e) => return Err(e.into()),
            };
            auth.login(&payload.email, &payload.password, tenant.id).await?
        }
    };
    Ok(Json(ApiResponse::success(session)))
}

/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<AuthSession> {
    let session = state.core.auth.refresh(&payload.refresh_token).await?;
    Ok(Json(ApiResponse::success(session)))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<()> {
    state.core.auth.logout(&payload.refresh_token).await?;
    Ok(Json(ApiResponse::success_with_message((), "Logged out successfully")))
}

/// POST /api/v1/auth/forgot-password
///
/// Answers identically whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    PublicHint(hint): PublicHint,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<()> {
    let slug = match payload.tenant_slug {
        Some(slug) => slug,
        None => match state.core.guard.resolve_public_tenant(&hint).await {
            Ok(tenant) => tenant.slug,
            Err(DomainError::TenantNotFound) => {
                return Ok(Json(ApiResponse::success_with_message((), RESET_REQUESTED)))
            }
            Err(e) => return Err(e.into()),
        },
    };

    state.core.password_resets.request_reset(&payload.email, &slug).await?;
    Ok(Json(ApiResponse::success_with_message((), RESET_REQUESTED)))
}

/// GET /api/v1/auth/reset-password/validate?token=
pub async fn validate_reset_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<ResetTokenStatus> {
    let token = state.core.password_resets.validate(&query.token).await?;
    Ok(Json(ApiResponse::success(ResetTokenStatus { valid: true, expires_at: token.expires_at })))
}

/// POST /api/v1/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    state.core.password_resets.consume(&payload.token, &payload.password).await?;
    Ok(Json(ApiResponse::success_with_message((), "Password has been reset")))
}
