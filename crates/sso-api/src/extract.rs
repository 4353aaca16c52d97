//! Request extractors that turn headers into identity

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sso_core::{RequestContext, TenantHint};
use sso_shared::constants::TENANT_HEADER;

use crate::response::ApiError;
use crate::state::AppState;

/// Caller authenticated by a bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let ctx = state.core.guard.authenticate(authorization)?;
        Ok(Self(ctx))
    }
}

/// Authenticated caller holding `admin` or `owner`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub RequestContext);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(ctx) = AuthUser::from_request_parts(parts, state).await?;
        ctx.require_admin()?;
        Ok(Self(ctx))
    }
}

/// Unverified tenant hints of a public request.
#[derive(Debug, Clone, Default)]
pub struct PublicHint(pub TenantHint);

impl<S: Send + Sync> FromRequestParts<S> for PublicHint {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let read = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        Ok(Self(TenantHint {
            header: read(TENANT_HEADER),
            host: read(header::HOST.as_str()),
        }))
    }
}
