//! Authorization guard
//!
//! Turns a bearer header into a [`RequestContext`], and resolves the tenant
//! for public endpoints that run before anyone is signed in.

use std::sync::Arc;

use sso_security::JwtService;
use sso_shared::constants::RESERVED_SUBDOMAINS;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{RequestContext, Tenant, TenantHint};
use crate::error::DomainError;
use crate::services::TenantService;

pub struct AuthorizationGuard {
    jwt: Arc<JwtService>,
    tenants: Arc<TenantService>,
}

impl AuthorizationGuard {
    pub fn new(jwt: Arc<JwtService>, tenants: Arc<TenantService>) -> Self {
        Self { jwt, tenants }
    }

    /// Expects the raw `Authorization` header value.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<RequestContext, DomainError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                warn!("missing or malformed authorization header");
                DomainError::InvalidAccessToken
            })?;

        let claims = self.jwt.verify(token)?;
        RequestContext::from_claims(claims)
    }

    /// Tenant for an unauthenticated request: `X-Tenant-ID` first, then the
    /// leading label of a host with at least three labels.
    pub async fn resolve_public_tenant(&self, hint: &TenantHint) -> Result<Tenant, DomainError> {
        if let Some(header) = hint.header.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            let id = Uuid::parse_str(header).map_err(|_| DomainError::InvalidTenantHint)?;
            return self.tenants.find_by_id(id).await;
        }

        if let Some(slug) = hint.host.as_deref().and_then(subdomain_of) {
            return self.tenants.find_by_slug(slug).await;
        }

        Err(DomainError::TenantRequired)
    }
}

fn subdomain_of(host: &str) -> Option<&str> {
    let host = host.split(':').next().unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }
    let first = labels[0];
    if first.is_empty() || RESERVED_SUBDOMAINS.contains(&first) {
        return None;
    }
    Some(first)
}
