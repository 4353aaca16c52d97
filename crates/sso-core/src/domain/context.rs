//! Request identity and tenant isolation
//!
//! [`RequestContext`] is built only from a verified access token and is passed
//! explicitly down every call chain. [`TenantScope`] is the capability every
//! tenant-partitioned repository method demands; outside this crate it can
//! only be obtained from a context or a tenant the directory returned.

use sso_security::Claims;
use uuid::Uuid;

use crate::domain::{Role, Tenant};
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantScope {
    tenant_id: Uuid,
}

impl TenantScope {
    pub(crate) fn new(tenant_id: Uuid) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl Tenant {
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.id)
    }
}

/// Immutable identity of the caller for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    user_id: Uuid,
    tenant_id: Uuid,
    email: String,
    role: Role,
}

impl RequestContext {
    /// Claims with an unknown role are treated as an invalid token.
    pub(crate) fn from_claims(claims: Claims) -> Result<Self, DomainError> {
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| DomainError::InvalidAccessToken)?;
        Ok(Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            email: claims.email,
            role,
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.tenant_id)
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), DomainError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                role = %self.role,
                "insufficient role"
            );
            Err(DomainError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), DomainError> {
        self.require_role(&[Role::Owner, Role::Admin])
    }
}

/// Unauthenticated tenant hints taken from a public request.
#[derive(Debug, Clone, Default)]
pub struct TenantHint {
    /// Raw `X-Tenant-ID` header value.
    pub header: Option<String>,
    /// Raw `Host` header value, port allowed.
    pub host: Option<String>,
}
