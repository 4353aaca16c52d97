//! Cross-entity atomic operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Tenant, TenantScope, User};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Creates the tenant and its first user together or not at all.
    /// `TenantSlugAlreadyExists` if the slug was taken in the meantime.
    async fn register_tenant(&self, tenant: &Tenant, admin: &User) -> Result<(), DomainError>;

    /// Marks the reset token used (only if still unused), sets the new
    /// password hash and revokes every refresh token of the user, atomically.
    /// `ResetTokenUsed` when the token was consumed concurrently.
    async fn complete_password_reset(
        &self,
        token_id: Uuid,
        scope: &TenantScope,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}
