//! Refresh token repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{RefreshToken, TenantScope};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> Result<(), DomainError>;
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError>;
    /// `false` when the token was already revoked or does not exist.
    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError>;
    /// Revokes `old_id` only if it is still valid at `at`, and inserts
    /// `successor` in the same transaction. `false` means another caller won.
    async fn rotate(
        &self,
        old_id: Uuid,
        successor: &RefreshToken,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;
    async fn revoke_all_for_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DomainError>;
    /// Purges tokens expired before `now` or revoked before `revoked_before`.
    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64, DomainError>;
}
