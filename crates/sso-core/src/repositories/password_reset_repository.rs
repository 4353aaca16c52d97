//! Password reset token repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::PasswordResetToken;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Marks every outstanding token of the owner used, then stores `token`.
    async fn issue(&self, token: &PasswordResetToken) -> Result<(), DomainError>;
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetToken>, DomainError>;
    /// Purges tokens that are used or expired at `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError>;
}
