//! User repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sso_shared::Pagination;
use uuid::Uuid;

use crate::domain::{Role, TenantScope, User};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<Option<User>, DomainError>;
    /// `email` is already normalised.
    async fn find_by_email(&self, scope: &TenantScope, email: &str) -> Result<Option<User>, DomainError>;
    async fn list(&self, scope: &TenantScope, page: Pagination) -> Result<Vec<User>, DomainError>;
    async fn count(&self, scope: &TenantScope) -> Result<u64, DomainError>;
    async fn active_count(&self, scope: &TenantScope) -> Result<u64, DomainError>;
    /// Active, non-deleted owners and admins other than `excluding`.
    async fn count_other_active_admins(
        &self,
        scope: &TenantScope,
        excluding: Uuid,
    ) -> Result<u64, DomainError>;
    async fn count_by_role(&self, scope: &TenantScope) -> Result<Vec<(Role, u64)>, DomainError>;
    /// `EmailAlreadyExists` when the email is taken inside the tenant, and
    /// `TenantMaxUsersReached` when the tenant already holds `max_users` live
    /// users. Both checks run under the tenant lock.
    async fn create(&self, scope: &TenantScope, user: &User, max_users: u64) -> Result<User, DomainError>;
    /// Replaces name, email, role and active flag. Fails with `LastAdmin`
    /// when the stored row is the tenant's only active administrator and the
    /// new state no longer is one.
    async fn update(&self, scope: &TenantScope, user: &User) -> Result<User, DomainError>;
    /// Tombstones the user under the same last-admin rule as `update`.
    async fn soft_delete(&self, scope: &TenantScope, id: Uuid) -> Result<(), DomainError>;
    async fn update_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), DomainError>;
    async fn touch_last_login(
        &self,
        scope: &TenantScope,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}
