//! Tenant repository trait (port)

use async_trait::async_trait;
use sso_shared::Pagination;
use uuid::Uuid;

use crate::domain::Tenant;
use crate::error::DomainError;

/// Soft-deleted tenants are invisible to every read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// `TenantSlugAlreadyExists` when the slug is taken.
    async fn create(&self, tenant: &Tenant) -> Result<Tenant, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DomainError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DomainError>;
    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DomainError>;
    async fn exists_by_slug(&self, slug: &str) -> Result<bool, DomainError>;
    /// Whether a tenant other than `exclude` already owns `domain`.
    async fn exists_by_domain(&self, domain: &str, exclude: Option<Uuid>) -> Result<bool, DomainError>;
    async fn update(&self, tenant: &Tenant) -> Result<Tenant, DomainError>;
    async fn soft_delete(&self, id: Uuid) -> Result<(), DomainError>;
    async fn list(&self, page: Pagination) -> Result<Vec<Tenant>, DomainError>;
    async fn count(&self) -> Result<u64, DomainError>;
}
