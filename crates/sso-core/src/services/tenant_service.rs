// ============================================================================
// SSO Core - Tenant Directory
// File: crates/sso-core/src/services/tenant_service.rs
// ============================================================================
//! Tenant lifecycle: creation, lookup, update, soft delete and listing

use std::sync::Arc;

use chrono::Utc;
use sso_shared::Pagination;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{is_valid_domain, is_valid_slug, Tenant, TenantStats, TenantUpdate};
use crate::error::DomainError;
use crate::repositories::{TenantRepository, UserRepository};

pub struct TenantService {
    tenants: Arc<dyn TenantRepository>,
    users: Arc<dyn UserRepository>,
}

impl TenantService {
    pub fn new(tenants: Arc<dyn TenantRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tenants, users }
    }

    /// Validates name and slug and checks the slug is free, without persisting.
    pub async fn prepare(&self, name: &str, slug: &str) -> Result<Tenant, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidTenantName);
        }
        let slug = slug.trim();
        if !is_valid_slug(slug) {
            return Err(DomainError::InvalidSlug);
        }
        if self.tenants.exists_by_slug(slug).await? {
            return Err(DomainError::TenantSlugAlreadyExists(slug.to_string()));
        }
        Ok(Tenant::new(name.to_string(), slug.to_string()))
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<Tenant, DomainError> {
        let tenant = self.prepare(name, slug).await?;
        let created = self.tenants.create(&tenant).await?;
        info!(tenant_id = %created.id, slug = %created.slug, "tenant created");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Tenant, DomainError> {
        self.tenants
            .find_by_id(id)
            .await?
            .ok_or(DomainError::TenantNotFound)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Tenant, DomainError> {
        self.tenants
            .find_by_slug(slug.trim())
            .await?
            .ok_or(DomainError::TenantNotFound)
    }

    pub async fn find_by_domain(&self, domain: &str) -> Result<Tenant, DomainError> {
        self.tenants
            .find_by_domain(&domain.trim().to_lowercase())
            .await?
            .ok_or(DomainError::TenantNotFound)
    }

    pub async fn update(&self, id: Uuid, update: TenantUpdate) -> Result<Tenant, DomainError> {
        let mut tenant = self.find_by_id(id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::InvalidTenantName);
            }
            tenant.name = name.to_string();
        }

        if let Some(domain) = update.domain {
            let domain = domain.trim().to_lowercase();
            if domain.is_empty() {
                tenant.domain = None;
            } else {
                if !is_valid_domain(&domain) {
                    return Err(DomainError::InvalidDomain);
                }
                if self.tenants.exists_by_domain(&domain, Some(id)).await? {
                    warn!(tenant_id = %id, domain = %domain, "domain already claimed");
                    return Err(DomainError::TenantDomainAlreadyExists(domain));
                }
                tenant.domain = Some(domain);
            }
        }

        if let Some(settings) = update.settings {
            tenant.merge_settings(settings);
        }
        if let Some(status) = update.subscription_status {
            tenant.subscription_status = status;
        }
        if let Some(ends_at) = update.subscription_ends_at {
            tenant.subscription_ends_at = ends_at;
        }
        tenant.updated_at = Utc::now();

        let updated = self.tenants.update(&tenant).await?;
        info!(tenant_id = %id, "tenant updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        self.tenants.soft_delete(id).await?;
        info!(tenant_id = %id, "tenant deleted");
        Ok(())
    }

    pub async fn list(&self, page: Pagination) -> Result<Vec<Tenant>, DomainError> {
        let page = Pagination::new(page.limit, page.offset);
        self.tenants.list(page).await
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        self.tenants.count().await
    }

    pub async fn stats(&self, id: Uuid) -> Result<TenantStats, DomainError> {
        let tenant = self.find_by_id(id).await?;
        let user_count = self.users.count(&tenant.scope()).await?;
        let days_remaining = tenant
            .subscription_ends_at
            .map(|ends| (ends - Utc::now()).num_days().max(0));

        Ok(TenantStats {
            user_count,
            subscription_status: tenant.subscription_status,
            created_at: tenant.created_at,
            subscription_ends_at: tenant.subscription_ends_at,
            days_remaining,
        })
    }
}
