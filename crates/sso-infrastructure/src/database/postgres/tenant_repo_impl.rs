// ============================================================================
// SSO Infrastructure - PostgreSQL Tenant Repository
// File: crates/sso-infrastructure/src/database/postgres/tenant_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use sso_shared::Pagination;
use tracing::{error, info};
use uuid::Uuid;

use sso_core::domain::Tenant;
use sso_core::error::DomainError;
use sso_core::repositories::TenantRepository;

use super::{db_error, to_count, unique_violation};

pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const TENANT_COLUMNS: &str = "id, slug, name, domain, settings, subscription_status, \
     subscription_ends_at, created_at, updated_at, deleted_at";

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
pub(crate) struct TenantRow {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub domain: Option<String>,
    pub settings: Json<Map<String, Value>>,
    pub subscription_status: String,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Tenant {
            id: row.id,
            slug: row.slug,
            name: row.name,
            domain: row.domain,
            settings: row.settings.0,
            subscription_status: row.subscription_status.parse()?,
            subscription_ends_at: row.subscription_ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// Maps a failed tenant write to the conflict it represents.
pub(crate) fn tenant_write_error(tenant: &Tenant, e: sqlx::Error) -> DomainError {
    match unique_violation(&e).as_deref() {
        Some("tenants_slug_key") => DomainError::TenantSlugAlreadyExists(tenant.slug.clone()),
        Some("tenants_domain_key") => {
            DomainError::TenantDomainAlreadyExists(tenant.domain.clone().unwrap_or_default())
        }
        _ => {
            error!("Database error writing tenant: {}", e);
            DomainError::DatabaseError(e.to_string())
        }
    }
}

pub(crate) async fn insert_tenant(
    tx: &mut Transaction<'static, Postgres>,
    tenant: &Tenant,
) -> Result<Tenant, DomainError> {
    let row: TenantRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO tenants (
            id, slug, name, domain, settings, subscription_status,
            subscription_ends_at, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        TENANT_COLUMNS
    ))
    .bind(tenant.id)
    .bind(&tenant.slug)
    .bind(&tenant.name)
    .bind(&tenant.domain)
    .bind(Json(&tenant.settings))
    .bind(tenant.subscription_status.as_str())
    .bind(tenant.subscription_ends_at)
    .bind(tenant.created_at)
    .bind(tenant.updated_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| tenant_write_error(tenant, e))?;

    row.try_into()
}

impl PgTenantRepository {
    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tenants WHERE {} = $1 AND deleted_at IS NULL",
            TENANT_COLUMNS, filter
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding tenant"))?;

        row.map(Tenant::try_from).transpose()
    }
}

#[async_trait]
impl TenantRepository for PgTenantRepository {
    async fn create(&self, tenant: &Tenant) -> Result<Tenant, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("opening transaction"))?;
        let created = insert_tenant(&mut tx, tenant).await?;
        tx.commit().await.map_err(db_error("committing tenant"))?;

        info!("Tenant created successfully: {}", created.id);
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tenants WHERE id = $1 AND deleted_at IS NULL",
            TENANT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding tenant by id"))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DomainError> {
        self.find_one("slug", slug).await
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DomainError> {
        self.find_one("domain", domain).await
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool, DomainError> {
        // Deleted tenants keep their slug.
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("checking slug"))
    }

    async fn exists_by_domain(&self, domain: &str, exclude: Option<Uuid>) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tenants
                WHERE domain = $1 AND deleted_at IS NULL
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(domain)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("checking domain"))
    }

    async fn update(&self, tenant: &Tenant) -> Result<Tenant, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            r#"
            UPDATE tenants
            SET name = $2, domain = $3, settings = $4, subscription_status = $5,
                subscription_ends_at = $6, updated_at = $7
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            TENANT_COLUMNS
        ))
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.domain)
        .bind(Json(&tenant.settings))
        .bind(tenant.subscription_status.as_str())
        .bind(tenant.subscription_ends_at)
        .bind(tenant.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| tenant_write_error(tenant, e))?;

        row.ok_or(DomainError::TenantNotFound)?.try_into()
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE tenants SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error("deleting tenant"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TenantNotFound);
        }
        Ok(())
    }

    async fn list(&self, page: Pagination) -> Result<Vec<Tenant>, DomainError> {
        let rows: Vec<TenantRow> = sqlx::query_as(&format!(
            "SELECT {} FROM tenants WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            TENANT_COLUMNS
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("listing tenants"))?;

        rows.into_iter().map(Tenant::try_from).collect()
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("counting tenants"))?;
        Ok(to_count(n))
    }
}
