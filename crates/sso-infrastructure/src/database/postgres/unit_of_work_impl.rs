// ============================================================================
// SSO Infrastructure - PostgreSQL Unit of Work
// File: crates/sso-infrastructure/src/database/postgres/unit_of_work_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use sso_core::domain::{Tenant, TenantScope, User};
use sso_core::error::DomainError;
use sso_core::repositories::UnitOfWork;

use super::tenant_repo_impl::insert_tenant;
use super::user_repo_impl::insert_user;
use super::{begin_scoped, bind_tenant, db_error};

pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn register_tenant(&self, tenant: &Tenant, admin: &User) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("opening transaction"))?;
        insert_tenant(&mut tx, tenant).await?;
        bind_tenant(&mut tx, tenant.id).await?;
        insert_user(&mut tx, admin).await?;
        tx.commit().await.map_err(db_error("committing registration"))?;

        info!("Tenant {} registered with admin {}", tenant.id, admin.id);
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        token_id: Uuid,
        scope: &TenantScope,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;

        let consumed = sqlx::query(
            "UPDATE password_reset_tokens SET used = TRUE WHERE id = $1 AND NOT used AND expires_at > $2",
        )
        .bind(token_id)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("consuming reset token"))?;
        if consumed.rows_affected() != 1 {
            tx.rollback().await.map_err(db_error("rolling back reset"))?;
            return Err(DomainError::ResetTokenUsed);
        }

        let updated = sqlx::query(
            r#"
            UPDATE users SET password_hash = $3, updated_at = $4
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(scope.tenant_id())
        .bind(password_hash)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("updating password"))?;
        if updated.rows_affected() != 1 {
            tx.rollback().await.map_err(db_error("rolling back reset"))?;
            return Err(DomainError::UserNotFound);
        }

        sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, revoked_at = $2 WHERE user_id = $1 AND NOT revoked",
        )
        .bind(user_id)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("revoking sessions"))?;

        tx.commit().await.map_err(db_error("committing reset"))?;
        Ok(())
    }
}
