//! PostgreSQL repository implementations

pub mod password_reset_repo_impl;
pub mod refresh_token_repo_impl;
pub mod tenant_repo_impl;
pub mod unit_of_work_impl;
pub mod user_repo_impl;

pub use password_reset_repo_impl::PgPasswordResetRepository;
pub use refresh_token_repo_impl::PgRefreshTokenRepository;
pub use tenant_repo_impl::PgTenantRepository;
pub use unit_of_work_impl::PgUnitOfWork;
pub use user_repo_impl::PgUserRepository;

use sqlx::{PgPool, Postgres, Transaction};
use sso_core::domain::TenantScope;
use sso_core::error::DomainError;
use tracing::error;
use uuid::Uuid;

/// Logs and wraps a driver error.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| {
        error!("Database error {}: {}", context, e);
        DomainError::DatabaseError(e.to_string())
    }
}

/// Name of the unique constraint a write violated, if that is why it failed.
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Opens a transaction with `app.current_tenant` bound for row level security.
pub(crate) async fn begin_scoped(
    pool: &PgPool,
    scope: &TenantScope,
) -> Result<Transaction<'static, Postgres>, DomainError> {
    let mut tx = pool.begin().await.map_err(db_error("opening transaction"))?;
    bind_tenant(&mut tx, scope.tenant_id()).await?;
    Ok(tx)
}

pub(crate) async fn bind_tenant(
    tx: &mut Transaction<'static, Postgres>,
    tenant_id: Uuid,
) -> Result<(), DomainError> {
    sqlx::query("SELECT set_config('app.current_tenant', $1, true)")
        .bind(tenant_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(db_error("binding tenant"))?;
    Ok(())
}

/// Serialises writers of one tenant until the transaction ends.
pub(crate) async fn lock_tenant(
    tx: &mut Transaction<'static, Postgres>,
    tenant_id: Uuid,
) -> Result<(), DomainError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(tenant_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(db_error("locking tenant"))?;
    Ok(())
}

pub(crate) fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}
