// ============================================================================
// SSO Infrastructure - PostgreSQL Password Reset Repository
// File: crates/sso-infrastructure/src/database/postgres/password_reset_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use sso_core::domain::PasswordResetToken;
use sso_core::error::DomainError;
use sso_core::repositories::PasswordResetRepository;

use super::db_error;

pub struct PgPasswordResetRepository {
    pool: PgPool,
}

impl PgPasswordResetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PasswordResetRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PasswordResetRow> for PasswordResetToken {
    fn from(row: PasswordResetRow) -> Self {
        PasswordResetToken {
            id: row.id,
            user_id: row.user_id,
            tenant_id: row.tenant_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PasswordResetRepository for PgPasswordResetRepository {
    async fn issue(&self, token: &PasswordResetToken) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("opening transaction"))?;

        sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE user_id = $1 AND NOT used")
            .bind(token.user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("invalidating reset tokens"))?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, tenant_id, token_hash, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(token.tenant_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("storing reset token"))?;

        tx.commit().await.map_err(db_error("committing reset token"))?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetToken>, DomainError> {
        let row: Option<PasswordResetRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, tenant_id, token_hash, expires_at, used, created_at
            FROM password_reset_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding reset token"))?;

        Ok(row.map(Into::into))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < $1 OR used")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_error("purging reset tokens"))?;
        Ok(result.rows_affected())
    }
}
