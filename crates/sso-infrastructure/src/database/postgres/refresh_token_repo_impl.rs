// ============================================================================
// SSO Infrastructure - PostgreSQL Refresh Token Repository
// File: crates/sso-infrastructure/src/database/postgres/refresh_token_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use sso_core::domain::{RefreshToken, TenantScope};
use sso_core::error::DomainError;
use sso_core::repositories::RefreshTokenRepository;

use super::db_error;

pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            user_id: row.user_id,
            tenant_id: row.tenant_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            revoked: row.revoked,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        }
    }
}

const INSERT_TOKEN: &str = r#"
    INSERT INTO refresh_tokens (
        id, user_id, tenant_id, token_hash, expires_at, revoked, revoked_at, created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
"#;

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn create(&self, token: &RefreshToken) -> Result<(), DomainError> {
        sqlx::query(INSERT_TOKEN)
            .bind(token.id)
            .bind(token.user_id)
            .bind(token.tenant_id)
            .bind(&token.token_hash)
            .bind(token.expires_at)
            .bind(token.revoked)
            .bind(token.revoked_at)
            .bind(token.created_at)
            .execute(&self.pool)
            .await
            .map_err(db_error("storing refresh token"))?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, tenant_id, token_hash, expires_at, revoked, revoked_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("finding refresh token"))?;

        Ok(row.map(Into::into))
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, revoked_at = $2 WHERE id = $1 AND NOT revoked",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("revoking refresh token"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn rotate(
        &self,
        old_id: Uuid,
        successor: &RefreshToken,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("opening transaction"))?;

        // The row lock makes a concurrent rotation wait and then match nothing.
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked = TRUE, revoked_at = $2
            WHERE id = $1 AND NOT revoked AND expires_at > $2
            "#,
        )
        .bind(old_id)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("revoking rotated token"))?;

        if revoked.rows_affected() != 1 {
            tx.rollback().await.map_err(db_error("rolling back rotation"))?;
            return Ok(false);
        }

        sqlx::query(INSERT_TOKEN)
            .bind(successor.id)
            .bind(successor.user_id)
            .bind(successor.tenant_id)
            .bind(&successor.token_hash)
            .bind(successor.expires_at)
            .bind(successor.revoked)
            .bind(successor.revoked_at)
            .bind(successor.created_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("storing successor token"))?;

        tx.commit().await.map_err(db_error("committing rotation"))?;
        Ok(true)
    }

    async fn revoke_all_for_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked = TRUE, revoked_at = $3
            WHERE user_id = $1 AND tenant_id = $2 AND NOT revoked
            "#,
        )
        .bind(user_id)
        .bind(scope.tenant_id())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db_error("revoking user tokens"))?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE expires_at < $1 OR (revoked AND revoked_at < $2)",
        )
        .bind(now)
        .bind(revoked_before)
        .execute(&self.pool)
        .await
        .map_err(db_error("purging refresh tokens"))?;
        Ok(result.rows_affected())
    }
}
