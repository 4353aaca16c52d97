// ============================================================================
// SSO Infrastructure - PostgreSQL User Repository
// File: crates/sso-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================
//! Every query runs in a transaction with `app.current_tenant` bound, so the
//! row level security policy on `users` applies on top of the explicit
//! `tenant_id` filter. Writes that can remove an administrator or add a user
//! take the tenant's advisory lock first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use sso_shared::Pagination;
use tracing::{info, warn};
use uuid::Uuid;

use sso_core::domain::{Role, TenantScope, User};
use sso_core::error::DomainError;
use sso_core::repositories::UserRepository;

use super::{begin_scoped, db_error, lock_tenant, to_count, unique_violation};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const USER_COLUMNS: &str = "id, tenant_id, email, password_hash, name, role, is_active, \
     last_login_at, created_at, updated_at, deleted_at";

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|_| DomainError::DatabaseError(format!("unknown role in users.role: {}", row.role)))?;
        Ok(User {
            id: row.id,
            tenant_id: row.tenant_id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn user_write_error(email: &str, e: sqlx::Error) -> DomainError {
    if unique_violation(&e).is_some() {
        return DomainError::EmailAlreadyExists(email.to_string());
    }
    db_error("writing user")(e)
}

pub(crate) async fn insert_user(
    tx: &mut Transaction<'static, Postgres>,
    user: &User,
) -> Result<User, DomainError> {
    let row: UserRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO users (
            id, tenant_id, email, password_hash, name, role, is_active,
            last_login_at, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(user.id)
    .bind(user.tenant_id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(user.is_active)
    .bind(user.last_login_at)
    .bind(user.created_at)
    .bind(user.updated_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| user_write_error(&user.email, e))?;

    row.try_into()
}

/// Locked read of the live row, for the last-admin decision.
async fn lock_user(
    tx: &mut Transaction<'static, Postgres>,
    scope: &TenantScope,
    id: Uuid,
) -> Result<User, DomainError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {} FROM users WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL FOR UPDATE",
        USER_COLUMNS
    ))
    .bind(id)
    .bind(scope.tenant_id())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_error("locking user"))?;

    row.ok_or(DomainError::UserNotFound)?.try_into()
}

async fn live_users(
    tx: &mut Transaction<'static, Postgres>,
    scope: &TenantScope,
) -> Result<u64, DomainError> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND deleted_at IS NULL",
    )
    .bind(scope.tenant_id())
    .fetch_one(&mut **tx)
    .await
    .map_err(db_error("counting users"))?;
    Ok(to_count(n))
}

async fn other_active_admins(
    tx: &mut Transaction<'static, Postgres>,
    scope: &TenantScope,
    excluding: Uuid,
) -> Result<u64, DomainError> {
    let n: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM users
        WHERE tenant_id = $1 AND id <> $2
          AND role IN ('owner', 'admin') AND is_active AND deleted_at IS NULL
        "#,
    )
    .bind(scope.tenant_id())
    .bind(excluding)
    .fetch_one(&mut **tx)
    .await
    .map_err(db_error("counting administrators"))?;
    Ok(to_count(n))
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<Option<User>, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(scope.tenant_id())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("finding user by id"))?;
        tx.commit().await.map_err(db_error("committing read"))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, scope: &TenantScope, email: &str) -> Result<Option<User>, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = $1 AND tenant_id = $2 AND deleted_at IS NULL",
            USER_COLUMNS
        ))
        .bind(email)
        .bind(scope.tenant_id())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("finding user by email"))?;
        tx.commit().await.map_err(db_error("committing read"))?;

        row.map(User::try_from).transpose()
    }

    async fn list(&self, scope: &TenantScope, page: Pagination) -> Result<Vec<User>, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM users
            WHERE tenant_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            USER_COLUMNS
        ))
        .bind(scope.tenant_id())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("listing users"))?;
        tx.commit().await.map_err(db_error("committing read"))?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn count(&self, scope: &TenantScope) -> Result<u64, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let n = live_users(&mut tx, scope).await?;
        tx.commit().await.map_err(db_error("committing read"))?;
        Ok(n)
    }

    async fn active_count(&self, scope: &TenantScope) -> Result<u64, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE tenant_id = $1 AND is_active AND deleted_at IS NULL",
        )
        .bind(scope.tenant_id())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("counting active users"))?;
        tx.commit().await.map_err(db_error("committing read"))?;
        Ok(to_count(n))
    }

    async fn count_other_active_admins(
        &self,
        scope: &TenantScope,
        excluding: Uuid,
    ) -> Result<u64, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let n = other_active_admins(&mut tx, scope, excluding).await?;
        tx.commit().await.map_err(db_error("committing read"))?;
        Ok(n)
    }

    async fn count_by_role(&self, scope: &TenantScope) -> Result<Vec<(Role, u64)>, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT role, COUNT(*) FROM users
            WHERE tenant_id = $1 AND deleted_at IS NULL
            GROUP BY role
            "#,
        )
        .bind(scope.tenant_id())
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("counting users by role"))?;
        tx.commit().await.map_err(db_error("committing read"))?;

        rows.into_iter()
            .map(|(role, n)| Ok((role.parse::<Role>()?, to_count(n))))
            .collect()
    }

    async fn create(&self, scope: &TenantScope, user: &User, max_users: u64) -> Result<User, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        lock_tenant(&mut tx, scope.tenant_id()).await?;

        if live_users(&mut tx, scope).await? >= max_users {
            warn!("Tenant {} is at its user limit of {}", scope.tenant_id(), max_users);
            return Err(DomainError::TenantMaxUsersReached);
        }
        let created = insert_user(&mut tx, user).await?;
        tx.commit().await.map_err(db_error("committing user"))?;

        info!("User created successfully: {}", created.id);
        Ok(created)
    }

    async fn update(&self, scope: &TenantScope, user: &User) -> Result<User, DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        lock_tenant(&mut tx, scope.tenant_id()).await?;

        let current = lock_user(&mut tx, scope, user.id).await?;
        let stays_admin = user.is_active && user.role.is_admin();
        if current.is_active_admin() && !stays_admin && other_active_admins(&mut tx, scope, user.id).await? == 0 {
            warn!("Refusing update that would remove the last admin of tenant {}", scope.tenant_id());
            return Err(DomainError::LastAdmin);
        }

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET email = $3, name = $4, role = $5, is_active = $6, updated_at = $7
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.id)
        .bind(scope.tenant_id())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| user_write_error(&user.email, e))?;
        tx.commit().await.map_err(db_error("committing user"))?;

        row.try_into()
    }

    async fn soft_delete(&self, scope: &TenantScope, id: Uuid) -> Result<(), DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        lock_tenant(&mut tx, scope.tenant_id()).await?;

        let current = lock_user(&mut tx, scope, id).await?;
        if current.is_active_admin() && other_active_admins(&mut tx, scope, id).await? == 0 {
            warn!("Refusing to delete the last admin of tenant {}", scope.tenant_id());
            return Err(DomainError::LastAdmin);
        }

        sqlx::query("UPDATE users SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(scope.tenant_id())
            .execute(&mut *tx)
            .await
            .map_err(db_error("deleting user"))?;
        tx.commit().await.map_err(db_error("committing delete"))?;
        Ok(())
    }

    async fn update_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        let result = sqlx::query(
            r#"
            UPDATE users SET password_hash = $3, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(scope.tenant_id())
        .bind(password_hash)
        .execute(&mut *tx)
        .await
        .map_err(db_error("updating password"))?;
        tx.commit().await.map_err(db_error("committing password"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::UserNotFound);
        }
        Ok(())
    }

    async fn touch_last_login(
        &self,
        scope: &TenantScope,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut tx = begin_scoped(&self.pool, scope).await?;
        sqlx::query("UPDATE users SET last_login_at = $3 WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(scope.tenant_id())
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(db_error("recording login"))?;
        tx.commit().await.map_err(db_error("committing login"))?;
        Ok(())
    }
}
