//! Database module (PostgreSQL and in-memory adapters)

pub mod connection;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use sqlx::PgPool;
use sso_core::Stores;

pub use connection::{create_pool, run_migrations};
pub use memory::MemoryStore;
pub use postgres::{
    PgPasswordResetRepository, PgRefreshTokenRepository, PgTenantRepository, PgUnitOfWork,
    PgUserRepository,
};

/// Postgres adapters for every repository port, sharing one pool.
pub fn postgres_stores(pool: PgPool) -> Stores {
    Stores {
        tenants: Arc::new(PgTenantRepository::new(pool.clone())),
        users: Arc::new(PgUserRepository::new(pool.clone())),
        refresh_tokens: Arc::new(PgRefreshTokenRepository::new(pool.clone())),
        password_resets: Arc::new(PgPasswordResetRepository::new(pool.clone())),
        unit_of_work: Arc::new(PgUnitOfWork::new(pool)),
    }
}
