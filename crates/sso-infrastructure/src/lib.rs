//! # SSO Infrastructure
//!
//! Persistence and delivery adapters for the identity core ports.

pub mod database;
pub mod notifier;

pub use database::{create_pool, postgres_stores, run_migrations, MemoryStore};
pub use notifier::LogNotifier;
