//! # SSO Core
//!
//! Identity and session core: domain entities, repository ports and the
//! services that enforce tenant isolation and the organisational invariants.

pub mod domain;
pub mod error;
pub mod notifier;
pub mod repositories;
pub mod services;

// Re-export domain entities
pub use domain::*;
pub use error::{DomainError, ErrorKind};
pub use notifier::{NotificationError, Notifier};
pub use services::{CoreSettings, IdentityCore, Stores};
