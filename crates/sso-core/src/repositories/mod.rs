//! Repository traits (ports)
//!
//! Implementations must make every method that touches more than one row
//! atomic. The user store additionally owns the last-admin rule: it rejects
//! any write that would leave a tenant without an active administrator, with
//! the check and the write serialised per tenant.

pub mod password_reset_repository;
pub mod refresh_token_repository;
pub mod tenant_repository;
pub mod unit_of_work;
pub mod user_repository;

pub use password_reset_repository::PasswordResetRepository;
pub use refresh_token_repository::RefreshTokenRepository;
pub use tenant_repository::TenantRepository;
pub use unit_of_work::UnitOfWork;
pub use user_repository::UserRepository;

#[cfg(test)]
pub use password_reset_repository::MockPasswordResetRepository;
#[cfg(test)]
pub use refresh_token_repository::MockRefreshTokenRepository;
#[cfg(test)]
pub use tenant_repository::MockTenantRepository;
#[cfg(test)]
pub use unit_of_work::MockUnitOfWork;
#[cfg(test)]
pub use user_repository::MockUserRepository;
