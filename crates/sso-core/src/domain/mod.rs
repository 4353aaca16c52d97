//! # SSO Core - Domain Module
//!
//! Domain entities for the identity core.

pub mod context;
pub mod password_reset_token;
pub mod refresh_token;
pub mod tenant;
pub mod user;

// Re-export all entities and enums
pub use context::{RequestContext, TenantHint, TenantScope};
pub use password_reset_token::PasswordResetToken;
pub use refresh_token::{IssuedRefreshToken, RefreshToken};
pub use tenant::{is_valid_domain, is_valid_slug, SubscriptionStatus, Tenant, TenantStats, TenantUpdate};
pub use user::{is_valid_email, NewUser, PasswordPolicy, Role, User, UserStats, UserUpdate};
