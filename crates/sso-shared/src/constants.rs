//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 86_400;
pub const DEFAULT_REFRESH_TOKEN_EXPIRY: i64 = 604_800;
pub const DEFAULT_RESET_TOKEN_EXPIRY: i64 = 3_600;
pub const REVOKED_TOKEN_RETENTION_DAYS: i64 = 30;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

pub const DEFAULT_MAX_USERS_PER_TENANT: u64 = 100;
pub const TRIAL_PERIOD_DAYS: i64 = 14;

/// Bytes of entropy in refresh and reset secrets.
pub const OPAQUE_TOKEN_BYTES: usize = 32;

pub const MIN_JWT_SECRET_BYTES: usize = 32;

pub const TENANT_HEADER: &str = "X-Tenant-ID";
pub const RESERVED_SUBDOMAINS: &[&str] = &["www", "app"];
