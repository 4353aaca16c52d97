//! Configuration management
//!
//! Loaded once at startup and handed to the services that need it; nothing in
//! the identity core reads configuration from global state.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::*;
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub directory: DirectorySettings,
    #[serde(default)]
    pub password: PasswordSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Postgres URL, or `memory://` for the in-process store.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_issuer() -> String {
    "sso".to_string()
}

/// Lifetimes of the credentials the session core hands out.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionSettings {
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub reset_token_ttl_secs: i64,
    /// How long revoked refresh tokens are kept for incident response.
    pub revoked_retention_days: i64,
    /// Interval of the background token sweeper.
    pub cleanup_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_EXPIRY,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_EXPIRY,
            reset_token_ttl_secs: DEFAULT_RESET_TOKEN_EXPIRY,
            revoked_retention_days: REVOKED_TOKEN_RETENTION_DAYS,
            cleanup_interval_secs: 3_600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DirectorySettings {
    /// Live users a tenant may hold. Tenants cannot change this themselves.
    pub max_users_per_tenant: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self { max_users_per_tenant: DEFAULT_MAX_USERS_PER_TENANT }
    }
}

/// Argon2id work factor and password policy.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PasswordSettings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
            min_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { filter: "info".to_string() }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.host", "127.0.0.1")?
            .set_default("app.port", 8080)?
            .set_default("app.name", "sso-server")?
            .set_default("database.url", "memory://")?
            .set_default("database.max_connections", 10)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with the in-process store and the given signing secret.
    pub fn local(secret: impl Into<String>) -> Self {
        AppConfig {
            app: AppSettings {
                env: "development".into(),
                host: "127.0.0.1".into(),
                port: 8080,
                name: "sso-server".into(),
            },
            database: DatabaseSettings { url: "memory://".into(), max_connections: 1 },
            jwt: JwtSettings { secret: secret.into(), issuer: default_issuer() },
            session: SessionSettings::default(),
            directory: DirectorySettings::default(),
            password: PasswordSettings::default(),
            log: LogSettings::default(),
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database.url.starts_with("memory://")
    }

    /// Rejects settings the identity core cannot run safely with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(AppError::InvalidConfig(format!(
                "jwt.secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }
        if self.session.access_token_ttl_secs <= 0
            || self.session.refresh_token_ttl_secs <= 0
            || self.session.reset_token_ttl_secs <= 0
        {
            return Err(AppError::InvalidConfig("token lifetimes must be positive".into()));
        }
        if self.session.cleanup_interval_secs == 0 {
            return Err(AppError::InvalidConfig("session.cleanup_interval_secs must be positive".into()));
        }
        if self.password.min_length > self.password.max_length {
            return Err(AppError::InvalidConfig(
                "password.min_length exceeds password.max_length".into(),
            ));
        }
        Ok(())
    }
}
