//! Domain services (business logic)

pub mod auth_service;
pub mod guard;
pub mod password_reset_service;
pub mod session_service;
pub mod tenant_service;
pub mod user_service;

use std::sync::Arc;

use chrono::Duration;
use sso_security::{JwtService, PasswordService};
use sso_shared::config::AppConfig;

use crate::domain::PasswordPolicy;
use crate::error::DomainError;
use crate::notifier::Notifier;
use crate::repositories::{
    PasswordResetRepository, RefreshTokenRepository, TenantRepository, UnitOfWork, UserRepository,
};

pub use auth_service::{AuthService, AuthSession, AuthTokens, RegisterRequest, Registration};
pub use guard::AuthorizationGuard;
pub use password_reset_service::{PasswordResetService, ResetRequestOutcome};
pub use session_service::{RotatedSession, SessionService};
pub use tenant_service::TenantService;
pub use user_service::UserService;

/// Policy values the services need, lifted out of [`AppConfig`].
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub revoked_retention: Duration,
    pub max_users_per_tenant: u64,
    pub password_policy: PasswordPolicy,
}

impl From<&AppConfig> for CoreSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            refresh_token_ttl: Duration::seconds(config.session.refresh_token_ttl_secs),
            reset_token_ttl: Duration::seconds(config.session.reset_token_ttl_secs),
            revoked_retention: Duration::days(config.session.revoked_retention_days),
            max_users_per_tenant: config.directory.max_users_per_tenant,
            password_policy: PasswordPolicy {
                min_length: config.password.min_length,
                max_length: config.password.max_length,
            },
        }
    }
}

/// The persistence adapters one core instance runs on.
#[derive(Clone)]
pub struct Stores {
    pub tenants: Arc<dyn TenantRepository>,
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
}

/// Every service of the identity core, wired once at startup.
#[derive(Clone)]
pub struct IdentityCore {
    pub tenants: Arc<TenantService>,
    pub users: Arc<UserService>,
    pub sessions: Arc<SessionService>,
    pub password_resets: Arc<PasswordResetService>,
    pub auth: Arc<AuthService>,
    pub guard: Arc<AuthorizationGuard>,
}

impl IdentityCore {
    pub fn new(
        config: &AppConfig,
        stores: Stores,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, DomainError> {
        let settings = CoreSettings::from(config);
        let jwt = Arc::new(JwtService::new(&config.jwt, config.session.access_token_ttl_secs));
        let passwords = PasswordService::new(&config.password)?;

        let tenants = Arc::new(TenantService::new(stores.tenants.clone(), stores.users.clone()));
        let users = Arc::new(UserService::new(
            stores.users.clone(),
            passwords.clone(),
            &settings,
        ));
        let sessions = Arc::new(SessionService::new(
            stores.refresh_tokens.clone(),
            stores.users.clone(),
            jwt.clone(),
            &settings,
        ));
        let password_resets = Arc::new(PasswordResetService::new(
            tenants.clone(),
            stores.users.clone(),
            stores.password_resets.clone(),
            stores.unit_of_work.clone(),
            passwords.clone(),
            notifier.clone(),
            &settings,
        ));
        let auth = Arc::new(AuthService::new(
            tenants.clone(),
            users.clone(),
            sessions.clone(),
            stores.unit_of_work.clone(),
            passwords,
            notifier,
            &settings,
        ));
        let guard = Arc::new(AuthorizationGuard::new(jwt, tenants.clone()));

        Ok(Self { tenants, users, sessions, password_resets, auth, guard })
    }
}
