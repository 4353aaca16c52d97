// ============================================================================
// SSO Core - Authentication Service
// File: crates/sso-core/src/services/auth_service.rs
// ============================================================================
//! Authentication service with login, register, and token management

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sso_security::PasswordService;
use sso_shared::utils::{mask_email, normalize_email};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{IssuedRefreshToken, PasswordPolicy, RequestContext, Role, Tenant, TenantScope, User};
use crate::error::DomainError;
use crate::notifier::{dispatch, Notice, Notifier};
use crate::repositories::UnitOfWork;
use crate::services::{CoreSettings, SessionService, TenantService, UserService};

/// Credentials handed to the client after login, registration or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub tenant: Tenant,
    #[serde(flatten)]
    pub session: AuthSession,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RegisterRequest {
    pub tenant_name: String,
    pub tenant_slug: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Authentication service for handling user login/register flows
pub struct AuthService {
    tenants: Arc<TenantService>,
    users: Arc<UserService>,
    sessions: Arc<SessionService>,
    unit_of_work: Arc<dyn UnitOfWork>,
    passwords: PasswordService,
    notifier: Arc<dyn Notifier>,
    policy: PasswordPolicy,
}

impl AuthService {
    pub fn new(
        tenants: Arc<TenantService>,
        users: Arc<UserService>,
        sessions: Arc<SessionService>,
        unit_of_work: Arc<dyn UnitOfWork>,
        passwords: PasswordService,
        notifier: Arc<dyn Notifier>,
        settings: &CoreSettings,
    ) -> Self {
        Self {
            tenants,
            users,
            sessions,
            unit_of_work,
            passwords,
            notifier,
            policy: settings.password_policy,
        }
    }

    /// Login with email and password inside a known tenant
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        tenant_id: Uuid,
    ) -> Result<AuthSession, DomainError> {
        let email = normalize_email(email);
        let scope = TenantScope::new(tenant_id);

        // 1. Find user; a miss costs one hash verification like a hit
        let user = match self.users.find_by_email(&scope, &email).await {
            Ok(user) => user,
            Err(DomainError::UserNotFound) => {
                self.passwords.verify_dummy(password).await;
                warn!(tenant_id = %tenant_id, email = %mask_email(&email), "login failed: unknown account");
                return Err(DomainError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        // 2. Verify password
        if !self.passwords.verify(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "login failed: wrong password");
            return Err(DomainError::InvalidCredentials);
        }

        // 3. Check the account may sign in
        if !user.is_active {
            warn!(user_id = %user.id, "login failed: account disabled");
            return Err(DomainError::AccountDisabled);
        }

        // 4. Record the login and mint credentials
        self.users.update_last_login(&scope, user.id).await?;
        let session = self.open_session(user).await?;
        info!(user_id = %session.user.id, tenant_id = %tenant_id, "login succeeded");
        Ok(session)
    }

    /// Login where the tenant is named by slug. An unknown slug looks like bad credentials.
    pub async fn login_with_slug(
        &self,
        email: &str,
        password: &str,
        tenant_slug: &str,
    ) -> Result<AuthSession, DomainError> {
        match self.tenants.find_by_slug(tenant_slug).await {
            Ok(tenant) => self.login(email, password, tenant.id).await,
            Err(DomainError::TenantNotFound) => {
                self.passwords.verify_dummy(password).await;
                warn!("login failed: unknown tenant");
                Err(DomainError::InvalidCredentials)
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a tenant together with its first administrator.
    pub async fn register(&self, request: RegisterRequest) -> Result<Registration, DomainError> {
        let tenant = self
            .tenants
            .prepare(&request.tenant_name, &request.tenant_slug)
            .await?;
        let email = UserService::parse_email(&request.email)?;
        self.policy.check(&request.password)?;

        let password_hash = self.passwords.hash(&request.password).await?;
        let admin = User::new(
            tenant.id,
            email,
            password_hash,
            request.name.trim().to_string(),
            Role::Admin,
        );

        self.unit_of_work.register_tenant(&tenant, &admin).await?;
        info!(
            tenant_id = %tenant.id,
            slug = %tenant.slug,
            admin = %mask_email(&admin.email),
            "tenant registered"
        );

        dispatch(
            self.notifier.clone(),
            Notice::Welcome {
                email: admin.email.clone(),
                name: admin.name.clone(),
                tenant_name: tenant.name.clone(),
            },
        );

        let session = self.open_session(admin).await?;
        Ok(Registration { tenant, session })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, DomainError> {
        let rotated = self.sessions.validate_and_rotate(refresh_token).await?;
        let tokens = self.tokens(&rotated.access_token, &rotated.refresh_token);
        Ok(AuthSession { user: rotated.user, tokens })
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), DomainError> {
        self.sessions.logout(refresh_token).await
    }

    /// Changes the caller's password and ends every session they hold.
    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        let scope = ctx.scope();
        self.users
            .change_password(&scope, ctx.user_id(), old_password, new_password)
            .await?;
        self.sessions.revoke_all_for_user(&scope, ctx.user_id()).await?;
        Ok(())
    }

    async fn open_session(&self, user: User) -> Result<AuthSession, DomainError> {
        let access = self.sessions.issue_access_token(&user)?;
        let refresh = self.sessions.create(&user).await?;
        let tokens = self.tokens(&access, &refresh);
        Ok(AuthSession { user, tokens })
    }

    fn tokens(&self, access: &sso_security::AccessToken, refresh: &IssuedRefreshToken) -> AuthTokens {
        AuthTokens {
            access_token: access.token.clone(),
            refresh_token: refresh.secret.clone(),
            token_type: "Bearer",
            expires_in: self.sessions.access_token_ttl().num_seconds(),
            expires_at: access.expires_at,
        }
    }
}
