// ============================================================================
// SSO Core - Password Reset Flow
// File: crates/sso-core/src/services/password_reset_service.rs
// ============================================================================
//! Request, validate and consume password-reset tokens
//!
//! A reset request never reveals whether the tenant or the account exists:
//! every miss returns the same outcome a hit does.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sso_security::secret::{digest_token, generate_opaque_token};
use sso_security::PasswordService;
use sso_shared::utils::{mask_email, normalize_email};
use tracing::{debug, info, warn};

use crate::domain::{PasswordPolicy, PasswordResetToken, TenantScope};
use crate::error::DomainError;
use crate::notifier::{dispatch, Notice, Notifier};
use crate::repositories::{PasswordResetRepository, UnitOfWork, UserRepository};
use crate::services::{CoreSettings, TenantService};

/// What `request_reset` did. Callers must answer both arms identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    Issued,
    Ignored,
}

pub struct PasswordResetService {
    tenants: Arc<TenantService>,
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
    passwords: PasswordService,
    notifier: Arc<dyn Notifier>,
    policy: PasswordPolicy,
    reset_ttl: Duration,
}

impl PasswordResetService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<TenantService>,
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
        passwords: PasswordService,
        notifier: Arc<dyn Notifier>,
        settings: &CoreSettings,
    ) -> Self {
        Self {
            tenants,
            users,
            resets,
            unit_of_work,
            passwords,
            notifier,
            policy: settings.password_policy,
            reset_ttl: settings.reset_token_ttl,
        }
    }

    pub async fn request_reset(
        &self,
        email: &str,
        tenant_slug: &str,
    ) -> Result<ResetRequestOutcome, DomainError> {
        let email = normalize_email(email);

        let tenant = match self.tenants.find_by_slug(tenant_slug).await {
            Ok(tenant) => tenant,
            Err(DomainError::TenantNotFound) => {
                debug!("reset request ignored: unknown tenant");
                return Ok(ResetRequestOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        let user = match self.users.find_by_email(&tenant.scope(), &email).await? {
            Some(user) if user.is_active => user,
            _ => {
                debug!(email = %mask_email(&email), "reset request ignored: no active account");
                return Ok(ResetRequestOutcome::Ignored);
            }
        };

        let secret = generate_opaque_token();
        let token = PasswordResetToken::new(user.id, user.tenant_id, digest_token(&secret), self.reset_ttl);
        self.resets.issue(&token).await?;

        dispatch(
            self.notifier.clone(),
            Notice::PasswordReset {
                email: user.email.clone(),
                name: user.name.clone(),
                token: secret,
            },
        );
        info!(user_id = %user.id, tenant_id = %user.tenant_id, "password reset issued");
        Ok(ResetRequestOutcome::Issued)
    }

    pub async fn validate(&self, secret: &str) -> Result<PasswordResetToken, DomainError> {
        let token = self
            .resets
            .find_by_hash(&digest_token(secret))
            .await?
            .ok_or(DomainError::InvalidResetToken)?;

        if token.used {
            return Err(DomainError::ResetTokenUsed);
        }
        if token.is_expired(Utc::now()) {
            return Err(DomainError::InvalidResetToken);
        }
        Ok(token)
    }

    pub async fn consume(&self, secret: &str, new_password: &str) -> Result<(), DomainError> {
        let token = self.validate(secret).await?;
        self.policy.check(new_password)?;

        let hash = self.passwords.hash(new_password).await?;
        let scope = TenantScope::new(token.tenant_id);
        self.unit_of_work
            .complete_password_reset(token.id, &scope, token.user_id, &hash, Utc::now())
            .await
            .inspect_err(|e| {
                if matches!(e, DomainError::ResetTokenUsed) {
                    warn!(token_id = %token.id, "reset token consumed concurrently");
                }
            })?;

        info!(user_id = %token.user_id, "password reset completed");
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> Result<u64, DomainError> {
        let purged = self.resets.delete_expired(Utc::now()).await?;
        if purged > 0 {
            info!(purged, "stale reset tokens purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, Tenant, User};
    use crate::notifier::MockNotifier;
    use crate::repositories::{
        MockPasswordResetRepository, MockTenantRepository, MockUnitOfWork, MockUserRepository,
    };
    use sso_shared::config::{AppConfig, PasswordSettings};

    struct Mocks {
        tenants: MockTenantRepository,
        users: MockUserRepository,
        resets: MockPasswordResetRepository,
        uow: MockUnitOfWork,
        notifier: MockNotifier,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                tenants: MockTenantRepository::new(),
                users: MockUserRepository::new(),
                resets: MockPasswordResetRepository::new(),
                uow: MockUnitOfWork::new(),
                notifier: MockNotifier::new(),
            }
        }

        fn build(self) -> PasswordResetService {
            let config = AppConfig::local("0123456789abcdef0123456789abcdef");
            let passwords = PasswordService::new(&PasswordSettings {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
                ..PasswordSettings::default()
            })
            .unwrap();
            let users: Arc<dyn UserRepository> = Arc::new(self.users);
            let tenants = Arc::new(TenantService::new(Arc::new(self.tenants), users.clone()));
            PasswordResetService::new(
                tenants,
                users,
                Arc::new(self.resets),
                Arc::new(self.uow),
                passwords,
                Arc::new(self.notifier),
                &CoreSettings::from(&config),
            )
        }
    }

    #[tokio::test]
    async fn test_unknown_tenant_and_user_look_alike() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let mut m = Mocks::new();
        m.tenants.expect_find_by_slug().returning(move |slug| {
            Ok((slug == "acme").then(|| tenant.clone()))
        });
        m.users.expect_find_by_email().returning(|_, _| Ok(None));
        m.resets.expect_issue().never();
        m.notifier.expect_send_password_reset().never();
        let svc = m.build();

        let unknown_tenant = svc.request_reset("a@b.io", "ghost").await.unwrap();
        let unknown_user = svc.request_reset("nobody@acme.test", "acme").await.unwrap();
        assert_eq!(unknown_tenant, ResetRequestOutcome::Ignored);
        assert_eq!(unknown_user, unknown_tenant);
    }

    #[tokio::test]
    async fn test_inactive_user_ignored() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let mut user = User::new(tenant.id, "bob@acme.test".into(), String::new(), "Bob".into(), Role::Agent);
        user.is_active = false;
        let mut m = Mocks::new();
        m.tenants.expect_find_by_slug().returning(move |_| Ok(Some(tenant.clone())));
        m.users.expect_find_by_email().returning(move |_, _| Ok(Some(user.clone())));
        m.resets.expect_issue().never();
        let svc = m.build();

        assert_eq!(
            svc.request_reset("bob@acme.test", "acme").await.unwrap(),
            ResetRequestOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_issue_stores_digest_and_notifies() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let user = User::new(tenant.id, "bob@acme.test".into(), String::new(), "Bob".into(), Role::Agent);
        let user_id = user.id;
        let mut m = Mocks::new();
        m.tenants.expect_find_by_slug().returning(move |_| Ok(Some(tenant.clone())));
        m.users
            .expect_find_by_email()
            .withf(|_, email| email == "bob@acme.test")
            .returning(move |_, _| Ok(Some(user.clone())));
        m.resets
            .expect_issue()
            .withf(move |t| t.user_id == user_id && !t.used && t.token_hash.len() == 64)
            .times(1)
            .returning(|_| Ok(()));
        m.notifier
            .expect_send_password_reset()
            .returning(|_, _, _| Ok(()));
        let svc = m.build();

        assert_eq!(
            svc.request_reset(" BOB@acme.test", "acme").await.unwrap(),
            ResetRequestOutcome::Issued
        );
    }

    #[tokio::test]
    async fn test_validate_states() {
        let used = {
            let mut t = PasswordResetToken::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), digest_token("used"), Duration::hours(1));
            t.used = true;
            t
        };
        let expired = PasswordResetToken::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), digest_token("old"), Duration::hours(-1));
        let mut m = Mocks::new();
        m.resets.expect_find_by_hash().returning(move |hash| {
            if hash == used.token_hash {
                Ok(Some(used.clone()))
            } else if hash == expired.token_hash {
                Ok(Some(expired.clone()))
            } else {
                Ok(None)
            }
        });
        let svc = m.build();

        assert!(matches!(svc.validate("used").await, Err(DomainError::ResetTokenUsed)));
        assert!(matches!(svc.validate("old").await, Err(DomainError::InvalidResetToken)));
        assert!(matches!(svc.validate("missing").await, Err(DomainError::InvalidResetToken)));
    }

    #[tokio::test]
    async fn test_consume_short_password_touches_nothing() {
        let token = PasswordResetToken::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), digest_token("ok"), Duration::hours(1));
        let mut m = Mocks::new();
        m.resets.expect_find_by_hash().returning(move |_| Ok(Some(token.clone())));
        m.uow.expect_complete_password_reset().never();
        let svc = m.build();

        assert!(matches!(
            svc.consume("ok", "short").await,
            Err(DomainError::InvalidPassword { .. })
        ));
    }

    #[tokio::test]
    async fn test_consume_runs_one_unit_of_work() {
        let token = PasswordResetToken::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), digest_token("ok"), Duration::hours(1));
        let (token_id, user_id, tenant_id) = (token.id, token.user_id, token.tenant_id);
        let mut m = Mocks::new();
        m.resets.expect_find_by_hash().returning(move |_| Ok(Some(token.clone())));
        m.uow
            .expect_complete_password_reset()
            .withf(move |tid, scope, uid, hash, _| {
                *tid == token_id
                    && scope.tenant_id() == tenant_id
                    && *uid == user_id
                    && hash.starts_with("$argon2id$")
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        let svc = m.build();

        svc.consume("ok", "brand-new-password").await.unwrap();
    }

    #[tokio::test]
    async fn test_consume_race_loser_sees_used() {
        let token = PasswordResetToken::new(uuid::Uuid::new_v4(), uuid::Uuid::new_v4(), digest_token("ok"), Duration::hours(1));
        let mut m = Mocks::new();
        m.resets.expect_find_by_hash().returning(move |_| Ok(Some(token.clone())));
        m.uow
            .expect_complete_password_reset()
            .returning(|_, _, _, _, _| Err(DomainError::ResetTokenUsed));
        let svc = m.build();

        assert!(matches!(
            svc.consume("ok", "brand-new-password").await,
            Err(DomainError::ResetTokenUsed)
        ));
    }
}
