// ============================================================================
// SSO Core - User Directory
// File: crates/sso-core/src/services/user_service.rs
// ============================================================================
//! Tenant-scoped user management
//!
//! Every operation requires a [`TenantScope`]. The last-admin rule and the
//! user ceiling are checked here for an early answer; the store re-checks both
//! under a per-tenant lock and its answer is authoritative. The ceiling comes
//! from `directory.max_users_per_tenant` only; tenant settings cannot raise it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use sso_security::PasswordService;
use sso_shared::utils::{mask_email, normalize_email};
use sso_shared::Pagination;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    is_valid_email, NewUser, PasswordPolicy, Role, TenantScope, User, UserStats, UserUpdate,
};
use crate::error::DomainError;
use crate::repositories::UserRepository;
use crate::services::CoreSettings;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    passwords: PasswordService,
    policy: PasswordPolicy,
    max_users: u64,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: PasswordService,
        settings: &CoreSettings,
    ) -> Self {
        Self {
            users,
            passwords,
            policy: settings.password_policy,
            max_users: settings.max_users_per_tenant,
        }
    }

    /// Normalises and checks an email address.
    pub fn parse_email(email: &str) -> Result<String, DomainError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(DomainError::InvalidEmail);
        }
        Ok(email)
    }

    pub async fn create(&self, scope: &TenantScope, input: NewUser) -> Result<User, DomainError> {
        let email = Self::parse_email(&input.email)?;
        let role: Role = input.role.trim().parse()?;
        self.policy.check(&input.password)?;

        if self.users.find_by_email(scope, &email).await?.is_some() {
            return Err(DomainError::EmailAlreadyExists(email));
        }

        if self.users.count(scope).await? >= self.max_users {
            warn!(tenant_id = %scope.tenant_id(), limit = self.max_users, "user limit reached");
            return Err(DomainError::TenantMaxUsersReached);
        }

        let password_hash = self.passwords.hash(&input.password).await?;
        let user = User::new(
            scope.tenant_id(),
            email,
            password_hash,
            input.name.trim().to_string(),
            role,
        );
        let created = self.users.create(scope, &user, self.max_users).await?;
        info!(
            tenant_id = %scope.tenant_id(),
            user_id = %created.id,
            email = %mask_email(&created.email),
            role = %created.role,
            "user created"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        scope: &TenantScope,
        id: Uuid,
        update: UserUpdate,
    ) -> Result<User, DomainError> {
        let current = self.find(scope, id).await?;
        let mut next = current.clone();

        if let Some(name) = update.name {
            next.name = name.trim().to_string();
        }
        if let Some(email) = update.email {
            let email = Self::parse_email(&email)?;
            if email != current.email {
                if self.users.find_by_email(scope, &email).await?.is_some() {
                    return Err(DomainError::EmailAlreadyExists(email));
                }
                next.email = email;
            }
        }
        if let Some(role) = update.role {
            next.role = role.trim().parse()?;
        }
        if let Some(is_active) = update.is_active {
            next.is_active = is_active;
        }

        if current.is_active_admin() && !next.is_active_admin() {
            self.ensure_other_admin(scope, id).await?;
        }

        next.updated_at = Utc::now();
        let updated = self.users.update(scope, &next).await?;
        info!(tenant_id = %scope.tenant_id(), user_id = %id, "user updated");
        Ok(updated)
    }

    pub async fn delete(
        &self,
        scope: &TenantScope,
        id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<(), DomainError> {
        if id == acting_user_id {
            return Err(DomainError::CannotDeleteSelf);
        }
        let user = self.find(scope, id).await?;
        if user.is_active_admin() {
            self.ensure_other_admin(scope, id).await?;
        }
        self.users.soft_delete(scope, id).await?;
        info!(tenant_id = %scope.tenant_id(), user_id = %id, by = %acting_user_id, "user deleted");
        Ok(())
    }

    /// Self-service change. The caller revokes sessions afterwards.
    pub async fn change_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        let user = self.find(scope, id).await?;
        if !self.passwords.verify(old_password, &user.password_hash).await? {
            warn!(user_id = %id, "password change rejected: wrong current password");
            return Err(DomainError::WrongPassword);
        }
        self.policy.check(new_password)?;

        let hash = self.passwords.hash(new_password).await?;
        self.users.update_password(scope, id, &hash).await?;
        info!(tenant_id = %scope.tenant_id(), user_id = %id, "password changed");
        Ok(())
    }

    /// Administrative reset, no knowledge of the current password needed.
    pub async fn reset_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        new_password: &str,
    ) -> Result<(), DomainError> {
        self.policy.check(new_password)?;
        self.find(scope, id).await?;
        let hash = self.passwords.hash(new_password).await?;
        self.users.update_password(scope, id, &hash).await?;
        info!(tenant_id = %scope.tenant_id(), user_id = %id, "password reset by administrator");
        Ok(())
    }

    pub async fn update_last_login(&self, scope: &TenantScope, id: Uuid) -> Result<(), DomainError> {
        self.users.touch_last_login(scope, id, Utc::now()).await
    }

    pub async fn find(&self, scope: &TenantScope, id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(scope, id)
            .await?
            .ok_or(DomainError::UserNotFound)
    }

    pub async fn find_by_email(&self, scope: &TenantScope, email: &str) -> Result<User, DomainError> {
        self.users
            .find_by_email(scope, &normalize_email(email))
            .await?
            .ok_or(DomainError::UserNotFound)
    }

    pub async fn list(&self, scope: &TenantScope, page: Pagination) -> Result<Vec<User>, DomainError> {
        self.users
            .list(scope, Pagination::new(page.limit, page.offset))
            .await
    }

    pub async fn count(&self, scope: &TenantScope) -> Result<u64, DomainError> {
        self.users.count(scope).await
    }

    pub async fn active_count(&self, scope: &TenantScope) -> Result<u64, DomainError> {
        self.users.active_count(scope).await
    }

    pub async fn count_by_role(&self, scope: &TenantScope) -> Result<BTreeMap<Role, u64>, DomainError> {
        let mut by_role: BTreeMap<Role, u64> = Role::ALL.iter().map(|r| (*r, 0)).collect();
        for (role, n) in self.users.count_by_role(scope).await? {
            by_role.insert(role, n);
        }
        Ok(by_role)
    }

    pub async fn stats(&self, scope: &TenantScope) -> Result<UserStats, DomainError> {
        let total = self.count(scope).await?;
        let active = self.active_count(scope).await?;
        let by_role = self.count_by_role(scope).await?;
        let limit = self.max_users;

        Ok(UserStats {
            total,
            active,
            inactive: total.saturating_sub(active),
            by_role,
            limit,
            remaining: limit.saturating_sub(total),
        })
    }

    async fn ensure_other_admin(&self, scope: &TenantScope, id: Uuid) -> Result<(), DomainError> {
        if self.users.count_other_active_admins(scope, id).await? > 0 {
            return Ok(());
        }
        warn!(tenant_id = %scope.tenant_id(), user_id = %id, "refusing to remove last admin");
        Err(DomainError::LastAdmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tenant;
    use crate::repositories::MockUserRepository;
    use sso_shared::config::PasswordSettings;

    fn passwords() -> PasswordService {
        PasswordService::new(&PasswordSettings {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
            ..PasswordSettings::default()
        })
        .unwrap()
    }

    fn settings() -> CoreSettings {
        CoreSettings::from(&sso_shared::config::AppConfig::local(
            "0123456789abcdef0123456789abcdef",
        ))
    }

    fn service(users: MockUserRepository) -> UserService {
        UserService::new(Arc::new(users), passwords(), &settings())
    }

    fn new_user(email: &str, role: &str, password: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password: password.into(),
            name: "Someone".into(),
            role: role.into(),
        }
    }

    fn user(tenant: &Tenant, email: &str, role: Role) -> User {
        User::new(tenant.id, email.into(), String::new(), "U".into(), role)
    }

    #[tokio::test]
    async fn test_create_validation_order() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let svc = service(MockUserRepository::new());

        // Bad email wins over bad role and bad password.
        assert!(matches!(
            svc.create(&scope, new_user("nope", "root", "x")).await,
            Err(DomainError::InvalidEmail)
        ));
        assert!(matches!(
            svc.create(&scope, new_user("a@acme.test", "root", "x")).await,
            Err(DomainError::InvalidRole)
        ));
        assert!(matches!(
            svc.create(&scope, new_user("a@acme.test", "agent", "short")).await,
            Err(DomainError::InvalidPassword { min: 8, max: 128 })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_email_case_insensitively() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let existing = user(&tenant, "alice@acme.test", Role::Agent);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|_, email| email == "alice@acme.test")
            .returning(move |_, _| Ok(Some(existing.clone())));
        let svc = service(users);

        assert!(matches!(
            svc.create(&scope, new_user("  ALICE@acme.test ", "agent", "password123")).await,
            Err(DomainError::EmailAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_create_honours_configured_ceiling() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_, _| Ok(None));
        users.expect_count().returning(|_| Ok(100));
        users.expect_create().never();
        let svc = service(users);

        assert!(matches!(
            svc.create(&scope, new_user("new@acme.test", "viewer", "password123")).await,
            Err(DomainError::TenantMaxUsersReached)
        ));
    }

    #[tokio::test]
    async fn test_create_hashes_and_persists() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let tenant_id = tenant.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_, _| Ok(None));
        users.expect_count().returning(|_| Ok(0));
        users
            .expect_create()
            .times(1)
            .withf(move |scope, u, limit| {
                scope.tenant_id() == tenant_id
                    && *limit == 100
                    && u.email == "new@acme.test"
                    && u.password_hash.starts_with("$argon2id$")
                    && u.is_active
            })
            .returning(|_, u, _| Ok(u.clone()));
        let svc = service(users);

        let created = svc
            .create(&scope, new_user("New@Acme.test", "agent", "password123"))
            .await
            .unwrap();
        assert_eq!(created.role, Role::Agent);
    }

    #[tokio::test]
    async fn test_demoting_only_admin_is_refused() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let bob = user(&tenant, "bob@acme.test", Role::Admin);
        let bob_id = bob.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_, _| Ok(Some(bob.clone())));
        users
            .expect_count_other_active_admins()
            .withf(move |_, excluding| *excluding == bob_id)
            .returning(|_, _| Ok(0));
        users.expect_update().never();
        let svc = service(users);

        let demote = UserUpdate { role: Some("agent".into()), ..Default::default() };
        assert!(matches!(
            svc.update(&scope, bob_id, demote).await,
            Err(DomainError::LastAdmin)
        ));
    }

    #[tokio::test]
    async fn test_deactivate_admin_with_another_admin() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let bob = user(&tenant, "bob@acme.test", Role::Admin);
        let bob_id = bob.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_, _| Ok(Some(bob.clone())));
        users.expect_count_other_active_admins().returning(|_, _| Ok(1));
        users.expect_update().times(1).returning(|_, u| Ok(u.clone()));
        let svc = service(users);

        let deactivate = UserUpdate { is_active: Some(false), ..Default::default() };
        let updated = svc.update(&scope, bob_id, deactivate).await.unwrap();
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn test_delete_self_refused_without_lookup() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let dave = Uuid::new_v4();
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().never();
        users.expect_soft_delete().never();
        let svc = service(users);

        assert!(matches!(
            svc.delete(&scope, dave, dave).await,
            Err(DomainError::CannotDeleteSelf)
        ));
    }

    #[tokio::test]
    async fn test_change_password_checks_current() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let mut alice = user(&tenant, "alice@acme.test", Role::Admin);
        alice.password_hash = passwords().hash_blocking("password123").unwrap();
        let alice_id = alice.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_, _| Ok(Some(alice.clone())));
        users.expect_update_password().times(1).returning(|_, _, _| Ok(()));
        let svc = service(users);

        assert!(matches!(
            svc.change_password(&scope, alice_id, "wrong-pass", "newpassword1").await,
            Err(DomainError::WrongPassword)
        ));
        assert!(matches!(
            svc.change_password(&scope, alice_id, "password123", "short").await,
            Err(DomainError::InvalidPassword { .. })
        ));
        svc.change_password(&scope, alice_id, "password123", "newpassword1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stats() {
        let tenant = Tenant::new("Acme".into(), "acme".into());
        let scope = tenant.scope();
        let mut users = MockUserRepository::new();
        users.expect_count().returning(|_| Ok(5));
        users.expect_active_count().returning(|_| Ok(4));
        users
            .expect_count_by_role()
            .returning(|_| Ok(vec![(Role::Admin, 1), (Role::Agent, 4)]));
        let svc = service(users);

        let stats = svc.stats(&scope).await.unwrap();
        assert_eq!(stats.inactive, 1);
        assert_eq!(stats.limit, 100);
        assert_eq!(stats.remaining, 95);
        assert_eq!(stats.by_role[&Role::Viewer], 0);
        assert_eq!(stats.by_role[&Role::Agent], 4);
    }
}
