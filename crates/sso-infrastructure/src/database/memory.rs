// ============================================================================
// SSO Infrastructure - In-Memory Store
// File: crates/sso-infrastructure/src/database/memory.rs
// ============================================================================
//! Process-local implementation of every repository port.
//!
//! All state sits behind one mutex and every method does its whole job inside
//! a single critical section, which gives the same atomicity the Postgres
//! transactions give. The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sso_shared::Pagination;
use uuid::Uuid;

use sso_core::domain::{PasswordResetToken, RefreshToken, Role, Tenant, TenantScope, User};
use sso_core::error::DomainError;
use sso_core::repositories::{
    PasswordResetRepository, RefreshTokenRepository, TenantRepository, UnitOfWork, UserRepository,
};
use sso_core::Stores;

#[derive(Default)]
struct State {
    tenants: HashMap<Uuid, Tenant>,
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<Uuid, RefreshToken>,
    password_resets: HashMap<Uuid, PasswordResetToken>,
}

impl State {
    fn live_tenant(&self, id: Uuid) -> Option<&Tenant> {
        self.tenants.get(&id).filter(|t| !t.is_deleted())
    }

    fn slug_taken(&self, slug: &str) -> bool {
        self.tenants.values().any(|t| t.slug == slug)
    }

    fn domain_taken(&self, domain: &str, exclude: Option<Uuid>) -> bool {
        self.tenants.values().any(|t| {
            !t.is_deleted() && Some(t.id) != exclude && t.domain.as_deref() == Some(domain)
        })
    }

    fn scoped_users<'a>(&'a self, scope: &TenantScope) -> impl Iterator<Item = &'a User> + 'a {
        let tenant_id = scope.tenant_id();
        self.users
            .values()
            .filter(move |u| u.tenant_id == tenant_id && !u.is_deleted())
    }

    fn scoped_user(&self, scope: &TenantScope, id: Uuid) -> Option<&User> {
        self.users
            .get(&id)
            .filter(|u| u.tenant_id == scope.tenant_id() && !u.is_deleted())
    }

    fn email_taken(&self, scope: &TenantScope, email: &str, exclude: Option<Uuid>) -> bool {
        self.scoped_users(scope)
            .any(|u| u.email == email && Some(u.id) != exclude)
    }

    fn other_active_admins(&self, scope: &TenantScope, excluding: Uuid) -> u64 {
        self.scoped_users(scope)
            .filter(|u| u.id != excluding && u.is_active_admin())
            .count() as u64
    }

    fn insert_tenant(&mut self, tenant: &Tenant) -> Result<(), DomainError> {
        if self.slug_taken(&tenant.slug) {
            return Err(DomainError::TenantSlugAlreadyExists(tenant.slug.clone()));
        }
        if let Some(domain) = tenant.domain.as_deref() {
            if self.domain_taken(domain, None) {
                return Err(DomainError::TenantDomainAlreadyExists(domain.to_string()));
            }
        }
        self.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    fn insert_user(&mut self, scope: &TenantScope, user: &User) -> Result<(), DomainError> {
        if user.tenant_id != scope.tenant_id() {
            return Err(DomainError::InternalError("user written outside its tenant scope".into()));
        }
        if self.email_taken(scope, &user.email, None) {
            return Err(DomainError::EmailAlreadyExists(user.email.clone()));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn revoke_user_tokens(&mut self, tenant_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> u64 {
        let mut revoked = 0;
        for token in self.refresh_tokens.values_mut() {
            if token.user_id == user_id && token.tenant_id == tenant_id && !token.revoked {
                token.revoked = true;
                token.revoked_at = Some(at);
                revoked += 1;
            }
        }
        revoked
    }
}

/// In-memory store shared by clones.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// This store behind every repository port.
    pub fn stores(&self) -> Stores {
        Stores {
            tenants: Arc::new(self.clone()),
            users: Arc::new(self.clone()),
            refresh_tokens: Arc::new(self.clone()),
            password_resets: Arc::new(self.clone()),
            unit_of_work: Arc::new(self.clone()),
        }
    }
}

fn page<T>(mut items: Vec<T>, page: Pagination, created: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl TenantRepository for MemoryStore {
    async fn create(&self, tenant: &Tenant) -> Result<Tenant, DomainError> {
        self.state.lock().insert_tenant(tenant)?;
        Ok(tenant.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>, DomainError> {
        Ok(self.state.lock().live_tenant(id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DomainError> {
        let state = self.state.lock();
        Ok(state
            .tenants
            .values()
            .find(|t| !t.is_deleted() && t.slug == slug)
            .cloned())
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Tenant>, DomainError> {
        let state = self.state.lock();
        Ok(state
            .tenants
            .values()
            .find(|t| !t.is_deleted() && t.domain.as_deref() == Some(domain))
            .cloned())
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool, DomainError> {
        Ok(self.state.lock().slug_taken(slug))
    }

    async fn exists_by_domain(&self, domain: &str, exclude: Option<Uuid>) -> Result<bool, DomainError> {
        Ok(self.state.lock().domain_taken(domain, exclude))
    }

    async fn update(&self, tenant: &Tenant) -> Result<Tenant, DomainError> {
        let mut state = self.state.lock();
        if state.live_tenant(tenant.id).is_none() {
            return Err(DomainError::TenantNotFound);
        }
        if let Some(domain) = tenant.domain.as_deref() {
            if state.domain_taken(domain, Some(tenant.id)) {
                return Err(DomainError::TenantDomainAlreadyExists(domain.to_string()));
            }
        }
        let stored = state
            .tenants
            .get_mut(&tenant.id)
            .ok_or(DomainError::TenantNotFound)?;
        // Slug and creation time are immutable.
        stored.name = tenant.name.clone();
        stored.domain = tenant.domain.clone();
        stored.settings = tenant.settings.clone();
        stored.subscription_status = tenant.subscription_status;
        stored.subscription_ends_at = tenant.subscription_ends_at;
        stored.updated_at = tenant.updated_at;
        Ok(stored.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state.lock();
        match state.tenants.get_mut(&id) {
            Some(tenant) if !tenant.is_deleted() => {
                let now = Utc::now();
                tenant.deleted_at = Some(now);
                tenant.updated_at = now;
                Ok(())
            }
            _ => Err(DomainError::TenantNotFound),
        }
    }

    async fn list(&self, p: Pagination) -> Result<Vec<Tenant>, DomainError> {
        let state = self.state.lock();
        let live: Vec<Tenant> = state.tenants.values().filter(|t| !t.is_deleted()).cloned().collect();
        Ok(page(live, p, |t| t.created_at))
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.state.lock().tenants.values().filter(|t| !t.is_deleted()).count() as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, scope: &TenantScope, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.state.lock().scoped_user(scope, id).cloned())
    }

    async fn find_by_email(&self, scope: &TenantScope, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .state
            .lock()
            .scoped_users(scope)
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self, scope: &TenantScope, p: Pagination) -> Result<Vec<User>, DomainError> {
        let state = self.state.lock();
        let users: Vec<User> = state.scoped_users(scope).cloned().collect();
        Ok(page(users, p, |u| u.created_at))
    }

    async fn count(&self, scope: &TenantScope) -> Result<u64, DomainError> {
        Ok(self.state.lock().scoped_users(scope).count() as u64)
    }

    async fn active_count(&self, scope: &TenantScope) -> Result<u64, DomainError> {
        Ok(self.state.lock().scoped_users(scope).filter(|u| u.is_active).count() as u64)
    }

    async fn count_other_active_admins(
        &self,
        scope: &TenantScope,
        excluding: Uuid,
    ) -> Result<u64, DomainError> {
        Ok(self.state.lock().other_active_admins(scope, excluding))
    }

    async fn count_by_role(&self, scope: &TenantScope) -> Result<Vec<(Role, u64)>, DomainError> {
        let state = self.state.lock();
        let mut counts: HashMap<Role, u64> = HashMap::new();
        for user in state.scoped_users(scope) {
            *counts.entry(user.role).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn create(&self, scope: &TenantScope, user: &User, max_users: u64) -> Result<User, DomainError> {
        let mut state = self.state.lock();
        if state.scoped_users(scope).count() as u64 >= max_users {
            return Err(DomainError::TenantMaxUsersReached);
        }
        state.insert_user(scope, user)?;
        Ok(user.clone())
    }

    async fn update(&self, scope: &TenantScope, user: &User) -> Result<User, DomainError> {
        let mut state = self.state.lock();
        let current = state
            .scoped_user(scope, user.id)
            .ok_or(DomainError::UserNotFound)?;

        let stays_admin = user.is_active && user.role.is_admin();
        if current.is_active_admin() && !stays_admin && state.other_active_admins(scope, user.id) == 0 {
            return Err(DomainError::LastAdmin);
        }
        if state.email_taken(scope, &user.email, Some(user.id)) {
            return Err(DomainError::EmailAlreadyExists(user.email.clone()));
        }

        let stored = state.users.get_mut(&user.id).ok_or(DomainError::UserNotFound)?;
        stored.email = user.email.clone();
        stored.name = user.name.clone();
        stored.role = user.role;
        stored.is_active = user.is_active;
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }

    async fn soft_delete(&self, scope: &TenantScope, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state.lock();
        let current = state.scoped_user(scope, id).ok_or(DomainError::UserNotFound)?;
        if current.is_active_admin() && state.other_active_admins(scope, id) == 0 {
            return Err(DomainError::LastAdmin);
        }

        let stored = state.users.get_mut(&id).ok_or(DomainError::UserNotFound)?;
        let now = Utc::now();
        stored.deleted_at = Some(now);
        stored.updated_at = now;
        Ok(())
    }

    async fn update_password(
        &self,
        scope: &TenantScope,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock();
        if state.scoped_user(scope, id).is_none() {
            return Err(DomainError::UserNotFound);
        }
        let stored = state.users.get_mut(&id).ok_or(DomainError::UserNotFound)?;
        stored.password_hash = password_hash.to_string();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn touch_last_login(
        &self,
        scope: &TenantScope,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock();
        if state.scoped_user(scope, id).is_some() {
            if let Some(stored) = state.users.get_mut(&id) {
                stored.last_login_at = Some(at);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn create(&self, token: &RefreshToken) -> Result<(), DomainError> {
        self.state.lock().refresh_tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>, DomainError> {
        Ok(self
            .state
            .lock()
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError> {
        let mut state = self.state.lock();
        match state.refresh_tokens.get_mut(&id) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                token.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rotate(
        &self,
        old_id: Uuid,
        successor: &RefreshToken,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.lock();
        match state.refresh_tokens.get_mut(&old_id) {
            Some(token) if token.is_valid(at) => {
                token.revoked = true;
                token.revoked_at = Some(at);
            }
            _ => return Ok(false),
        }
        state.refresh_tokens.insert(successor.id, successor.clone());
        Ok(true)
    }

    async fn revoke_all_for_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        Ok(self.state.lock().revoke_user_tokens(scope.tenant_id(), user_id, at))
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let mut state = self.state.lock();
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, t| {
            let expired = t.expires_at < now;
            let stale = t.revoked && t.revoked_at.is_some_and(|at| at < revoked_before);
            !(expired || stale)
        });
        Ok((before - state.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl PasswordResetRepository for MemoryStore {
    async fn issue(&self, token: &PasswordResetToken) -> Result<(), DomainError> {
        let mut state = self.state.lock();
        for existing in state.password_resets.values_mut() {
            if existing.user_id == token.user_id && !existing.used {
                existing.used = true;
            }
        }
        state.password_resets.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<PasswordResetToken>, DomainError> {
        Ok(self
            .state
            .lock()
            .password_resets
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut state = self.state.lock();
        let before = state.password_resets.len();
        state.password_resets.retain(|_, t| !(t.used || t.expires_at < now));
        Ok((before - state.password_resets.len()) as u64)
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    async fn register_tenant(&self, tenant: &Tenant, admin: &User) -> Result<(), DomainError> {
        let mut state = self.state.lock();
        // Validate both writes before applying either.
        if state.slug_taken(&tenant.slug) {
            return Err(DomainError::TenantSlugAlreadyExists(tenant.slug.clone()));
        }
        if admin.tenant_id != tenant.id {
            return Err(DomainError::InternalError("admin does not belong to the new tenant".into()));
        }
        state.insert_tenant(tenant)?;
        state.insert_user(&tenant.scope(), admin)?;
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        token_id: Uuid,
        scope: &TenantScope,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock();
        match state.password_resets.get(&token_id) {
            Some(token) if token.is_valid(at) => {}
            _ => return Err(DomainError::ResetTokenUsed),
        }
        if state.scoped_user(scope, user_id).is_none() {
            return Err(DomainError::UserNotFound);
        }

        if let Some(token) = state.password_resets.get_mut(&token_id) {
            token.used = true;
        }
        if let Some(user) = state.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = at;
        }
        state.revoke_user_tokens(scope.tenant_id(), user_id, at);
        Ok(())
    }
}
