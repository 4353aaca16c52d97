// ============================================================================
// SSO Core - Session Manager
// File: crates/sso-core/src/services/session_service.rs
// ============================================================================
//! Refresh-token lifecycle
//!
//! A refresh token is `active` until it is revoked or runs out; both ends are
//! terminal. Rotation revokes the presented token and inserts its successor in
//! one store operation, so two concurrent rotations of the same secret cannot
//! both succeed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sso_security::secret::{digest_token, generate_opaque_token};
use sso_security::{AccessToken, JwtService, TokenSubject};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{IssuedRefreshToken, RefreshToken, TenantScope, User};
use crate::error::DomainError;
use crate::repositories::{RefreshTokenRepository, UserRepository};
use crate::services::CoreSettings;

/// Outcome of a successful rotation.
#[derive(Debug, Clone)]
pub struct RotatedSession {
    pub user: User,
    pub access_token: AccessToken,
    pub refresh_token: IssuedRefreshToken,
}

pub struct SessionService {
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
    refresh_ttl: Duration,
    revoked_retention: Duration,
}

impl SessionService {
    pub fn new(
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        users: Arc<dyn UserRepository>,
        jwt: Arc<JwtService>,
        settings: &CoreSettings,
    ) -> Self {
        Self {
            refresh_tokens,
            users,
            jwt,
            refresh_ttl: settings.refresh_token_ttl,
            revoked_retention: settings.revoked_retention,
        }
    }

    pub fn issue_access_token(&self, user: &User) -> Result<AccessToken, DomainError> {
        let subject = TokenSubject {
            user_id: user.id,
            tenant_id: user.tenant_id,
            email: &user.email,
            role: user.role.as_str(),
        };
        Ok(self.jwt.issue(subject)?)
    }

    pub fn access_token_ttl(&self) -> Duration {
        self.jwt.access_token_ttl()
    }

    fn mint(&self, user: &User) -> IssuedRefreshToken {
        let secret = generate_opaque_token();
        let record = RefreshToken::new(user.id, user.tenant_id, digest_token(&secret), self.refresh_ttl);
        IssuedRefreshToken { secret, record }
    }

    pub async fn create(&self, user: &User) -> Result<IssuedRefreshToken, DomainError> {
        let issued = self.mint(user);
        self.refresh_tokens.create(&issued.record).await?;
        Ok(issued)
    }

    pub async fn validate_and_rotate(&self, secret: &str) -> Result<RotatedSession, DomainError> {
        let now = Utc::now();
        let stored = self
            .refresh_tokens
            .find_by_hash(&digest_token(secret))
            .await?
            .ok_or_else(|| {
                warn!("refresh rejected: unknown token");
                DomainError::InvalidRefreshToken
            })?;

        if !stored.is_valid(now) {
            warn!(token_id = %stored.id, revoked = stored.revoked, "refresh rejected: token no longer valid");
            return Err(DomainError::TokenExpired);
        }

        let scope = TenantScope::new(stored.tenant_id);
        let user = self
            .users
            .find_by_id(&scope, stored.user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        if !user.is_active {
            self.refresh_tokens.revoke(stored.id, now).await?;
            warn!(user_id = %user.id, "refresh rejected: account disabled");
            return Err(DomainError::AccountDisabled);
        }

        let successor = self.mint(&user);
        if !self.refresh_tokens.rotate(stored.id, &successor.record, now).await? {
            warn!(token_id = %stored.id, "refresh rejected: lost concurrent rotation");
            return Err(DomainError::TokenExpired);
        }

        let access_token = self.issue_access_token(&user)?;
        info!(user_id = %user.id, tenant_id = %user.tenant_id, "refresh token rotated");
        Ok(RotatedSession { user, access_token, refresh_token: successor })
    }

    /// Unknown or already revoked tokens are not an error.
    pub async fn logout(&self, secret: &str) -> Result<(), DomainError> {
        if let Some(stored) = self.refresh_tokens.find_by_hash(&digest_token(secret)).await? {
            if self.refresh_tokens.revoke(stored.id, Utc::now()).await? {
                info!(user_id = %stored.user_id, "session ended");
            }
        }
        Ok(())
    }

    pub async fn revoke_all_for_user(
        &self,
        scope: &TenantScope,
        user_id: Uuid,
    ) -> Result<u64, DomainError> {
        let revoked = self
            .refresh_tokens
            .revoke_all_for_user(scope, user_id, Utc::now())
            .await?;
        info!(user_id = %user_id, revoked, "refresh tokens revoked");
        Ok(revoked)
    }

    pub async fn cleanup_expired(&self) -> Result<u64, DomainError> {
        let now = Utc::now();
        let purged = self
            .refresh_tokens
            .delete_expired(now, now - self.revoked_retention)
            .await?;
        if purged > 0 {
            info!(purged, "expired refresh tokens purged");
        }
        Ok(purged)
    }
}
