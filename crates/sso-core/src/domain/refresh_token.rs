//! Refresh token entity

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Persisted refresh token. Only the digest of the secret is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(user_id: Uuid, tenant_id: Uuid, token_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: sso_shared::new_id(),
            user_id,
            tenant_id,
            token_hash,
            expires_at: now + ttl,
            revoked: false,
            revoked_at: None,
            created_at: now,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// A freshly minted refresh token: the raw secret for the client and the stored row.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub secret: String,
    pub record: RefreshToken,
}
