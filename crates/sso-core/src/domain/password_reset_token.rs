use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn new(user_id: Uuid, tenant_id: Uuid, token_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: sso_shared::new_id(),
            user_id,
            tenant_id,
            token_hash,
            expires_at: now + ttl,
            used: false,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        let mut token =
            PasswordResetToken::new(Uuid::new_v4(), Uuid::new_v4(), "h".into(), Duration::hours(1));
        let now = Utc::now();
        assert!(token.is_valid(now));
        assert!(token.is_expired(now + Duration::minutes(61)));

        token.used = true;
        assert!(!token.is_valid(now));
    }
}
