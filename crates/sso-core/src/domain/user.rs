//! User domain entity

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sso_shared::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use uuid::Uuid;
use validator::ValidateEmail;

use crate::error::DomainError;

/// Closed set of tenant roles. Parsed once at the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Agent,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Agent, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Agent => "agent",
            Role::Viewer => "viewer",
        }
    }

    /// Owners count as administrators for every admin-only rule.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "agent" => Ok(Role::Agent),
            "viewer" => Ok(Role::Viewer),
            _ => Err(DomainError::InvalidRole),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(tenant_id: Uuid, email: String, password_hash: String, name: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: sso_shared::new_id(),
            tenant_id,
            email,
            password_hash,
            name,
            role,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Counts toward the "at least one active administrator" population.
    pub fn is_active_admin(&self) -> bool {
        self.is_active && !self.is_deleted() && self.role.is_admin()
    }
}

/// Input for creating a user. Role arrives as text and is parsed by the directory.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub by_role: BTreeMap<Role, u64>,
    pub limit: u64,
    pub remaining: u64,
}

/// Password length bounds, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Result<(), DomainError> {
        let len = password.chars().count();
        if len < self.min_length || len > self.max_length {
            return Err(DomainError::InvalidPassword {
                min: self.min_length,
                max: self.max_length,
            });
        }
        Ok(())
    }
}

/// Email syntax check applied after normalisation.
pub fn is_valid_email(email: &str) -> bool {
    if !(3..=255).contains(&email.len()) || !email.validate_email() {
        return false;
    }
    match email.rsplit_once('@') {
        Some((_, domain)) => domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_admin_set() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("owner".parse::<Role>().unwrap(), Role::Owner);
        assert!(matches!("Admin".parse::<Role>(), Err(DomainError::InvalidRole)));
        assert!(matches!("superuser".parse::<Role>(), Err(DomainError::InvalidRole)));

        assert!(Role::Owner.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Agent.is_admin());
        assert!(!Role::Viewer.is_admin());
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Viewer).unwrap(), "\"viewer\"");
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new(
            Uuid::new_v4(),
            "alice@acme.test".into(),
            "$argon2id$secret".into(),
            "Alice".into(),
            Role::Admin,
        );
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_active_admin() {
        let mut user = User::new(Uuid::new_v4(), "a@b.io".into(), String::new(), "A".into(), Role::Owner);
        assert!(user.is_active_admin());
        user.is_active = false;
        assert!(!user.is_active_admin());
        user.is_active = true;
        user.deleted_at = Some(Utc::now());
        assert!(!user.is_active_admin());
    }

    #[test]
    fn test_password_policy() {
        let policy = PasswordPolicy::default();
        assert!(policy.check("1234567").is_err());
        assert!(policy.check("12345678").is_ok());
        assert!(policy.check(&"x".repeat(128)).is_ok());
        assert!(policy.check(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("alice@acme.test"));
        assert!(is_valid_email("a.b+tag@mail.example.co"));
        assert!(!is_valid_email("alice@localhost"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("@acme.test"));
        assert!(!is_valid_email("alice@acme."));
    }
}
