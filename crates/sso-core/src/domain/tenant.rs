// ============================================================================
// SSO Core - Tenant Entity
// File: crates/sso-core/src/domain/tenant.rs
// Description: Tenant entity with subscription state and settings
// ============================================================================

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sso_shared::constants::TRIAL_PERIOD_DAYS;
use uuid::Uuid;

use crate::error::DomainError;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("slug regex"));

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9][a-zA-Z0-9-]{0,61}[a-zA-Z0-9]\.)+[a-zA-Z]{2,}$").expect("domain regex")
});

/// Lowercase letters, digits and hyphens; alphanumeric at both ends; 3-63 chars.
pub fn is_valid_slug(slug: &str) -> bool {
    (3..=63).contains(&slug.len()) && SLUG_RE.is_match(slug)
}

/// Conventional host-label grammar, at least one dot, 3-255 chars.
pub fn is_valid_domain(domain: &str) -> bool {
    (3..=255).contains(&domain.len()) && domain.contains('.') && DOMAIN_RE.is_match(domain)
}

/// Subscription status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Trial,
    Active,
    PastDue,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(DomainError::InternalError(format!(
                "unknown subscription status: {}",
                other
            ))),
        }
    }
}

/// Tenant entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub domain: Option<String>,
    pub settings: Map<String, Value>,
    pub subscription_status: SubscriptionStatus,
    pub subscription_ends_at: Option<DateTime<Utc>>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Builds a new trial tenant. Name and slug must already be validated.
    pub fn new(name: String, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: sso_shared::new_id(),
            slug,
            name,
            domain: None,
            settings: default_settings(),
            subscription_status: SubscriptionStatus::Trial,
            subscription_ends_at: Some(now + Duration::days(TRIAL_PERIOD_DAYS)),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Merges `patch` into the settings key by key.
    pub fn merge_settings(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.settings.insert(key, value);
        }
    }
}

fn default_settings() -> Map<String, Value> {
    let value = json!({
        "onboarding_completed": false,
        "features": {
            "chat_enabled": true,
            "crm_enabled": false,
            "calendar_enabled": false,
        },
    });
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Mutable tenant fields. Id, slug and creation time are deliberately absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantUpdate {
    pub name: Option<String>,
    /// `Some("")` clears the domain.
    pub domain: Option<String>,
    pub settings: Option<Map<String, Value>>,
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(default, with = "double_option")]
    pub subscription_ends_at: Option<Option<DateTime<Utc>>>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TenantStats {
    pub user_count: u64,
    pub subscription_status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
}
