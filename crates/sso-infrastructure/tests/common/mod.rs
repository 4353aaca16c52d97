//! Harness for identity flows. Runs on the in-memory store by default, or on
//! PostgreSQL at `DATABASE_URL` through [`Harness::postgres`].

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sso_core::notifier::{NotificationError, Notifier};
use sso_core::services::{AuthSession, RegisterRequest, Registration};
use sso_core::{IdentityCore, Stores};
use sso_infrastructure::{create_pool, postgres_stores, run_migrations, MemoryStore};
use sso_shared::config::{AppConfig, PasswordSettings};
use tokio::sync::{mpsc, Mutex};

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Records outbound notices so tests can read the raw reset secrets.
#[derive(Clone)]
pub struct CapturingNotifier {
    tx: mpsc::UnboundedSender<Sent>,
}

#[derive(Debug, Clone)]
pub enum Sent {
    Reset { email: String, token: String },
    Welcome { email: String, tenant_name: String },
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send_password_reset(&self, email: &str, _name: &str, token: &str) -> Result<(), NotificationError> {
        let _ = self.tx.send(Sent::Reset { email: email.into(), token: token.into() });
        Ok(())
    }

    async fn send_welcome(&self, email: &str, _name: &str, tenant_name: &str) -> Result<(), NotificationError> {
        let _ = self.tx.send(Sent::Welcome { email: email.into(), tenant_name: tenant_name.into() });
        Ok(())
    }
}

pub struct Harness {
    pub core: IdentityCore,
    outbox: Mutex<mpsc::UnboundedReceiver<Sent>>,
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::local(SECRET);
    config.password = PasswordSettings {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
        ..PasswordSettings::default()
    };
    config
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_stores(config, MemoryStore::new().stores())
    }

    /// Harness over a migrated PostgreSQL database at `DATABASE_URL`.
    pub async fn postgres() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = create_pool(&url, 10).await.expect("pool");
        run_migrations(&pool).await.expect("migrations");
        Self::with_stores(config(), postgres_stores(pool))
    }

    fn with_stores(config: AppConfig, stores: Stores) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let core = IdentityCore::new(&config, stores, Arc::new(CapturingNotifier { tx }))
            .expect("core");
        Self { core, outbox: Mutex::new(rx) }
    }

    pub async fn register(&self, slug: &str, email: &str, password: &str) -> Registration {
        self.core
            .auth
            .register(RegisterRequest {
                tenant_name: format!("{} Inc", slug),
                tenant_slug: slug.into(),
                email: email.into(),
                password: password.into(),
                name: "Founder".into(),
            })
            .await
            .expect("registration")
    }

    pub async fn login(&self, slug: &str, email: &str, password: &str) -> AuthSession {
        self.core
            .auth
            .login_with_slug(email, password, slug)
            .await
            .expect("login")
    }

    /// Next reset secret delivered to `email`, skipping other notices.
    pub async fn next_reset_token(&self, email: &str) -> String {
        let mut outbox = self.outbox.lock().await;
        loop {
            let sent = tokio::time::timeout(Duration::from_secs(5), outbox.recv())
                .await
                .expect("notice within timeout")
                .expect("notifier alive");
            if let Sent::Reset { email: to, token } = sent {
                if to == email {
                    return token;
                }
            }
        }
    }

    pub async fn next_notice(&self) -> Sent {
        let mut outbox = self.outbox.lock().await;
        tokio::time::timeout(Duration::from_secs(5), outbox.recv())
            .await
            .expect("notice within timeout")
            .expect("notifier alive")
    }
}
