//! Outbound notification port
//!
//! Delivery is fire-and-forget: [`dispatch`] hands the notice to a spawned
//! task and returns at once. A failed delivery is logged and never reaches
//! the operation that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use sso_shared::utils::mask_email;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Notification delivery failed: {0}")]
pub struct NotificationError(pub String);

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `token` is the raw reset secret and must only be placed into the message body.
    async fn send_password_reset(&self, email: &str, name: &str, token: &str) -> Result<(), NotificationError>;
    async fn send_welcome(&self, email: &str, name: &str, tenant_name: &str) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone)]
pub enum Notice {
    PasswordReset { email: String, name: String, token: String },
    Welcome { email: String, name: String, tenant_name: String },
}

impl Notice {
    fn kind(&self) -> &'static str {
        match self {
            Notice::PasswordReset { .. } => "password_reset",
            Notice::Welcome { .. } => "welcome",
        }
    }

    fn recipient(&self) -> &str {
        match self {
            Notice::PasswordReset { email, .. } | Notice::Welcome { email, .. } => email,
        }
    }
}

/// Spawns delivery of `notice` on the current runtime.
pub fn dispatch(notifier: Arc<dyn Notifier>, notice: Notice) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = match &notice {
            Notice::PasswordReset { email, name, token } => {
                notifier.send_password_reset(email, name, token).await
            }
            Notice::Welcome { email, name, tenant_name } => {
                notifier.send_welcome(email, name, tenant_name).await
            }
        };
        if let Err(e) = result {
            tracing::error!(
                kind = notice.kind(),
                recipient = %mask_email(notice.recipient()),
                error = %e,
                "notification delivery failed"
            );
        }
    })
}
