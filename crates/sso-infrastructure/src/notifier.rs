//! Notification adapter that writes to the log instead of sending mail.

use async_trait::async_trait;
use sso_core::notifier::{NotificationError, Notifier};
use sso_shared::utils::mask_email;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_password_reset(&self, email: &str, name: &str, _token: &str) -> Result<(), NotificationError> {
        info!(recipient = %mask_email(email), name, "password reset email queued");
        Ok(())
    }

    async fn send_welcome(&self, email: &str, name: &str, tenant_name: &str) -> Result<(), NotificationError> {
        info!(recipient = %mask_email(email), name, tenant = tenant_name, "welcome email queued");
        Ok(())
    }
}
