//! Messaging gateways are external collaborators; these are logging-only
//! stand-ins so the action catalog runs standalone.

use async_trait::async_trait;

#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_sms(&self, id: &str, value: &str);
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str);
}

#[derive(Default)]
pub struct LoggingSmsGateway;

#[async_trait]
impl SmsGateway for LoggingSmsGateway {
    async fn send_sms(&self, id: &str, value: &str) {
        tracing::info!(id, value, "send-sms (no gateway wired, logged only)");
    }
}

#[derive(Default)]
pub struct LoggingEmailGateway;

#[async_trait]
impl EmailGateway for LoggingEmailGateway {
    async fn send_email(&self, to: &str, subject: &str, body: &str) {
        tracing::info!(to, subject, body, "send-email (no gateway wired, logged only)");
    }
}
