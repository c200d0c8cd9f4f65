//! Outbound delivery collaborators: checkout and email.
//!
//! Both ship only as stubs. The traits are the seam where a real payment
//! provider or mailer would plug in.

use std::time::Duration;

use async_trait::async_trait;
use datamart_core::config::MailerConfig;
use datamart_core::error::AppError;
use tracing::info;
use uuid::Uuid;

/// Settles a purchase and says where to send the buyer next.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the path the buyer is redirected to after checkout.
    async fn checkout(&self, dataset_id: Uuid) -> Result<String, AppError>;
}

/// Sends purchased datasets to buyers.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_dataset(&self, email: &str, dataset_id: Uuid) -> Result<(), AppError>;
}

/// Stub gateway: no settlement, no signature, no idempotency key.
///
/// Anyone who visits the returned URL gets `paid=true`.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn checkout(&self, dataset_id: Uuid) -> Result<String, AppError> {
        info!("[mock payment] Processing payment for dataset {}", dataset_id);
        Ok(format!("/dataset/{}?paid=true", dataset_id))
    }
}

/// Stub mailer: logs the request and waits, sends nothing.
#[derive(Debug, Clone)]
pub struct LogMailer {
    delay: Duration,
}

impl LogMailer {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            delay: config.simulated_delay,
        }
    }
}

impl Default for LogMailer {
    fn default() -> Self {
        Self::new(MailerConfig::default())
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_dataset(&self, email: &str, dataset_id: Uuid) -> Result<(), AppError> {
        info!("[mock mailer] Sending dataset {} to {}", dataset_id, email);
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Rough shape check for a delivery address.
pub fn validate_email(email: &str) -> Result<&str, AppError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::ValidationError(
            "a valid email address is required".to_string(),
        )),
    }
}
