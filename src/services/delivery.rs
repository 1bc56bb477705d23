/// Out-of-band delivery boundary
///
/// Invoked only when a recipient has zero live sessions. The gateway resolves
/// recipient contact info itself; this side sends it the record shape and
/// gets back success or failure, with no retry contract owed here.
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::models::Notification;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("delivery gateway returned status {0}")]
    Gateway(u16),

    #[error("no out-of-band delivery gateway configured")]
    NotConfigured,
}

#[async_trait]
pub trait OutOfBandDelivery: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// HTTP gateway for push/email delivery
pub struct HttpDeliveryGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDeliveryGateway {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl OutOfBandDelivery for HttpDeliveryGateway {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "recipient_id": notification.recipient_id,
                "category": notification.category.as_str(),
                "title": notification.title,
                "body": notification.body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Gateway(status.as_u16()));
        }

        debug!(
            notification_id = notification.id,
            recipient = %notification.recipient_id,
            "out-of-band delivery accepted"
        );
        Ok(())
    }
}

/// Stand-in when no gateway is configured; reports failure so the dispatch
/// receipt carries a warning while the record stays durable.
pub struct DisabledDelivery;

#[async_trait]
impl OutOfBandDelivery for DisabledDelivery {
    async fn deliver(&self, _notification: &Notification) -> Result<(), DeliveryError> {
        Err(DeliveryError::NotConfigured)
    }
}
