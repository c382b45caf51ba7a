//! services/web/src/adapters/mail.rs
//!
//! Implementations of the `MailDelivery` port. The real adapter posts
//! the invitation batch to an HTTP mail gateway; the null adapter logs
//! and drops it, for deployments without outbound mail.

use async_trait::async_trait;
use serde::Serialize;
use survey_core::domain::InvitationMail;
use survey_core::ports::{MailDelivery, PortError, PortResult};
use tracing::warn;

#[derive(Serialize)]
struct MailMessage<'a> {
    to: &'a str,
    subject: &'a str,
    template: &'a str,
    url: &'a str,
}

/// A mail adapter that hands the batch to an HTTP mail gateway.
pub struct HttpMailAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMailAdapter {
    /// Creates a new `HttpMailAdapter` posting to `endpoint`.
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl MailDelivery for HttpMailAdapter {
    async fn send_batch(&self, batch: Vec<InvitationMail>) -> PortResult<()> {
        let messages: Vec<MailMessage> = batch
            .iter()
            .map(|m| MailMessage {
                to: &m.to,
                subject: &m.subject,
                template: "invitation",
                url: &m.url,
            })
            .collect();

        let response = self
            .client
            .post(&self.endpoint)
            .json(&messages)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

/// A mail adapter for deployments without a gateway: the batch is
/// logged and dropped, which the issuing flow already tolerates.
pub struct NullMailAdapter;

#[async_trait]
impl MailDelivery for NullMailAdapter {
    async fn send_batch(&self, batch: Vec<InvitationMail>) -> PortResult<()> {
        warn!(
            count = batch.len(),
            "No mail gateway configured; dropping invitation batch"
        );
        Ok(())
    }
}
