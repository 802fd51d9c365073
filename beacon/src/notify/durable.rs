//! Durable escalation notices
//!
//! When an alert escalates, every contact gets a durable notice through a
//! [`DurableChannel`] — delivery to an address that does not require the
//! recipient to be connected. The webhook implementation posts the notice
//! as JSON to the contact's delivery address; a logging implementation
//! stands in when no outbound transport is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{AlertId, Subject, SubjectId};

/// Error type for durable notice delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery to {address} failed: {reason}")]
    DeliveryFailed { address: String, reason: String },

    #[error("Recipient {0} has no delivery address")]
    NoAddress(SubjectId),
}

/// Result type for durable notice delivery
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Composed escalation notice ready for durable delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationNotice {
    /// Alert that escalated
    pub alert_id: AlertId,
    /// Subject who raised the alert
    pub subject_id: SubjectId,
    /// Short headline for the notice
    pub headline: String,
    /// Full notice body
    pub body: String,
    /// Link to the trigger location on a map
    pub map_link: String,
    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

impl EscalationNotice {
    /// Compose the notice for an escalated alert
    pub fn compose(
        alert_id: &str,
        subject: &Subject,
        latitude: f64,
        longitude: f64,
        raised_at: DateTime<Utc>,
    ) -> Self {
        let map_link = map_link(latitude, longitude);
        let headline = format!("URGENT: distress alert from {}", subject.display_name);
        let body = format!(
            "{} raised a distress alert at {} and has not marked themselves safe.\n\
             Last known location: {}\n\
             Please try to reach them immediately.",
            subject.display_name,
            raised_at.format("%Y-%m-%d %H:%M:%S UTC"),
            map_link,
        );
        Self {
            alert_id: alert_id.to_string(),
            subject_id: subject.id.clone(),
            headline,
            body,
            map_link,
            raised_at,
        }
    }
}

/// Build a map link for a trigger location
pub fn map_link(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps?q={},{}", latitude, longitude)
}

/// Transport that delivers a notice to a recipient's durable address
#[async_trait]
pub trait DurableChannel: Send + Sync {
    /// Deliver the notice to the recipient
    async fn deliver(&self, recipient: &Subject, notice: &EscalationNotice) -> NotifyResult<()>;
}

/// Durable channel that posts the notice as JSON to a webhook endpoint
///
/// The recipient's delivery address is appended to the configured base URL,
/// so one relay endpoint serves all contacts.
pub struct WebhookDurableChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookDurableChannel {
    /// Create a channel posting to the given endpoint
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    headline: &'a str,
    body: &'a str,
    alert_id: &'a str,
}

#[async_trait]
impl DurableChannel for WebhookDurableChannel {
    async fn deliver(&self, recipient: &Subject, notice: &EscalationNotice) -> NotifyResult<()> {
        let address = recipient
            .delivery_address
            .as_deref()
            .ok_or_else(|| NotifyError::NoAddress(recipient.id.clone()))?;

        let payload = WebhookPayload {
            to: address,
            headline: &notice.headline,
            body: &notice.body,
            alert_id: &notice.alert_id,
        };

        let response = self
            .client
            .post(format!("{}/notify", self.endpoint))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::DeliveryFailed {
                address: address.to_string(),
                reason: format!("endpoint returned {}", response.status()),
            });
        }

        info!(recipient_id = %recipient.id, alert_id = %notice.alert_id, "Durable notice delivered");
        Ok(())
    }
}

/// Durable channel that records notices in the process log
///
/// Used when no webhook endpoint is configured; deliveries still count as
/// successful so the notification log reflects the fan-out.
pub struct LoggingDurableChannel;

#[async_trait]
impl DurableChannel for LoggingDurableChannel {
    async fn deliver(&self, recipient: &Subject, notice: &EscalationNotice) -> NotifyResult<()> {
        match recipient.delivery_address.as_deref() {
            Some(address) => {
                info!(
                    recipient_id = %recipient.id,
                    address,
                    alert_id = %notice.alert_id,
                    "{}",
                    notice.headline
                );
            }
            None => {
                warn!(recipient_id = %recipient.id, alert_id = %notice.alert_id, "Recipient has no delivery address");
                return Err(NotifyError::NoAddress(recipient.id.clone()));
            }
        }
        Ok(())
    }
}
