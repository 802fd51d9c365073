//! Immediate fan-out channel for live alert pushes
//!
//! Provides pub/sub delivery of alert pushes to connected listeners using
//! Tokio broadcast channels. Each recipient has a logical topic; listeners
//! subscribe filtered to the recipient they act for.
//!
//! Immediate delivery is best-effort. A push to a topic with no connected
//! listener is dropped without error; the durable channel at escalation time
//! is the delivery of record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::store::{AlertId, SubjectId};

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to FanoutChannel
pub type SharedFanout = Arc<FanoutChannel>;

/// Alert push delivered to one recipient's topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPush {
    /// Recipient whose topic this push belongs to
    pub recipient_id: SubjectId,
    /// Alert being pushed
    pub alert_id: AlertId,
    /// Subject who raised the alert
    pub subject_id: SubjectId,
    /// Display name of the subject, for rendering
    pub subject_name: String,
    /// Latitude at trigger time
    pub latitude: f64,
    /// Longitude at trigger time
    pub longitude: f64,
    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

/// Broadcast-based fan-out channel for live alert pushes
pub struct FanoutChannel {
    sender: broadcast::Sender<AlertPush>,
}

impl FanoutChannel {
    /// Create a new fan-out channel
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this channel
    pub fn shared(self) -> SharedFanout {
        Arc::new(self)
    }

    /// Push an alert to the recipient's topic
    ///
    /// Infallible: a topic with no connected listener simply drops the
    /// push, and a slow listener lags rather than blocking the sender.
    pub fn push(&self, push: AlertPush) {
        let recipient = push.recipient_id.clone();
        let alert = push.alert_id.clone();
        match self.sender.send(push) {
            Ok(count) => {
                debug!(recipient_id = %recipient, alert_id = %alert, listeners = count, "Alert pushed");
            }
            Err(_) => {
                debug!(recipient_id = %recipient, alert_id = %alert, "Alert pushed (no listeners)");
            }
        }
    }

    /// Subscribe to every push on the channel
    pub fn subscribe(&self) -> broadcast::Receiver<AlertPush> {
        self.sender.subscribe()
    }

    /// Subscribe to pushes addressed to one recipient
    pub fn subscribe_topic(&self, recipient_id: &str) -> TopicReceiver {
        TopicReceiver {
            receiver: self.sender.subscribe(),
            recipient_id: recipient_id.to_string(),
        }
    }

    /// Get the number of connected listeners
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for FanoutChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver that only yields pushes for one recipient's topic
pub struct TopicReceiver {
    receiver: broadcast::Receiver<AlertPush>,
    recipient_id: String,
}

impl TopicReceiver {
    /// Receive the next push addressed to this topic
    pub async fn recv(&mut self) -> Result<AlertPush, broadcast::error::RecvError> {
        loop {
            let push = self.receiver.recv().await?;
            if push.recipient_id == self.recipient_id {
                return Ok(push);
            }
        }
    }
}
