//! Save-lifecycle notifications.
//!
//! The pipeline reports progress solely through an injected
//! [`EventPublisher`]; the returned error remains the authoritative failure
//! report. Publish failures are logged and swallowed — they never fail a
//! save.

use serde::Serialize;

/// Topics the engine publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    DatasetSaveStarted,
    DatasetSaveProgress,
    DatasetSaveCompleted,
}

/// Payload carried by every save-lifecycle event.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEvent {
    pub username: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Root address, present once the save completed successfully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fraction of the save completed, 0.0 through 1.0.
    pub completion: f64,
}

/// Sink for save-lifecycle events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: Topic, payload: &SaveEvent) -> anyhow::Result<()>;
}

/// Publisher that discards everything.
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _topic: Topic, _payload: &SaveEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publisher backed by an unbounded channel. Tests assert on the receiver.
pub struct ChannelPublisher {
    tx: tokio::sync::mpsc::UnboundedSender<(Topic, SaveEvent)>,
}

impl ChannelPublisher {
    pub fn new() -> (
        Self,
        tokio::sync::mpsc::UnboundedReceiver<(Topic, SaveEvent)>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, topic: Topic, payload: &SaveEvent) -> anyhow::Result<()> {
        self.tx.send((topic, payload.clone()))?;
        Ok(())
    }
}

/// Publish, logging and swallowing any sink error.
pub(crate) fn publish(publisher: &dyn EventPublisher, topic: Topic, payload: &SaveEvent) {
    if let Err(error) = publisher.publish(topic, payload) {
        tracing::warn!(?topic, %error, "failed to publish save event");
    }
}
