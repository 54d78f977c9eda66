//! Operator notification events
//!
//! In-process event bus distributing outcome notifications to subscribers
//! (the chat transport renders them as replies). Uses
//! `tokio::sync::broadcast`: emitting never blocks, events are dropped if
//! nobody is listening, and lagging subscribers lose oldest events first.
//! Fire-time outcomes of scheduled entries reach the operator only through
//! this bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::UserId;

/// Event receiver type alias
pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new event bus with the specified per-subscriber capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers. Non-blocking; a send error just
    /// means nobody is listening.
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Stage of a publish attempt at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    Validation,
    Transcode,
    MediaUpload,
    PostCreation,
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Transcode => write!(f, "transcode"),
            Self::MediaUpload => write!(f, "media upload"),
            Self::PostCreation => write!(f, "post creation"),
        }
    }
}

/// Events emitted by services during operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A rewrite finished and is waiting for approval.
    DraftReady { user: UserId, text: String },

    /// The generative collaborator failed; the prior draft is untouched.
    GenerationFailed { user: UserId, error: String },

    /// Media was staged and a caption is needed.
    MediaStaged { user: UserId },

    /// A draft was handed to the scheduling engine.
    EntryScheduled {
        user: UserId,
        entry_id: Uuid,
        publish_at: DateTime<Utc>,
    },

    /// A pending entry was removed before it fired.
    EntryCancelled { user: UserId, entry_id: Uuid },

    /// A publish attempt succeeded.
    Published {
        user: UserId,
        platform_post_id: String,
        /// Present when the publish was a scheduled entry firing.
        entry_id: Option<Uuid>,
    },

    /// A publish attempt failed at the given stage.
    PublishFailed {
        user: UserId,
        stage: PublishStage,
        error: String,
        entry_id: Option<Uuid>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission_and_subscription() {
        let bus = EventBus::new(10);
        let mut receiver = bus.subscribe();

        bus.emit(Event::DraftReady {
            user: UserId(1),
            text: "rewritten".to_string(),
        });

        match receiver.recv().await.unwrap() {
            Event::DraftReady { user, text } => {
                assert_eq!(user, UserId(1));
                assert_eq!(text, "rewritten");
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut r1 = bus.subscribe();
        let mut r2 = bus.subscribe();

        let id = Uuid::new_v4();
        bus.emit(Event::EntryCancelled {
            user: UserId(1),
            entry_id: id,
        });

        for receiver in [&mut r1, &mut r2] {
            match receiver.recv().await.unwrap() {
                Event::EntryCancelled { entry_id, .. } => assert_eq!(entry_id, id),
                other => panic!("Wrong event type received: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let bus = EventBus::new(10);

        // Emit with no subscribers - must not panic or block
        bus.emit(Event::MediaStaged { user: UserId(1) });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = Event::PublishFailed {
            user: UserId(9),
            stage: PublishStage::MediaUpload,
            error: "rejected".to_string(),
            entry_id: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("publish_failed"));
        assert!(json.contains("media_upload"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        match deserialized {
            Event::PublishFailed { stage, error, .. } => {
                assert_eq!(stage, PublishStage::MediaUpload);
                assert_eq!(error, "rejected");
            }
            other => panic!("Deserialization produced {:?}", other),
        }
    }

    #[test]
    fn test_publish_stage_display() {
        assert_eq!(PublishStage::Validation.to_string(), "validation");
        assert_eq!(PublishStage::Transcode.to_string(), "transcode");
        assert_eq!(PublishStage::MediaUpload.to_string(), "media upload");
        assert_eq!(PublishStage::PostCreation.to_string(), "post creation");
    }
}
