//! Room event fan-out boundary.
//!
//! Events follow the "object.action" naming convention and share one flat
//! JSON structure:
//!
//! ```json
//! {
//!     "type": "message.created",
//!     "timestamp": "2026-08-07T10:30:00Z",
//!     "room_id": "uuid",
//!     ...event fields...
//! }
//! ```
//!
//! The engine emits events after a mutation commits. Delivery is
//! fire-and-forget: a failed broadcast is logged and never unwinds the
//! committed mutation.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

pub mod redis;

pub use self::redis::RedisNotifier;

/// What a replaced message's subscribers should re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderIntent {
    /// The message's own presentation changed (body, todo state).
    Presentation,
    /// A child came or went; the visible reply count is stale.
    ReplyCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoomEvent {
    #[serde(rename = "message.created")]
    Created { room_id: Uuid, message: Message },

    #[serde(rename = "message.replaced")]
    Replaced {
        room_id: Uuid,
        message: Message,
        intent: RenderIntent,
    },

    #[serde(rename = "message.removed")]
    Removed { room_id: Uuid, message_id: Uuid },

    /// Thread membership changed; carries both old and new parent so
    /// clients can reconcile either panel.
    #[serde(rename = "thread.changed")]
    ThreadChanged {
        room_id: Uuid,
        message: Message,
        old_parent_id: Option<Uuid>,
        new_parent_id: Option<Uuid>,
    },
}

impl RoomEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "message.created",
            Self::Replaced { .. } => "message.replaced",
            Self::Removed { .. } => "message.removed",
            Self::ThreadChanged { .. } => "thread.changed",
        }
    }

    pub fn room_id(&self) -> Uuid {
        match self {
            Self::Created { room_id, .. }
            | Self::Replaced { room_id, .. }
            | Self::Removed { room_id, .. }
            | Self::ThreadChanged { room_id, .. } => *room_id,
        }
    }

    pub fn to_payload_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut payload = serde_json::json!({
            "type": self.event_type(),
            "timestamp": Utc::now().to_rfc3339(),
            "room_id": self.room_id(),
        });

        // Unwrap the externally tagged enum and flatten the variant's
        // fields into the payload.
        let event_data = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = event_data {
            for (_, inner) in map {
                if let serde_json::Value::Object(fields) = inner {
                    for (key, value) in fields {
                        payload[key] = value;
                    }
                }
            }
        }

        Ok(payload)
    }

    /// Serialize to the JSON string published to subscribers.
    pub fn to_broadcast_payload(&self) -> Result<String, serde_json::Error> {
        let value = self.to_payload_value()?;
        serde_json::to_string(&value)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: RoomEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoState;

    fn sample_message(room_id: Uuid) -> Message {
        Message {
            id: Uuid::now_v7(),
            room_id,
            creator_id: Uuid::new_v4(),
            body: "hello".into(),
            parent_id: None,
            ancestry_root_id: None,
            todo_state: TodoState::None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn event_payload_is_flat() {
        let room_id = Uuid::new_v4();
        let message = sample_message(room_id);
        let event = RoomEvent::Created {
            room_id,
            message: message.clone(),
        };

        let payload = event.to_broadcast_payload().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(parsed["type"], "message.created");
        assert_eq!(parsed["room_id"], room_id.to_string());
        assert_eq!(parsed["message"]["id"], message.id.to_string());
        assert!(parsed["timestamp"].is_string());
        assert!(parsed.get("message.created").is_none(), "tag must be unwrapped");
    }

    #[test]
    fn replaced_payload_carries_intent() {
        let room_id = Uuid::new_v4();
        let event = RoomEvent::Replaced {
            room_id,
            message: sample_message(room_id),
            intent: RenderIntent::ReplyCount,
        };

        let parsed = event.to_payload_value().unwrap();
        assert_eq!(parsed["type"], "message.replaced");
        assert_eq!(parsed["intent"], "reply_count");
    }

    #[test]
    fn event_types_are_unique() {
        let room_id = Uuid::new_v4();
        let message = sample_message(room_id);
        let types = vec![
            RoomEvent::Created {
                room_id,
                message: message.clone(),
            }
            .event_type(),
            RoomEvent::Replaced {
                room_id,
                message: message.clone(),
                intent: RenderIntent::Presentation,
            }
            .event_type(),
            RoomEvent::Removed {
                room_id,
                message_id: message.id,
            }
            .event_type(),
            RoomEvent::ThreadChanged {
                room_id,
                message,
                old_parent_id: None,
                new_parent_id: None,
            }
            .event_type(),
        ];

        let unique: std::collections::HashSet<_> = types.iter().collect();
        assert_eq!(types.len(), unique.len());
    }
}
