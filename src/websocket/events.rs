//! Real-time event definitions and emission helpers.
//!
//! Every event serializes to one flat JSON object:
//!
//! ```json
//! {
//!     "type": "message.new",
//!     "timestamp": "2026-01-10T10:30:00Z",
//!     ...event fields...
//! }
//! ```
//!
//! Emission is strictly best-effort: serialization or delivery problems
//! are logged and swallowed, never bubbled back into the request that
//! triggered them. Callers emit only after their transaction commits.

use axum::extract::ws::Message;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::conversation::ConversationSummary;
use crate::models::message::MessageDetail;
use crate::websocket::ChatRegistry;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatEvent {
    MessageNew { message: MessageDetail },
    MessageUpdated { message: MessageDetail },
    // Carries only the id; clients just drop the message from view.
    MessageDeleted { conversation_id: Uuid, message_id: Uuid },
    ConversationNew { conversation: ConversationSummary },
}

impl ChatEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageNew { .. } => "message.new",
            Self::MessageUpdated { .. } => "message.updated",
            Self::MessageDeleted { .. } => "message.deleted",
            Self::ConversationNew { .. } => "conversation.new",
        }
    }

    /// Flat broadcast payload: the envelope fields plus the event's own
    /// fields at the top level. This is the only place event
    /// serialization happens.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut payload = serde_json::json!({
            "type": self.event_type(),
            "timestamp": Utc::now().to_rfc3339(),
        });

        let fields = serde_json::to_value(self)?;
        if let serde_json::Value::Object(map) = fields {
            for (key, value) in map {
                payload[key] = value;
            }
        }

        Ok(payload)
    }
}

/// Delivers an event to one broadcast group. Failures are logged and
/// dropped so a committed mutation is never reported as failed because
/// fan-out misbehaved.
pub async fn emit(registry: &ChatRegistry, group: Uuid, event: &ChatEvent) {
    let payload = match event.to_payload() {
        Ok(value) => value.to_string(),
        Err(e) => {
            tracing::error!(error = %e, event = event.event_type(), "failed to serialize event");
            return;
        }
    };
    registry.broadcast(group, Message::Text(payload)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    fn sample_message() -> MessageDetail {
        MessageDetail {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            content: "hello".into(),
            created_at: Utc::now(),
            sender: UserProfile {
                id: Uuid::new_v4(),
                email: "a@x.com".into(),
                name: "A".into(),
            },
        }
    }

    #[test]
    fn event_types_follow_object_action_naming() {
        let msg = sample_message();
        assert_eq!(
            ChatEvent::MessageNew { message: msg.clone() }.event_type(),
            "message.new"
        );
        assert_eq!(
            ChatEvent::MessageUpdated { message: msg }.event_type(),
            "message.updated"
        );
        assert_eq!(
            ChatEvent::MessageDeleted {
                conversation_id: Uuid::new_v4(),
                message_id: Uuid::new_v4(),
            }
            .event_type(),
            "message.deleted"
        );
    }

    #[test]
    fn payload_is_flat_with_type_and_timestamp() {
        let msg = sample_message();
        let payload = ChatEvent::MessageNew { message: msg.clone() }
            .to_payload()
            .unwrap();

        assert_eq!(payload["type"], "message.new");
        assert!(payload["timestamp"].is_string());
        assert_eq!(payload["message"]["id"], msg.id.to_string());
        assert_eq!(payload["message"]["content"], "hello");
        assert_eq!(
            payload["message"]["sender"]["email"],
            msg.sender.email
        );
    }

    #[test]
    fn deleted_payload_carries_only_identifiers() {
        let conversation_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();
        let payload = ChatEvent::MessageDeleted {
            conversation_id,
            message_id,
        }
        .to_payload()
        .unwrap();

        assert_eq!(payload["type"], "message.deleted");
        assert_eq!(payload["message_id"], message_id.to_string());
        assert_eq!(payload["conversation_id"], conversation_id.to_string());
        assert!(payload.get("message").is_none());
        assert!(payload.get("content").is_none());
    }
}
