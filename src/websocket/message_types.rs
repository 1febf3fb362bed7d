use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client -> server frames. Joining and leaving conversation groups is
/// idempotent; anything unparseable is ignored by the socket loop.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    #[serde(rename = "conversation.join")]
    JoinConversation { conversation_id: Uuid },
    #[serde(rename = "conversation.leave")]
    LeaveConversation { conversation_id: Uuid },
}
