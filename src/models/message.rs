use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserProfile;

/// Full message payload as returned to participants and broadcast to
/// the conversation group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender: UserProfile,
}

/// Reduced shape for "my sent messages" listings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SentMessage {
    pub conversation_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Sender-scoped view of a single message (get-by-id).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OwnMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub conversation_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
