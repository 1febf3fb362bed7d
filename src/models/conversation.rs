use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::MessageDetail;
use super::UserProfile;

/// One row of the conversation list: the conversation plus its most
/// recent message (empty string when no message exists yet).
/// `updated_at` is the latest message time, falling back to the
/// conversation's creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: UserProfile,
    pub participants: Vec<UserProfile>,
    pub messages: Vec<MessageDetail>,
}

/// Explicit patch for conversation updates. A user present in both
/// lists ends up removed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub add_participant_emails: Option<Vec<String>>,
    pub remove_participant_emails: Option<Vec<String>>,
}
