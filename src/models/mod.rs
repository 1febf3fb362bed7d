pub mod conversation;
pub mod message;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public identity shape attached to conversations and messages.
/// Users are owned by an external identity flow; this service only
/// ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}
