use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::message::{MessageDetail, OwnMessage, SentMessage};

use super::conversation_service::ConversationService;

/// Message store access. Posting requires participation in the owning
/// conversation; editing and deleting are sender-only and surface the
/// merged `NotFoundOrForbidden` error so callers cannot distinguish
/// "missing" from "not yours".
pub struct MessageService;

impl MessageService {
    /// Everything the user has sent, newest first.
    pub async fn list_for_sender(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> AppResult<Vec<SentMessage>> {
        let rows = sqlx::query_as::<_, SentMessage>(
            "SELECT conversation_id, content, created_at \
             FROM messages WHERE sender_id = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// A single message, visible only to its sender.
    pub async fn get_by_id(
        db: &Pool<Postgres>,
        user_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<OwnMessage> {
        let message = sqlx::query_as::<_, OwnMessage>(
            "SELECT id, sender_id, conversation_id, content, created_at \
             FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(db)
        .await?;

        match message {
            Some(m) if m.sender_id == user_id => Ok(m),
            _ => Err(AppError::NotFoundOrForbidden),
        }
    }

    /// Posts a message. The participant check runs before anything is
    /// written, so a forbidden send creates no record.
    pub async fn send(
        db: &Pool<Postgres>,
        sender_id: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<MessageDetail> {
        if !ConversationService::is_participant(db, conversation_id, sender_id).await? {
            return Err(AppError::Forbidden);
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("message content must not be empty".into()));
        }

        let id = Uuid::new_v4();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO messages (id, conversation_id, sender_id, content) \
             VALUES ($1, $2, $3, $4) RETURNING created_at",
        )
        .bind(id)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(db)
        .await?;

        let sender = super::fetch_user_profile(db, sender_id).await?;

        Ok(MessageDetail {
            id,
            conversation_id,
            content: content.to_string(),
            created_at,
            sender,
        })
    }

    /// Sender-only content edit, scoped to the conversation in the
    /// request path.
    pub async fn update(
        db: &Pool<Postgres>,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        content: &str,
    ) -> AppResult<MessageDetail> {
        Self::verify_sender(db, user_id, conversation_id, message_id).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("message content must not be empty".into()));
        }

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE messages SET content = $1 WHERE id = $2 RETURNING created_at",
        )
        .bind(content)
        .bind(message_id)
        .fetch_one(db)
        .await?;

        let sender = super::fetch_user_profile(db, user_id).await?;

        Ok(MessageDetail {
            id: message_id,
            conversation_id,
            content: content.to_string(),
            created_at,
            sender,
        })
    }

    /// Sender-only delete. A second delete of the same id falls through
    /// to the merged error because the row is gone.
    pub async fn delete(
        db: &Pool<Postgres>,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<()> {
        Self::verify_sender(db, user_id, conversation_id, message_id).await?;

        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(db)
            .await?;

        Ok(())
    }

    /// The combined existence/ownership/scoping check for message
    /// mutations. All three failure modes present identically.
    async fn verify_sender(
        db: &Pool<Postgres>,
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> AppResult<()> {
        let row = sqlx::query("SELECT sender_id, conversation_id FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(db)
            .await?;

        match row {
            Some(r) => {
                let sender_id: Uuid = r.get("sender_id");
                let owner: Uuid = r.get("conversation_id");
                if sender_id != user_id || owner != conversation_id {
                    return Err(AppError::NotFoundOrForbidden);
                }
                Ok(())
            }
            None => Err(AppError::NotFoundOrForbidden),
        }
    }
}
