use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::conversation::{ConversationDetail, ConversationPatch, ConversationSummary};
use crate::models::message::MessageDetail;
use crate::models::UserProfile;

/// Conversation store access. Authorization rules:
/// any participant may read and post; only the author may change the
/// title or membership, or delete the conversation.
pub struct ConversationService;

/// Participant set for a new conversation: resolved ids unioned with
/// the author, deduplicated, author first.
fn participant_union(author_id: Uuid, resolved: Vec<Uuid>) -> Vec<Uuid> {
    let mut ids = vec![author_id];
    for id in resolved {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Removals never touch the author; they always remain a participant.
fn removable(author_id: Uuid, resolved: Vec<Uuid>) -> Vec<Uuid> {
    resolved.into_iter().filter(|id| *id != author_id).collect()
}

/// Net membership change for a patch. A user listed for both addition
/// and removal is removed, and the author is never removed, so the
/// resulting sets are disjoint and order of application is irrelevant.
fn membership_delta(
    author_id: Uuid,
    additions: Vec<Uuid>,
    removals: Vec<Uuid>,
) -> (Vec<Uuid>, Vec<Uuid>) {
    let removals = removable(author_id, removals);
    let additions = additions
        .into_iter()
        .filter(|id| !removals.contains(id))
        .collect();
    (additions, removals)
}

impl ConversationService {
    /// Resolves emails to user ids inside the caller's transaction.
    /// Emails with no matching user are silently dropped.
    async fn resolve_emails(
        tx: &mut Transaction<'_, Postgres>,
        emails: &[String],
    ) -> AppResult<Vec<Uuid>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = ANY($1)")
            .bind(emails)
            .fetch_all(&mut **tx)
            .await?;
        Ok(ids)
    }

    pub async fn is_participant(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        let rec = sqlx::query(
            "SELECT 1 FROM conversation_participants WHERE conversation_id = $1 AND user_id = $2 LIMIT 1",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(rec.is_some())
    }

    /// Every conversation the user participates in, most recently
    /// active first. The summary timestamp is the latest message time,
    /// or the conversation's creation time when no message exists; ties
    /// break on id so the order is deterministic.
    pub async fn list_for_user(
        db: &Pool<Postgres>,
        user_id: Uuid,
    ) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id,
                   c.title,
                   COALESCE(m.content, '') AS last_message,
                   COALESCE(m.created_at, c.created_at) AS updated_at
            FROM conversations c
            JOIN conversation_participants cp ON cp.conversation_id = c.id
            LEFT JOIN LATERAL (
                SELECT content, created_at
                FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) m ON TRUE
            WHERE cp.user_id = $1
            ORDER BY COALESCE(m.created_at, c.created_at) DESC, c.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        let summaries = rows
            .into_iter()
            .map(|row| ConversationSummary {
                id: row.get("id"),
                title: row.get("title"),
                last_message: row.get("last_message"),
                updated_at: row.get("updated_at"),
            })
            .collect();

        Ok(summaries)
    }

    /// Full conversation with author, participants, and messages in
    /// ascending creation order. Nonexistent ids always yield
    /// `NotFound`; `Forbidden` is only reachable once the conversation
    /// is known to exist.
    pub async fn get_by_id(
        db: &Pool<Postgres>,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<ConversationDetail> {
        let exists = sqlx::query("SELECT 1 FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(db)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound);
        }

        if !Self::is_participant(db, conversation_id, user_id).await? {
            return Err(AppError::Forbidden);
        }

        Self::load_detail(db, conversation_id).await
    }

    /// Creates a conversation in one transaction: either the row and
    /// all participant links land together, or nothing does.
    pub async fn create(
        db: &Pool<Postgres>,
        author_id: Uuid,
        title: Option<String>,
        participant_emails: &[String],
    ) -> AppResult<ConversationDetail> {
        let conversation_id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        Self::insert_conversation(&mut tx, conversation_id, author_id, &title, participant_emails)
            .await?;
        tx.commit().await.map_err(AppError::from_tx)?;

        Self::load_detail(db, conversation_id).await
    }

    /// Same atomic unit as `create`, plus the author's first message.
    /// Fan-out is the caller's responsibility and must happen only
    /// after this returns (the transaction has committed by then).
    pub async fn create_with_message(
        db: &Pool<Postgres>,
        author_id: Uuid,
        title: Option<String>,
        participant_emails: &[String],
        initial_message: &str,
    ) -> AppResult<(ConversationDetail, MessageDetail)> {
        let content = initial_message.trim();
        if content.is_empty() {
            return Err(AppError::Validation("initial message must not be empty".into()));
        }

        let conversation_id = Uuid::new_v4();
        let message_id = Uuid::new_v4();
        let mut tx = db.begin().await?;
        Self::insert_conversation(&mut tx, conversation_id, author_id, &title, participant_emails)
            .await?;
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO messages (id, conversation_id, sender_id, content) \
             VALUES ($1, $2, $3, $4) RETURNING created_at",
        )
        .bind(message_id)
        .bind(conversation_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from_tx)?;
        tx.commit().await.map_err(AppError::from_tx)?;

        let detail = Self::load_detail(db, conversation_id).await?;
        let message = MessageDetail {
            id: message_id,
            conversation_id,
            content: content.to_string(),
            created_at,
            sender: detail.author.clone(),
        };
        Ok((detail, message))
    }

    /// Author-only metadata and membership update. Removal wins when
    /// the same user appears in both lists (see `membership_delta`).
    /// Unresolvable emails are dropped.
    pub async fn update(
        db: &Pool<Postgres>,
        user_id: Uuid,
        conversation_id: Uuid,
        patch: ConversationPatch,
    ) -> AppResult<ConversationDetail> {
        let mut tx = db.begin().await?;

        let author_id: Uuid =
            sqlx::query_scalar("SELECT author_id FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound)?;
        if author_id != user_id {
            return Err(AppError::Forbidden);
        }

        if let Some(title) = &patch.title {
            sqlx::query("UPDATE conversations SET title = $1 WHERE id = $2")
                .bind(title)
                .bind(conversation_id)
                .execute(&mut *tx)
                .await
                .map_err(AppError::from_tx)?;
        }

        let additions = match &patch.add_participant_emails {
            Some(emails) => Self::resolve_emails(&mut tx, emails).await?,
            None => Vec::new(),
        };
        let removals = match &patch.remove_participant_emails {
            Some(emails) => Self::resolve_emails(&mut tx, emails).await?,
            None => Vec::new(),
        };
        let (add_ids, remove_ids) = membership_delta(author_id, additions, removals);

        for id in add_ids {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(conversation_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_tx)?;
        }

        if !remove_ids.is_empty() {
            sqlx::query(
                "DELETE FROM conversation_participants \
                 WHERE conversation_id = $1 AND user_id = ANY($2)",
            )
            .bind(conversation_id)
            .bind(&remove_ids)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from_tx)?;
        }

        tx.commit().await.map_err(AppError::from_tx)?;

        Self::load_detail(db, conversation_id).await
    }

    /// Author-only delete; messages and participant links cascade.
    pub async fn delete(
        db: &Pool<Postgres>,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<()> {
        let author_id: Uuid =
            sqlx::query_scalar("SELECT author_id FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(db)
                .await?
                .ok_or(AppError::NotFound)?;
        if author_id != user_id {
            return Err(AppError::Forbidden);
        }

        sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .execute(db)
            .await?;

        Ok(())
    }

    async fn insert_conversation(
        tx: &mut Transaction<'_, Postgres>,
        conversation_id: Uuid,
        author_id: Uuid,
        title: &Option<String>,
        participant_emails: &[String],
    ) -> AppResult<()> {
        let resolved = Self::resolve_emails(tx, participant_emails).await?;
        let participant_ids = participant_union(author_id, resolved);

        sqlx::query("INSERT INTO conversations (id, title, author_id) VALUES ($1, $2, $3)")
            .bind(conversation_id)
            .bind(title)
            .bind(author_id)
            .execute(&mut **tx)
            .await
            .map_err(AppError::from_tx)?;

        for id in &participant_ids {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(conversation_id)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(AppError::from_tx)?;
        }

        Ok(())
    }

    pub(crate) async fn load_detail(
        db: &Pool<Postgres>,
        conversation_id: Uuid,
    ) -> AppResult<ConversationDetail> {
        let row = sqlx::query("SELECT title, created_at, author_id FROM conversations WHERE id = $1")
            .bind(conversation_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;
        let title: Option<String> = row.get("title");
        let created_at: DateTime<Utc> = row.get("created_at");
        let author_id: Uuid = row.get("author_id");

        let author = super::fetch_user_profile(db, author_id).await?;

        let participants = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.email, u.name
            FROM users u
            JOIN conversation_participants cp ON cp.user_id = u.id
            WHERE cp.conversation_id = $1
            ORDER BY u.email ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(db)
        .await?;

        let message_rows = sqlx::query(
            r#"
            SELECT m.id, m.content, m.created_at,
                   u.id AS sender_id, u.email AS sender_email, u.name AS sender_name
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = $1
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(db)
        .await?;

        let messages = message_rows
            .into_iter()
            .map(|r| MessageDetail {
                id: r.get("id"),
                conversation_id,
                content: r.get("content"),
                created_at: r.get("created_at"),
                sender: UserProfile {
                    id: r.get("sender_id"),
                    email: r.get("sender_email"),
                    name: r.get("sender_name"),
                },
            })
            .collect();

        Ok(ConversationDetail {
            id: conversation_id,
            title,
            created_at,
            author,
            participants,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_always_includes_author_exactly_once() {
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();

        // Author omitted from the resolved list.
        let ids = participant_union(author, vec![other]);
        assert_eq!(ids, vec![author, other]);

        // Author resolved from their own email: no duplicate.
        let ids = participant_union(author, vec![other, author, other]);
        assert_eq!(ids, vec![author, other]);
    }

    #[test]
    fn union_of_empty_list_is_just_the_author() {
        let author = Uuid::new_v4();
        assert_eq!(participant_union(author, Vec::new()), vec![author]);
    }

    #[test]
    fn author_is_never_removable() {
        let author = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(removable(author, vec![a, author, b]), vec![a, b]);
        assert!(removable(author, vec![author]).is_empty());
    }

    #[test]
    fn adding_and_removing_the_same_user_nets_to_removal() {
        let author = Uuid::new_v4();
        let both = Uuid::new_v4();
        let added = Uuid::new_v4();

        let (add, remove) = membership_delta(author, vec![added, both], vec![both]);
        assert_eq!(add, vec![added]);
        assert_eq!(remove, vec![both]);
    }

    #[test]
    fn author_in_both_lists_stays_a_participant() {
        let author = Uuid::new_v4();

        let (add, remove) = membership_delta(author, vec![author], vec![author]);
        assert_eq!(add, vec![author]);
        assert!(remove.is_empty());
    }
}
