pub mod conversation_service;
pub mod message_service;

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::UserProfile;

/// The full user directory, ordered by email for stable listings.
pub async fn list_user_profiles(db: &Pool<Postgres>) -> AppResult<Vec<UserProfile>> {
    let users =
        sqlx::query_as::<_, UserProfile>("SELECT id, email, name FROM users ORDER BY email ASC")
            .fetch_all(db)
            .await?;
    Ok(users)
}

pub(crate) async fn fetch_user_profile(
    db: &Pool<Postgres>,
    user_id: Uuid,
) -> AppResult<UserProfile> {
    sqlx::query_as::<_, UserProfile>("SELECT id, email, name FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}
