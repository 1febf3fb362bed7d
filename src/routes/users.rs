use axum::extract::State;
use axum::Json;

use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::UserProfile;
use crate::state::AppState;

/// GET /users — the user directory, so clients can pick participant
/// emails when composing a conversation.
pub async fn list_users(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let users = crate::services::list_user_profiles(&state.db).await?;
    Ok(Json(users))
}
