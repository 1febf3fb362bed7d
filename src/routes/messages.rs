use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::message::{MessageDetail, OwnMessage, SentMessage};
use crate::services::message_service::MessageService;
use crate::state::AppState;
use crate::websocket::events::{self, ChatEvent};

#[derive(Deserialize)]
pub struct MessageContentRequest {
    pub content: String,
}

/// GET /messages — everything the caller has sent, newest first.
pub async fn list_my_messages(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SentMessage>>, AppError> {
    let messages = MessageService::list_for_sender(&state.db, user.id).await?;
    Ok(Json(messages))
}

/// GET /messages/:id — sender-only view of a single message.
pub async fn get_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OwnMessage>, AppError> {
    let message = MessageService::get_by_id(&state.db, user.id, id).await?;
    Ok(Json(message))
}

/// POST /conversations/:id/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<MessageContentRequest>,
) -> Result<(StatusCode, Json<MessageDetail>), AppError> {
    let message =
        MessageService::send(&state.db, user.id, conversation_id, &body.content).await?;

    events::emit(
        &state.registry,
        conversation_id,
        &ChatEvent::MessageNew {
            message: message.clone(),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

/// PUT /conversations/:id/messages/:message_id
pub async fn update_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((conversation_id, message_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<MessageContentRequest>,
) -> Result<Json<MessageDetail>, AppError> {
    let message = MessageService::update(
        &state.db,
        user.id,
        conversation_id,
        message_id,
        &body.content,
    )
    .await?;

    events::emit(
        &state.registry,
        conversation_id,
        &ChatEvent::MessageUpdated {
            message: message.clone(),
        },
    )
    .await;

    Ok(Json(message))
}

/// DELETE /conversations/:id/messages/:message_id
pub async fn delete_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((conversation_id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    MessageService::delete(&state.db, user.id, conversation_id, message_id).await?;

    events::emit(
        &state.registry,
        conversation_id,
        &ChatEvent::MessageDeleted {
            conversation_id,
            message_id,
        },
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
