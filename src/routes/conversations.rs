use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::CurrentUser;
use crate::models::conversation::{ConversationDetail, ConversationPatch, ConversationSummary};
use crate::models::message::MessageDetail;
use crate::services::conversation_service::ConversationService;
use crate::state::AppState;
use crate::websocket::events::{self, ChatEvent};

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub participant_emails: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreateWithMessageRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub participant_emails: Vec<String>,
    pub initial_message: String,
}

#[derive(Serialize)]
pub struct ConversationWithMessageResponse {
    pub conversation: ConversationDetail,
    pub message: MessageDetail,
}

/// GET /conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ConversationSummary>>, AppError> {
    let summaries = ConversationService::list_for_user(&state.db, user.id).await?;
    Ok(Json(summaries))
}

/// GET /conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationDetail>, AppError> {
    let detail = ConversationService::get_by_id(&state.db, user.id, id).await?;
    Ok(Json(detail))
}

/// POST /conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationDetail>), AppError> {
    let detail = ConversationService::create(
        &state.db,
        user.id,
        body.title,
        &body.participant_emails,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// POST /conversations/with-message
///
/// Creates the conversation and its first message in one transaction,
/// then notifies the conversation group and each participant's
/// personal group. Emission happens strictly after commit and cannot
/// fail the request.
pub async fn create_conversation_with_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateWithMessageRequest>,
) -> Result<(StatusCode, Json<ConversationWithMessageResponse>), AppError> {
    let (conversation, message) = ConversationService::create_with_message(
        &state.db,
        user.id,
        body.title,
        &body.participant_emails,
        &body.initial_message,
    )
    .await?;

    events::emit(
        &state.registry,
        conversation.id,
        &ChatEvent::MessageNew {
            message: message.clone(),
        },
    )
    .await;

    let summary = ConversationSummary {
        id: conversation.id,
        title: conversation.title.clone(),
        last_message: message.content.clone(),
        updated_at: message.created_at,
    };
    for participant in &conversation.participants {
        events::emit(
            &state.registry,
            participant.id,
            &ChatEvent::ConversationNew {
                conversation: summary.clone(),
            },
        )
        .await;
    }

    Ok((
        StatusCode::CREATED,
        Json(ConversationWithMessageResponse {
            conversation,
            message,
        }),
    ))
}

/// PUT /conversations/:id
pub async fn update_conversation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<ConversationPatch>,
) -> Result<Json<ConversationDetail>, AppError> {
    let detail = ConversationService::update(&state.db, user.id, id, patch).await?;
    Ok(Json(detail))
}

/// DELETE /conversations/:id
pub async fn delete_conversation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ConversationService::delete(&state.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
