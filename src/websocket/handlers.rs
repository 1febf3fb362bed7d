use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{error, warn};
use uuid::Uuid;

use crate::middleware::auth::verify_token;
use crate::services::conversation_service::ConversationService;
use crate::state::AppState;
use crate::websocket::message_types::WsInboundEvent;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// GET /ws — upgrades after validating the token from the query string
/// (browser clients cannot set headers on a websocket handshake) or
/// the Authorization header.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let token = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });

    let user_id = match token.as_deref().map(|t| verify_token(&state.config.jwt_secret, t)) {
        Some(Ok(id)) => id,
        _ => {
            warn!("websocket connection rejected: missing or invalid token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, user_id, socket))
        .into_response()
}

async fn handle_socket(state: AppState, user_id: Uuid, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = unbounded_channel();

    // Every connection starts in its user's personal group so targeted
    // notifications work without any explicit join.
    state
        .registry
        .subscribe(user_id, connection_id, tx.clone())
        .await;

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            maybe = rx.recv() => {
                match maybe {
                    Some(msg) => {
                        if sink.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(txt))) => {
                        // Unparseable frames are dropped, not fatal.
                        if let Ok(evt) = serde_json::from_str::<WsInboundEvent>(&txt) {
                            handle_inbound(&state, user_id, connection_id, &tx, evt).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.registry.drop_connection(connection_id).await;
}

async fn handle_inbound(
    state: &AppState,
    user_id: Uuid,
    connection_id: Uuid,
    tx: &UnboundedSender<Message>,
    evt: WsInboundEvent,
) {
    match evt {
        WsInboundEvent::JoinConversation { conversation_id } => {
            match ConversationService::is_participant(&state.db, conversation_id, user_id).await {
                Ok(true) => {
                    state
                        .registry
                        .subscribe(conversation_id, connection_id, tx.clone())
                        .await;
                }
                Ok(false) => {
                    warn!(%user_id, %conversation_id, "join refused: not a participant");
                }
                Err(e) => {
                    error!(%user_id, %conversation_id, error = %e, "join membership check failed");
                }
            }
        }
        WsInboundEvent::LeaveConversation { conversation_id } => {
            state
                .registry
                .unsubscribe(conversation_id, connection_id)
                .await;
        }
    }
}
