use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod conversations;
use conversations::{
    create_conversation, create_conversation_with_message, delete_conversation,
    get_conversation, list_conversations, update_conversation,
};
pub mod messages;
use messages::{delete_message, get_message, list_my_messages, send_message, update_message};
pub mod users;
use users::list_users;

use crate::websocket::handlers::ws_handler;

pub fn build_router(state: AppState) -> Router {
    // Health stays public for probes.
    let introspection = Router::new().route("/health", get(|| async { "OK" }));

    let api_v1 = Router::new()
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route(
            "/conversations/with-message",
            axum::routing::post(create_conversation_with_message),
        )
        .route(
            "/conversations/:id",
            get(get_conversation)
                .put(update_conversation)
                .delete(delete_conversation),
        )
        .route(
            "/conversations/:id/messages",
            axum::routing::post(send_message),
        )
        .route(
            "/conversations/:id/messages/:message_id",
            axum::routing::put(update_message).delete(delete_message),
        )
        .route("/messages", get(list_my_messages))
        .route("/messages/:id", get(get_message))
        .route("/users", get(list_users))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ))
        // The websocket handshake validates its own token (query string
        // or header), so it sits outside the header-only middleware.
        .route("/ws", get(ws_handler));

    introspection
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
