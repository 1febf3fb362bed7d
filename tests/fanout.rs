//! Fan-out behavior over the broadcast registry, driven end to end
//! through channels: no database or live socket required.

use axum::extract::ws::Message;
use chat_service::models::conversation::ConversationSummary;
use chat_service::models::message::MessageDetail;
use chat_service::models::UserProfile;
use chat_service::websocket::events::{self, ChatEvent};
use chat_service::websocket::ChatRegistry;
use chrono::Utc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use uuid::Uuid;

fn profile(email: &str) -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        email: email.into(),
        name: email.split('@').next().unwrap_or("user").into(),
    }
}

fn recv_json(rx: &mut UnboundedReceiver<Message>) -> serde_json::Value {
    match rx.try_recv().expect("expected a delivered frame") {
        Message::Text(txt) => serde_json::from_str(&txt).expect("frame should be JSON"),
        other => panic!("unexpected frame: {other:?}"),
    }
}

#[tokio::test]
async fn new_message_reaches_conversation_group_and_summaries_reach_personal_groups() {
    let registry = ChatRegistry::new();
    let conversation_id = Uuid::new_v4();
    let alice = profile("alice@x.com");
    let bob = profile("bob@x.com");

    // Both users connected: personal group plus the conversation group.
    let (tx_a, mut rx_a) = unbounded_channel();
    let (tx_b, mut rx_b) = unbounded_channel();
    let conn_a = Uuid::new_v4();
    let conn_b = Uuid::new_v4();
    registry.subscribe(alice.id, conn_a, tx_a.clone()).await;
    registry.subscribe(bob.id, conn_b, tx_b.clone()).await;
    registry.subscribe(conversation_id, conn_a, tx_a).await;
    registry.subscribe(conversation_id, conn_b, tx_b).await;

    let message = MessageDetail {
        id: Uuid::new_v4(),
        conversation_id,
        content: "hello".into(),
        created_at: Utc::now(),
        sender: alice.clone(),
    };

    events::emit(
        &registry,
        conversation_id,
        &ChatEvent::MessageNew {
            message: message.clone(),
        },
    )
    .await;

    for rx in [&mut rx_a, &mut rx_b] {
        let frame = recv_json(rx);
        assert_eq!(frame["type"], "message.new");
        assert_eq!(frame["message"]["content"], "hello");
        assert_eq!(frame["message"]["sender"]["email"], "alice@x.com");
    }

    // One summary per participant's personal group.
    let summary = ConversationSummary {
        id: conversation_id,
        title: Some("hi".into()),
        last_message: message.content.clone(),
        updated_at: message.created_at,
    };
    for user in [&alice, &bob] {
        events::emit(
            &registry,
            user.id,
            &ChatEvent::ConversationNew {
                conversation: summary.clone(),
            },
        )
        .await;
    }

    for rx in [&mut rx_a, &mut rx_b] {
        let frame = recv_json(rx);
        assert_eq!(frame["type"], "conversation.new");
        assert_eq!(frame["conversation"]["last_message"], "hello");
        // Exactly one conversation.new each.
        assert!(rx.try_recv().is_err());
    }
}

#[tokio::test]
async fn delete_event_carries_only_the_message_id() {
    let registry = ChatRegistry::new();
    let conversation_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();
    let (tx, mut rx) = unbounded_channel();
    registry.subscribe(conversation_id, Uuid::new_v4(), tx).await;

    events::emit(
        &registry,
        conversation_id,
        &ChatEvent::MessageDeleted {
            conversation_id,
            message_id,
        },
    )
    .await;

    let frame = recv_json(&mut rx);
    assert_eq!(frame["type"], "message.deleted");
    assert_eq!(frame["message_id"], message_id.to_string());
    assert!(frame.get("content").is_none());
}

#[tokio::test]
async fn emission_to_an_empty_group_is_a_silent_noop() {
    let registry = ChatRegistry::new();
    let conversation_id = Uuid::new_v4();
    let message_id = Uuid::new_v4();

    // Nobody connected: best-effort delivery drops the event.
    events::emit(
        &registry,
        conversation_id,
        &ChatEvent::MessageDeleted {
            conversation_id,
            message_id,
        },
    )
    .await;

    assert_eq!(registry.group_size(conversation_id).await, 0);
}

#[tokio::test]
async fn disconnected_endpoint_receives_nothing_further() {
    let registry = ChatRegistry::new();
    let conversation_id = Uuid::new_v4();
    let connection = Uuid::new_v4();
    let (tx, mut rx) = unbounded_channel();
    registry.subscribe(conversation_id, connection, tx).await;

    registry.drop_connection(connection).await;

    events::emit(
        &registry,
        conversation_id,
        &ChatEvent::MessageDeleted {
            conversation_id,
            message_id: Uuid::new_v4(),
        },
    )
    .await;

    assert!(rx.try_recv().is_err());
}
