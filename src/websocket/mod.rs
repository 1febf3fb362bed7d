use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

pub mod events;
pub mod handlers;
pub mod message_types;

/// Broadcast-group membership table. Group keys share one Uuid
/// namespace: a user's personal group is keyed by their user id, a
/// conversation group by the conversation id. Each connected socket is
/// identified by a connection id so join/leave are idempotent and
/// disconnect can sweep every group the connection belongs to.
#[derive(Default, Clone)]
pub struct ChatRegistry {
    inner: Arc<RwLock<HashMap<Uuid, HashMap<Uuid, UnboundedSender<Message>>>>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the connection to a group. Re-subscribing an already
    /// subscribed connection replaces the sender, so a repeated join
    /// never produces duplicate deliveries.
    pub async fn subscribe(&self, group: Uuid, connection: Uuid, tx: UnboundedSender<Message>) {
        let mut guard = self.inner.write().await;
        guard.entry(group).or_default().insert(connection, tx);
    }

    /// Removes the connection from a group. Leaving a group the
    /// connection never joined is a no-op.
    pub async fn unsubscribe(&self, group: Uuid, connection: Uuid) {
        let mut guard = self.inner.write().await;
        if let Some(members) = guard.get_mut(&group) {
            members.remove(&connection);
            if members.is_empty() {
                guard.remove(&group);
            }
        }
    }

    /// Removes the connection from every group it is a member of.
    /// Called on socket teardown.
    pub async fn drop_connection(&self, connection: Uuid) {
        let mut guard = self.inner.write().await;
        guard.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
    }

    /// Best-effort delivery to every current member of a group. Sends
    /// are non-blocking; members whose channel is gone are pruned.
    pub async fn broadcast(&self, group: Uuid, msg: Message) {
        let mut guard = self.inner.write().await;
        if let Some(members) = guard.get_mut(&group) {
            members.retain(|_, tx| tx.send(msg.clone()).is_ok());
            if members.is_empty() {
                guard.remove(&group);
            }
        }
    }

    pub async fn group_size(&self, group: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.get(&group).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn text(s: &str) -> Message {
        Message::Text(s.to_string())
    }

    #[tokio::test]
    async fn broadcast_reaches_every_group_member() {
        let registry = ChatRegistry::new();
        let group = Uuid::new_v4();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        registry.subscribe(group, Uuid::new_v4(), tx_a).await;
        registry.subscribe(group, Uuid::new_v4(), tx_b).await;

        registry.broadcast(group, text("hello")).await;

        assert_eq!(rx_a.recv().await, Some(text("hello")));
        assert_eq!(rx_b.recv().await, Some(text("hello")));
    }

    #[tokio::test]
    async fn repeated_join_delivers_once() {
        let registry = ChatRegistry::new();
        let group = Uuid::new_v4();
        let connection = Uuid::new_v4();
        let (tx, mut rx) = unbounded_channel();
        registry.subscribe(group, connection, tx.clone()).await;
        registry.subscribe(group, connection, tx).await;

        registry.broadcast(group, text("once")).await;

        assert_eq!(rx.recv().await, Some(text("once")));
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.group_size(group).await, 1);
    }

    #[tokio::test]
    async fn leaving_an_unjoined_group_is_a_noop() {
        let registry = ChatRegistry::new();
        let group = Uuid::new_v4();
        registry.unsubscribe(group, Uuid::new_v4()).await;
        assert_eq!(registry.group_size(group).await, 0);
    }

    #[tokio::test]
    async fn drop_connection_sweeps_all_groups() {
        let registry = ChatRegistry::new();
        let connection = Uuid::new_v4();
        let personal = Uuid::new_v4();
        let convo = Uuid::new_v4();
        let (tx, _rx) = unbounded_channel();
        registry.subscribe(personal, connection, tx.clone()).await;
        registry.subscribe(convo, connection, tx).await;

        registry.drop_connection(connection).await;

        assert_eq!(registry.group_size(personal).await, 0);
        assert_eq!(registry.group_size(convo).await, 0);
    }

    #[tokio::test]
    async fn closed_receivers_are_pruned_on_broadcast() {
        let registry = ChatRegistry::new();
        let group = Uuid::new_v4();
        let (tx_dead, rx_dead) = unbounded_channel();
        let (tx_live, mut rx_live) = unbounded_channel();
        registry.subscribe(group, Uuid::new_v4(), tx_dead).await;
        registry.subscribe(group, Uuid::new_v4(), tx_live).await;
        drop(rx_dead);

        registry.broadcast(group, text("still here")).await;

        assert_eq!(rx_live.recv().await, Some(text("still here")));
        assert_eq!(registry.group_size(group).await, 1);
    }
}
