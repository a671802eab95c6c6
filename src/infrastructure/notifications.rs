// Real-time notification push
// Services enqueue after their writes commit; a background task delivers to connected sockets

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

use crate::models::{ConversationId, PostId, UserId, UserSummary};

/// Outbound event names understood by the client.
pub const NOTIFICATION_EVENT: &str = "notification";
pub const NEW_MESSAGE_EVENT: &str = "newMessage";
pub const MESSAGE_NOTIFICATION_EVENT: &str = "messageNotification";

/// Delivery seam between services and the transport.
/// `push` never fails and never waits; there is no retry and no ordering across events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn is_reachable(&self, user_id: UserId) -> bool;
    fn push(&self, user_id: UserId, event: &str, payload: Value);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Message,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub user_id: UserId,
    pub user_details: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<PostId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Notification {
    pub fn followed(actor: UserSummary) -> Self {
        let message = format!("{} started following you.", actor.username);
        Self::new(NotificationKind::Follow, actor, None, Some(message))
    }

    pub fn liked(actor: UserSummary, post_id: PostId) -> Self {
        let message = format!("{} liked your post.", actor.username);
        Self::new(NotificationKind::Like, actor, Some(post_id), Some(message))
    }

    pub fn commented(actor: UserSummary, post_id: PostId) -> Self {
        let message = format!("{} commented on your post.", actor.username);
        Self::new(NotificationKind::Comment, actor, Some(post_id), Some(message))
    }

    pub fn messaged(actor: UserSummary, conversation_id: ConversationId, text: &str) -> Self {
        let mut notification = Self::new(NotificationKind::Message, actor, None, None);
        notification.conversation_id = Some(conversation_id);
        notification.text = Some(text.to_string());
        notification
    }

    fn new(
        kind: NotificationKind,
        actor: UserSummary,
        post_id: Option<PostId>,
        message: Option<String>,
    ) -> Self {
        Self {
            kind,
            user_id: actor.id,
            user_details: actor,
            post_id,
            conversation_id: None,
            text: None,
            message,
        }
    }

    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Unique identifier for one socket of a user; a user may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Connected sockets by user.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<UserId, Vec<Subscriber>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_subscriber(&self, user_id: UserId) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard.entry(user_id).or_default().push(Subscriber { id, sender: tx });
        tracing::debug!(
            "Added subscriber {:?} for user {}, total sockets: {}",
            id,
            user_id,
            guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
        );

        (id, rx)
    }

    /// Must be called when a socket closes.
    pub async fn remove_subscriber(&self, user_id: UserId, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&user_id) {
            subscribers.retain(|s| s.id != subscriber_id);
            if subscribers.is_empty() {
                guard.remove(&user_id);
                tracing::debug!("User {} has no open sockets", user_id);
            }
        }
    }

    pub async fn is_connected(&self, user_id: UserId) -> bool {
        let guard = self.inner.read().await;
        guard.get(&user_id).map(|v| !v.is_empty()).unwrap_or(false)
    }

    /// Sends to every socket of the user, dropping dead ones.
    pub async fn deliver(&self, user_id: UserId, frame: String) -> usize {
        let mut guard = self.inner.write().await;
        let Some(subscribers) = guard.get_mut(&user_id) else {
            return 0;
        };
        subscribers.retain(|s| s.sender.send(frame.clone()).is_ok());
        let delivered = subscribers.len();
        if delivered == 0 {
            guard.remove(&user_id);
        }
        delivered
    }
}

struct OutboundEvent {
    user_id: UserId,
    frame: String,
}

/// Queue in front of the connection registry.
#[derive(Clone)]
pub struct NotificationDispatcher {
    queue: UnboundedSender<OutboundEvent>,
    registry: ConnectionRegistry,
}

impl NotificationDispatcher {
    /// Spawns the delivery task; must be called inside a tokio runtime.
    pub fn start(registry: ConnectionRegistry) -> Self {
        let (queue, mut rx) = unbounded_channel::<OutboundEvent>();
        let delivery = registry.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let delivered = delivery.deliver(event.user_id, event.frame).await;
                if delivered == 0 {
                    tracing::trace!("User {} not connected, event dropped", event.user_id);
                }
            }
            tracing::debug!("Notification queue closed");
        });
        Self { queue, registry }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

pub fn frame(event: &str, payload: Value) -> String {
    json!({ "event": event, "payload": payload }).to_string()
}

#[async_trait]
impl NotificationSink for NotificationDispatcher {
    async fn is_reachable(&self, user_id: UserId) -> bool {
        self.registry.is_connected(user_id).await
    }

    fn push(&self, user_id: UserId, event: &str, payload: Value) {
        let outbound = OutboundEvent {
            user_id,
            frame: frame(event, payload),
        };
        if self.queue.send(outbound).is_err() {
            tracing::warn!("Notification queue closed, dropping {} for user {}", event, user_id);
        }
    }
}
