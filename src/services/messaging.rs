// MessagingService - direct messages between two users
// A pair shares one conversation, created on the first message

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::collections::{associations, conversations, messages, users};
use crate::infrastructure::database::EntityStore;
use crate::infrastructure::notifications::{
    Notification, NotificationSink, MESSAGE_NOTIFICATION_EVENT, NEW_MESSAGE_EVENT,
};
use crate::models::{AssocType, Message, UserId};

#[derive(Clone)]
pub struct MessagingService {
    store: EntityStore,
    notifier: Arc<dyn NotificationSink>,
}

impl MessagingService {
    pub fn new(store: EntityStore, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { store, notifier }
    }

    pub async fn send_message(&self, sender: UserId, receiver: UserId, text: &str) -> AppResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message is required".to_string()));
        }
        if sender == receiver {
            return Err(AppError::Validation("You can't message yourself".to_string()));
        }

        let message_id = self.store.next_id();
        let mut tx = self.store.begin().await?;
        if !users::exists(tx.conn(), receiver).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        let actor = users::summary(tx.conn(), sender)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let conversation_id = match conversations::find_between(tx.conn(), sender, receiver).await? {
            Some(id) => id,
            None => {
                let id = self.store.next_id();
                conversations::insert(tx.conn(), id, [sender, receiver]).await?;
                debug!("Started conversation {} between {} and {}", id, sender, receiver);
                id
            }
        };

        let message = messages::insert(tx.conn(), message_id, sender, receiver, text).await?;
        associations::add(tx.conn(), conversation_id, AssocType::Messages, message_id).await?;
        tx.commit().await?;
        info!("User {} sent message {} to {}", sender, message_id, receiver);

        self.notifier.push(
            receiver,
            NEW_MESSAGE_EVENT,
            serde_json::to_value(&message).unwrap_or_default(),
        );
        self.notifier.push(
            receiver,
            MESSAGE_NOTIFICATION_EVENT,
            Notification::messaged(actor, conversation_id, text).to_payload(),
        );
        Ok(message)
    }

    /// The pair's messages in send order; empty when they never talked.
    pub async fn get_messages(&self, a: UserId, b: UserId) -> AppResult<Vec<Message>> {
        let mut conn = self.store.acquire().await?;
        let Some(conversation_id) = conversations::find_between(&mut conn, a, b).await? else {
            return Ok(Vec::new());
        };
        messages::in_conversation(&mut conn, conversation_id).await
    }
}
