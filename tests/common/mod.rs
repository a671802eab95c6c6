#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use social_graph::infrastructure::collections::{associations, users};
use social_graph::infrastructure::collections::users::NewUser;
use social_graph::infrastructure::{EntityStore, NotificationSink, SessionKeys};
use social_graph::models::{AssocType, ObjectId, UserId};
use social_graph::services::{
    AccountRemovalTransaction, AccountService, ContentService, MessagingService,
    ProtectedAccounts, SocialGraphService,
};

#[derive(Debug, Clone)]
pub struct PushedEvent {
    pub user_id: UserId,
    pub event: String,
    pub payload: Value,
}

/// Sink that keeps every push for later inspection.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PushedEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PushedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, user_id: UserId) -> Vec<PushedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn is_reachable(&self, _user_id: UserId) -> bool {
        true
    }

    fn push(&self, user_id: UserId, event: &str, payload: Value) {
        self.events.lock().unwrap().push(PushedEvent {
            user_id,
            event: event.to_string(),
            payload,
        });
    }
}

pub struct Harness {
    pub store: EntityStore,
    pub sink: Arc<RecordingSink>,
    pub owner: UserId,
    pub accounts: AccountService,
    pub graph: SocialGraphService,
    pub content: ContentService,
    pub removal: AccountRemovalTransaction,
    pub messaging: MessagingService,
}

pub const BLOCKED: &[&str] = &["porn", "nude", "badword"];

/// In-memory store with an existing owner account.
pub async fn harness() -> Harness {
    harness_on(EntityStore::new_in_memory().await.unwrap()).await
}

/// On-disk store with a real connection pool, for tests that race operations.
/// Keep the returned directory alive for the duration of the test.
pub async fn file_harness() -> (tempfile::TempDir, Harness) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("social.db").display());
    let store = EntityStore::connect(&url, 4, 0).await.unwrap();
    (dir, harness_on(store).await)
}

pub async fn harness_on(store: EntityStore) -> Harness {
    let owner = seed_user(&store, "owner").await;
    let protected = ProtectedAccounts::new(Some(owner));
    let sink = Arc::new(RecordingSink::default());
    let notifier: Arc<dyn NotificationSink> = sink.clone();

    Harness {
        accounts: AccountService::new(
            store.clone(),
            SessionKeys::new("test-secret", 24),
            protected,
            vec!["admin".to_string()],
        ),
        graph: SocialGraphService::new(store.clone(), notifier.clone(), protected),
        content: ContentService::new(
            store.clone(),
            notifier.clone(),
            protected,
            BLOCKED.iter().map(|t| t.to_string()).collect(),
        ),
        removal: AccountRemovalTransaction::new(store.clone(), protected),
        messaging: MessagingService::new(store.clone(), notifier),
        store,
        sink,
        owner,
    }
}

/// Inserts a user directly, skipping password hashing.
pub async fn seed_user(store: &EntityStore, username: &str) -> UserId {
    let id = store.next_id();
    let mut conn = store.acquire().await.unwrap();
    users::insert(
        &mut conn,
        NewUser {
            id,
            username,
            email: &format!("{}@example.com", username),
            password_hash: "not-a-real-hash",
        },
    )
    .await
    .unwrap();
    id
}

pub async fn list(store: &EntityStore, id1: ObjectId, atype: AssocType) -> Vec<ObjectId> {
    let mut conn = store.acquire().await.unwrap();
    associations::list(&mut conn, id1, atype).await.unwrap()
}

pub async fn count(store: &EntityStore, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(store.pool()).await.unwrap()
}

pub async fn user_exists(store: &EntityStore, id: UserId) -> bool {
    let mut conn = store.acquire().await.unwrap();
    users::exists(&mut conn, id).await.unwrap()
}

/// Every row of every table, rendered to text in a stable order.
pub async fn snapshot(store: &EntityStore) -> Vec<String> {
    let queries = [
        "SELECT 'users|' || quote(id) || '|' || quote(username) || '|' || quote(email) || '|' || quote(password_hash) || '|' || quote(bio) || '|' || quote(profile_picture) || '|' || quote(gender) || '|' || quote(is_private) || '|' || quote(time_created) || '|' || quote(time_updated) FROM users ORDER BY id",
        "SELECT 'posts|' || quote(id) || '|' || quote(author_id) || '|' || quote(image) || '|' || quote(caption) || '|' || quote(time_created) FROM posts ORDER BY id",
        "SELECT 'comments|' || quote(id) || '|' || quote(text) || '|' || quote(author_id) || '|' || quote(post_id) || '|' || quote(time_created) FROM comments ORDER BY id",
        "SELECT 'conversations|' || quote(id) || '|' || quote(time_created) FROM conversations ORDER BY id",
        "SELECT 'messages|' || quote(id) || '|' || quote(sender_id) || '|' || quote(receiver_id) || '|' || quote(message) || '|' || quote(time_created) FROM messages ORDER BY id",
        "SELECT 'associations|' || quote(position) || '|' || quote(id1) || '|' || quote(atype) || '|' || quote(id2) || '|' || quote(time_created) FROM associations ORDER BY position",
    ];

    let mut rows = Vec::new();
    for query in queries {
        let found: Vec<String> = sqlx::query_scalar(query)
            .fetch_all(store.pool())
            .await
            .unwrap();
        rows.extend(found);
    }
    rows
}
