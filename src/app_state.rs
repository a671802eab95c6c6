use std::sync::Arc;

use crate::{
    config::Config,
    infrastructure::{
        middleware::HasSessionKeys, ConnectionRegistry, EntityStore, NotificationDispatcher,
        NotificationSink, SessionKeys,
    },
    services::{
        AccountRemovalTransaction, AccountService, ContentService, MessagingService,
        ProtectedAccounts, SocialGraphService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: EntityStore,
    pub sessions: SessionKeys,
    pub dispatcher: NotificationDispatcher,
    pub accounts: AccountService,
    pub graph: SocialGraphService,
    pub content: ContentService,
    pub removal: AccountRemovalTransaction,
    pub messaging: MessagingService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = EntityStore::connect(
            &config.database.url,
            config.database.max_connections,
            config.server.node_id,
        )
        .await?;
        Ok(Self::with_store(config, store))
    }

    /// Wires every service over an existing store. Must run inside a tokio runtime.
    pub fn with_store(config: Config, store: EntityStore) -> Self {
        let dispatcher = NotificationDispatcher::start(ConnectionRegistry::new());
        let notifier: Arc<dyn NotificationSink> = Arc::new(dispatcher.clone());
        let protected = ProtectedAccounts::new(config.auth.owner_id);
        let sessions = SessionKeys::new(&config.auth.secret_key, config.auth.session_ttl_hours);

        Self {
            accounts: AccountService::new(
                store.clone(),
                sessions.clone(),
                protected,
                config.moderation.reserved_terms.clone(),
            ),
            graph: SocialGraphService::new(store.clone(), notifier.clone(), protected),
            content: ContentService::new(
                store.clone(),
                notifier.clone(),
                protected,
                config.moderation.blocked_terms.clone(),
            ),
            removal: AccountRemovalTransaction::new(store.clone(), protected),
            messaging: MessagingService::new(store.clone(), notifier),
            config,
            store,
            sessions,
            dispatcher,
        }
    }
}

impl HasSessionKeys for AppState {
    fn session_keys(&self) -> &SessionKeys {
        &self.sessions
    }
}
