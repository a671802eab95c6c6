// Infrastructure: storage, ids, sessions, request identity and push delivery
pub mod collections;           // Typed queries per collection
pub mod database;              // SQLite entity store and transactions
pub mod id_generator;          // Snowflake ids
pub mod middleware;            // Session -> ViewerContext
pub mod notifications;         // Outbound push queue and socket registry
pub mod security;              // Password hashing and session tokens
pub mod viewer;                // Viewer context

pub use database::{EntityStore, StoreTransaction};
pub use id_generator::IdGenerator;
pub use notifications::{ConnectionRegistry, NotificationDispatcher, NotificationSink};
pub use security::SessionKeys;
pub use viewer::ViewerContext;
