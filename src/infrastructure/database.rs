// Entity store - SQLite persistence for the document collections
// Object tables hold scalar fields, the associations table holds every id list

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::infrastructure::id_generator::IdGenerator;
use crate::models::ObjectId;

/// Transaction wrapper for every write.
/// Dropping it without `commit` rolls everything back.
pub struct StoreTransaction {
    tx: Transaction<'static, Sqlite>,
    // Released after `tx` is dropped.
    _writer: OwnedMutexGuard<()>,
}

impl StoreTransaction {
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> AppResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit transaction: {}", e)))
    }

    pub async fn rollback(self) -> AppResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to rollback transaction: {}", e)))
    }
}

#[derive(Clone)]
pub struct EntityStore {
    pool: SqlitePool,
    ids: Arc<IdGenerator>,
    writer: Arc<Mutex<()>>,
}

impl EntityStore {
    pub async fn connect(database_url: &str, max_connections: u32, node_id: u16) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::DatabaseError(format!("Invalid database url: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to {}: {}", database_url, e)))?;

        info!("Connected to entity store at {}", database_url);
        let store = Self {
            pool,
            ids: Arc::new(IdGenerator::new(node_id)),
            writer: Arc::new(Mutex::new(())),
        };
        store.initialize().await?;
        Ok(store)
    }

    /// Private in-memory database. A single pinned connection keeps the data alive.
    pub async fn new_in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::DatabaseError(format!("Invalid database url: {}", e)))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to in-memory SQLite: {}", e)))?;

        let store = Self {
            pool,
            ids: Arc::new(IdGenerator::new(0)),
            writer: Arc::new(Mutex::new(())),
        };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                bio TEXT NOT NULL DEFAULT '',
                profile_picture TEXT NOT NULL DEFAULT '',
                gender TEXT,
                is_private INTEGER NOT NULL DEFAULT 0,
                time_created INTEGER NOT NULL,
                time_updated INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                author_id INTEGER NOT NULL,
                image TEXT NOT NULL,
                caption TEXT NOT NULL DEFAULT '',
                time_created INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY,
                text TEXT NOT NULL,
                author_id INTEGER NOT NULL,
                post_id INTEGER NOT NULL,
                time_created INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY,
                time_created INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY,
                sender_id INTEGER NOT NULL,
                receiver_id INTEGER NOT NULL,
                message TEXT NOT NULL,
                time_created INTEGER NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS associations (
                position INTEGER PRIMARY KEY AUTOINCREMENT,
                id1 INTEGER NOT NULL,
                atype TEXT NOT NULL,
                id2 INTEGER NOT NULL,
                time_created INTEGER NOT NULL,
                UNIQUE (id1, atype, id2)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id, time_created DESC)",
            "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id)",
            "CREATE INDEX IF NOT EXISTS idx_comments_author ON comments(author_id)",
            "CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id)",
            "CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id)",
            "CREATE INDEX IF NOT EXISTS idx_assoc_target ON associations(atype, id2)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn next_id(&self) -> ObjectId {
        self.ids.next_id()
    }

    /// Opens a write transaction. Write transactions on one store run one at a
    /// time, so a check made inside the transaction still holds at commit.
    /// Never call this while holding a connection from `acquire`.
    pub async fn begin(&self) -> AppResult<StoreTransaction> {
        let writer = self.writer.clone().lock_owned().await;
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;
        Ok(StoreTransaction { tx, _writer: writer })
    }

    /// Connection for reads.
    pub async fn acquire(&self) -> AppResult<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to acquire connection: {}", e)))
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}
