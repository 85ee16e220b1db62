//! Storage for visitors and their messages.
//!
//! Every call opens its own connection, runs inside a transaction when it
//! writes, and closes the connection before returning. There is no pool.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::FromRow;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Backend, DatabaseConfig};

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlStore;
pub use postgres::PgStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("database configuration error: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub timestamp: String,
}

/// A message joined with the name of the visitor who left it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub message: String,
    pub timestamp: String,
}

#[async_trait]
pub trait Storage: Send + Sync {
    fn backend(&self) -> Backend;

    /// Creates `users` and `messages` if they are missing. Safe to call repeatedly.
    async fn provision(&self) -> StoreResult<()>;

    async fn ping(&self) -> StoreResult<()>;

    async fn create_user(&self, name: &str) -> StoreResult<i64>;

    async fn create_message(&self, user_id: i64, message: &str) -> StoreResult<i64>;

    /// Newest first.
    async fn list_users(&self) -> StoreResult<Vec<UserRow>>;

    /// Newest first.
    async fn list_messages(&self) -> StoreResult<Vec<MessageRow>>;
}

pub type DynStorage = Arc<dyn Storage>;

pub fn open(config: &DatabaseConfig) -> StoreResult<DynStorage> {
    info!(backend = %config.backend, "using {} store", config.backend);
    Ok(match config.backend {
        Backend::Sqlite => Arc::new(SqliteStore::new(config)?),
        Backend::Postgres => Arc::new(PgStore::new(config)?),
        Backend::MySql => Arc::new(MySqlStore::new(config)?),
    })
}

/// Closes a connection, logging instead of failing: the caller's result is already decided.
pub(crate) async fn close<C: sqlx::Connection>(conn: C) {
    if let Err(e) = conn.close().await {
        warn!("closing database connection failed: {e}");
    }
}
