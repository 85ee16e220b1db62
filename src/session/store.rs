//! Session records kept in the configured database, next to the visitor tables.

use async_trait::async_trait;
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions};
use tower_sessions::{
    ExpiredDeletion, SessionStore,
    session::{Id, Record},
    session_store,
};
use tower_sessions_sqlx_store::{MySqlStore, PostgresStore, SqliteStore};
use tracing::info;

use crate::{
    config::{Backend, DatabaseConfig},
    db::{self, StoreError, StoreResult},
};

const MAX_CONNECTIONS: u32 = 4;
pub const SESSION_TABLE: &str = "sessions";

/// The sqlx-backed session store matching the configured backend.
#[derive(Debug, Clone)]
pub enum SessionBackend {
    Sqlite(SqliteStore),
    Postgres(PostgresStore),
    MySql(MySqlStore),
}

impl SessionBackend {
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<SessionBackend> {
        info!(backend = %config.backend, "opening session store");
        let backend = match config.backend {
            Backend::Sqlite => {
                let options = db::SqliteStore::new(config)?.options().clone();
                let pool = SqlitePoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options)
                    .await
                    .map_err(StoreError::Connect)?;
                SessionBackend::Sqlite(
                    SqliteStore::new(pool)
                        .with_table_name(SESSION_TABLE)
                        .map_err(StoreError::Config)?,
                )
            }
            Backend::Postgres => {
                let options = db::PgStore::new(config)?.options().clone();
                let pool = PgPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options)
                    .await
                    .map_err(StoreError::Connect)?;
                SessionBackend::Postgres(
                    PostgresStore::new(pool)
                        .with_table_name(SESSION_TABLE)
                        .map_err(StoreError::Config)?,
                )
            }
            Backend::MySql => {
                let options = db::MySqlStore::new(config)?.options().clone();
                let pool = MySqlPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options)
                    .await
                    .map_err(StoreError::Connect)?;
                SessionBackend::MySql(
                    MySqlStore::new(pool)
                        .with_table_name(SESSION_TABLE)
                        .map_err(StoreError::Config)?,
                )
            }
        };
        Ok(backend)
    }

    /// Creates the session table if it is missing.
    pub async fn migrate(&self) -> StoreResult<()> {
        match self {
            SessionBackend::Sqlite(store) => store.migrate().await?,
            SessionBackend::Postgres(store) => store.migrate().await?,
            SessionBackend::MySql(store) => store.migrate().await?,
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SessionBackend {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            SessionBackend::Sqlite(store) => store.create(record).await,
            SessionBackend::Postgres(store) => store.create(record).await,
            SessionBackend::MySql(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            SessionBackend::Sqlite(store) => store.save(record).await,
            SessionBackend::Postgres(store) => store.save(record).await,
            SessionBackend::MySql(store) => store.save(record).await,
        }
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            SessionBackend::Sqlite(store) => store.load(session_id).await,
            SessionBackend::Postgres(store) => store.load(session_id).await,
            SessionBackend::MySql(store) => store.load(session_id).await,
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        match self {
            SessionBackend::Sqlite(store) => store.delete(session_id).await,
            SessionBackend::Postgres(store) => store.delete(session_id).await,
            SessionBackend::MySql(store) => store.delete(session_id).await,
        }
    }
}

#[async_trait]
impl ExpiredDeletion for SessionBackend {
    async fn delete_expired(&self) -> session_store::Result<()> {
        match self {
            SessionBackend::Sqlite(store) => store.delete_expired().await,
            SessionBackend::Postgres(store) => store.delete_expired().await,
            SessionBackend::MySql(store) => store.delete_expired().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use sqlx::{ConnectOptions, SqliteConnection};
    use time::{Duration, OffsetDateTime};

    use super::*;

    struct Scratch {
        config: DatabaseConfig,
        path: PathBuf,
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn scratch() -> Scratch {
        let path = std::env::temp_dir().join(format!("valentine-{}.db", uuid::Uuid::new_v4()));
        Scratch {
            config: DatabaseConfig::sqlite(path.to_string_lossy()),
            path,
        }
    }

    async fn raw(config: &DatabaseConfig) -> SqliteConnection {
        db::SqliteStore::new(config)
            .unwrap()
            .options()
            .connect()
            .await
            .unwrap()
    }

    fn record(expiry_date: OffsetDateTime) -> Record {
        Record {
            id: Id::default(),
            data: Default::default(),
            expiry_date,
        }
    }

    #[tokio::test]
    async fn sessions_live_in_the_database() {
        let scratch = scratch();
        let sessions = SessionBackend::connect(&scratch.config).await.unwrap();
        sessions.migrate().await.unwrap();
        sessions.migrate().await.unwrap();

        let live = record(OffsetDateTime::now_utc() + Duration::hours(1));
        sessions.save(&live).await.unwrap();

        let loaded = sessions.load(&live.id).await.unwrap();
        assert_eq!(loaded.map(|r| r.id), Some(live.id));
    }

    #[tokio::test]
    async fn expired_records_are_purged() {
        let scratch = scratch();
        let sessions = SessionBackend::connect(&scratch.config).await.unwrap();
        sessions.migrate().await.unwrap();

        let live = record(OffsetDateTime::now_utc() + Duration::hours(1));
        let stale = record(OffsetDateTime::now_utc() - Duration::hours(1));
        sessions.save(&live).await.unwrap();
        sessions.save(&stale).await.unwrap();

        sessions.delete_expired().await.unwrap();

        let mut conn = raw(&scratch.config).await;
        let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM sessions")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(sessions.load(&stale.id).await.unwrap().is_none());
        assert!(sessions.load(&live.id).await.unwrap().is_some());
    }
}
