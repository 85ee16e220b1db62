use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    ConnectOptions, Connection, SqliteConnection,
    sqlite::SqliteConnectOptions,
};

use crate::config::{Backend, DatabaseConfig};

use super::{MessageRow, Storage, StoreError, StoreResult, UserRow, close};

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL,
  message TEXT NOT NULL,
  timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
  FOREIGN KEY (user_id) REFERENCES users (id)
)"#;

#[derive(Debug, Clone)]
pub struct SqliteStore {
    options: SqliteConnectOptions,
}

impl SqliteStore {
    pub fn new(config: &DatabaseConfig) -> StoreResult<SqliteStore> {
        let options = match &config.url {
            Some(url) => SqliteConnectOptions::from_str(url)
                .map_err(|e| StoreError::Config(format!("invalid sqlite url: {e}")))?,
            None => SqliteConnectOptions::new().filename(&config.name),
        };

        Ok(SqliteStore {
            options: options.create_if_missing(true).foreign_keys(true),
        })
    }

    pub(crate) fn options(&self) -> &SqliteConnectOptions {
        &self.options
    }

    async fn connect(&self) -> StoreResult<SqliteConnection> {
        self.options.connect().await.map_err(StoreError::Connect)
    }
}

#[async_trait]
impl Storage for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn provision(&self) -> StoreResult<()> {
        let mut conn = self.connect().await?;
        let result = async {
            let mut tx = conn.begin().await?;
            sqlx::query(CREATE_USERS).execute(&mut *tx).await?;
            sqlx::query(CREATE_MESSAGES).execute(&mut *tx).await?;
            tx.commit().await
        }
        .await;
        close(conn).await;
        Ok(result?)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connect().await?;
        let result = sqlx::query("SELECT 1").execute(&mut conn).await;
        close(conn).await;
        result?;
        Ok(())
    }

    async fn create_user(&self, name: &str) -> StoreResult<i64> {
        let mut conn = self.connect().await?;
        let result = async {
            let mut tx = conn.begin().await?;
            let id = sqlx::query("INSERT INTO users (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        close(conn).await;
        Ok(result?)
    }

    async fn create_message(&self, user_id: i64, message: &str) -> StoreResult<i64> {
        let mut conn = self.connect().await?;
        let result = async {
            let mut tx = conn.begin().await?;
            let id = sqlx::query("INSERT INTO messages (user_id, message) VALUES (?, ?)")
                .bind(user_id)
                .bind(message)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id)
        }
        .await;
        close(conn).await;
        Ok(result?)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, CAST(timestamp AS TEXT) AS timestamp
            FROM users
            ORDER BY users.timestamp DESC, id DESC
            "#,
        )
        .fetch_all(&mut conn)
        .await;
        close(conn).await;
        Ok(result?)
    }

    async fn list_messages(&self) -> StoreResult<Vec<MessageRow>> {
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, m.user_id, u.name, m.message, CAST(m.timestamp AS TEXT) AS timestamp
            FROM messages m
            JOIN users u ON m.user_id = u.id
            ORDER BY m.timestamp DESC, m.id DESC
            "#,
        )
        .fetch_all(&mut conn)
        .await;
        close(conn).await;
        Ok(result?)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    struct Scratch {
        store: SqliteStore,
        path: PathBuf,
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn scratch() -> Scratch {
        let path = std::env::temp_dir().join(format!("valentine-{}.db", uuid::Uuid::new_v4()));
        let config = DatabaseConfig::sqlite(path.to_string_lossy());
        Scratch {
            store: SqliteStore::new(&config).unwrap(),
            path,
        }
    }

    async fn table_count(store: &SqliteStore) -> i64 {
        let mut conn = store.connect().await.unwrap();
        let (count,): (i64,) = sqlx::query_as(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'messages')",
        )
        .fetch_one(&mut conn)
        .await
        .unwrap();
        count
    }

    #[tokio::test]
    async fn provision_is_idempotent() {
        let scratch = scratch();
        let store = &scratch.store;

        store.provision().await.unwrap();
        store.create_user("Ava").await.unwrap();
        store.provision().await.unwrap();

        assert_eq!(table_count(store).await, 2);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ids_increase_and_names_repeat() {
        let scratch = scratch();
        let store = &scratch.store;
        store.provision().await.unwrap();

        let first = store.create_user("Ava").await.unwrap();
        let second = store.create_user("Ava").await.unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, second);
        assert_eq!(users[1].id, first);
        assert_eq!(users[0].timestamp.len(), "2026-02-14 12:00:00".len());
    }

    #[tokio::test]
    async fn messages_carry_the_visitor_name() {
        let scratch = scratch();
        let store = &scratch.store;
        store.provision().await.unwrap();

        let ava = store.create_user("Ava").await.unwrap();
        let ben = store.create_user("Ben").await.unwrap();
        store.create_message(ava, "Yes!").await.unwrap();
        store.create_message(ben, "Of course").await.unwrap();

        let messages = store.list_messages().await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].name, "Ben");
        assert_eq!(messages[0].message, "Of course");
        assert_eq!(messages[1].user_id, ava);
        assert_eq!(messages[1].name, "Ava");
    }

    #[tokio::test]
    async fn message_for_unknown_visitor_is_rejected() {
        let scratch = scratch();
        let store = &scratch.store;
        store.provision().await.unwrap();

        let err = store.create_message(999, "hello?").await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert!(store.list_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_file_is_a_connect_error() {
        let config = DatabaseConfig::sqlite("/nonexistent-dir/valentine.db");
        let store = SqliteStore::new(&config).unwrap();
        assert!(matches!(store.ping().await, Err(StoreError::Connect(_))));
    }
}
