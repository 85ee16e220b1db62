use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{ConnectOptions, Connection, PgConnection, postgres::PgConnectOptions};

use crate::config::{Backend, DatabaseConfig};

use super::{MessageRow, Storage, StoreError, StoreResult, UserRow, close};

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id BIGSERIAL PRIMARY KEY,
  name VARCHAR(255) NOT NULL,
  "timestamp" TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
  id BIGSERIAL PRIMARY KEY,
  user_id BIGINT NOT NULL REFERENCES users (id),
  message TEXT NOT NULL,
  "timestamp" TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#;

#[derive(Debug, Clone)]
pub struct PgStore {
    options: PgConnectOptions,
}

impl PgStore {
    pub fn new(config: &DatabaseConfig) -> StoreResult<PgStore> {
        let options = match &config.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| StoreError::Config(format!("invalid postgres url: {e}")))?,
            None => PgConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .password(&config.password)
                .database(&config.name),
        };

        Ok(PgStore { options })
    }

    pub(crate) fn options(&self) -> &PgConnectOptions {
        &self.options
    }

    async fn connect(&self) -> StoreResult<PgConnection> {
        self.options.connect().await.map_err(StoreError::Connect)
    }
}

#[async_trait]
impl Storage for PgStore {
    fn backend(&self) -> Backend {
        Backend::Postgres
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
            let (id,): (i64,) = sqlx::query_as("INSERT INTO users (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
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
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO messages (user_id, message) VALUES ($1, $2) RETURNING id",
            )
            .bind(user_id)
            .bind(message)
            .fetch_one(&mut *tx)
            .await?;
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
            SELECT id, name, to_char("timestamp", 'YYYY-MM-DD HH24:MI:SS') AS "timestamp"
            FROM users
            ORDER BY users."timestamp" DESC, id DESC
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
            SELECT m.id, m.user_id, u.name, m.message,
                   to_char(m."timestamp", 'YYYY-MM-DD HH24:MI:SS') AS "timestamp"
            FROM messages m
            JOIN users u ON m.user_id = u.id
            ORDER BY m."timestamp" DESC, m.id DESC
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
    use super::*;

    #[test]
    fn builds_options_from_components() {
        let config = DatabaseConfig {
            backend: Backend::Postgres,
            url: None,
            host: "db.internal".to_owned(),
            port: 6543,
            user: "ava".to_owned(),
            password: "secret".to_owned(),
            name: "hearts".to_owned(),
        };
        let store = PgStore::new(&config).unwrap();
        assert_eq!(store.options.get_host(), "db.internal");
        assert_eq!(store.options.get_port(), 6543);
        assert_eq!(store.options.get_username(), "ava");
        assert_eq!(store.options.get_database(), Some("hearts"));
    }

    #[test]
    fn rejects_garbage_url() {
        let mut config = DatabaseConfig::sqlite("unused");
        config.backend = Backend::Postgres;
        config.url = Some("postgres://[::1".to_owned());
        assert!(matches!(PgStore::new(&config), Err(StoreError::Config(_))));
    }

    #[test]
    fn messages_reference_users() {
        assert!(CREATE_USERS.contains("IF NOT EXISTS users"));
        assert!(CREATE_MESSAGES.contains("REFERENCES users (id)"));
    }
}
