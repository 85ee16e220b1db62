use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{ConnectOptions, Connection, MySqlConnection, mysql::MySqlConnectOptions};

use crate::config::{Backend, DatabaseConfig};

use super::{MessageRow, Storage, StoreError, StoreResult, UserRow, close};

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
  id BIGINT AUTO_INCREMENT PRIMARY KEY,
  name VARCHAR(255) NOT NULL,
  `timestamp` TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"#;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
  id BIGINT AUTO_INCREMENT PRIMARY KEY,
  user_id BIGINT NOT NULL,
  message TEXT NOT NULL,
  `timestamp` TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
  FOREIGN KEY (user_id) REFERENCES users (id)
)"#;

#[derive(Debug, Clone)]
pub struct MySqlStore {
    options: MySqlConnectOptions,
}

impl MySqlStore {
    pub fn new(config: &DatabaseConfig) -> StoreResult<MySqlStore> {
        let options = match &config.url {
            Some(url) => MySqlConnectOptions::from_str(url)
                .map_err(|e| StoreError::Config(format!("invalid mysql url: {e}")))?,
            None => MySqlConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .password(&config.password)
                .database(&config.name),
        };

        Ok(MySqlStore { options })
    }

    pub(crate) fn options(&self) -> &MySqlConnectOptions {
        &self.options
    }

    async fn connect(&self) -> StoreResult<MySqlConnection> {
        self.options.connect().await.map_err(StoreError::Connect)
    }
}

#[async_trait]
impl Storage for MySqlStore {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    // DDL commits implicitly in MySQL, so no transaction here.
    async fn provision(&self) -> StoreResult<()> {
        let mut conn = self.connect().await?;
        let result = async {
            sqlx::query(CREATE_USERS).execute(&mut conn).await?;
            sqlx::query(CREATE_MESSAGES).execute(&mut conn).await
        }
        .await;
        close(conn).await;
        result?;
        Ok(())
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
                .last_insert_id();
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id as i64)
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
                .last_insert_id();
            tx.commit().await?;
            Ok::<_, sqlx::Error>(id as i64)
        }
        .await;
        close(conn).await;
        Ok(result?)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, DATE_FORMAT(`timestamp`, '%Y-%m-%d %H:%i:%s') AS `timestamp`
            FROM users
            ORDER BY users.`timestamp` DESC, id DESC
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
                   DATE_FORMAT(m.`timestamp`, '%Y-%m-%d %H:%i:%s') AS `timestamp`
            FROM messages m
            JOIN users u ON m.user_id = u.id
            ORDER BY m.`timestamp` DESC, m.id DESC
            "#,
        )
        .fetch_all(&mut conn)
        .await;
        close(conn).await;
        Ok(result?)
    }
}
