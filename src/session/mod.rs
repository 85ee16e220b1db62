mod store;

use tower_sessions::Session;

pub use store::{SESSION_TABLE, SessionBackend};

pub const USER_ID: &str = "user_id";
pub const NAME: &str = "name";

/// What the session knows about the visitor's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visit {
    pub user_id: Option<i64>,
    pub name: Option<String>,
}

impl Visit {
    pub fn started(user_id: i64, name: impl Into<String>) -> Visit {
        Visit {
            user_id: Some(user_id),
            name: Some(name.into()),
        }
    }

    pub async fn load(session: &Session) -> Result<Visit, tower_sessions::session::Error> {
        Ok(Visit {
            user_id: session.get(USER_ID).await?,
            name: session.get(NAME).await?,
        })
    }

    pub async fn store(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        if let Some(user_id) = self.user_id {
            session.insert(USER_ID, user_id).await?;
        }
        if let Some(name) = &self.name {
            session.insert(NAME, name).await?;
        }
        Ok(())
    }
}
