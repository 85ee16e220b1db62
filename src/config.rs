//! Process configuration, read once at startup.

use std::{fmt, net::SocketAddr, str::FromStr};

use thiserror::Error;
use tower_sessions::cookie::{Key, SameSite};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("SECRET_KEY must be at least 64 bytes, got {0}")]
    ShortSecret(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
    MySql,
}

impl Backend {
    fn default_port(self) -> u16 {
        use Backend::*;
        match self {
            Sqlite => 0,
            Postgres => 5432,
            MySql => 3306,
        }
    }

    fn from_url(url: &str) -> Option<Backend> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Backend::Postgres)
        } else if url.starts_with("mysql://") {
            Some(Backend::MySql)
        } else if url.starts_with("sqlite:") {
            Some(Backend::Sqlite)
        } else {
            None
        }
    }
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "mysql" => Ok(Backend::MySql),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// Full connection string; when set the component fields are ignored.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database name, or the file path for SQLite.
    pub name: String,
}

// Keeps the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &self.url.as_ref().map(|_| "<set>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("name", &self.name)
            .finish()
    }
}

impl DatabaseConfig {
    /// Throwaway SQLite file, used by tests and local runs.
    pub fn sqlite(path: impl Into<String>) -> Self {
        DatabaseConfig {
            backend: Backend::Sqlite,
            url: None,
            host: String::new(),
            port: 0,
            user: String::new(),
            password: String::new(),
            name: path.into(),
        }
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    /// Signing key for the session cookie. `None` means one is generated per process.
    pub secret: Option<Key>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub lifetime: time::Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<set>"))
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .field("same_site", &self.same_site)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            secret: None,
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            lifetime: time::Duration::seconds(1800),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds the config from any key lookup, so callers can substitute the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // first non-empty value among the given keys
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .find(|value| !value.trim().is_empty())
        };

        let port: u16 = parse("PORT", get(&["PORT"]))?.unwrap_or(5000);
        let listen_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let url = get(&["DATABASE_URL"]);
        let backend = match get(&["DB_BACKEND"]) {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "DB_BACKEND",
                value,
            })?,
            None => url
                .as_deref()
                .and_then(Backend::from_url)
                .unwrap_or(Backend::Sqlite),
        };

        let default_name = match backend {
            Backend::Sqlite => "valentine.db",
            _ => "valentine_db",
        };
        let database = DatabaseConfig {
            backend,
            url,
            host: get(&["DB_HOST", "PGHOST"]).unwrap_or_else(|| "localhost".to_owned()),
            port: parse("DB_PORT", get(&["DB_PORT", "PGPORT"]))?
                .unwrap_or(backend.default_port()),
            user: get(&["DB_USER", "PGUSER"]).unwrap_or_else(|| match backend {
                Backend::Sqlite => String::new(),
                Backend::Postgres => "postgres".to_owned(),
                Backend::MySql => "root".to_owned(),
            }),
            password: get(&["DB_PASSWORD", "PGPASSWORD"]).unwrap_or_default(),
            name: get(&["DB_NAME", "PGDATABASE"]).unwrap_or_else(|| default_name.to_owned()),
        };

        let secret = match get(&["SECRET_KEY"]) {
            Some(secret) => Some(
                Key::try_from(secret.as_bytes())
                    .map_err(|_| ConfigError::ShortSecret(secret.len()))?,
            ),
            None => None,
        };
        let same_site = match get(&["SESSION_COOKIE_SAMESITE"]) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "lax" => SameSite::Lax,
                "strict" => SameSite::Strict,
                "none" => SameSite::None,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "SESSION_COOKIE_SAMESITE",
                        value,
                    });
                }
            },
            None => SameSite::Lax,
        };
        let session = SessionConfig {
            secret,
            secure: flag("SESSION_COOKIE_SECURE", get(&["SESSION_COOKIE_SECURE"]))?
                .unwrap_or(true),
            http_only: flag("SESSION_COOKIE_HTTPONLY", get(&["SESSION_COOKIE_HTTPONLY"]))?
                .unwrap_or(true),
            same_site,
            lifetime: time::Duration::seconds(
                parse("SESSION_LIFETIME", get(&["SESSION_LIFETIME"]))?.unwrap_or(1800),
            ),
        };

        Ok(Config {
            listen_addr,
            database,
            session,
        })
    }
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value })
        })
        .transpose()
}

fn flag(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        })
        .transpose()
}
