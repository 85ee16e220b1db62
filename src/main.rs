use anyhow::Context;
use tower_sessions::ExpiredDeletion;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use valentine::{AppState, app, config::Config, db, session::SessionBackend};

const SESSION_SWEEP_PERIOD: tokio::time::Duration = tokio::time::Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    info!("starting valentine");
    dotenv::dotenv().ok();

    let config = Config::from_env().context("invalid configuration")?;
    info!(database = ?config.database, session = ?config.session, "configuration loaded");

    let store = db::open(&config.database)?;
    store
        .provision()
        .await
        .context("database initialization failed")?;
    info!(backend = %store.backend(), "database tables initialized");

    store
        .ping()
        .await
        .context("database connection failed; check that the server is running, the credentials are correct and the database exists")?;
    info!("database connection successful");

    let sessions = SessionBackend::connect(&config.database)
        .await
        .context("session store connection failed")?;
    sessions
        .migrate()
        .await
        .context("session table initialization failed")?;
    let deletion_task = tokio::task::spawn(
        sessions
            .clone()
            .continuously_delete_expired(SESSION_SWEEP_PERIOD),
    );

    let app = app(AppState { store }, sessions, &config.session);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!("listening on http://{}", config.listen_addr);
    let served = axum::serve(listener, app).await;
    deletion_task.abort();
    served?;

    Ok(())
}
