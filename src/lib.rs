pub mod admin;
pub mod config;
pub mod db;
pub mod flow;
pub mod res;
pub mod session;

use axum::{
    Router,
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore, cookie::Key};
use tracing::{error, warn};

use config::SessionConfig;
use db::DynStorage;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: DynStorage,
}

pub fn app<S>(state: AppState, sessions: S, session: &SessionConfig) -> Router
where
    S: SessionStore + Clone,
{
    let key = session.secret.clone().unwrap_or_else(|| {
        warn!("SECRET_KEY not set, using a random signing key; session cookies issued before a restart will be rejected");
        Key::generate()
    });
    let session_layer = SessionManagerLayer::new(sessions)
        .with_secure(session.secure)
        .with_http_only(session.http_only)
        .with_same_site(session.same_site)
        .with_expiry(Expiry::OnInactivity(session.lifetime))
        .with_signed(key);

    Router::new()
        .merge(flow::router())
        .merge(admin::router())
        .nest_service("/static", ServeDir::new(res::STATIC_DIR))
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong.",
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
