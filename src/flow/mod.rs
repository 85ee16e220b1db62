mod machine;
mod pages;
mod submit;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::{AppResult, AppState, session::Visit};

pub use machine::{FlowState, Guard, trim_input};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::landing))
        .route("/submit-name", post(submit::submit_name))
        .route("/question", get(pages::question))
        .route("/accept", post(submit::accept))
        .route("/message", get(pages::message))
        .route("/submit-message", post(submit::submit_message))
}

/// Loads the visit if `state` admits it.
pub(crate) async fn admit(session: &Session, state: FlowState) -> AppResult<Option<Visit>> {
    let visit = Visit::load(session).await?;
    Ok(state.admits(&visit).then_some(visit))
}

pub(crate) fn redirect(state: FlowState) -> Redirect {
    Redirect::to(state.path().unwrap_or("/"))
}

/// Redirect to the step after `state`.
pub(crate) fn advance(state: FlowState) -> Redirect {
    redirect(state.next().unwrap_or(state.fallback()))
}
