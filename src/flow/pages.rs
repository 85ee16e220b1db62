use axum::{
    debug_handler,
    response::{Html, IntoResponse, Response},
};
use tower_sessions::Session;

use crate::{
    AppResult, include_res,
    res::{escape_html, fill},
};

use super::{FlowState, admit, redirect};

#[debug_handler]
pub(crate) async fn landing() -> impl IntoResponse {
    Html(include_res!(str, "/pages/landing.html"))
}

#[debug_handler]
pub(crate) async fn question(session: Session) -> AppResult<Response> {
    let Some(visit) = admit(&session, FlowState::Question).await? else {
        return Ok(redirect(FlowState::Question.fallback()).into_response());
    };

    let name = escape_html(visit.name.as_deref().unwrap_or_default());
    Ok(Html(fill(
        include_res!(str, "/pages/question.html"),
        &[("name", name.as_str())],
    ))
    .into_response())
}

#[debug_handler]
pub(crate) async fn message(session: Session) -> AppResult<Response> {
    let Some(visit) = admit(&session, FlowState::Message).await? else {
        return Ok(redirect(FlowState::Message.fallback()).into_response());
    };

    let name = escape_html(visit.name.as_deref().unwrap_or_default());
    Ok(Html(fill(
        include_res!(str, "/pages/message.html"),
        &[("name", name.as_str())],
    ))
    .into_response())
}

pub(crate) fn thanked(name: &str) -> Response {
    let name = escape_html(name);
    Html(fill(
        include_res!(str, "/pages/thank_you.html"),
        &[("name", name.as_str())],
    ))
    .into_response()
}
