use axum::{
    Form, debug_handler,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info};

use crate::{AppResult, db::DynStorage, session::Visit};

use super::{FlowState, admit, advance, pages, redirect, trim_input};

#[derive(Debug, Deserialize)]
pub(crate) struct NameForm {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageForm {
    #[serde(default)]
    message: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit_name(
    State(store): State<DynStorage>,
    session: Session,
    Form(NameForm { name }): Form<NameForm>,
) -> AppResult<Response> {
    let Some(name) = trim_input(&name) else {
        return Ok(redirect(FlowState::Landing).into_response());
    };

    let user_id = match store.create_user(name).await {
        Ok(user_id) => user_id,
        Err(e) => {
            error!("saving name failed: {e}");
            return Ok(redirect(FlowState::Naming.fallback()).into_response());
        }
    };
    info!(user_id, "new visitor {name}");

    Visit::started(user_id, name).store(&session).await?;

    Ok(advance(FlowState::Naming).into_response())
}

#[debug_handler]
pub(crate) async fn accept(session: Session) -> AppResult<Response> {
    if admit(&session, FlowState::Accept).await?.is_none() {
        return Ok(redirect(FlowState::Accept.fallback()).into_response());
    }

    Ok(advance(FlowState::Accept).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn submit_message(
    State(store): State<DynStorage>,
    session: Session,
    Form(MessageForm { message }): Form<MessageForm>,
) -> AppResult<Response> {
    let Some(visit) = admit(&session, FlowState::Submission).await? else {
        return Ok(redirect(FlowState::Submission.fallback()).into_response());
    };
    let Some(user_id) = visit.user_id else {
        return Ok(redirect(FlowState::Submission.fallback()).into_response());
    };

    // an empty message still finishes the flow
    if let Some(message) = trim_input(&message) {
        match store.create_message(user_id, message).await {
            Ok(id) => info!(user_id, message_id = id, "message saved"),
            Err(e) => error!(user_id, "saving message failed: {e}"),
        }
    }

    Ok(pages::thanked(visit.name.as_deref().unwrap_or_default()))
}
