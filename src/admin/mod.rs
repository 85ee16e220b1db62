//! Read-only dump of everything stored. There is no login in front of it.

mod view;

use axum::{Router, routing::get};

use crate::AppState;

pub use view::render_report;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/view-data", get(view::view_data))
}
