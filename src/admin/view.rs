use axum::{debug_handler, extract::State, response::Html};
use tracing::error;

use crate::{
    db::{DynStorage, MessageRow, StoreResult, UserRow},
    include_res,
    res::{escape_html, fill},
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn view_data(State(store): State<DynStorage>) -> Html<String> {
    match load(&store).await {
        Ok((users, messages)) => Html(render_report(&users, &messages)),
        Err(e) => {
            error!("admin report failed: {e}");
            let error = escape_html(&e.to_string());
            Html(fill(
                include_res!(str, "/pages/admin/error.html"),
                &[("error", error.as_str())],
            ))
        }
    }
}

async fn load(store: &DynStorage) -> StoreResult<(Vec<UserRow>, Vec<MessageRow>)> {
    Ok((store.list_users().await?, store.list_messages().await?))
}

fn user_row(user: &UserRow) -> String {
    let id = user.id.to_string();
    let name = escape_html(&user.name);
    let timestamp = escape_html(&user.timestamp);
    fill(
        include_res!(str, "/pages/admin/user_row.html"),
        &[
            ("id", id.as_str()),
            ("name", name.as_str()),
            ("timestamp", timestamp.as_str()),
        ],
    )
}

fn message_row(msg: &MessageRow) -> String {
    let id = msg.id.to_string();
    let name = escape_html(&msg.name);
    let message = escape_html(&msg.message);
    let timestamp = escape_html(&msg.timestamp);
    fill(
        include_res!(str, "/pages/admin/message_row.html"),
        &[
            ("id", id.as_str()),
            ("name", name.as_str()),
            ("message", message.as_str()),
            ("timestamp", timestamp.as_str()),
        ],
    )
}

pub fn render_report(users: &[UserRow], messages: &[MessageRow]) -> String {
    let users_html = if users.is_empty() {
        "<p>No users yet.</p>".to_owned()
    } else {
        let rows: String = users.iter().map(user_row).collect();
        fill(
            include_res!(str, "/pages/admin/users_table.html"),
            &[("rows", rows.as_str())],
        )
    };

    let messages_html = if messages.is_empty() {
        "<p>No messages yet.</p>".to_owned()
    } else {
        let rows: String = messages.iter().map(message_row).collect();
        fill(
            include_res!(str, "/pages/admin/messages_table.html"),
            &[("rows", rows.as_str())],
        )
    };

    let user_count = users.len().to_string();
    let message_count = messages.len().to_string();
    fill(
        include_res!(str, "/pages/admin/view.html"),
        &[
            ("user_count", user_count.as_str()),
            ("message_count", message_count.as_str()),
            ("users", users_html.as_str()),
            ("messages", messages_html.as_str()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_placeholders() {
        let html = render_report(&[], &[]);
        assert!(html.contains("No users yet."));
        assert!(html.contains("No messages yet."));
        assert!(html.contains(r#"<span class="count">0</span>"#));
    }

    #[test]
    fn rows_are_escaped() {
        let users = [UserRow {
            id: 1,
            name: "<script>".to_owned(),
            timestamp: "2026-02-14 09:30:00".to_owned(),
        }];
        let messages = [MessageRow {
            id: 1,
            user_id: 1,
            name: "<script>".to_owned(),
            message: "Yes & yes".to_owned(),
            timestamp: "2026-02-14 09:31:00".to_owned(),
        }];
        let html = render_report(&users, &messages);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Yes &amp; yes"));
        assert!(html.contains("2026-02-14 09:31:00"));
        assert!(!html.contains("No users yet."));
    }

    #[test]
    fn placeholder_lookalikes_in_rows_stay_literal() {
        let users = [UserRow {
            id: 1,
            name: "{messages}".to_owned(),
            timestamp: "2026-02-14 09:30:00".to_owned(),
        }];
        let messages = [MessageRow {
            id: 1,
            user_id: 1,
            name: "{message}".to_owned(),
            message: "SECRET".to_owned(),
            timestamp: "2026-02-14 09:31:00".to_owned(),
        }];
        let html = render_report(&users, &messages);

        assert_eq!(html.matches("SECRET").count(), 1);
        assert_eq!(html.matches("<th>Message</th>").count(), 1);
        assert!(html.contains("<td>{messages}</td>"));
        assert!(html.contains("<strong>{message}</strong>"));
    }
}
