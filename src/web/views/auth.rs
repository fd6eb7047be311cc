use axum::response::Html;

use super::{Page, attr, esc};
use crate::web::forms::FieldErrors;
use crate::web::session::Flash;

pub fn login_page(
    next: Option<&str>,
    username: &str,
    error: Option<&str>,
    flashes: &[Flash],
) -> Html<String> {
    let action = next.map_or_else(
        || "/login".to_string(),
        |next| format!("/login?next={}", urlencoding::encode(next)),
    );

    let error = error
        .map(|e| format!(r#"<div class="flash flash-error">{}</div>"#, esc(e)))
        .unwrap_or_default();

    let no_errors = FieldErrors::default();

    let body = format!(
        r#"<section class="card narrow">
<h1>Log in</h1>
{error}
<form method="post" action="{action}">
{username}
{password}
<button type="submit" class="primary">Log in</button>
</form>
</section>"#,
        action = attr(&action),
        username = super::field("Username", "username", "text", username, &no_errors),
        password = super::field("Password", "password", "password", "", &no_errors),
    );

    Page {
        title: "Log in",
        user: None,
        flashes,
        body,
    }
    .render()
}
