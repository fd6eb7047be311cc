//! Server-rendered HTML. Every value coming from the database or the request
//! goes through [`esc`] or [`attr`] before it reaches the page.

use axum::http::StatusCode;
use axum::response::Html;
use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Write;

use super::forms::FieldErrors;
use super::session::Flash;
use crate::models::SessionUser;
use crate::models::time::format_minutes;

pub mod auth;
pub mod items;
pub mod reports;
pub mod users;

#[must_use]
pub fn esc(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

#[must_use]
pub fn attr(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// Username for an audit column, or `user#<id>` when the account is gone.
#[must_use]
pub fn display_user(names: &HashMap<i32, String>, id: i32) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("user#{id}"))
}

#[must_use]
pub fn timestamp(ts: &DateTime<Utc>) -> String {
    format_minutes(ts)
}

/// A labelled, required `<input>` with its inline error, if any. Password
/// inputs are never marked required since edit forms accept them blank.
#[must_use]
pub fn field(label: &str, name: &str, kind: &str, value: &str, errors: &FieldErrors) -> String {
    input(label, name, kind, value, errors, kind != "password")
}

#[must_use]
pub fn optional_field(
    label: &str,
    name: &str,
    kind: &str,
    value: &str,
    errors: &FieldErrors,
) -> String {
    input(label, name, kind, value, errors, false)
}

fn input(
    label: &str,
    name: &str,
    kind: &str,
    value: &str,
    errors: &FieldErrors,
    required: bool,
) -> String {
    let error = errors.get(name);
    let class = if error.is_some() { " invalid" } else { "" };
    let mut html = format!(
        r#"<label class="field{class}"><span>{label}</span><input type="{kind}" name="{name}" value="{value}""#,
        label = esc(label),
        value = attr(value),
    );
    if required {
        html.push_str(" required");
    }
    html.push('>');
    if let Some(error) = error {
        let _ = write!(html, r#"<small class="error">{}</small>"#, esc(error));
    }
    html.push_str("</label>");
    html
}

/// A POST form consisting of a single button.
#[must_use]
pub fn post_button(action: &str, label: &str, class: &str, confirm: Option<&str>) -> String {
    let confirm = confirm
        .map(|msg| format!(r#" data-confirm="{}""#, attr(msg)))
        .unwrap_or_default();
    format!(
        r#"<form class="inline" method="post" action="{action}"{confirm}><button type="submit" class="{class}">{label}</button></form>"#,
        action = attr(action),
        label = esc(label),
    )
}

pub struct Page<'a> {
    pub title: &'a str,
    pub user: Option<&'a SessionUser>,
    pub flashes: &'a [Flash],
    pub body: String,
}

impl Page<'_> {
    #[must_use]
    pub fn render(self) -> Html<String> {
        let mut nav = String::new();
        if let Some(user) = self.user {
            nav.push_str(r#"<nav><a href="/">Items</a><a href="/items/new">New item</a>"#);
            if user.is_admin() {
                nav.push_str(
                    r#"<a href="/admin/stock">Stock lookup</a><a href="/admin/stats">Statistics</a><a href="/admin/users">Users</a>"#,
                );
            }
            nav.push_str("</nav>");
            let _ = write!(
                nav,
                r#"<div class="who">{name} <span class="badge">{role}</span>{logout}</div>"#,
                name = esc(&user.username),
                role = user.role,
                logout = post_button("/logout", "Log out", "link", None),
            );
        }

        let flashes: String = self
            .flashes
            .iter()
            .map(|f| {
                format!(
                    r#"<div class="flash {}">{}</div>"#,
                    f.level.css_class(),
                    esc(&f.message)
                )
            })
            .collect();

        Html(format!(
            r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Stockroom</title>
<link rel="stylesheet" href="/static/style.css">
<script src="/static/app.js" defer></script>
</head>
<body>
<header class="topbar"><a class="brand" href="/">Stockroom</a>{nav}</header>
<main>
{flashes}
{body}
</main>
</body>
</html>"#,
            title = esc(self.title),
            body = self.body,
        ))
    }
}

#[must_use]
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let title = status.canonical_reason().unwrap_or("Error");
    Page {
        title,
        user: None,
        flashes: &[],
        body: format!(
            r#"<section class="card narrow"><h1>{code} {title}</h1><p>{message}</p><p><a href="/">Back to the item list</a></p></section>"#,
            code = status.as_u16(),
            title = esc(title),
            message = esc(message),
        ),
    }
    .render()
}
