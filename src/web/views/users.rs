use axum::response::Html;
use std::fmt::Write;

use super::{Page, attr, esc, field, post_button, timestamp};
use crate::models::{Role, User};
use crate::web::forms::{FieldErrors, UserForm};
use crate::web::session::PageContext;

pub fn list_page(ctx: &PageContext, users: &[User]) -> Html<String> {
    let mut rows = String::new();
    for user in users {
        let is_self = user.id == ctx.user.id;

        let status = if user.locked {
            r#"<span class="badge locked">Locked</span>"#
        } else {
            r#"<span class="badge active">Active</span>"#
        };

        let mut actions = format!(r#"<a href="/admin/users/{}/edit">Edit</a> "#, user.id);
        if user.locked {
            actions.push_str(&post_button(
                &format!("/admin/users/{}/unlock", user.id),
                "Unlock",
                "link",
                None,
            ));
        } else if !is_self {
            actions.push_str(&post_button(
                &format!("/admin/users/{}/lock", user.id),
                "Lock",
                "link",
                None,
            ));
        }
        if !is_self {
            actions.push(' ');
            actions.push_str(&post_button(
                &format!("/admin/users/{}/delete", user.id),
                "Delete",
                "link danger",
                Some("Delete this account? Items keep its id in their audit columns."),
            ));
        }

        let _ = write!(
            rows,
            r#"<tr><td class="num">{id}</td><td>{name}{you}</td><td><span class="badge">{role}</span></td><td>{status}</td><td>{created}</td><td class="actions">{actions}</td></tr>"#,
            id = user.id,
            name = esc(&user.username),
            you = if is_self { r#" <small class="muted">(you)</small>"# } else { "" },
            role = user.role.label(),
            created = timestamp(&user.created_at),
        );
    }

    let body = format!(
        r#"<section class="card">
<div class="heading"><h1>Users</h1><a class="button primary" href="/admin/users/new">New user</a></div>
<table>
<thead><tr><th class="num">Id</th><th>Username</th><th>Role</th><th>Status</th><th>Created</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>
</section>"#
    );

    Page {
        title: "Users",
        user: Some(&ctx.user),
        flashes: &ctx.flashes,
        body,
    }
    .render()
}

/// Create form when `user` is `None`, edit form otherwise.
pub fn user_form_page(
    ctx: &PageContext,
    user: Option<&User>,
    form: &UserForm,
    errors: &FieldErrors,
    min_password_len: usize,
) -> Html<String> {
    let (title, action, password_label) = user.map_or_else(
        || {
            (
                "New user".to_string(),
                "/admin/users".to_string(),
                format!("Password (at least {min_password_len} characters)"),
            )
        },
        |user| {
            (
                format!("Edit {}", user.username),
                format!("/admin/users/{}", user.id),
                "New password (leave blank to keep the current one)".to_string(),
            )
        },
    );

    let current_role = form.role.parse::<Role>().unwrap_or_default();
    let options: String = Role::ALL
        .iter()
        .map(|role| {
            let selected = if *role == current_role { " selected" } else { "" };
            format!(
                r#"<option value="{value}"{selected}>{label}</option>"#,
                value = role.as_str(),
                label = role.label(),
            )
        })
        .collect();

    let role_error = errors
        .get("role")
        .map(|e| format!(r#"<small class="error">{}</small>"#, esc(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<section class="card narrow">
<h1>{heading}</h1>
<form method="post" action="{action}">
{username}
{password}
<label class="field"><span>Role</span><select name="role">{options}</select>{role_error}</label>
<div class="buttons"><button type="submit" class="primary">Save</button> <a href="/admin/users">Cancel</a></div>
</form>
</section>"#,
        heading = esc(&title),
        action = attr(&action),
        username = field("Username", "username", "text", &form.username, errors),
        password = field(&password_label, "password", "password", "", errors),
    );

    Page {
        title: &title,
        user: Some(&ctx.user),
        flashes: &ctx.flashes,
        body,
    }
    .render()
}
