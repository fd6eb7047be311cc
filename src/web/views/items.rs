use axum::response::Html;
use std::collections::HashMap;
use std::fmt::Write;

use super::{Page, attr, display_user, esc, field, optional_field, post_button, timestamp};
use crate::models::{Direction, Item, Movement};
use crate::services::stock_service::ITEM_LIST_LIMIT;
use crate::web::forms::{FieldErrors, ItemForm, MovementForm};
use crate::web::session::PageContext;

pub fn list_page(
    ctx: &PageContext,
    items: &[Item],
    names: &HashMap<i32, String>,
    q: &str,
) -> Html<String> {
    let mut rows = String::new();
    for item in items {
        let updated_by = item
            .updated_by_id
            .map_or_else(|| "-".to_string(), |id| display_user(names, id));
        let _ = write!(
            rows,
            r#"<tr>
<td>{finis}</td><td>{full}</td><td>{desc}</td><td class="num">{qty}</td>
<td>{created_by}<br><small>{created_at}</small></td>
<td>{updated_by}<br><small>{updated_at}</small></td>
<td class="actions"><a href="/items/{id}/movements/new">Move</a> <a href="/items/{id}/edit">Edit</a> {delete}</td>
</tr>"#,
            finis = esc(&item.finis_code),
            full = esc(&item.full_code),
            desc = esc(&item.description),
            qty = item.quantity,
            created_by = esc(&display_user(names, item.created_by_id)),
            created_at = timestamp(&item.created_at),
            updated_by = esc(&updated_by),
            updated_at = timestamp(&item.updated_at),
            id = item.id,
            delete = post_button(
                &format!("/items/{}/delete", item.id),
                "Delete",
                "link danger",
                Some("Delete this item and its movements?"),
            ),
        );
    }

    if items.is_empty() {
        rows.push_str(r#"<tr><td colspan="7" class="empty">No items found.</td></tr>"#);
    }

    let scope = if ctx.user.is_admin() {
        "All items"
    } else {
        "Your items"
    };

    let capped = if u64::try_from(items.len()).unwrap_or(u64::MAX) >= ITEM_LIST_LIMIT {
        format!(r#"<p class="muted">Showing the {ITEM_LIST_LIMIT} most recently updated items. Refine the search to see others.</p>"#)
    } else {
        String::new()
    };

    let body = format!(
        r#"<section class="card">
<div class="heading"><h1>{scope}</h1><a class="button primary" href="/items/new">New item</a></div>
<form method="get" action="/" class="filters">
<input type="search" name="q" value="{q}" placeholder="Search FINIS code, full code or description">
<button type="submit">Search</button>
</form>
{capped}
<table>
<thead><tr><th>FINIS code</th><th>Full code</th><th>Description</th><th class="num">Qty</th><th>Created</th><th>Updated</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>
</section>"#,
        q = attr(q),
    );

    Page {
        title: scope,
        user: Some(&ctx.user),
        flashes: &ctx.flashes,
        body,
    }
    .render()
}

/// Create form when `item` is `None`, edit form otherwise.
pub fn item_form_page(
    ctx: &PageContext,
    item: Option<&Item>,
    form: &ItemForm,
    errors: &FieldErrors,
) -> Html<String> {
    let (title, action) = item.map_or_else(
        || ("New item".to_string(), "/items".to_string()),
        |item| (format!("Edit {}", item.full_code), format!("/items/{}", item.id)),
    );

    let description_error = errors
        .get("description")
        .map(|e| format!(r#"<small class="error">{}</small>"#, esc(e)))
        .unwrap_or_default();

    let extra = item
        .map(|item| {
            format!(
                r#"<div class="actions"><a href="/items/{id}/movements/new">Record movement</a> {delete}</div>"#,
                id = item.id,
                delete = post_button(
                    &format!("/items/{}/delete", item.id),
                    "Delete item",
                    "danger",
                    Some("Delete this item and its movements?"),
                ),
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<section class="card narrow">
<h1>{title}</h1>
<form method="post" action="{action}">
{finis}
{full}
<label class="field{desc_class}"><span>Description</span><textarea name="description" rows="3" required>{description}</textarea>{description_error}</label>
{quantity}
<div class="buttons"><button type="submit" class="primary">Save</button> <a href="/">Cancel</a></div>
</form>
{extra}
</section>"#,
        title = esc(&title),
        action = attr(&action),
        finis = field("FINIS code", "finis_code", "text", &form.finis_code, errors),
        full = field("Full code", "full_code", "text", &form.full_code, errors),
        desc_class = if description_error.is_empty() { "" } else { " invalid" },
        description = esc(&form.description),
        quantity = field("Quantity", "quantity", "number", &form.quantity, errors),
    );

    Page {
        title: &title,
        user: Some(&ctx.user),
        flashes: &ctx.flashes,
        body,
    }
    .render()
}

pub fn movement_page(
    ctx: &PageContext,
    item: &Item,
    form: &MovementForm,
    errors: &FieldErrors,
    history: &[Movement],
    names: &HashMap<i32, String>,
) -> Html<String> {
    let options: String = [Direction::In, Direction::Out]
        .iter()
        .map(|d| {
            let selected = if form.direction == d.as_str() { " selected" } else { "" };
            format!(r#"<option value="{d}"{selected}>{d}</option>"#)
        })
        .collect();

    let direction_error = errors
        .get("direction")
        .map(|e| format!(r#"<small class="error">{}</small>"#, esc(e)))
        .unwrap_or_default();

    let mut rows = String::new();
    for m in history {
        let _ = write!(
            rows,
            r#"<tr><td>{when}</td><td><span class="badge dir-{class}">{dir}</span></td><td class="num">{qty}</td><td>{note}</td><td>{user}</td></tr>"#,
            when = timestamp(&m.occurred_at),
            class = m.direction.as_str().to_ascii_lowercase(),
            dir = m.direction,
            qty = m.qty,
            note = esc(m.note.as_deref().unwrap_or("")),
            user = esc(&display_user(names, m.user_id)),
        );
    }
    if history.is_empty() {
        rows.push_str(r#"<tr><td colspan="5" class="empty">No movements yet.</td></tr>"#);
    }

    let title = format!("Movement for {}", item.full_code);

    let body = format!(
        r#"<section class="card narrow">
<h1>{heading}</h1>
<p class="muted">FINIS {finis}, current quantity <strong>{qty}</strong></p>
<form method="post" action="/items/{id}/movements">
<label class="field"><span>Direction</span><select name="direction">{options}</select>{direction_error}</label>
{qty_field}
{when}
{note}
<div class="buttons"><button type="submit" class="primary">Record</button> <a href="/">Cancel</a></div>
</form>
</section>
<section class="card">
<h2>Recent movements</h2>
<table>
<thead><tr><th>When (UTC)</th><th>Direction</th><th class="num">Qty</th><th>Note</th><th>By</th></tr></thead>
<tbody>{rows}</tbody>
</table>
</section>"#,
        heading = esc(&title),
        finis = esc(&item.finis_code),
        qty = item.quantity,
        id = item.id,
        qty_field = field("Quantity", "qty", "number", &form.qty, errors),
        when = optional_field(
            "When (UTC, blank for now)",
            "when",
            "datetime-local",
            &form.when,
            errors
        ),
        note = optional_field("Note", "note", "text", &form.note, errors),
    );

    Page {
        title: &title,
        user: Some(&ctx.user),
        flashes: &ctx.flashes,
        body,
    }
    .render()
}
