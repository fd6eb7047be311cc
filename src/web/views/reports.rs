use axum::response::Html;
use std::collections::HashMap;
use std::fmt::Write;

use super::{Page, attr, display_user, esc, timestamp};
use crate::models::{MovementStats, StockFilter, StockLookup, User};
use crate::web::session::PageContext;

fn user_select(users: &[User], selected: Option<i32>, any_label: &str) -> String {
    let mut html = format!(
        r#"<select name="user_id"><option value="">{}</option>"#,
        esc(any_label)
    );
    for user in users {
        let mark = if selected == Some(user.id) { " selected" } else { "" };
        let _ = write!(
            html,
            r#"<option value="{id}"{mark}>{name}</option>"#,
            id = user.id,
            name = esc(&user.username),
        );
    }
    html.push_str("</select>");
    html
}

pub fn stock_page(
    ctx: &PageContext,
    lookup: &StockLookup,
    filter: &StockFilter,
    users: &[User],
    names: &HashMap<i32, String>,
) -> Html<String> {
    let by_code: String = lookup
        .by_code
        .iter()
        .map(|g| {
            format!(
                r#"<tr><td><a href="/admin/stock?code={link}">{code}</a></td><td class="num">{count}</td><td class="num">{qty}</td></tr>"#,
                link = attr(&urlencoding::encode(&g.finis_code)),
                code = esc(&g.finis_code),
                count = g.item_count,
                qty = g.quantity,
            )
        })
        .collect();

    let by_user: String = lookup
        .by_user
        .iter()
        .map(|g| {
            format!(
                r#"<tr><td><a href="/admin/stock?user_id={id}">{name}</a></td><td class="num">{count}</td><td class="num">{qty}</td></tr>"#,
                id = g.user_id,
                name = esc(&display_user(names, g.user_id)),
                count = g.item_count,
                qty = g.quantity,
            )
        })
        .collect();

    let by_code_user: String = lookup
        .by_code_user
        .iter()
        .map(|g| {
            format!(
                r#"<tr><td>{code}</td><td>{name}</td><td class="num">{qty}</td></tr>"#,
                code = esc(&g.finis_code),
                name = esc(&display_user(names, g.user_id)),
                qty = g.quantity,
            )
        })
        .collect();

    let rows: String = lookup
        .rows
        .iter()
        .map(|item| {
            format!(
                r#"<tr><td>{finis}</td><td>{full}</td><td>{desc}</td><td class="num">{qty}</td><td>{owner}</td><td>{updated}</td></tr>"#,
                finis = esc(&item.finis_code),
                full = esc(&item.full_code),
                desc = esc(&item.description),
                qty = item.quantity,
                owner = esc(&display_user(names, item.created_by_id)),
                updated = timestamp(&item.updated_at),
            )
        })
        .collect();

    let body = format!(
        r#"<section class="card">
<h1>Stock lookup</h1>
<form method="get" action="/admin/stock" class="filters">
<input type="search" name="code" value="{code}" placeholder="FINIS or full code">
{users}
<button type="submit">Filter</button> <a href="/admin/stock">Reset</a>
</form>
<div class="kpis">
<div class="kpi"><span>Items</span><strong>{item_count}</strong></div>
<div class="kpi"><span>Total quantity</span><strong>{total}</strong></div>
<div class="kpi"><span>FINIS codes</span><strong>{code_count}</strong></div>
</div>
</section>
<div class="grid">
<section class="card"><h2>By FINIS code</h2><table>
<thead><tr><th>FINIS code</th><th class="num">Items</th><th class="num">Quantity</th></tr></thead>
<tbody>{by_code}</tbody></table></section>
<section class="card"><h2>By user</h2><table>
<thead><tr><th>User</th><th class="num">Items</th><th class="num">Quantity</th></tr></thead>
<tbody>{by_user}</tbody></table></section>
</div>
<section class="card"><h2>By FINIS code and user</h2><table>
<thead><tr><th>FINIS code</th><th>User</th><th class="num">Quantity</th></tr></thead>
<tbody>{by_code_user}</tbody></table></section>
<section class="card"><h2>Matching items</h2><table>
<thead><tr><th>FINIS code</th><th>Full code</th><th>Description</th><th class="num">Qty</th><th>Created by</th><th>Updated</th></tr></thead>
<tbody>{rows}</tbody></table></section>"#,
        code = attr(filter.code.as_deref().unwrap_or("")),
        users = user_select(users, filter.user_id, "All users"),
        item_count = lookup.rows.len(),
        total = lookup.total_quantity,
        code_count = lookup.by_code.len(),
    );

    Page {
        title: "Stock lookup",
        user: Some(&ctx.user),
        flashes: &ctx.flashes,
        body,
    }
    .render()
}

/// Width of a bar as a percentage of the largest value, at least 1% for
/// non-zero values so they stay visible.
fn bar_width(value: i64, max: i64) -> i64 {
    if value <= 0 || max <= 0 {
        0
    } else {
        (value * 100 / max).max(1)
    }
}

pub fn stats_page(
    ctx: &PageContext,
    stats: &MovementStats,
    users: &[User],
    names: &HashMap<i32, String>,
    json_link: &str,
) -> Html<String> {
    let max = stats
        .days
        .iter()
        .map(|d| d.qty_in.max(d.qty_out))
        .max()
        .unwrap_or(0);

    let days: String = stats
        .days
        .iter()
        .map(|d| {
            format!(
                r#"<tr><td>{day}</td>
<td class="num">{qty_in}</td><td class="bar"><span class="bar-in" style="width:{w_in}%"></span></td>
<td class="num">{qty_out}</td><td class="bar"><span class="bar-out" style="width:{w_out}%"></span></td>
<td class="num">{stock}</td></tr>"#,
                day = d.day.format("%Y-%m-%d"),
                qty_in = d.qty_in,
                w_in = bar_width(d.qty_in, max),
                qty_out = d.qty_out,
                w_out = bar_width(d.qty_out, max),
                stock = d.stock,
            )
        })
        .collect();

    let movements: String = stats
        .movements
        .iter()
        .rev()
        .map(|m| {
            format!(
                r#"<tr><td>{when}</td><td>{finis}</td><td>{full}</td><td><span class="badge dir-{class}">{dir}</span></td><td class="num">{qty}</td><td>{note}</td><td>{user}</td></tr>"#,
                when = timestamp(&m.occurred_at),
                finis = esc(&m.finis_code),
                full = esc(&m.full_code),
                class = m.direction.as_str().to_ascii_lowercase(),
                dir = m.direction,
                qty = m.qty,
                note = esc(m.note.as_deref().unwrap_or("")),
                user = esc(&display_user(names, m.user_id)),
            )
        })
        .collect();

    let filter = &stats.filter;

    let body = format!(
        r#"<section class="card">
<h1>Movement statistics</h1>
<form method="get" action="/admin/stats" class="filters">
<label>From <input type="date" name="start" value="{start}"></label>
<label>To <input type="date" name="end" value="{end}"></label>
<input type="search" name="finis" value="{finis}" placeholder="FINIS code">
{users}
<button type="submit">Apply</button> <a href="{json}">JSON</a>
</form>
<div class="kpis">
<div class="kpi"><span>Opening balance</span><strong>{opening}</strong></div>
<div class="kpi"><span>Total IN</span><strong>{total_in}</strong></div>
<div class="kpi"><span>Total OUT</span><strong>{total_out}</strong></div>
<div class="kpi"><span>Net</span><strong>{net}</strong></div>
<div class="kpi"><span>Current stock</span><strong>{current}</strong></div>
</div>
</section>
<section class="card"><h2>Daily movements</h2><table class="chart">
<thead><tr><th>Day</th><th class="num">IN</th><th></th><th class="num">OUT</th><th></th><th class="num">Stock</th></tr></thead>
<tbody>{days}</tbody></table></section>
<section class="card"><h2>Movements</h2><table>
<thead><tr><th>When (UTC)</th><th>FINIS code</th><th>Full code</th><th>Direction</th><th class="num">Qty</th><th>Note</th><th>By</th></tr></thead>
<tbody>{movements}</tbody></table></section>"#,
        start = filter.start.format("%Y-%m-%d"),
        end = filter.end.format("%Y-%m-%d"),
        finis = attr(filter.finis.as_deref().unwrap_or("")),
        users = user_select(users, filter.user_id, "All users"),
        json = attr(json_link),
        opening = stats.opening,
        total_in = stats.total_in,
        total_out = stats.total_out,
        net = stats.net,
        current = stats.current_stock,
    );

    Page {
        title: "Statistics",
        user: Some(&ctx.user),
        flashes: &ctx.flashes,
        body,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_width() {
        assert_eq!(bar_width(0, 10), 0);
        assert_eq!(bar_width(5, 0), 0);
        assert_eq!(bar_width(10, 10), 100);
        assert_eq!(bar_width(1, 1000), 1);
        assert_eq!(bar_width(25, 100), 25);
    }
}
