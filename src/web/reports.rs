use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

use super::forms::{StatsQuery, StockQuery, parse_user_id};
use super::session::PageContext;
use super::{AppState, WebError, views};
use crate::models::{MovementStats, StatsFilter};

/// GET /admin/stock
pub async fn stock_lookup(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Query(query): Query<StockQuery>,
) -> Result<Response, WebError> {
    let filter = query.to_filter();

    let lookup = state.report_service().stock_lookup(&filter).await?;
    let users = state.user_service().list().await?;
    let names = state.user_service().username_map().await?;

    Ok(views::reports::stock_page(&ctx, &lookup, &filter, &users, &names).into_response())
}

async fn compute_stats(state: &AppState, query: StatsQuery) -> Result<MovementStats, WebError> {
    let filter = StatsFilter::from_query(
        query.start.as_deref(),
        query.end.as_deref(),
        query.finis,
        parse_user_id(query.user_id.as_deref()),
        Utc::now().date_naive(),
    );

    Ok(state.report_service().movement_stats(filter).await?)
}

fn json_link(stats: &MovementStats) -> String {
    let filter = &stats.filter;
    let mut link = format!(
        "/admin/stats.json?start={}&end={}",
        filter.start.format("%Y-%m-%d"),
        filter.end.format("%Y-%m-%d")
    );
    if let Some(finis) = &filter.finis {
        link.push_str("&finis=");
        link.push_str(&urlencoding::encode(finis));
    }
    if let Some(user_id) = filter.user_id {
        link.push_str(&format!("&user_id={user_id}"));
    }
    link
}

/// GET /admin/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Query(query): Query<StatsQuery>,
) -> Result<Response, WebError> {
    let stats = compute_stats(&state, query).await?;
    let users = state.user_service().list().await?;
    let names = state.user_service().username_map().await?;

    Ok(views::reports::stats_page(&ctx, &stats, &users, &names, &json_link(&stats)).into_response())
}

/// GET /admin/stats.json
pub async fn stats_json(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<MovementStats>, WebError> {
    Ok(Json(compute_stats(&state, query).await?))
}
