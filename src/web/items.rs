use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::forms::{FieldErrors, ItemForm, SearchQuery};
use super::session::{self, PageContext};
use super::{AppState, WebError, views};
use crate::models::SessionUser;

/// GET /
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Query(query): Query<SearchQuery>,
) -> Result<Response, WebError> {
    let q = query.q.unwrap_or_default();

    let items = state
        .stock_service()
        .list_items(&ctx.user, Some(q.as_str()))
        .await?;
    let names = state.user_service().username_map().await?;

    Ok(views::items::list_page(&ctx, &items, &names, q.trim()).into_response())
}

/// GET /items/new
pub async fn new_item(ctx: PageContext) -> impl IntoResponse {
    let form = ItemForm {
        quantity: "0".to_string(),
        ..ItemForm::default()
    };
    views::items::item_form_page(&ctx, None, &form, &FieldErrors::default())
}

/// POST /items
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<ItemForm>,
) -> Result<Response, WebError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                views::items::item_form_page(&ctx, None, &form, &errors),
            )
                .into_response());
        }
    };

    let item = state.stock_service().create_item(&ctx.user, &input).await?;
    session::info(&session, format!("Item {} created.", item.full_code)).await?;

    Ok(Redirect::to("/").into_response())
}

/// GET /items/{id}/edit
pub async fn edit_item(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<Response, WebError> {
    let item = state.stock_service().get_item(&ctx.user, id).await?;
    let form = ItemForm::from(&item);

    Ok(
        views::items::item_form_page(&ctx, Some(&item), &form, &FieldErrors::default())
            .into_response(),
    )
}

/// POST /items/{id}
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<ItemForm>,
) -> Result<Response, WebError> {
    let item = state.stock_service().get_item(&ctx.user, id).await?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                views::items::item_form_page(&ctx, Some(&item), &form, &errors),
            )
                .into_response());
        }
    };

    let item = state
        .stock_service()
        .update_item(&ctx.user, id, &input)
        .await?;
    session::info(&session, format!("Item {} updated.", item.full_code)).await?;

    Ok(Redirect::to("/").into_response())
}

/// POST /items/{id}/delete
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<SessionUser>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect, WebError> {
    state.stock_service().delete_item(&user, id).await?;
    session::info(&session, "Item deleted.").await?;

    Ok(Redirect::to("/"))
}
