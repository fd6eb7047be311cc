use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::forms::{FieldErrors, MovementForm};
use super::session::{self, PageContext};
use super::{AppState, WebError, views};
use crate::models::time;

async fn render(
    state: &AppState,
    ctx: &PageContext,
    id: i32,
    form: &MovementForm,
    errors: &FieldErrors,
) -> Result<axum::response::Html<String>, WebError> {
    let item = state.stock_service().get_item(&ctx.user, id).await?;
    let history = state.stock_service().item_movements(&ctx.user, id).await?;
    let names = state.user_service().username_map().await?;

    Ok(views::items::movement_page(
        ctx, &item, form, errors, &history, &names,
    ))
}

/// GET /items/{id}/movements/new
pub async fn new_movement(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<Response, WebError> {
    let form = MovementForm {
        direction: "IN".to_string(),
        when: time::now().format("%Y-%m-%dT%H:%M").to_string(),
        ..MovementForm::default()
    };

    Ok(render(&state, &ctx, id, &form, &FieldErrors::default())
        .await?
        .into_response())
}

/// POST /items/{id}/movements
pub async fn create_movement(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<MovementForm>,
) -> Result<Response, WebError> {
    // access check before looking at the payload
    state.stock_service().get_item(&ctx.user, id).await?;

    let input = match form.validate(time::now()) {
        Ok(input) => input,
        Err(errors) => {
            let page = render(&state, &ctx, id, &form, &errors).await?;
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let item = state
        .stock_service()
        .record_movement(&ctx.user, id, &input)
        .await?;

    session::info(
        &session,
        format!(
            "{} {} recorded for {}. Quantity is now {}.",
            input.direction, input.qty, item.full_code, item.quantity
        ),
    )
    .await?;

    Ok(Redirect::to("/").into_response())
}
