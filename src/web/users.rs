use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::forms::{FieldErrors, UserForm};
use super::session::{self, PageContext};
use super::{AppState, WebError, views};
use crate::models::{Role, SessionUser, User};
use crate::services::UserError;

const USERS_PAGE: &str = "/admin/users";

fn form_response(
    state: &AppState,
    ctx: &PageContext,
    status: StatusCode,
    user: Option<&User>,
    form: &UserForm,
    errors: &FieldErrors,
) -> Response {
    let page = views::users::user_form_page(
        ctx,
        user,
        form,
        errors,
        state.config().security.min_password_length,
    );
    (status, page).into_response()
}

/// Turns the service errors a user can fix into inline form errors.
fn inline_error(err: UserError) -> Result<(StatusCode, FieldErrors), WebError> {
    let mut errors = FieldErrors::default();
    match err {
        UserError::UsernameTaken(name) => {
            errors.add("username", format!("Username '{name}' is already taken."));
            Ok((StatusCode::CONFLICT, errors))
        }
        UserError::Validation(msg) => {
            errors.add("username", msg);
            Ok((StatusCode::UNPROCESSABLE_ENTITY, errors))
        }
        other => Err(other.into()),
    }
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
) -> Result<Response, WebError> {
    let users = state.user_service().list().await?;
    Ok(views::users::list_page(&ctx, &users).into_response())
}

/// GET /admin/users/new
pub async fn new_user(State(state): State<Arc<AppState>>, ctx: PageContext) -> Response {
    let form = UserForm {
        role: Role::User.as_str().to_string(),
        ..UserForm::default()
    };
    form_response(&state, &ctx, StatusCode::OK, None, &form, &FieldErrors::default())
}

/// POST /admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<UserForm>,
) -> Result<Response, WebError> {
    let min_len = state.config().security.min_password_length;

    let input = match form.validate_new(min_len) {
        Ok(input) => input,
        Err(errors) => {
            return Ok(form_response(
                &state,
                &ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                None,
                &form,
                &errors,
            ));
        }
    };

    match state.user_service().create(input).await {
        Ok(user) => {
            session::info(&session, format!("User {} created.", user.username)).await?;
            Ok(Redirect::to(USERS_PAGE).into_response())
        }
        Err(err) => {
            let (status, errors) = inline_error(err)?;
            Ok(form_response(&state, &ctx, status, None, &form, &errors))
        }
    }
}

/// GET /admin/users/{id}/edit
pub async fn edit_user(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<Response, WebError> {
    let user = state.user_service().get(id).await?;
    let form = UserForm {
        username: user.username.clone(),
        password: String::new(),
        role: user.role.as_str().to_string(),
    };

    Ok(form_response(
        &state,
        &ctx,
        StatusCode::OK,
        Some(&user),
        &form,
        &FieldErrors::default(),
    ))
}

/// POST /admin/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ctx: PageContext,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<UserForm>,
) -> Result<Response, WebError> {
    let user = state.user_service().get(id).await?;
    let min_len = state.config().security.min_password_length;

    let input = match form.validate_update(min_len) {
        Ok(input) => input,
        Err(errors) => {
            return Ok(form_response(
                &state,
                &ctx,
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(&user),
                &form,
                &errors,
            ));
        }
    };

    match state.user_service().update(id, input).await {
        Ok(updated) => {
            session::info(&session, format!("User {} updated.", updated.username)).await?;
            Ok(Redirect::to(USERS_PAGE).into_response())
        }
        Err(err) => {
            let (status, errors) = inline_error(err)?;
            Ok(form_response(&state, &ctx, status, Some(&user), &form, &errors))
        }
    }
}

async fn set_locked(
    state: &AppState,
    actor: &SessionUser,
    session: &Session,
    id: i32,
    locked: bool,
) -> Result<Redirect, WebError> {
    match state
        .user_service()
        .set_locked(Some(actor.id), id, locked)
        .await
    {
        Ok(user) => {
            let verb = if locked { "locked" } else { "unlocked" };
            session::info(session, format!("User {} {verb}.", user.username)).await?;
        }
        Err(err @ UserError::SelfAction(_)) => {
            session::error(session, format!("{err}.")).await?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Redirect::to(USERS_PAGE))
}

/// POST /admin/users/{id}/lock
pub async fn lock_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<SessionUser>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect, WebError> {
    set_locked(&state, &actor, &session, id, true).await
}

/// POST /admin/users/{id}/unlock
pub async fn unlock_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<SessionUser>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect, WebError> {
    set_locked(&state, &actor, &session, id, false).await
}

/// POST /admin/users/{id}/delete
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<SessionUser>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Redirect, WebError> {
    match state.user_service().delete(Some(actor.id), id).await {
        Ok(()) => session::info(&session, "User deleted.").await?,
        Err(err @ UserError::SelfAction(_)) => {
            session::error(&session, format!("{err}.")).await?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(Redirect::to(USERS_PAGE))
}
