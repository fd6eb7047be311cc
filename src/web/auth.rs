use axum::{
    Extension, Form,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::forms::{LoginForm, NextQuery, safe_next};
use super::session::{self, USER_ID_KEY, take_flashes};
use super::{AppState, WebError, views};
use crate::models::SessionUser;
use crate::services::AuthError;

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the session to a [`SessionUser`] and stores it in the request
/// extensions. Anonymous requests are sent to the login page; sessions of
/// users that were locked or deleted since login are flushed.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let target = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str())
        .to_string();
    let login_redirect = || Redirect::to(&format!("/login?next={}", urlencoding::encode(&target)));

    let Some(user_id) = session.get::<i32>(USER_ID_KEY).await? else {
        return Ok(login_redirect().into_response());
    };

    let Some(user) = state.auth_service().session_user(user_id).await? else {
        tracing::info!(user_id, "Ending session of locked or removed account");
        session.flush().await?;
        session::error(&session, "Your session has ended. Please log in again.").await?;
        return Ok(login_redirect().into_response());
    };

    tracing::Span::current().record("user_id", user.id);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Must run inside [`require_login`].
pub async fn require_admin(
    Extension(user): Extension<SessionUser>,
    request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if user.is_admin() {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(user_id = user.id, path = %request.uri().path(), "Admin page refused");
        Err(WebError::forbidden())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /login
pub async fn login_form(Query(query): Query<NextQuery>, session: Session) -> impl IntoResponse {
    let flashes = take_flashes(&session).await;
    views::auth::login_page(query.next.as_deref(), "", None, &flashes)
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NextQuery>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let next = query.next.as_deref();

    match state
        .auth_service()
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            session.cycle_id().await?;
            session.insert(USER_ID_KEY, user.id).await?;
            session::info(&session, "Logged in.").await?;
            Ok(Redirect::to(&safe_next(next)).into_response())
        }
        Err(AuthError::InvalidCredentials) => Ok((
            StatusCode::UNAUTHORIZED,
            views::auth::login_page(
                next,
                form.username.trim(),
                Some("Invalid username or password."),
                &[],
            ),
        )
            .into_response()),
        Err(AuthError::Locked) => Ok((
            StatusCode::FORBIDDEN,
            views::auth::login_page(
                next,
                form.username.trim(),
                Some("Account locked. Contact an administrator."),
                &[],
            ),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

/// POST /logout
pub async fn logout(session: Session) -> Result<Redirect, WebError> {
    session.flush().await?;
    session::info(&session, "Logged out.").await?;
    Ok(Redirect::to("/login"))
}
