use axum::{
    Router, middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, ExpiredDeletion, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::Config;
use crate::services::{AuthService, ReportService, StockService, UserService};
use crate::state::SharedState;

mod assets;
pub mod auth;
mod error;
pub mod forms;
mod items;
mod movements;
mod observability;
mod reports;
pub mod session;
mod system;
mod users;
pub mod views;

pub use error::WebError;

const SESSION_TABLE: &str = "sessions";

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub session_key: Key,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn stock_service(&self) -> &Arc<dyn StockService> {
        &self.shared.stock_service
    }

    #[must_use]
    pub fn report_service(&self) -> &Arc<dyn ReportService> {
        &self.shared.report_service
    }
}

/// Derives the cookie signing key from `SECRET_KEY`, or generates a random
/// one. A random key logs everybody out on restart.
pub fn session_key(secret: Option<&str>) -> anyhow::Result<Key> {
    let mut bytes = [0u8; 64];

    match secret {
        Some(secret) => {
            argon2::Argon2::default()
                .hash_password_into(secret.as_bytes(), b"stockroom-session-key", &mut bytes)
                .map_err(|e| anyhow::anyhow!("Failed to derive session key: {e}"))?;
        }
        None => {
            tracing::warn!(
                "SECRET_KEY is not set, using a random session key. Sessions will not survive a restart."
            );
            rand::RngCore::fill_bytes(&mut rand::rng(), &mut bytes);
        }
    }

    Key::try_from(&bytes[..]).map_err(|e| anyhow::anyhow!("Invalid session key: {e}"))
}

pub async fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let session_key = session_key(shared.config.server.secret_key.as_deref())?;

    Ok(Arc::new(AppState {
        shared,
        session_key,
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared, prometheus_handle).await
}

/// Session storage in the users database. Expired rows are purged here, once
/// per start.
async fn session_store(state: &AppState) -> anyhow::Result<SqliteStore> {
    let pool = state.shared.users.conn.get_sqlite_connection_pool().clone();
    let store = SqliteStore::new(pool)
        .with_table_name(SESSION_TABLE)
        .map_err(|e| anyhow::anyhow!("Invalid session table name: {e}"))?;

    store.migrate().await?;
    store
        .delete_expired()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to purge expired sessions: {e}"))?;

    Ok(store)
}

pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let (secure_cookies, inactivity_minutes) = {
        let config = state.config();
        (
            config.server.secure_cookies,
            config.server.session_inactivity_minutes,
        )
    };

    let session_layer = SessionManagerLayer::new(session_store(&state).await?)
        .with_name("stockroom_session")
        .with_secure(secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(inactivity_minutes)))
        .with_signed(state.session_key.clone());

    let protected_routes = create_protected_router(state.clone());

    let app = Router::new()
        .merge(protected_routes)
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/healthz", get(system::healthz))
        .route("/static/{*path}", get(assets::serve_asset))
        .layer(session_layer)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_routes = Router::new()
        .route("/admin/users", get(users::list_users).post(users::create_user))
        .route("/admin/users/new", get(users::new_user))
        .route("/admin/users/{id}", post(users::update_user))
        .route("/admin/users/{id}/edit", get(users::edit_user))
        .route("/admin/users/{id}/lock", post(users::lock_user))
        .route("/admin/users/{id}/unlock", post(users::unlock_user))
        .route("/admin/users/{id}/delete", post(users::delete_user))
        .route("/admin/stock", get(reports::stock_lookup))
        .route("/admin/stats", get(reports::stats))
        .route("/admin/stats.json", get(reports::stats_json))
        .route("/admin/metrics", get(system::metrics))
        .route_layer(middleware::from_fn(auth::require_admin));

    Router::new()
        .route("/", get(items::list_items))
        .route("/items", post(items::create_item))
        .route("/items/new", get(items::new_item))
        .route("/items/{id}", post(items::update_item))
        .route("/items/{id}/edit", get(items::edit_item))
        .route("/items/{id}/delete", post(items::delete_item))
        .route(
            "/items/{id}/movements",
            post(movements::create_movement),
        )
        .route("/items/{id}/movements/new", get(movements::new_movement))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth::require_login))
}
