//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::UsersStore;
use crate::models::{SessionUser, User};
use crate::services::auth_service::{AuthError, AuthService};

pub struct SeaOrmAuthService {
    store: UsersStore,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: UsersStore, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self
            .store
            .verify_credentials(username, password, &self.security)
            .await?
        else {
            warn!(username = %username, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        };

        if user.locked {
            warn!(user_id = user.id, "Login refused for locked account");
            return Err(AuthError::Locked);
        }

        info!(user_id = user.id, "User logged in");
        Ok(user)
    }

    async fn session_user(&self, user_id: i32) -> Result<Option<SessionUser>, AuthError> {
        let user = self.store.get_user(user_id).await?;
        Ok(user.filter(|u| !u.locked).map(SessionUser::from))
    }
}
