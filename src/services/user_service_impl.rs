//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::config::{BootstrapConfig, SecurityConfig};
use crate::db::{UsersStore, is_unique_violation};
use crate::models::{Role, User};
use crate::services::user_service::{
    MAX_USERNAME_LEN, NewUser, UserError, UserService, UserUpdate,
};

const DEV_ADMIN_USER: &str = "admin";
const DEV_ADMIN_PASS: &str = "admin";

pub struct SeaOrmUserService {
    store: UsersStore,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: UsersStore, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    fn validate_username(username: &str) -> Result<String, UserError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(UserError::Validation("Username is required".to_string()));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(UserError::Validation(format!(
                "Username must be at most {MAX_USERNAME_LEN} characters"
            )));
        }
        Ok(username.to_string())
    }

    fn validate_password(&self, password: &str) -> Result<(), UserError> {
        if password.chars().count() < self.security.min_password_length {
            return Err(UserError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        Ok(())
    }

    /// Fails when `username` belongs to an account other than `except`.
    async fn ensure_username_free(
        &self,
        username: &str,
        except: Option<i32>,
    ) -> Result<(), UserError> {
        match self.store.get_user_by_username(username).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(UserError::UsernameTaken(username.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn map_write_error(err: anyhow::Error, username: &str) -> UserError {
        if is_unique_violation(&err) {
            UserError::UsernameTaken(username.to_string())
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list(&self) -> Result<Vec<User>, UserError> {
        Ok(self.store.list_users().await?)
    }

    async fn get(&self, id: i32) -> Result<User, UserError> {
        self.store.get_user(id).await?.ok_or(UserError::NotFound)
    }

    async fn get_by_username(&self, username: &str) -> Result<User, UserError> {
        self.store
            .get_user_by_username(username.trim())
            .await?
            .ok_or(UserError::NotFound)
    }

    async fn username_map(&self) -> Result<HashMap<i32, String>, UserError> {
        Ok(self.store.username_map().await?)
    }

    async fn create(&self, input: NewUser) -> Result<User, UserError> {
        let username = Self::validate_username(&input.username)?;
        self.validate_password(&input.password)?;
        self.ensure_username_free(&username, None).await?;

        let user = self
            .store
            .create_user(&username, &input.password, input.role, &self.security)
            .await
            .map_err(|e| Self::map_write_error(e, &username))?;

        info!(user_id = user.id, role = %user.role, "User created");
        Ok(user)
    }

    async fn update(&self, id: i32, input: UserUpdate) -> Result<User, UserError> {
        let username = Self::validate_username(&input.username)?;
        let password = input.password.filter(|p| !p.is_empty());
        if let Some(password) = &password {
            self.validate_password(password)?;
        }
        self.ensure_username_free(&username, Some(id)).await?;

        let user = self
            .store
            .update_user(id, &username, input.role, password.as_deref(), &self.security)
            .await
            .map_err(|e| Self::map_write_error(e, &username))?
            .ok_or(UserError::NotFound)?;

        info!(user_id = user.id, password_changed = password.is_some(), "User updated");
        Ok(user)
    }

    async fn set_password(&self, id: i32, password: &str) -> Result<(), UserError> {
        self.validate_password(password)?;

        if self.store.set_password(id, password, &self.security).await? {
            info!(user_id = id, "Password changed");
            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }

    async fn set_locked(
        &self,
        actor: Option<i32>,
        id: i32,
        locked: bool,
    ) -> Result<User, UserError> {
        if locked && actor == Some(id) {
            return Err(UserError::SelfAction("lock"));
        }

        if !self.store.set_locked(id, locked).await? {
            return Err(UserError::NotFound);
        }

        info!(user_id = id, locked, actor = ?actor, "Lock state changed");
        self.get(id).await
    }

    async fn delete(&self, actor: Option<i32>, id: i32) -> Result<(), UserError> {
        if actor == Some(id) {
            return Err(UserError::SelfAction("delete"));
        }

        if self.store.delete_user(id).await? {
            info!(user_id = id, actor = ?actor, "User deleted");
            Ok(())
        } else {
            Err(UserError::NotFound)
        }
    }

    async fn bootstrap_admin(
        &self,
        bootstrap: &BootstrapConfig,
    ) -> Result<Option<User>, UserError> {
        if self.store.count_users().await? > 0 {
            return Ok(None);
        }

        let (username, password) = match (&bootstrap.admin_user, &bootstrap.admin_pass) {
            (Some(user), Some(pass)) => (Self::validate_username(user)?, pass.clone()),
            _ if bootstrap.create_default_admin => {
                warn!(
                    "No ADMIN_USER/ADMIN_PASS set, creating development account '{}' with the default password. Change it before exposing the app.",
                    DEV_ADMIN_USER
                );
                (DEV_ADMIN_USER.to_string(), DEV_ADMIN_PASS.to_string())
            }
            _ => {
                warn!("Users table is empty and no bootstrap admin is configured");
                return Ok(None);
            }
        };

        let user = self
            .store
            .create_user(&username, &password, Role::Admin, &self.security)
            .await
            .map_err(|e| Self::map_write_error(e, &username))?;

        info!(user_id = user.id, username = %user.username, "Bootstrap admin created");
        Ok(Some(user))
    }
}
