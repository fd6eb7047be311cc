//! Domain service for account management.

use std::collections::HashMap;
use thiserror::Error;

use crate::config::BootstrapConfig;
use crate::models::{Role, User};

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 80;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("You cannot {0} your own account")]
    SelfAction(&'static str),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub username: String,
    pub role: Role,
    /// `None` keeps the current password.
    pub password: Option<String>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// All accounts ordered by id.
    async fn list(&self) -> Result<Vec<User>, UserError>;

    async fn get(&self, id: i32) -> Result<User, UserError>;

    async fn get_by_username(&self, username: &str) -> Result<User, UserError>;

    /// Id to username, for rendering audit columns.
    async fn username_map(&self) -> Result<HashMap<i32, String>, UserError>;

    /// # Errors
    ///
    /// Returns [`UserError::UsernameTaken`] without writing anything when the
    /// name is in use.
    async fn create(&self, input: NewUser) -> Result<User, UserError>;

    async fn update(&self, id: i32, input: UserUpdate) -> Result<User, UserError>;

    async fn set_password(&self, id: i32, password: &str) -> Result<(), UserError>;

    /// `actor` is the admin performing the change, `None` for the CLI.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::SelfAction`] when an admin tries to lock themselves.
    async fn set_locked(
        &self,
        actor: Option<i32>,
        id: i32,
        locked: bool,
    ) -> Result<User, UserError>;

    async fn delete(&self, actor: Option<i32>, id: i32) -> Result<(), UserError>;

    /// Creates the first admin when the users table is empty. Returns the
    /// created account, or `None` when accounts already exist.
    async fn bootstrap_admin(&self, bootstrap: &BootstrapConfig) -> Result<Option<User>, UserError>;
}
