//! Domain service for authentication.
//!
//! Verifies credentials at login and re-checks the account on every request,
//! so that locking or deleting a user ends their existing sessions.

use thiserror::Error;

use crate::models::{SessionUser, User};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked")]
    Locked,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies a username/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the user does not exist
    /// or the password is wrong, and [`AuthError::Locked`] when the password
    /// is right but the account is locked.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError>;

    /// Resolves the user behind a session. `None` means the session must be
    /// dropped: the account was deleted or locked since login.
    async fn session_user(&self, user_id: i32) -> Result<Option<SessionUser>, AuthError>;
}
