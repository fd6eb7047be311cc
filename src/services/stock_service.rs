//! Domain service for stock items and their movements.
//!
//! Every call takes the acting [`SessionUser`]: regular users only see and
//! modify the items they created, admins see everything.

use thiserror::Error;

use crate::models::{Item, ItemInput, Movement, MovementInput, SessionUser};

/// Rows shown on the item list page.
pub const ITEM_LIST_LIMIT: u64 = 500;

/// Movements shown on an item's movement page.
pub const ITEM_HISTORY_LIMIT: u64 = 20;

#[derive(Debug, Error)]
pub enum StockError {
    #[error("Item not found")]
    NotFound,

    #[error("You can only change items you created")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for StockError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

#[async_trait::async_trait]
pub trait StockService: Send + Sync {
    /// Items visible to `user`, most recently updated first.
    async fn list_items(
        &self,
        user: &SessionUser,
        search: Option<&str>,
    ) -> Result<Vec<Item>, StockError>;

    /// # Errors
    ///
    /// [`StockError::NotFound`] for a missing item, [`StockError::Forbidden`]
    /// when `user` is neither the creator nor an admin.
    async fn get_item(&self, user: &SessionUser, id: i32) -> Result<Item, StockError>;

    async fn create_item(&self, user: &SessionUser, input: &ItemInput) -> Result<Item, StockError>;

    async fn update_item(
        &self,
        user: &SessionUser,
        id: i32,
        input: &ItemInput,
    ) -> Result<Item, StockError>;

    async fn delete_item(&self, user: &SessionUser, id: i32) -> Result<(), StockError>;

    /// Applies an IN/OUT movement and returns the updated item.
    async fn record_movement(
        &self,
        user: &SessionUser,
        id: i32,
        input: &MovementInput,
    ) -> Result<Item, StockError>;

    async fn item_movements(
        &self,
        user: &SessionUser,
        id: i32,
    ) -> Result<Vec<Movement>, StockError>;
}
