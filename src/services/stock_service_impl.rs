//! `SeaORM` implementation of the `StockService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{ItemQuery, StockStore};
use crate::models::{Item, ItemInput, Movement, MovementInput, SessionUser};
use crate::services::stock_service::{
    ITEM_HISTORY_LIMIT, ITEM_LIST_LIMIT, StockError, StockService,
};

pub struct SeaOrmStockService {
    store: StockStore,
}

impl SeaOrmStockService {
    #[must_use]
    pub const fn new(store: StockStore) -> Self {
        Self { store }
    }

    async fn editable_item(&self, user: &SessionUser, id: i32) -> Result<Item, StockError> {
        let item = self.store.get_item(id).await?.ok_or(StockError::NotFound)?;
        if item.editable_by(user) {
            Ok(item)
        } else {
            Err(StockError::Forbidden)
        }
    }
}

#[async_trait]
impl StockService for SeaOrmStockService {
    async fn list_items(
        &self,
        user: &SessionUser,
        search: Option<&str>,
    ) -> Result<Vec<Item>, StockError> {
        let query = ItemQuery {
            owner: (!user.is_admin()).then_some(user.id),
            search: search.map(str::trim).filter(|s| !s.is_empty()).map(ToString::to_string),
            limit: ITEM_LIST_LIMIT,
        };

        Ok(self.store.list_items(&query).await?)
    }

    async fn get_item(&self, user: &SessionUser, id: i32) -> Result<Item, StockError> {
        self.editable_item(user, id).await
    }

    async fn create_item(&self, user: &SessionUser, input: &ItemInput) -> Result<Item, StockError> {
        let item = self.store.create_item(input, user.id).await?;
        info!(item_id = item.id, finis_code = %item.finis_code, "Item created");
        Ok(item)
    }

    async fn update_item(
        &self,
        user: &SessionUser,
        id: i32,
        input: &ItemInput,
    ) -> Result<Item, StockError> {
        self.editable_item(user, id).await?;

        let item = self
            .store
            .update_item(id, input, user.id)
            .await?
            .ok_or(StockError::NotFound)?;

        info!(item_id = item.id, "Item updated");
        Ok(item)
    }

    async fn delete_item(&self, user: &SessionUser, id: i32) -> Result<(), StockError> {
        self.editable_item(user, id).await?;

        if self.store.delete_item(id).await? {
            info!(item_id = id, "Item deleted");
            Ok(())
        } else {
            Err(StockError::NotFound)
        }
    }

    async fn record_movement(
        &self,
        user: &SessionUser,
        id: i32,
        input: &MovementInput,
    ) -> Result<Item, StockError> {
        self.editable_item(user, id).await?;

        let (movement, item) = self
            .store
            .record_movement(id, input, user.id)
            .await?
            .ok_or(StockError::NotFound)?;

        info!(
            item_id = id,
            movement_id = movement.id,
            direction = %movement.direction,
            qty = movement.qty,
            quantity = item.quantity,
            "Movement recorded"
        );
        Ok(item)
    }

    async fn item_movements(
        &self,
        user: &SessionUser,
        id: i32,
    ) -> Result<Vec<Movement>, StockError> {
        self.editable_item(user, id).await?;
        Ok(self.store.item_movements(id, ITEM_HISTORY_LIMIT).await?)
    }
}
