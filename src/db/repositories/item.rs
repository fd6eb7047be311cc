use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait, sea_query::Expr,
};

use crate::entities::{items, movements, prelude::*};
use crate::models::time;
use crate::models::{CodeTotal, CodeUserTotal, Item, ItemInput, StockFilter, UserTotal};

/// Filters for the item list page.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Only items created by this user.
    pub owner: Option<i32>,
    /// Case-insensitive substring of FINIS code, full code or description.
    pub search: Option<String>,
    pub limit: u64,
}

/// Repository for stock items
pub struct ItemRepository {
    conn: DatabaseConnection,
}

impl ItemRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub(crate) fn map_model(m: items::Model) -> Result<Item> {
        Ok(Item {
            id: m.id,
            created_at: time::from_db(&m.created_at)?,
            updated_at: time::from_db(&m.updated_at)?,
            finis_code: m.finis_code,
            full_code: m.full_code,
            description: m.description,
            quantity: m.quantity,
            created_by_id: m.created_by_id,
            updated_by_id: m.updated_by_id,
        })
    }

    fn filtered(filter: &StockFilter) -> Select<Items> {
        let mut query = Items::find();

        if let Some(code) = filter.code.as_deref().filter(|c| !c.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(items::Column::FinisCode.contains(code))
                    .add(items::Column::FullCode.contains(code)),
            );
        }

        if let Some(user_id) = filter.user_id {
            query = query.filter(items::Column::CreatedById.eq(user_id));
        }

        query
    }

    pub async fn list(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let mut select = Items::find();

        if let Some(owner) = query.owner {
            select = select.filter(items::Column::CreatedById.eq(owner));
        }

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(items::Column::FinisCode.contains(search))
                    .add(items::Column::FullCode.contains(search))
                    .add(items::Column::Description.contains(search)),
            );
        }

        let rows = select
            .order_by_desc(items::Column::UpdatedAt)
            .order_by_desc(items::Column::Id)
            .limit(query.limit)
            .all(&self.conn)
            .await
            .context("Failed to list items")?;

        rows.into_iter().map(Self::map_model).collect()
    }

    pub async fn get(&self, id: i32) -> Result<Option<Item>> {
        let row = Items::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query item")?;

        row.map(Self::map_model).transpose()
    }

    pub async fn create(&self, input: &ItemInput, actor: i32) -> Result<Item> {
        let now = time::to_db(&time::now());

        let model = items::ActiveModel {
            finis_code: Set(input.finis_code.clone()),
            full_code: Set(input.full_code.clone()),
            description: Set(input.description.clone()),
            quantity: Set(input.quantity),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            created_by_id: Set(actor),
            updated_by_id: Set(Some(actor)),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert item")?;

        Self::map_model(model)
    }

    /// Overwrites the editable fields and stamps the update. The `created_*`
    /// columns are left out of the active model, so they never change.
    pub async fn update(&self, id: i32, input: &ItemInput, actor: i32) -> Result<Option<Item>> {
        let Some(existing) = Items::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query item for update")?
        else {
            return Ok(None);
        };

        let mut active: items::ActiveModel = existing.into();
        active.finis_code = Set(input.finis_code.clone());
        active.full_code = Set(input.full_code.clone());
        active.description = Set(input.description.clone());
        active.quantity = Set(input.quantity);
        active.updated_by_id = Set(Some(actor));
        active.updated_at = Set(time::to_db(&time::now()));

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update item")?;

        Self::map_model(model).map(Some)
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let txn = self.conn.begin().await?;

        Movements::delete_many()
            .filter(movements::Column::ItemId.eq(id))
            .exec(&txn)
            .await
            .context("Failed to delete item movements")?;

        let result = Items::delete_by_id(id)
            .exec(&txn)
            .await
            .context("Failed to delete item")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Aggregations
    // ========================================================================

    pub async fn find_filtered(&self, filter: &StockFilter) -> Result<Vec<Item>> {
        let rows = Self::filtered(filter)
            .order_by_asc(items::Column::CreatedById)
            .order_by_asc(items::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query items for lookup")?;

        rows.into_iter().map(Self::map_model).collect()
    }

    pub async fn totals_by_code(&self, filter: &StockFilter) -> Result<Vec<CodeTotal>> {
        let rows: Vec<(String, i64, Option<i64>)> = Self::filtered(filter)
            .select_only()
            .column(items::Column::FinisCode)
            .column_as(Expr::col(items::Column::Id).count(), "item_count")
            .column_as(Expr::col(items::Column::Quantity).sum(), "quantity")
            .group_by(items::Column::FinisCode)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to aggregate items by code")?;

        Ok(rows
            .into_iter()
            .map(|(finis_code, item_count, quantity)| CodeTotal {
                finis_code,
                item_count,
                quantity: quantity.unwrap_or(0),
            })
            .collect())
    }

    pub async fn totals_by_user(&self, filter: &StockFilter) -> Result<Vec<UserTotal>> {
        let rows: Vec<(i32, i64, Option<i64>)> = Self::filtered(filter)
            .select_only()
            .column(items::Column::CreatedById)
            .column_as(Expr::col(items::Column::Id).count(), "item_count")
            .column_as(Expr::col(items::Column::Quantity).sum(), "quantity")
            .group_by(items::Column::CreatedById)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to aggregate items by user")?;

        Ok(rows
            .into_iter()
            .map(|(user_id, item_count, quantity)| UserTotal {
                user_id,
                item_count,
                quantity: quantity.unwrap_or(0),
            })
            .collect())
    }

    pub async fn totals_by_code_and_user(
        &self,
        filter: &StockFilter,
    ) -> Result<Vec<CodeUserTotal>> {
        let rows: Vec<(String, i32, Option<i64>)> = Self::filtered(filter)
            .select_only()
            .column(items::Column::FinisCode)
            .column(items::Column::CreatedById)
            .column_as(Expr::col(items::Column::Quantity).sum(), "quantity")
            .group_by(items::Column::FinisCode)
            .group_by(items::Column::CreatedById)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to aggregate items by code and user")?;

        Ok(rows
            .into_iter()
            .map(|(finis_code, user_id, quantity)| CodeUserTotal {
                finis_code,
                user_id,
                quantity: quantity.unwrap_or(0),
            })
            .collect())
    }

    /// Sum of quantities for the statistics KPI. The user filter applies to
    /// the last updater, matching the "who touched it last" reading of stock.
    pub async fn current_stock(&self, finis: Option<&str>, updated_by: Option<i32>) -> Result<i64> {
        let mut query = Items::find()
            .select_only()
            .column_as(Expr::col(items::Column::Quantity).sum(), "total");

        if let Some(finis) = finis {
            query = query.filter(items::Column::FinisCode.contains(finis));
        }
        if let Some(user_id) = updated_by {
            query = query.filter(items::Column::UpdatedById.eq(user_id));
        }

        let total: Option<Option<i64>> = query
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to sum current stock")?;

        Ok(total.flatten().unwrap_or(0))
    }
}
