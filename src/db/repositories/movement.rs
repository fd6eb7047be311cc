use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Select, Set, TransactionTrait,
    sea_query::{Expr, SimpleExpr},
};

use super::item::ItemRepository;
use crate::entities::{items, movements, prelude::*};
use crate::models::time;
use crate::models::{Direction, Item, Movement, MovementInput, MovementRow};

/// Repository for stock movements
pub struct MovementRepository {
    conn: DatabaseConnection,
}

impl MovementRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: movements::Model) -> Result<Movement> {
        Ok(Movement {
            id: m.id,
            item_id: m.item_id,
            direction: m.direction.parse().map_err(anyhow::Error::msg)?,
            qty: m.qty,
            occurred_at: time::from_db(&m.occurred_at)?,
            note: m.note,
            user_id: m.user_id,
        })
    }

    fn with_item_filters(
        query: Select<Movements>,
        finis: Option<&str>,
        user_id: Option<i32>,
    ) -> Select<Movements> {
        let mut query = query;
        if let Some(finis) = finis {
            query = query.filter(items::Column::FinisCode.contains(finis));
        }
        if let Some(user_id) = user_id {
            query = query.filter(movements::Column::UserId.eq(user_id));
        }
        query
    }

    /// New quantity computed in SQL from the stored one, so concurrent
    /// movements never overwrite each other. OUT stops at zero.
    fn quantity_expr(direction: Direction, qty: i32) -> SimpleExpr {
        match direction {
            Direction::In => Expr::col(items::Column::Quantity).add(qty),
            Direction::Out => Expr::case(
                Expr::col(items::Column::Quantity).gt(qty),
                Expr::col(items::Column::Quantity).sub(qty),
            )
            .finally(0)
            .into(),
        }
    }

    /// Applies the movement to the item quantity and inserts it, in one
    /// transaction. Returns `None` when the item does not exist.
    ///
    /// The item update must stay the first statement: it takes the SQLite
    /// write lock, which waits on the busy timeout.
    pub async fn record(
        &self,
        item_id: i32,
        input: &MovementInput,
        actor: i32,
    ) -> Result<Option<(Movement, Item)>> {
        let txn = self.conn.begin().await?;

        let updated = Items::update_many()
            .col_expr(
                items::Column::Quantity,
                Self::quantity_expr(input.direction, input.qty),
            )
            .col_expr(items::Column::UpdatedById, Expr::value(actor))
            .col_expr(
                items::Column::UpdatedAt,
                Expr::value(time::to_db(&time::now())),
            )
            .filter(items::Column::Id.eq(item_id))
            .exec(&txn)
            .await
            .context("Failed to apply movement to item")?;

        if updated.rows_affected == 0 {
            return Ok(None);
        }

        let movement = movements::ActiveModel {
            item_id: Set(item_id),
            direction: Set(input.direction.as_str().to_string()),
            qty: Set(input.qty),
            occurred_at: Set(time::to_db(&input.occurred_at)),
            note: Set(input.note.clone()),
            user_id: Set(actor),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert movement")?;

        let item = Items::find_by_id(item_id)
            .one(&txn)
            .await
            .context("Failed to reload item after movement")?
            .context("Item vanished during movement")?;

        txn.commit().await?;

        Ok(Some((
            Self::map_model(movement)?,
            ItemRepository::map_model(item)?,
        )))
    }

    pub async fn list_for_item(&self, item_id: i32, limit: u64) -> Result<Vec<Movement>> {
        let rows = Movements::find()
            .filter(movements::Column::ItemId.eq(item_id))
            .order_by_desc(movements::Column::OccurredAt)
            .order_by_desc(movements::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list item movements")?;

        rows.into_iter().map(Self::map_model).collect()
    }

    /// Movements in `[from, to)` joined with their item codes, oldest first.
    pub async fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        finis: Option<&str>,
        user_id: Option<i32>,
    ) -> Result<Vec<MovementRow>> {
        let query = Movements::find()
            .filter(movements::Column::OccurredAt.gte(time::to_db(&from)))
            .filter(movements::Column::OccurredAt.lt(time::to_db(&to)));

        let rows = Self::with_item_filters(query, finis, user_id)
            .find_also_related(Items)
            .order_by_asc(movements::Column::OccurredAt)
            .order_by_asc(movements::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query movements in range")?;

        rows.into_iter()
            .filter_map(|(m, item)| item.map(|item| (m, item)))
            .map(|(m, item)| {
                Ok(MovementRow {
                    occurred_at: time::from_db(&m.occurred_at)?,
                    direction: m.direction.parse().map_err(anyhow::Error::msg)?,
                    qty: m.qty,
                    note: m.note,
                    user_id: m.user_id,
                    finis_code: item.finis_code,
                    full_code: item.full_code,
                })
            })
            .collect()
    }

    /// Net quantity (IN minus OUT) of all matching movements before `before`.
    pub async fn net_before(
        &self,
        before: DateTime<Utc>,
        finis: Option<&str>,
        user_id: Option<i32>,
    ) -> Result<i64> {
        let query = Movements::find()
            .join(JoinType::InnerJoin, movements::Relation::Item.def())
            .filter(movements::Column::OccurredAt.lt(time::to_db(&before)));

        let rows: Vec<(String, Option<i64>)> = Self::with_item_filters(query, finis, user_id)
            .select_only()
            .column(movements::Column::Direction)
            .column_as(Expr::col((Movements, movements::Column::Qty)).sum(), "qty")
            .group_by(movements::Column::Direction)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to sum movements before window")?;

        rows.into_iter().try_fold(0_i64, |acc, (direction, qty)| {
            let direction: Direction = direction.parse().map_err(anyhow::Error::msg)?;
            Ok(acc + direction.signed(qty.unwrap_or(0)))
        })
    }
}
