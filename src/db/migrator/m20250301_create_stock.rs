use crate::entities::{items, movements, prelude::*};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn index(name: &str, table: impl IntoTableRef, column: impl IntoIden) -> IndexCreateStatement {
    Index::create()
        .name(name)
        .if_not_exists()
        .table(table)
        .col(column)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Items)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(Movements)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        for statement in [
            index("idx_items_finis_code", Items, items::Column::FinisCode),
            index("idx_items_full_code", Items, items::Column::FullCode),
            index("idx_items_created_by", Items, items::Column::CreatedById),
            index("idx_items_updated_at", Items, items::Column::UpdatedAt),
            index("idx_movements_item_id", Movements, movements::Column::ItemId),
            index("idx_movements_occurred_at", Movements, movements::Column::OccurredAt),
        ] {
            manager.create_index(statement).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Movements).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Items).to_owned())
            .await
    }
}
