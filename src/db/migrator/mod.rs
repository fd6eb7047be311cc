use sea_orm_migration::prelude::*;

mod m20250301_create_stock;
mod m20250301_create_users;

/// Schema of the users database.
pub struct UsersMigrator;

#[async_trait::async_trait]
impl MigratorTrait for UsersMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_create_users::Migration)]
    }
}

/// Schema of the stock database.
pub struct StockMigrator;

#[async_trait::async_trait]
impl MigratorTrait for StockMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250301_create_stock::Migration)]
    }
}
