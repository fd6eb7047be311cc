use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::models::{
    CodeTotal, CodeUserTotal, Item, ItemInput, Movement, MovementInput, MovementRow, Role,
    StockFilter, User, UserTotal,
};

pub mod migrator;
pub mod repositories;

pub use repositories::ItemQuery;
pub use repositories::user::is_unique_violation;

/// Opens a pooled SQLite connection, creating the database file (and its
/// parent directory) when it does not exist yet.
async fn connect(
    db_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection> {
    let path_str = db_url.trim_start_matches("sqlite:");
    if !path_str.starts_with(":memory:") {
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        if let Some(parent) = Path::new(path_str).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        if !Path::new(path_str).exists() {
            std::fs::File::create(path_str)
                .with_context(|| format!("Failed to create database file {path_str}"))?;
        }
    }

    let mut opt = ConnectOptions::new(db_url.to_string());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(600))
        .sqlx_logging(false);

    Database::connect(opt)
        .await
        .with_context(|| format!("Failed to connect to {db_url}"))
}

async fn ping(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    conn.query_one(Statement::from_string(backend, "SELECT 1".to_string()))
        .await?;
    Ok(())
}

/// Accounts database. The session table lives here too.
#[derive(Clone)]
pub struct UsersStore {
    pub conn: DatabaseConnection,
}

impl UsersStore {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        let conn = connect(db_url, max_connections, min_connections).await?;

        migrator::UsersMigrator::up(&conn, None).await?;

        info!(
            "Users database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        ping(&self.conn).await
    }

    fn user_repo(&self) -> repositories::UserRepository {
        repositories::UserRepository::new(self.conn.clone())
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn username_map(&self) -> Result<HashMap<i32, String>> {
        self.user_repo().username_map().await
    }

    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo()
            .verify_credentials(username, password, security)
            .await
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
        security: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(username, password, role, security)
            .await
    }

    pub async fn update_user(
        &self,
        id: i32,
        username: &str,
        role: Role,
        password: Option<&str>,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo()
            .update(id, username, role, password, security)
            .await
    }

    pub async fn set_password(
        &self,
        id: i32,
        password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        self.user_repo().set_password(id, password, security).await
    }

    pub async fn set_locked(&self, id: i32, locked: bool) -> Result<bool> {
        self.user_repo().set_locked(id, locked).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }
}

/// Items and movements database.
#[derive(Clone)]
pub struct StockStore {
    pub conn: DatabaseConnection,
}

impl StockStore {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        let conn = connect(db_url, max_connections, min_connections).await?;

        migrator::StockMigrator::up(&conn, None).await?;

        info!(
            "Stock database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        ping(&self.conn).await
    }

    fn item_repo(&self) -> repositories::ItemRepository {
        repositories::ItemRepository::new(self.conn.clone())
    }

    fn movement_repo(&self) -> repositories::MovementRepository {
        repositories::MovementRepository::new(self.conn.clone())
    }

    pub async fn list_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        self.item_repo().list(query).await
    }

    pub async fn get_item(&self, id: i32) -> Result<Option<Item>> {
        self.item_repo().get(id).await
    }

    pub async fn create_item(&self, input: &ItemInput, actor: i32) -> Result<Item> {
        self.item_repo().create(input, actor).await
    }

    pub async fn update_item(
        &self,
        id: i32,
        input: &ItemInput,
        actor: i32,
    ) -> Result<Option<Item>> {
        self.item_repo().update(id, input, actor).await
    }

    pub async fn delete_item(&self, id: i32) -> Result<bool> {
        self.item_repo().delete(id).await
    }

    pub async fn find_items(&self, filter: &StockFilter) -> Result<Vec<Item>> {
        self.item_repo().find_filtered(filter).await
    }

    pub async fn totals_by_code(&self, filter: &StockFilter) -> Result<Vec<CodeTotal>> {
        self.item_repo().totals_by_code(filter).await
    }

    pub async fn totals_by_user(&self, filter: &StockFilter) -> Result<Vec<UserTotal>> {
        self.item_repo().totals_by_user(filter).await
    }

    pub async fn totals_by_code_and_user(
        &self,
        filter: &StockFilter,
    ) -> Result<Vec<CodeUserTotal>> {
        self.item_repo().totals_by_code_and_user(filter).await
    }

    pub async fn current_stock(&self, finis: Option<&str>, updated_by: Option<i32>) -> Result<i64> {
        self.item_repo().current_stock(finis, updated_by).await
    }

    pub async fn record_movement(
        &self,
        item_id: i32,
        input: &MovementInput,
        actor: i32,
    ) -> Result<Option<(Movement, Item)>> {
        self.movement_repo().record(item_id, input, actor).await
    }

    pub async fn item_movements(&self, item_id: i32, limit: u64) -> Result<Vec<Movement>> {
        self.movement_repo().list_for_item(item_id, limit).await
    }

    pub async fn movements_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        finis: Option<&str>,
        user_id: Option<i32>,
    ) -> Result<Vec<MovementRow>> {
        self.movement_repo().in_range(from, to, finis, user_id).await
    }

    pub async fn net_before(
        &self,
        before: DateTime<Utc>,
        finis: Option<&str>,
        user_id: Option<i32>,
    ) -> Result<i64> {
        self.movement_repo().net_before(before, finis, user_id).await
    }
}
