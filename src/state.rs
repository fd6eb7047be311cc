use std::sync::Arc;

use crate::config::Config;
use crate::db::{StockStore, UsersStore};
use crate::services::{
    AuthService, ReportService, SeaOrmAuthService, SeaOrmReportService, SeaOrmStockService,
    SeaOrmUserService, StockService, UserService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub users: UsersStore,

    pub stock: StockStore,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub stock_service: Arc<dyn StockService>,

    pub report_service: Arc<dyn ReportService>,
}

impl SharedState {
    /// Connects both databases, applies their migrations, wires the services
    /// on top and creates the first admin account when needed.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let users = UsersStore::with_pool_options(
            &config.database.users_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let stock = StockStore::with_pool_options(
            &config.database.stock_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let state = Self::from_stores(config, users, stock);
        state
            .user_service
            .bootstrap_admin(&state.config.bootstrap)
            .await?;

        Ok(state)
    }

    #[must_use]
    fn from_stores(config: Config, users: UsersStore, stock: StockStore) -> Self {
        let auth_service = Arc::new(SeaOrmAuthService::new(
            users.clone(),
            config.security.clone(),
        ));
        let user_service = Arc::new(SeaOrmUserService::new(
            users.clone(),
            config.security.clone(),
        ));
        let stock_service = Arc::new(SeaOrmStockService::new(stock.clone()));
        let report_service = Arc::new(SeaOrmReportService::new(stock.clone()));

        Self {
            config: Arc::new(config),
            users,
            stock,
            auth_service,
            user_service,
            stock_service,
            report_service,
        }
    }
}
