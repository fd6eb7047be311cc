//! `SeaORM` implementation of the `ReportService` trait.

use async_trait::async_trait;
use chrono::Days;

use crate::db::StockStore;
use crate::models::time::day_start;
use crate::models::{MovementStats, StatsFilter, StockFilter, StockLookup};
use crate::services::report_service::ReportService;
use crate::services::stock_service::StockError;

pub struct SeaOrmReportService {
    store: StockStore,
}

impl SeaOrmReportService {
    #[must_use]
    pub const fn new(store: StockStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReportService for SeaOrmReportService {
    async fn stock_lookup(&self, filter: &StockFilter) -> Result<StockLookup, StockError> {
        let rows = self.store.find_items(filter).await?;
        let by_code = self.store.totals_by_code(filter).await?;
        let by_user = self.store.totals_by_user(filter).await?;
        let by_code_user = self.store.totals_by_code_and_user(filter).await?;

        let total_quantity = rows.iter().map(|i| i64::from(i.quantity)).sum();

        Ok(StockLookup {
            rows,
            total_quantity,
            by_code,
            by_user,
            by_code_user,
        }
        .sorted())
    }

    async fn movement_stats(&self, filter: StatsFilter) -> Result<MovementStats, StockError> {
        let finis = filter.finis.as_deref();
        let from = day_start(filter.start);
        let to = day_start(filter.end.checked_add_days(Days::new(1)).unwrap_or(filter.end));

        let opening = self.store.net_before(from, finis, filter.user_id).await?;

        let movements = if to > from {
            self.store
                .movements_in_range(from, to, finis, filter.user_id)
                .await?
        } else {
            Vec::new()
        };

        let current_stock = self.store.current_stock(finis, filter.user_id).await?;

        Ok(MovementStats::build(filter, opening, movements, current_stock))
    }
}
