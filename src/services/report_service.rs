//! Admin reports over the stock store.

use crate::models::{MovementStats, StatsFilter, StockFilter, StockLookup};
use crate::services::stock_service::StockError;

#[async_trait::async_trait]
pub trait ReportService: Send + Sync {
    /// Matching items plus their totals grouped by code, by creator and by
    /// both.
    async fn stock_lookup(&self, filter: &StockFilter) -> Result<StockLookup, StockError>;

    /// Daily IN/OUT totals and the running stock level over the window.
    async fn movement_stats(&self, filter: StatsFilter) -> Result<MovementStats, StockError>;
}
