//! Aggregated views over the stock store used by the admin reports.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{Direction, Item};

/// Default statistics window, inclusive of today.
pub const DEFAULT_STATS_DAYS: u64 = 30;

/// Longest window the statistics page will compute.
pub const MAX_STATS_DAYS: u64 = 731;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockFilter {
    /// Substring of the FINIS or full code.
    pub code: Option<String>,
    /// Creator of the item.
    pub user_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeTotal {
    pub finis_code: String,
    pub item_count: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTotal {
    pub user_id: i32,
    pub item_count: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeUserTotal {
    pub finis_code: String,
    pub user_id: i32,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockLookup {
    pub rows: Vec<Item>,
    pub total_quantity: i64,
    pub by_code: Vec<CodeTotal>,
    pub by_user: Vec<UserTotal>,
    pub by_code_user: Vec<CodeUserTotal>,
}

impl StockLookup {
    /// Orders the groups for display: codes by quantity (largest first),
    /// users by id, code/user pairs by code then user.
    #[must_use]
    pub fn sorted(mut self) -> Self {
        self.by_code
            .sort_by(|a, b| {
                b.quantity
                    .cmp(&a.quantity)
                    .then_with(|| a.finis_code.cmp(&b.finis_code))
            });
        self.by_user.sort_by_key(|u| u.user_id);
        self.by_code_user
            .sort_by(|a, b| a.finis_code.cmp(&b.finis_code).then(a.user_id.cmp(&b.user_id)));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsFilter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub finis: Option<String>,
    pub user_id: Option<i32>,
}

impl StatsFilter {
    /// Builds the window from raw query values. Unparsable dates fall back to
    /// the last [`DEFAULT_STATS_DAYS`] days; over-long windows keep `end` and
    /// move `start` forward.
    #[must_use]
    pub fn from_query(
        start: Option<&str>,
        end: Option<&str>,
        finis: Option<String>,
        user_id: Option<i32>,
        today: NaiveDate,
    ) -> Self {
        let parse = |raw: Option<&str>| {
            raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        };

        let default_start = today
            .checked_sub_days(Days::new(DEFAULT_STATS_DAYS - 1))
            .unwrap_or(today);

        let end = parse(end).unwrap_or(today);
        let mut start = parse(start).unwrap_or(default_start);

        if let Some(earliest) = end.checked_sub_days(Days::new(MAX_STATS_DAYS - 1))
            && start < earliest
        {
            start = earliest;
        }

        Self {
            start,
            end,
            finis: finis.filter(|f| !f.trim().is_empty()).map(|f| f.trim().to_string()),
            user_id,
        }
    }

    /// Every day of the window, in order. Empty when `end < start`.
    #[must_use]
    pub fn days(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take_while(|d| *d <= self.end).collect()
    }
}

/// One movement joined with its item's codes.
#[derive(Debug, Clone, Serialize)]
pub struct MovementRow {
    pub occurred_at: DateTime<Utc>,
    pub direction: Direction,
    pub qty: i32,
    pub note: Option<String>,
    pub user_id: i32,
    pub finis_code: String,
    pub full_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    pub day: NaiveDate,
    pub qty_in: i64,
    pub qty_out: i64,
    /// Stock level at the end of the day.
    pub stock: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementStats {
    pub filter: StatsFilter,
    pub opening: i64,
    pub total_in: i64,
    pub total_out: i64,
    pub net: i64,
    pub current_stock: i64,
    pub days: Vec<DailyPoint>,
    pub movements: Vec<MovementRow>,
}

impl MovementStats {
    /// Folds the movements of the window into per-day totals. `opening` is the
    /// net of all matching movements before the window.
    #[must_use]
    pub fn build(
        filter: StatsFilter,
        opening: i64,
        movements: Vec<MovementRow>,
        current_stock: i64,
    ) -> Self {
        let mut per_day: BTreeMap<NaiveDate, (i64, i64)> =
            filter.days().into_iter().map(|d| (d, (0, 0))).collect();

        let mut total_in = 0;
        let mut total_out = 0;

        for m in &movements {
            let Some(slot) = per_day.get_mut(&m.occurred_at.date_naive()) else {
                continue;
            };
            let qty = i64::from(m.qty);
            match m.direction {
                Direction::In => {
                    slot.0 += qty;
                    total_in += qty;
                }
                Direction::Out => {
                    slot.1 += qty;
                    total_out += qty;
                }
            }
        }

        let mut running = opening;
        let days = per_day
            .into_iter()
            .map(|(day, (qty_in, qty_out))| {
                running += qty_in - qty_out;
                DailyPoint {
                    day,
                    qty_in,
                    qty_out,
                    stock: running,
                }
            })
            .collect();

        Self {
            filter,
            opening,
            total_in,
            total_out,
            net: total_in - total_out,
            current_stock,
            days,
            movements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn movement(direction: Direction, qty: i32, y: i32, m: u32, d: u32) -> MovementRow {
        MovementRow {
            occurred_at: Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
            direction,
            qty,
            note: None,
            user_id: 1,
            finis_code: "F1".to_string(),
            full_code: "F1-A".to_string(),
        }
    }

    #[test]
    fn test_filter_defaults_to_last_thirty_days() {
        let today = day(2024, 3, 31);
        let filter = StatsFilter::from_query(None, Some("garbage"), None, None, today);
        assert_eq!(filter.start, day(2024, 3, 2));
        assert_eq!(filter.end, today);
        assert_eq!(filter.days().len(), 30);
    }

    #[test]
    fn test_filter_clamps_long_windows() {
        let today = day(2024, 3, 31);
        let filter =
            StatsFilter::from_query(Some("1990-01-01"), Some("2024-03-31"), None, None, today);
        assert_eq!(filter.days().len() as u64, MAX_STATS_DAYS);
        assert_eq!(filter.end, today);
    }

    #[test]
    fn test_filter_inverted_window_is_empty() {
        let today = day(2024, 3, 31);
        let filter = StatsFilter::from_query(
            Some("2024-03-10"),
            Some("2024-03-01"),
            Some("  ".into()),
            None,
            today,
        );
        assert!(filter.days().is_empty());
        assert_eq!(filter.finis, None);
    }

    #[test]
    fn test_stock_series_accumulates_from_opening() {
        let filter = StatsFilter::from_query(
            Some("2024-01-01"),
            Some("2024-01-03"),
            None,
            None,
            day(2024, 1, 3),
        );
        let rows = vec![
            movement(Direction::In, 5, 2024, 1, 1),
            movement(Direction::Out, 2, 2024, 1, 1),
            movement(Direction::In, 4, 2024, 1, 3),
        ];

        let stats = MovementStats::build(filter, 10, rows, 17);

        assert_eq!(stats.total_in, 9);
        assert_eq!(stats.total_out, 2);
        assert_eq!(stats.net, 7);
        let stock: Vec<i64> = stats.days.iter().map(|d| d.stock).collect();
        assert_eq!(stock, vec![13, 13, 17]);
        assert_eq!(stats.days[0].qty_in, 5);
        assert_eq!(stats.days[0].qty_out, 2);
        assert_eq!(stats.movements.len(), 3);
    }

    #[test]
    fn test_lookup_sorting() {
        let lookup = StockLookup {
            rows: vec![],
            total_quantity: 0,
            by_code: vec![
                CodeTotal { finis_code: "B".into(), item_count: 1, quantity: 5 },
                CodeTotal { finis_code: "A".into(), item_count: 2, quantity: 5 },
                CodeTotal { finis_code: "C".into(), item_count: 1, quantity: 9 },
            ],
            by_user: vec![
                UserTotal { user_id: 3, item_count: 1, quantity: 1 },
                UserTotal { user_id: 1, item_count: 1, quantity: 1 },
            ],
            by_code_user: vec![],
        }
        .sorted();

        let codes: Vec<&str> = lookup.by_code.iter().map(|c| c.finis_code.as_str()).collect();
        assert_eq!(codes, vec!["C", "A", "B"]);
        assert_eq!(lookup.by_user[0].user_id, 1);
    }
}
