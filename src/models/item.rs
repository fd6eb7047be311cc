use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::SessionUser;

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: i32,
    pub finis_code: String,
    pub full_code: String,
    pub description: String,
    pub quantity: i32,
    pub created_by_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_by_id: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Admins can change anything, users only what they created.
    #[must_use]
    pub fn editable_by(&self, user: &SessionUser) -> bool {
        user.is_admin() || self.created_by_id == user.id
    }
}

/// Validated fields of the item form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInput {
    pub finis_code: String,
    pub full_code: String,
    pub description: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }

    /// Signed effect of `qty` on the stock level.
    #[must_use]
    pub const fn signed(self, qty: i64) -> i64 {
        match self {
            Self::In => qty,
            Self::Out => -qty,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            other => Err(format!("Unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Movement {
    pub id: i32,
    pub item_id: i32,
    pub direction: Direction,
    pub qty: i32,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub user_id: i32,
}

/// Validated fields of the movement form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementInput {
    pub direction: Direction,
    pub qty: i32,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("IN".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!("OUT".parse::<Direction>().unwrap(), Direction::Out);
        assert!("in".parse::<Direction>().is_err());
        assert_eq!(Direction::Out.signed(7), -7);
    }
}
