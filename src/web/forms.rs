//! Form and query payloads plus their validation.
//!
//! Every field arrives as a string so that bad input turns into an inline
//! message instead of an extractor rejection.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::time::parse_local_minutes;
use crate::models::{Direction, ItemInput, MovementInput, Role, StockFilter};
use crate::services::user_service::MAX_USERNAME_LEN;
use crate::services::{NewUser, UserUpdate};

pub const MAX_FINIS_CODE_LEN: usize = 64;
pub const MAX_FULL_CODE_LEN: usize = 128;
pub const MAX_NOTE_LEN: usize = 500;

/// Field name to message, rendered next to the offending input.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

fn required(errors: &mut FieldErrors, field: &'static str, raw: &str, max: usize) -> String {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, "This field is required.");
    } else if value.chars().count() > max {
        errors.add(field, format!("At most {max} characters."));
    }
    value.to_string()
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Redirect target after login. Only local absolute paths are accepted so the
/// login page cannot be used as an open redirect.
#[must_use]
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

// ============================================================================
// Items
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ItemForm {
    pub finis_code: String,
    pub full_code: String,
    pub description: String,
    pub quantity: String,
}

impl ItemForm {
    pub fn validate(&self) -> Result<ItemInput, FieldErrors> {
        let mut errors = FieldErrors::default();

        let finis_code = required(&mut errors, "finis_code", &self.finis_code, MAX_FINIS_CODE_LEN);
        let full_code = required(&mut errors, "full_code", &self.full_code, MAX_FULL_CODE_LEN);
        let description = required(&mut errors, "description", &self.description, usize::MAX);

        let quantity = match self.quantity.trim() {
            "" => 0,
            raw => match raw.parse::<i32>() {
                Ok(q) if q >= 0 => q,
                Ok(_) => {
                    errors.add("quantity", "Quantity cannot be negative.");
                    0
                }
                Err(_) => {
                    errors.add("quantity", "Quantity must be a whole number.");
                    0
                }
            },
        };

        errors.into_result(|| ItemInput {
            finis_code,
            full_code,
            description,
            quantity,
        })
    }
}

impl From<&crate::models::Item> for ItemForm {
    fn from(item: &crate::models::Item) -> Self {
        Self {
            finis_code: item.finis_code.clone(),
            full_code: item.full_code.clone(),
            description: item.description.clone(),
            quantity: item.quantity.to_string(),
        }
    }
}

// ============================================================================
// Movements
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovementForm {
    pub direction: String,
    pub qty: String,
    pub when: String,
    pub note: String,
}

impl MovementForm {
    /// `now` is used when `when` is blank or not a valid date-time.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<MovementInput, FieldErrors> {
        let mut errors = FieldErrors::default();

        let direction = self.direction.parse::<Direction>().unwrap_or_else(|_| {
            errors.add("direction", "Choose IN or OUT.");
            Direction::In
        });

        let qty = match self.qty.trim().parse::<i32>() {
            Ok(q) if q > 0 => q,
            _ => {
                errors.add("qty", "Quantity must be a whole number greater than zero.");
                0
            }
        };

        let note = self.note.trim();
        if note.chars().count() > MAX_NOTE_LEN {
            errors.add("note", format!("At most {MAX_NOTE_LEN} characters."));
        }
        let note = (!note.is_empty()).then(|| note.to_string());

        let occurred_at = parse_local_minutes(&self.when).unwrap_or(now);

        errors.into_result(|| MovementInput {
            direction,
            qty,
            occurred_at,
            note,
        })
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserForm {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl UserForm {
    fn common(&self, errors: &mut FieldErrors) -> (String, Role) {
        let username = required(errors, "username", &self.username, MAX_USERNAME_LEN);
        let role = self.role.parse::<Role>().unwrap_or_else(|_| {
            errors.add("role", "Choose a role.");
            Role::User
        });
        (username, role)
    }

    fn check_password(&self, errors: &mut FieldErrors, min_len: usize) {
        if self.password.chars().count() < min_len {
            errors.add("password", format!("At least {min_len} characters."));
        }
    }

    pub fn validate_new(&self, min_password_len: usize) -> Result<NewUser, FieldErrors> {
        let mut errors = FieldErrors::default();
        let (username, role) = self.common(&mut errors);
        self.check_password(&mut errors, min_password_len);

        errors.into_result(|| NewUser {
            username,
            password: self.password.clone(),
            role,
        })
    }

    /// A blank password keeps the current one.
    pub fn validate_update(&self, min_password_len: usize) -> Result<UserUpdate, FieldErrors> {
        let mut errors = FieldErrors::default();
        let (username, role) = self.common(&mut errors);
        if !self.password.is_empty() {
            self.check_password(&mut errors, min_password_len);
        }

        errors.into_result(|| UserUpdate {
            username,
            role,
            password: (!self.password.is_empty()).then(|| self.password.clone()),
        })
    }
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StockQuery {
    pub code: Option<String>,
    pub user_id: Option<String>,
}

impl StockQuery {
    #[must_use]
    pub fn to_filter(&self) -> StockFilter {
        StockFilter {
            code: self
                .code
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(ToString::to_string),
            user_id: parse_user_id(self.user_id.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub finis: Option<String>,
    pub user_id: Option<String>,
}

/// Empty or non-numeric select values mean "any user".
#[must_use]
pub fn parse_user_id(raw: Option<&str>) -> Option<i32> {
    raw.and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item_form(finis: &str, full: &str, desc: &str, qty: &str) -> ItemForm {
        ItemForm {
            finis_code: finis.to_string(),
            full_code: full.to_string(),
            description: desc.to_string(),
            quantity: qty.to_string(),
        }
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/items/3/edit")), "/items/3/edit");
        assert_eq!(safe_next(Some("/?q=abc")), "/?q=abc");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(Some("")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_item_form_trims_and_defaults_quantity() {
        let input = item_form("  F-100 ", "F-100-A", " bolt ", "").validate().unwrap();
        assert_eq!(input.finis_code, "F-100");
        assert_eq!(input.description, "bolt");
        assert_eq!(input.quantity, 0);
    }

    #[test]
    fn test_item_form_reports_each_field() {
        let errors = item_form("", "  ", "x", "-3").validate().unwrap_err();
        assert!(errors.get("finis_code").is_some());
        assert!(errors.get("full_code").is_some());
        assert!(errors.get("description").is_none());
        assert_eq!(errors.get("quantity"), Some("Quantity cannot be negative."));

        let errors = item_form("a", "b", "c", "ten").validate().unwrap_err();
        assert_eq!(errors.get("quantity"), Some("Quantity must be a whole number."));
    }

    #[test]
    fn test_item_form_rejects_long_codes() {
        let long = "x".repeat(MAX_FINIS_CODE_LEN + 1);
        let errors = item_form(&long, "b", "c", "1").validate().unwrap_err();
        assert!(errors.get("finis_code").is_some());
    }

    #[test]
    fn test_movement_form() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let form = MovementForm {
            direction: "OUT".to_string(),
            qty: "4".to_string(),
            when: "2025-02-28T08:30".to_string(),
            note: "  ".to_string(),
        };
        let input = form.validate(now).unwrap();
        assert_eq!(input.direction, Direction::Out);
        assert_eq!(input.qty, 4);
        assert_eq!(input.occurred_at, Utc.with_ymd_and_hms(2025, 2, 28, 8, 30, 0).unwrap());
        assert_eq!(input.note, None);

        let form = MovementForm {
            direction: "IN".to_string(),
            qty: "2".to_string(),
            when: "yesterday".to_string(),
            note: "restock".to_string(),
        };
        let input = form.validate(now).unwrap();
        assert_eq!(input.occurred_at, now);
        assert_eq!(input.note.as_deref(), Some("restock"));
    }

    #[test]
    fn test_movement_form_rejects_bad_values() {
        let now = Utc::now();
        let form = MovementForm {
            direction: "SIDEWAYS".to_string(),
            qty: "0".to_string(),
            ..MovementForm::default()
        };
        let errors = form.validate(now).unwrap_err();
        assert!(errors.get("direction").is_some());
        assert!(errors.get("qty").is_some());
    }

    #[test]
    fn test_user_form() {
        let form = UserForm {
            username: " alice ".to_string(),
            password: "short".to_string(),
            role: "admin".to_string(),
        };
        let errors = form.validate_new(8).unwrap_err();
        assert!(errors.get("password").is_some());

        // blank password is fine on update
        let form = UserForm {
            password: String::new(),
            ..form
        };
        let update = form.validate_update(8).unwrap();
        assert_eq!(update.username, "alice");
        assert_eq!(update.role, Role::Admin);
        assert_eq!(update.password, None);
    }

    #[test]
    fn test_stock_query_filter() {
        let query = StockQuery {
            code: Some("  ".to_string()),
            user_id: Some(String::new()),
        };
        assert_eq!(query.to_filter(), StockFilter::default());

        let query = StockQuery {
            code: Some(" F1 ".to_string()),
            user_id: Some("7".to_string()),
        };
        let filter = query.to_filter();
        assert_eq!(filter.code.as_deref(), Some("F1"));
        assert_eq!(filter.user_id, Some(7));
    }
}
