//! Rule and message tables the validator is configured with.

use chrono::NaiveDate;

/// Bounds applied by the validator.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationRules {
    /// Minimum category length after trimming, in characters.
    pub category_min_len: usize,
    /// Maximum category length after trimming, in characters.
    pub category_max_len: usize,
    pub value_min: f64,
    pub value_max: f64,
    pub memo_max_len: usize,
    /// Earliest accepted record date (inclusive).
    pub date_min: NaiveDate,
    /// Latest accepted record date (inclusive).
    pub date_max: NaiveDate,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            category_min_len: 1,
            category_max_len: 50,
            value_min: 0.0,
            value_max: 999_999.0,
            memo_max_len: 500,
            date_min: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN),
            date_max: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

/// User-facing messages attached to failing fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorMessages {
    pub required: String,
    pub invalid_format: String,
    pub too_long: String,
    pub too_short: String,
    pub invalid_number: String,
    pub invalid_date: String,
}

impl Default for ErrorMessages {
    fn default() -> Self {
        Self {
            required: "This field is required".to_string(),
            invalid_format: "Invalid format".to_string(),
            too_long: "Too many characters".to_string(),
            too_short: "Too few characters".to_string(),
            invalid_number: "Please enter a number".to_string(),
            invalid_date: "Invalid date".to_string(),
        }
    }
}
