//! Field validators and normalizers.

use super::rules::{ErrorMessages, ValidationRules};
use crate::error::{Result, StoreError};
use crate::types::Theme;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::BTreeMap;

/// Outcome of validating a record or a settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Failing field name to user-facing message. Empty when valid.
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, field: &str, message: &str) {
        self.errors.insert(field.to_string(), message.to_string());
    }

    /// Convert into a `Result`, carrying every failing field.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(StoreError::Validation {
                errors: self.errors,
            })
        }
    }
}

/// Stateless checker configured with a rule table and a message table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Validator {
    rules: ValidationRules,
    messages: ErrorMessages,
}

impl Validator {
    pub fn new(rules: ValidationRules, messages: ErrorMessages) -> Self {
        Self { rules, messages }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    pub fn messages(&self) -> &ErrorMessages {
        &self.messages
    }

    /// A string whose trimmed length is within bounds and which has no
    /// leading or trailing whitespace.
    pub fn validate_category(&self, category: &Value) -> bool {
        let Some(s) = category.as_str() else {
            return false;
        };

        let len = s.trim().chars().count();
        if len < self.rules.category_min_len || len > self.rules.category_max_len {
            return false;
        }

        let first = s.chars().next();
        let last = s.chars().next_back();
        matches!((first, last), (Some(a), Some(b)) if !a.is_whitespace() && !b.is_whitespace())
    }

    /// Coerces to a finite number inside the value range.
    pub fn validate_value(&self, value: &Value) -> bool {
        match coerce_number(value) {
            Some(n) => n >= self.rules.value_min && n <= self.rules.value_max,
            None => false,
        }
    }

    /// Memos are optional; only over-long strings fail.
    pub fn validate_memo(&self, memo: &Value) -> bool {
        match memo.as_str() {
            Some(s) if !s.is_empty() => s.chars().count() <= self.rules.memo_max_len,
            _ => true,
        }
    }

    /// Exactly `YYYY-MM-DD`, a real calendar day, inside the date range.
    pub fn validate_date(&self, date: &Value) -> bool {
        let Some(s) = date.as_str() else {
            return false;
        };
        if !has_date_shape(s) {
            return false;
        }
        match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(day) => day >= self.rules.date_min && day <= self.rules.date_max,
            Err(_) => false,
        }
    }

    /// Check every field of a record-shaped value. All fields are checked
    /// so a caller can flag each failing one at once.
    pub fn validate_record(&self, record: &Value) -> ValidationReport {
        let mut report = ValidationReport::default();

        if !self.validate_category(field_of(record, "category")) {
            report.fail("category", &self.messages.required);
        }

        if !self.validate_value(field_of(record, "value")) {
            report.fail("value", &self.messages.invalid_number);
        }

        let memo = field_of(record, "memo");
        if is_truthy(memo) && !self.validate_memo(memo) {
            report.fail("memo", &self.messages.too_long);
        }

        let date = field_of(record, "date");
        if is_truthy(date) && !self.validate_date(date) {
            report.fail("date", &self.messages.invalid_date);
        }

        report
    }

    /// Check a (possibly partial) settings object. Absent fields are valid.
    pub fn validate_settings(&self, settings: &Value) -> ValidationReport {
        let mut report = ValidationReport::default();

        let Some(map) = settings.as_object() else {
            report.fail("settings", &self.messages.invalid_format);
            return report;
        };

        if let Some(theme) = map.get("theme") {
            let known = theme
                .as_str()
                .is_some_and(|name| name.parse::<Theme>().is_ok());
            if is_truthy(theme) && !known {
                report.fail("theme", &self.messages.invalid_format);
            }
        }

        for flag in ["notifications", "autoSave"] {
            if let Some(value) = map.get(flag) {
                if !value.is_boolean() {
                    report.fail(flag, &self.messages.invalid_format);
                }
            }
        }

        report
    }
}

fn field_of<'a>(record: &'a Value, name: &str) -> &'a Value {
    record.get(name).unwrap_or(&Value::Null)
}

fn has_date_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Loose truthiness: null, false, zero and the empty string count as absent.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce a loosely-typed value to a finite number.
///
/// Numbers pass through, strings are trimmed and parsed (the empty string
/// is zero), booleans become 1 or 0. Anything else does not coerce.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().ok()?
            }
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Trim a category; non-strings become empty.
pub fn normalize_category(category: &Value) -> String {
    category.as_str().map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Coerce, clamp at zero and floor. Non-numeric input becomes 0.
pub fn normalize_value(value: &Value) -> u32 {
    match coerce_number(value) {
        Some(n) => n.max(0.0).floor() as u32,
        None => 0,
    }
}

/// Trim a memo; non-strings become empty.
pub fn normalize_memo(memo: &Value) -> String {
    normalize_category(memo)
}

/// Parse a date in any of the common shapes; anything unparseable is today.
pub fn normalize_date(date: &Value) -> NaiveDate {
    let Some(s) = date.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
        return current_date();
    };

    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return day;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return instant.with_timezone(&Local).date_naive();
    }
    if let Ok(local) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return local.date();
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return day;
    }

    current_date()
}

/// Today in the local calendar.
pub fn current_date() -> NaiveDate {
    Local::now().date_naive()
}

/// `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
