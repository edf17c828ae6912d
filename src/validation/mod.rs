//! Field validation, normalization and whole-document integrity checks.
//!
//! Validation is strict and only reports; normalization is lenient and
//! always produces some legal value. The store trims text fields first,
//! validates, and then normalizes what it persists.

mod integrity;
mod rules;
mod validator;

pub use integrity::IntegrityReport;
pub use rules::{ErrorMessages, ValidationRules};
pub use validator::{
    coerce_number, current_date, format_date, normalize_category, normalize_date,
    normalize_memo, normalize_value, ValidationReport, Validator,
};
