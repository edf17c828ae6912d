//! Whole-document integrity checking.

use super::validator::Validator;
use crate::document::REQUIRED_SECTIONS;
use serde_json::Value;

/// Outcome of an integrity check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// One human-readable line per problem found.
    pub issues: Vec<String>,
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

impl Validator {
    /// Check the structure of a document and the validity of every record
    /// and category in it. Never fails; problems are collected as issues.
    pub fn validate_data_integrity(&self, document: &Value) -> IntegrityReport {
        let mut issues = Vec::new();

        let Some(root) = document.as_object() else {
            issues.push("Document is not a structured object".to_string());
            return IntegrityReport { issues };
        };

        for section in REQUIRED_SECTIONS {
            if root.get(section).map_or(true, Value::is_null) {
                issues.push(format!("Required field \"{section}\" is missing"));
            }
        }

        let data = root.get("data");

        match data.and_then(|d| d.get("records")).filter(|v| !v.is_null()) {
            Some(Value::Array(records)) => {
                for (index, record) in records.iter().enumerate() {
                    let report = self.validate_record(record);
                    if !report.is_valid() {
                        let messages: Vec<&str> =
                            report.errors.values().map(String::as_str).collect();
                        issues.push(format!(
                            "Record {} is invalid: {}",
                            index + 1,
                            messages.join(", ")
                        ));
                    }
                }
            }
            Some(_) => issues.push("Records are not a list".to_string()),
            None => {}
        }

        match data.and_then(|d| d.get("categories")).filter(|v| !v.is_null()) {
            Some(Value::Array(categories)) => {
                for (index, category) in categories.iter().enumerate() {
                    if !self.validate_category(category) {
                        issues.push(format!("Category {} is invalid", index + 1));
                    }
                }
            }
            Some(_) => issues.push("Categories are not a list".to_string()),
            None => {}
        }

        IntegrityReport { issues }
    }
}
