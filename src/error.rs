//! Error types for the record book store.

use crate::types::RecordId;
use std::collections::BTreeMap;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {}", format_fields(.errors))]
    Validation { errors: BTreeMap<String, String> },

    #[error("Integrity check failed: {}", .0.join(", "))]
    Integrity(Vec<String>),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists: {0}")]
    CategoryExists(String),

    #[error("Category {category} is referenced by {records} record(s)")]
    CategoryInUse { category: String, records: usize },

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,
}

impl StoreError {
    /// Build a validation error for a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), message.into());
        StoreError::Validation { errors }
    }

    /// True for the "addressed something that does not exist" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::RecordNotFound(_)
                | StoreError::CategoryNotFound(_)
                | StoreError::BackupNotFound(_)
                | StoreError::NotInitialized
        )
    }

    /// True when the underlying storage could not be read or written.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Io(_)
                | StoreError::Serialization(_)
                | StoreError::Deserialization(_)
                | StoreError::Backend(_)
                | StoreError::Locked
        )
    }
}

fn format_fields(errors: &BTreeMap<String, String>) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            StoreError::Deserialization(e.to_string())
        } else {
            StoreError::Serialization(e.to_string())
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let mut errors = BTreeMap::new();
        errors.insert("category".to_string(), "This field is required".to_string());
        errors.insert("value".to_string(), "Please enter a number".to_string());
        let err = StoreError::Validation { errors };

        assert_eq!(
            err.to_string(),
            "Validation failed: category: This field is required, value: Please enter a number"
        );
    }

    #[test]
    fn test_error_families() {
        assert!(StoreError::RecordNotFound(RecordId::from("abc")).is_not_found());
        assert!(StoreError::Locked.is_storage_failure());
        assert!(!StoreError::Integrity(vec![]).is_not_found());
    }

    #[test]
    fn test_json_syntax_error_maps_to_deserialization() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Deserialization(_)));
    }
}
