//! # Record Book
//!
//! A small personal record book: log everyday counts ("3 hiccups today"),
//! keep them in categories, and get them back filtered, sorted and totalled.
//!
//! ## Core Concepts
//!
//! - **Document**: All state lives in one JSON document under one key
//! - **Records**: Validated, normalized entries with a category, a count, a memo and a day
//! - **Backends**: Any key-value blob store; a locked directory or memory
//! - **Backups**: A bounded list of whole-document snapshots
//!
//! ## Example
//!
//! ```ignore
//! use recordbook::{RecordFilter, RecordInput, SortField, SortOrder, Store, StoreConfig};
//!
//! let store = Store::open_or_create(StoreConfig {
//!     path: "./my-book".into(),
//!     ..Default::default()
//! })?;
//! store.initialize()?;
//!
//! // Log a record
//! store.add_record(RecordInput::new("Hiccups", 3).with_memo("after lunch"))?;
//!
//! // Biggest counts first
//! let records = store.get_records(
//!     &RecordFilter::new().sort_by(SortField::Value, SortOrder::Desc),
//! );
//!
//! // Snapshot before a risky import
//! let backup = store.create_backup()?;
//! ```

pub mod backend;
pub mod document;
pub mod error;
pub mod records;
pub mod store;
pub mod types;
pub mod validation;

// Re-exports
pub use backend::{FileBackend, KeyValueBackend, MemoryBackend, StorageKeys};
pub use document::{Document, FORMAT_VERSION, SEED_CATEGORIES};
pub use error::{Result, StoreError};
pub use records::{CategorySummary, Period, RecordFilter, SortField, SortOrder, Statistics};
pub use store::{InitOutcome, Store, StoreConfig};
pub use types::*;
pub use validation::{ErrorMessages, IntegrityReport, ValidationReport, ValidationRules, Validator};
