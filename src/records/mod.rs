//! Record listing and aggregation.
//!
//! Both operate on copies of the document's records; nothing here touches
//! storage.

mod filter;
mod stats;

pub use filter::{Period, RecordFilter, SortField, SortOrder};
pub use stats::{CategorySummary, Statistics};
