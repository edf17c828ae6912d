//! Record filtering and ordering.

use crate::types::Record;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Record fields a listing can be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Id,
    Category,
    Value,
    Memo,
    Date,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Ascending comparison on this field.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Category => a.category.cmp(&b.category),
            SortField::Value => a.value.cmp(&b.value),
            SortField::Memo => a.memo.cmp(&b.memo),
            SortField::Date => a.date.cmp(&b.date),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "category" => Ok(SortField::Category),
            "value" => Ok(SortField::Value),
            "memo" => Ok(SortField::Memo),
            "date" => Ok(SortField::Date),
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Calendar windows a listing is commonly narrowed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Period {
    Today,
    /// Monday through Sunday of the current week.
    ThisWeek,
    ThisMonth,
    ThisYear,
}

impl Period {
    /// Inclusive first and last day of the period containing `today`.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Period::Today => (today, today),
            Period::ThisWeek => {
                let start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (start, start + Duration::days(6))
            }
            Period::ThisMonth => {
                let start = today.with_day(1).unwrap_or(today);
                let next_month = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let end = next_month
                    .and_then(|d| d.pred_opt())
                    .unwrap_or(today);
                (start, end)
            }
            Period::ThisYear => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
                (start, end)
            }
        }
    }
}

/// Conditions for listing records. All set conditions must hold.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordFilter {
    /// Exact category match.
    pub category: Option<String>,
    /// Exact day match.
    pub date: Option<NaiveDate>,
    /// Inclusive range; only applied when both ends are set.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring of category or memo.
    pub search: Option<String>,
    pub sort_by: Option<SortField>,
    pub sort_order: SortOrder,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter covering a calendar period around `today`.
    pub fn for_period(period: Period, today: NaiveDate) -> Self {
        let (start, end) = period.bounds(today);
        Self::default().between(start, end)
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn sort_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_order = order;
        self
    }

    /// Whether a single record passes every condition.
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if record.category != category {
                return false;
            }
        }

        if let Some(date) = self.date {
            if record.date != date {
                return false;
            }
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if record.date < start || record.date > end {
                return false;
            }
        }

        if let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !record.category.to_lowercase().contains(&term)
                && !record.memo.to_lowercase().contains(&term)
            {
                return false;
            }
        }

        true
    }

    /// Matching records, copied and ordered.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        let mut out: Vec<Record> = records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();

        if let Some(field) = self.sort_by {
            out.sort_by(|a, b| {
                let ordering = field.compare(a, b);
                match self.sort_order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        out
    }
}
