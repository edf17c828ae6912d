//! Aggregate figures over the record history.

use crate::types::Record;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Per-category totals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: String,
    pub count: usize,
    pub total_value: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_records: usize,
    /// Distinct days with at least one record.
    pub record_days: usize,
    /// Category with the most records; ties go to the one seen last.
    pub top_category: Option<String>,
    /// Records per recorded day, rounded to one decimal.
    pub average_per_day: f64,
    /// Listed categories first (in list order), then any only seen in records.
    pub categories: Vec<CategorySummary>,
}

impl Statistics {
    pub fn compute(records: &[Record], categories: &[String]) -> Self {
        let mut summaries: Vec<CategorySummary> = categories
            .iter()
            .map(|category| CategorySummary {
                category: category.clone(),
                count: 0,
                total_value: 0,
            })
            .collect();
        let mut position: HashMap<String, usize> = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| (s.category.clone(), i))
            .collect();

        let mut days = HashSet::new();
        let mut first_seen: Vec<usize> = Vec::new();

        for record in records {
            days.insert(record.date);

            let index = match position.get(&record.category) {
                Some(&i) => i,
                None => {
                    summaries.push(CategorySummary {
                        category: record.category.clone(),
                        count: 0,
                        total_value: 0,
                    });
                    let i = summaries.len() - 1;
                    position.insert(record.category.clone(), i);
                    i
                }
            };

            if summaries[index].count == 0 {
                first_seen.push(index);
            }
            summaries[index].count += 1;
            summaries[index].total_value += u64::from(record.value);
        }

        let mut top: Option<&CategorySummary> = None;
        for &index in &first_seen {
            let candidate = &summaries[index];
            if top.map_or(true, |best| candidate.count >= best.count) {
                top = Some(candidate);
            }
        }
        let top_category = top.map(|s| s.category.clone());

        let average_per_day = if days.is_empty() {
            0.0
        } else {
            (records.len() as f64 / days.len() as f64 * 10.0).round() / 10.0
        };

        Self {
            total_records: records.len(),
            record_days: days.len(),
            top_category,
            average_per_day,
            categories: summaries,
        }
    }
}
