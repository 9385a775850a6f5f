use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::{CategoryCatalog, Record, Selection, UnknownCategoryPolicy};

use super::date_key::{format_date_key, parse_date_key};

/// What an empty selection means. The two are distinct on purpose; neither
/// is inferred from the other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum EmptySelectionPolicy {
    /// No categories selected renders the "no updates" notice.
    #[default]
    ShowNothing,
    /// No categories selected disables filtering.
    ShowEverything,
}

/// Records sharing one calendar date, in their filtered input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBucket {
    pub date: NaiveDate,
    /// Canonical `YYYY-MM-DD` form of `date`, used as the header text.
    pub key: String,
    pub records: Vec<Record>,
}

impl DateBucket {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Date buckets ordered newest first. Never contains an empty bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    buckets: Vec<DateBucket>,
}

impl Grouping {
    pub fn buckets(&self) -> &[DateBucket] {
        &self.buckets
    }

    pub fn into_buckets(self) -> Vec<DateBucket> {
        self.buckets
    }

    /// True when filtering left nothing to show.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn record_count(&self) -> usize {
        self.buckets.iter().map(DateBucket::len).sum()
    }
}

/// A record excluded from grouping without failing the render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    MalformedDateKey {
        /// Position in the unfiltered input.
        index: usize,
        raw: String,
        company: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOutcome {
    pub grouping: Grouping,
    pub diagnostics: Vec<Diagnostic>,
}

/// Filters records by category and partitions them into date buckets.
/// Pure: same records and selection always give the same outcome.
#[derive(Debug, Clone, Default)]
pub struct DatasetPipeline {
    catalog: CategoryCatalog,
    empty_selection: EmptySelectionPolicy,
    unknown_category: UnknownCategoryPolicy,
}

impl DatasetPipeline {
    pub fn new(
        catalog: CategoryCatalog,
        empty_selection: EmptySelectionPolicy,
        unknown_category: UnknownCategoryPolicy,
    ) -> Self {
        Self {
            catalog,
            empty_selection,
            unknown_category,
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn empty_selection(&self) -> EmptySelectionPolicy {
        self.empty_selection
    }

    fn passes(&self, record: &Record, selected: &Selection) -> bool {
        if selected.is_empty() {
            return self.empty_selection == EmptySelectionPolicy::ShowEverything;
        }
        let category = self.catalog.resolve(&record.company, &self.unknown_category);
        selected.contains(&*category)
    }

    pub fn group(&self, records: &[Record], selected: &Selection) -> GroupOutcome {
        if selected.is_empty() && self.empty_selection == EmptySelectionPolicy::ShowNothing {
            return GroupOutcome::default();
        }

        // BTreeMap keeps buckets in calendar order; pushes keep input order.
        let mut by_date: BTreeMap<NaiveDate, Vec<Record>> = BTreeMap::new();
        let mut diagnostics = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if !self.passes(record, selected) {
                continue;
            }
            match parse_date_key(&record.date) {
                Ok(date) => by_date.entry(date).or_default().push(record.clone()),
                Err(err) => {
                    warn!(
                        "Excluding record #{index} ({}, '{}'): {err}",
                        record.company, record.title
                    );
                    diagnostics.push(Diagnostic::MalformedDateKey {
                        index,
                        raw: err.raw,
                        company: record.company.clone(),
                    });
                }
            }
        }

        let buckets = by_date
            .into_iter()
            .rev()
            .map(|(date, records)| DateBucket {
                date,
                key: format_date_key(date),
                records,
            })
            .collect();

        GroupOutcome {
            grouping: Grouping { buckets },
            diagnostics,
        }
    }
}
