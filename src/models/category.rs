//! The fixed, ordered category enumeration and the rules for records whose
//! company falls outside it.

use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Record;

/// The set of selected category keys.
pub type Selection = BTreeSet<String>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub key: String,
    pub label: String,
}

impl Category {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// What to do with a record whose company is not in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum UnknownCategoryPolicy {
    /// The raw company string is its own category. A session adds such
    /// companies to the selectable catalog, after the configured keys.
    OwnGroup,
    /// Treat the record as belonging to the catch-all key `into`.
    Fold { into: String },
}

impl Default for UnknownCategoryPolicy {
    fn default() -> Self {
        UnknownCategoryPolicy::OwnGroup
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut seen = BTreeSet::new();
        let categories = categories
            .into_iter()
            .filter(|category| seen.insert(category.key.clone()))
            .collect();
        Self { categories }
    }

    /// Catalog whose labels equal their keys.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            keys.into_iter()
                .map(|key| {
                    let key = key.into();
                    Category::new(key.clone(), key)
                })
                .collect(),
        )
    }

    /// Catalog built from the companies present in `records`, in first-seen
    /// order.
    pub fn discover(records: &[Record]) -> Self {
        Self::from_keys(
            records
                .iter()
                .filter(|record| !record.company.is_empty())
                .map(|record| record.company.clone()),
        )
    }

    /// Companies in `records` missing from the catalog, in first-seen order.
    pub fn unlisted(&self, records: &[Record]) -> Vec<Category> {
        let mut seen = BTreeSet::new();
        records
            .iter()
            .map(|record| record.company.as_str())
            .filter(|company| !company.is_empty() && !self.contains(company))
            .filter(|company| seen.insert(*company))
            .map(|company| Category::new(company, company))
            .collect()
    }

    /// Appends categories whose key is not present yet. Returns how many
    /// were added.
    pub fn extend(&mut self, extra: impl IntoIterator<Item = Category>) -> usize {
        let before = self.categories.len();
        for category in extra {
            if !self.contains(&category.key) {
                self.categories.push(category);
            }
        }
        self.categories.len() - before
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.categories.iter().position(|category| category.key == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.key.as_str())
    }

    /// First-run default: every category selected.
    pub fn all_keys(&self) -> Selection {
        self.keys().map(str::to_string).collect()
    }

    /// Category key a record with company `raw` is filtered under.
    pub fn resolve<'a>(&'a self, raw: &'a str, policy: &'a UnknownCategoryPolicy) -> Cow<'a, str> {
        if self.contains(raw) {
            return Cow::Borrowed(raw);
        }
        match policy {
            UnknownCategoryPolicy::OwnGroup => Cow::Borrowed(raw),
            UnknownCategoryPolicy::Fold { into } => Cow::Borrowed(into.as_str()),
        }
    }
}

/// Style-class key for a company: ASCII alphanumerics lowercased, every
/// other run collapsed to a single `-`, no leading or trailing `-`.
/// Companies with no ASCII alphanumerics map to `"unknown"`.
pub fn class_key(company: &str) -> String {
    let mut key = String::with_capacity(company.len());
    let mut pending_dash = false;
    for ch in company.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !key.is_empty() {
                key.push('-');
            }
            pending_dash = false;
            key.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if key.is_empty() {
        "unknown".to_string()
    } else {
        key
    }
}
