use std::sync::Arc;

use anyhow::Result;
use log::warn;

use crate::models::{Category, CategoryCatalog, Selection};

use super::kv::KeyValueStore;

/// Persists the filter selection as one delimiter-joined string under a
/// fixed key. Keys are written in catalog order, so the stored form is
/// canonical for a given set.
#[derive(Clone)]
pub struct FilterStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    delimiter: char,
    catalog: CategoryCatalog,
}

impl FilterStore {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        delimiter: char,
        catalog: CategoryCatalog,
    ) -> Self {
        let key = key.into();
        for category in catalog.keys().filter(|k| k.contains(delimiter)) {
            warn!("category key '{category}' contains the filter delimiter '{delimiter}' and will not round-trip");
        }
        Self {
            backend,
            key,
            delimiter,
            catalog,
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Makes more keys storable. Returns how many were new.
    pub fn extend_catalog(&mut self, extra: Vec<Category>) -> usize {
        for category in extra.iter().filter(|c| c.key.contains(self.delimiter)) {
            warn!(
                "category key '{}' contains the filter delimiter '{}' and will not round-trip",
                category.key, self.delimiter
            );
        }
        self.catalog.extend(extra)
    }

    /// `None` only when nothing was ever saved. A stored empty string is an
    /// empty selection.
    pub fn load(&self) -> Result<Option<Selection>> {
        Ok(self.backend.get(&self.key)?.map(|raw| self.decode(&raw)))
    }

    /// Overwrites the stored selection.
    pub fn save(&self, selection: &Selection) -> Result<()> {
        self.backend.set(&self.key, &self.encode(selection))
    }

    pub fn encode(&self, selection: &Selection) -> String {
        for key in selection.iter().filter(|key| !self.catalog.contains(key)) {
            warn!("not persisting unknown category '{key}'");
        }
        let mut encoded = String::new();
        for key in self.catalog.keys().filter(|key| selection.contains(*key)) {
            if !encoded.is_empty() {
                encoded.push(self.delimiter);
            }
            encoded.push_str(key);
        }
        encoded
    }

    pub fn decode(&self, raw: &str) -> Selection {
        raw.split(self.delimiter)
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .filter(|key| {
                let known = self.catalog.contains(key);
                if !known {
                    warn!("dropping stored filter key '{key}' not in the category catalog");
                }
                known
            })
            .map(str::to_string)
            .collect()
    }
}
