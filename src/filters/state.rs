use anyhow::{bail, Result};
use log::info;

use crate::models::{Category, Selection};

use super::store::FilterStore;

/// The in-memory selection, kept in step with its persisted copy: every
/// mutation is saved before it returns.
pub struct FilterState {
    store: FilterStore,
    selected: Selection,
}

impl FilterState {
    /// Loads the stored selection, or selects every category on first run.
    pub fn load(store: FilterStore) -> Result<Self> {
        let selected = Self::stored_or_all(&store)?;
        Ok(Self { store, selected })
    }

    fn stored_or_all(store: &FilterStore) -> Result<Selection> {
        Ok(match store.load()? {
            Some(selected) => selected,
            None => {
                info!("No stored filter selection; selecting all categories");
                store.catalog().all_keys()
            }
        })
    }

    /// Adds selectable categories and re-reads the stored selection, so
    /// keys that were dropped as unknown on load come back. Returns how
    /// many categories were new.
    pub fn extend_catalog(&mut self, extra: Vec<Category>) -> Result<usize> {
        let added = self.store.extend_catalog(extra);
        if added > 0 {
            self.selected = Self::stored_or_all(&self.store)?;
        }
        Ok(added)
    }

    pub fn selected(&self) -> &Selection {
        &self.selected
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    pub fn store(&self) -> &FilterStore {
        &self.store
    }

    /// Flips `key` and returns whether it is now selected.
    pub fn toggle(&mut self, key: &str) -> Result<bool> {
        let checked = !self.is_selected(key);
        self.set_selected(key, checked)?;
        Ok(checked)
    }

    pub fn set_selected(&mut self, key: &str, checked: bool) -> Result<()> {
        if !self.store.catalog().contains(key) {
            bail!("unknown category '{key}'");
        }
        let mut next = self.selected.clone();
        if checked {
            next.insert(key.to_string());
        } else {
            next.remove(key);
        }
        self.replace(next)
    }

    pub fn select_all(&mut self) -> Result<()> {
        self.replace(self.store.catalog().all_keys())
    }

    pub fn select_none(&mut self) -> Result<()> {
        self.replace(Selection::new())
    }

    fn replace(&mut self, next: Selection) -> Result<()> {
        self.store.save(&next)?;
        self.selected = next;
        Ok(())
    }
}
