use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{Category, CategoryCatalog, UnknownCategoryPolicy};
use crate::pipeline::EmptySelectionPolicy;

pub const DEFAULT_CHUNK_SIZE: usize = 25;
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 120;
pub const DEFAULT_IDLE_FALLBACK_MS: u64 = 16;
pub const DEFAULT_FILTER_KEY: &str = "selectedCompanies";
pub const DEFAULT_FILTER_DELIMITER: char = ',';

const DEBUG_ENV: &str = "UPDATE_FEED_DEBUG";

/// Tunables for the feed. Every field has a default so a partial JSON file
/// only needs to name what it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedConfig {
    /// Records rendered per scheduler step.
    pub chunk_size: usize,
    /// Debounce window for filter changes.
    pub quiet_period_ms: u64,
    /// Longest a yielded step waits for an idle slot before resuming anyway.
    pub idle_fallback_ms: u64,
    pub empty_selection: EmptySelectionPolicy,
    pub unknown_category: UnknownCategoryPolicy,
    /// Persistence key holding the delimited filter selection.
    pub filter_key: String,
    pub filter_delimiter: char,
    /// Ordered category enumeration. Empty means "discover from the data".
    pub categories: Vec<Category>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            quiet_period_ms: DEFAULT_QUIET_PERIOD_MS,
            idle_fallback_ms: DEFAULT_IDLE_FALLBACK_MS,
            empty_selection: EmptySelectionPolicy::default(),
            unknown_category: UnknownCategoryPolicy::default(),
            filter_key: DEFAULT_FILTER_KEY.into(),
            filter_delimiter: DEFAULT_FILTER_DELIMITER,
            categories: Vec::new(),
        }
    }
}

impl FeedConfig {
    /// Reads `path` if it exists, otherwise returns the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: FeedConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// `UPDATE_FEED_DEBUG=1` renders one record per step.
    pub fn apply_env_overrides(&mut self) {
        let debug_value = std::env::var(DEBUG_ENV).ok();
        if debug_flag(debug_value.as_deref()) {
            log::info!("{DEBUG_ENV} set; rendering one record per step");
            self.chunk_size = 1;
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn idle_fallback(&self) -> Duration {
        Duration::from_millis(self.idle_fallback_ms)
    }

    pub fn catalog(&self) -> CategoryCatalog {
        CategoryCatalog::new(self.categories.clone())
    }
}

fn debug_flag(value: Option<&str>) -> bool {
    value
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(
            &path,
            r#"{ "chunkSize": 40, "emptySelection": "showEverything",
                 "unknownCategory": { "mode": "fold", "into": "other" },
                 "categories": [{ "key": "A", "label": "Alpha" }] }"#,
        )
        .unwrap();

        let config = FeedConfig::load(&path).unwrap();
        assert_eq!(config.chunk_size, 40);
        assert_eq!(config.quiet_period_ms, DEFAULT_QUIET_PERIOD_MS);
        assert_eq!(config.empty_selection, EmptySelectionPolicy::ShowEverything);
        assert_eq!(
            config.unknown_category,
            UnknownCategoryPolicy::Fold {
                into: "other".into()
            }
        );
        assert_eq!(config.catalog().len(), 1);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, FeedConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(FeedConfig::load(&path).is_err());
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let config = FeedConfig {
            chunk_size: 0,
            ..FeedConfig::default()
        };
        assert_eq!(config.chunk_size(), 1);
    }

    #[test]
    fn debug_flag_accepts_one_and_true() {
        assert!(debug_flag(Some("1")));
        assert!(debug_flag(Some("TRUE")));
        assert!(!debug_flag(Some("0")));
        assert!(!debug_flag(None));
    }
}
