#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::Mutex;

use update_feed_lib::config::FeedConfig;
use update_feed_lib::filters::{FilterState, FilterStore, MemoryStore};
use update_feed_lib::models::{CategoryCatalog, Record, Selection};
use update_feed_lib::render::MemoryTarget;
use update_feed_lib::scheduler::IdleHost;
use update_feed_lib::session::RenderSession;

pub const FILTER_KEY: &str = "selectedCompanies";

pub fn record(date: &str, company: &str, title: &str) -> Record {
    Record {
        date: date.to_string(),
        company: company.to_string(),
        game: format!("{company} game"),
        title: title.to_string(),
        summary: format!("{title} summary"),
        link: format!("https://example.com/{title}"),
    }
}

pub fn selection(keys: &[&str]) -> Selection {
    keys.iter().map(|key| key.to_string()).collect()
}

pub fn config(chunk_size: usize) -> FeedConfig {
    FeedConfig {
        chunk_size,
        ..FeedConfig::default()
    }
}

/// Idle slots only come from the test; the fallback never fires.
pub fn manual_config(chunk_size: usize) -> FeedConfig {
    FeedConfig {
        idle_fallback_ms: 60_000,
        ..config(chunk_size)
    }
}

pub fn session(
    records: Vec<Record>,
    categories: &[&str],
    config: &FeedConfig,
    idle: Arc<dyn IdleHost>,
) -> (RenderSession<MemoryTarget>, Arc<MemoryStore>) {
    let backend = Arc::new(MemoryStore::new());
    let session = session_with_store(records, categories, config, idle, backend.clone());
    (session, backend)
}

pub fn session_with_store(
    records: Vec<Record>,
    categories: &[&str],
    config: &FeedConfig,
    idle: Arc<dyn IdleHost>,
    backend: Arc<MemoryStore>,
) -> RenderSession<MemoryTarget> {
    let store = FilterStore::new(
        backend,
        FILTER_KEY,
        ',',
        CategoryCatalog::from_keys(categories.iter().copied()),
    );
    let filters = FilterState::load(store).unwrap();
    let target = Arc::new(Mutex::new(MemoryTarget::new()));
    RenderSession::new(records, filters, config, idle, target).unwrap()
}
