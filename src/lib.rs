pub mod config;
pub mod db;
pub mod debounce;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod source;
mod utils;

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;

use config::FeedConfig;
use db::SqliteStore;
use filters::{FilterState, FilterStore, JsonFileStore, KeyValueStore};
use models::CategoryCatalog;
use render::TextTarget;
use scheduler::YieldNow;
use session::{present_load_failure, RenderSession, RenderStart};

const DEFAULT_CONFIG_PATH: &str = "update-feed.json";
const DEFAULT_STATE_PATH: &str = "update-feed.sqlite3";

/// Command-line arguments of the bundled text host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub data_path: PathBuf,
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    /// Categories to flip before rendering, in order.
    pub toggles: Vec<String>,
}

impl RunArgs {
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut data_path = None;
        let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let mut state_path = PathBuf::from(DEFAULT_STATE_PATH);
        let mut toggles = Vec::new();

        let mut args = args.into_iter().map(Into::<String>::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    config_path = args.next().context("--config needs a path")?.into();
                }
                "--state" => {
                    state_path = args.next().context("--state needs a path")?.into();
                }
                "--toggle" => {
                    toggles.push(args.next().context("--toggle needs a category key")?);
                }
                flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
                _ if data_path.is_none() => data_path = Some(PathBuf::from(&arg)),
                _ => bail!("unexpected argument {arg}"),
            }
        }

        Ok(Self {
            data_path: data_path.context(
                "usage: update-feed <updates.json> [--config <path>] [--state <path>] [--toggle <key>]...",
            )?,
            config_path,
            state_path,
            toggles,
        })
    }
}

/// Opens the key-value store for `path`: JSON for `.json`, SQLite otherwise.
pub fn open_store(path: &Path) -> Result<Arc<dyn KeyValueStore>> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Ok(Arc::new(JsonFileStore::new(path.to_path_buf())?))
    } else {
        Ok(Arc::new(SqliteStore::open(path.to_path_buf())?))
    }
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = RunArgs::parse(std::env::args().skip(1))?;
    log::info!("update-feed starting with {}", args.data_path.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(render_feed(args))
}

async fn render_feed(args: RunArgs) -> Result<()> {
    let mut config = FeedConfig::load(&args.config_path)?;
    config.apply_env_overrides();

    let target = Arc::new(Mutex::new(TextTarget::new(io::stdout())));

    let records = match source::load_records(&args.data_path) {
        Ok(records) => records,
        Err(err) => {
            present_load_failure(&mut *target.lock().await, &err);
            return Err(err).context("update data could not be loaded");
        }
    };

    let catalog = if config.categories.is_empty() {
        let discovered = CategoryCatalog::discover(&records);
        log::info!("Discovered {} categories from the data", discovered.len());
        discovered
    } else {
        config.catalog()
    };

    let store = FilterStore::new(
        open_store(&args.state_path)?,
        config.filter_key.clone(),
        config.filter_delimiter,
        catalog,
    );
    let filters = FilterState::load(store)?;

    let mut session = RenderSession::new(records, filters, &config, Arc::new(YieldNow), target)?;

    let start = if args.toggles.is_empty() {
        session.refresh().await?
    } else {
        for key in &args.toggles {
            let checked = session.toggle(key)?;
            log::info!("{key} is now {}", if checked { "shown" } else { "hidden" });
        }
        session.process_next_trigger().await?
    };

    if let RenderStart::Started(_) = start {
        if let Some(report) = session.wait_idle().await? {
            log::info!(
                "Rendered {} records in {} buckets",
                report.records_emitted,
                report.buckets
            );
        }
    }
    session.shutdown().await
}
