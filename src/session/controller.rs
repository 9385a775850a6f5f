use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use uuid::Uuid;

use crate::config::FeedConfig;
use crate::debounce::RenderDebouncer;
use crate::errors::SourceLoadError;
use crate::filters::FilterState;
use crate::metrics::{CycleReport, RenderMetrics};
use crate::models::{Record, Selection, UnknownCategoryPolicy};
use crate::pipeline::{DatasetPipeline, Diagnostic};
use crate::render::{Notice, RenderTarget, RenderUnit};
use crate::scheduler::{ChunkedScheduler, CycleHandle, IdleHost, SharedTarget};

/// What a render request turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStart {
    /// A cycle is running; it finishes asynchronously.
    Started(Uuid),
    /// Filtering left nothing; the "no updates" notice was shown.
    NothingToShow,
    /// The surface rejected the notice. Nothing to do until the next render.
    TargetUnavailable,
}

/// Everything one mounted feed needs: the dataset, the filter selection, the
/// pending debounce timer and the in-flight render cycle.
///
/// At most one cycle is active. Starting a render cancels the previous cycle
/// and waits for it to stop before the new one touches the target.
pub struct RenderSession<T>
where
    T: RenderTarget + Send + 'static,
{
    records: Arc<Vec<Record>>,
    pipeline: DatasetPipeline,
    filters: FilterState,
    scheduler: ChunkedScheduler,
    debouncer: RenderDebouncer<Selection>,
    target: SharedTarget<T>,
    active: Option<CycleHandle>,
    metrics: RenderMetrics,
    diagnostics: Vec<Diagnostic>,
}

impl<T> RenderSession<T>
where
    T: RenderTarget + Send + 'static,
{
    /// Under [`UnknownCategoryPolicy::OwnGroup`], companies missing from
    /// the catalog become selectable categories after the configured ones.
    pub fn new(
        records: Vec<Record>,
        mut filters: FilterState,
        config: &FeedConfig,
        idle: Arc<dyn IdleHost>,
        target: SharedTarget<T>,
    ) -> Result<Self> {
        if config.unknown_category == UnknownCategoryPolicy::OwnGroup {
            let unlisted = filters.store().catalog().unlisted(&records);
            let added = filters.extend_catalog(unlisted)?;
            if added > 0 {
                info!("{added} companies outside the catalog added as their own categories");
            }
        }

        let metrics = RenderMetrics::new();
        let pipeline = DatasetPipeline::new(
            filters.store().catalog().clone(),
            config.empty_selection,
            config.unknown_category.clone(),
        );
        let scheduler = ChunkedScheduler::new(
            config.chunk_size(),
            idle,
            config.idle_fallback(),
            metrics.clone(),
        );

        Ok(Self {
            records: Arc::new(records),
            pipeline,
            filters,
            scheduler,
            debouncer: RenderDebouncer::new(config.quiet_period()),
            target,
            active: None,
            metrics,
            diagnostics: Vec::new(),
        })
    }

    pub fn target(&self) -> SharedTarget<T> {
        Arc::clone(&self.target)
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn metrics(&self) -> RenderMetrics {
        self.metrics.clone()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Records excluded by the most recent render.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Id of the cycle still emitting, if any.
    pub fn active_cycle(&self) -> Option<Uuid> {
        self.active
            .as_ref()
            .filter(|handle| !handle.is_finished())
            .map(CycleHandle::id)
    }

    pub fn active_handle(&self) -> Option<&CycleHandle> {
        self.active.as_ref()
    }

    pub fn pending_triggers(&self) -> usize {
        self.debouncer.pending_count()
    }

    /// Flips one category, persists the selection and schedules a render.
    pub fn toggle(&mut self, key: &str) -> Result<bool> {
        let checked = self.filters.toggle(key)?;
        self.schedule_render();
        Ok(checked)
    }

    pub fn set_category(&mut self, key: &str, checked: bool) -> Result<()> {
        self.filters.set_selected(key, checked)?;
        self.schedule_render();
        Ok(())
    }

    pub fn select_all(&mut self) -> Result<()> {
        self.filters.select_all()?;
        self.schedule_render();
        Ok(())
    }

    pub fn select_none(&mut self) -> Result<()> {
        self.filters.select_none()?;
        self.schedule_render();
        Ok(())
    }

    fn schedule_render(&mut self) {
        self.debouncer.schedule(self.filters.selected().clone());
    }

    /// Waits for the debounced filter change and renders it.
    pub async fn process_next_trigger(&mut self) -> Result<RenderStart> {
        let selection = self.debouncer.fired().await;
        self.render_now(&selection).await
    }

    /// Renders the current selection immediately, dropping any pending
    /// debounced trigger.
    pub async fn refresh(&mut self) -> Result<RenderStart> {
        if self.debouncer.cancel() {
            info!("refresh replaces a pending filter render");
        }
        let selection = self.filters.selected().clone();
        self.render_now(&selection).await
    }

    pub async fn render_now(&mut self, selection: &Selection) -> Result<RenderStart> {
        self.stop_active().await?;

        let outcome = self.pipeline.group(&self.records, selection);
        if !outcome.diagnostics.is_empty() {
            warn!(
                "{} records excluded for malformed dates",
                outcome.diagnostics.len()
            );
        }
        self.diagnostics = outcome.diagnostics;

        if outcome.grouping.is_empty() {
            let mut target = self.target.lock().await;
            let shown = target
                .clear()
                .and_then(|_| target.append(RenderUnit::notice(Notice::NoUpdates)));
            return Ok(match shown {
                Ok(()) => RenderStart::NothingToShow,
                Err(err) => {
                    warn!("could not show empty state: {err}");
                    RenderStart::TargetUnavailable
                }
            });
        }

        let handle = self.scheduler.start(outcome.grouping, Arc::clone(&self.target));
        let id = handle.id();
        self.active = Some(handle);
        Ok(RenderStart::Started(id))
    }

    /// Waits for the active cycle to finish on its own.
    pub async fn wait_idle(&mut self) -> Result<Option<CycleReport>> {
        match self.active.take() {
            Some(handle) => handle.join().await.map(Some),
            None => Ok(None),
        }
    }

    /// Cancels the pending trigger and the active cycle.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.debouncer.cancel();
        self.stop_active().await?;
        Ok(())
    }

    async fn stop_active(&mut self) -> Result<Option<CycleReport>> {
        let Some(handle) = self.active.take() else {
            return Ok(None);
        };
        if !handle.is_finished() {
            info!("superseding render cycle {}", handle.id());
        }
        handle.supersede().await.map(Some)
    }
}

impl<T> Drop for RenderSession<T>
where
    T: RenderTarget + Send + 'static,
{
    fn drop(&mut self) {
        // The cycle task outlives its handle; stop it writing to a target
        // the next session may already own.
        if let Some(handle) = &self.active {
            handle.cancel();
        }
        self.debouncer.cancel();
    }
}

/// Shows the failure state for a dataset that never loaded. The pipeline
/// is not involved.
pub fn present_load_failure<T: RenderTarget + ?Sized>(target: &mut T, err: &SourceLoadError) {
    let notice = Notice::LoadFailed {
        reason: err.to_string(),
    };
    if let Err(target_err) = target
        .clear()
        .and_then(|_| target.append(RenderUnit::notice(notice)))
    {
        warn!("could not show load failure: {target_err}");
    }
}
