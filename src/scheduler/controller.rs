use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::metrics::{CycleOutcome, CycleReport, RenderMetrics};
use crate::pipeline::Grouping;
use crate::render::RenderTarget;

use super::cycle::{RenderCycle, StepOutcome};
use super::idle::{next_slot, IdleHost, Resume};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Render surface shared between the session and its running cycle.
pub type SharedTarget<T> = Arc<Mutex<T>>;

/// Progress published after every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleProgress {
    pub steps: usize,
    pub records_emitted: usize,
    pub finished: bool,
}

/// Drives render cycles cooperatively: one chunk per step, a yield after
/// each step, resumed on the next idle slot or after `idle_fallback`.
#[derive(Clone)]
pub struct ChunkedScheduler {
    chunk_size: usize,
    idle: Arc<dyn IdleHost>,
    idle_fallback: Duration,
    metrics: RenderMetrics,
}

impl ChunkedScheduler {
    pub fn new(
        chunk_size: usize,
        idle: Arc<dyn IdleHost>,
        idle_fallback: Duration,
        metrics: RenderMetrics,
    ) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            idle,
            idle_fallback,
            metrics,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Spawns a cycle over `grouping`. The returned handle is the only way to
    /// cancel it.
    pub fn start<T>(&self, grouping: Grouping, target: SharedTarget<T>) -> CycleHandle
    where
        T: RenderTarget + Send + 'static,
    {
        let cycle = RenderCycle::new(grouping, self.chunk_size);
        let id = cycle.id();
        let cancel_token = CancellationToken::new();
        let (progress_tx, progress_rx) = watch::channel(CycleProgress::default());

        log_info!(
            "render cycle {id} starting: {} buckets, {} records, chunk size {}",
            cycle.bucket_count(),
            cycle.record_count(),
            self.chunk_size
        );

        let handle = tokio::spawn(drive_cycle(
            cycle,
            target,
            Arc::clone(&self.idle),
            self.idle_fallback,
            cancel_token.clone(),
            progress_tx,
            self.metrics.clone(),
        ));

        CycleHandle {
            id,
            cancel_token,
            progress: progress_rx,
            handle,
        }
    }
}

/// The caller's grip on an in-flight cycle.
pub struct CycleHandle {
    id: Uuid,
    cancel_token: CancellationToken,
    progress: watch::Receiver<CycleProgress>,
    handle: JoinHandle<CycleReport>,
}

impl CycleHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// No step runs after this returns, even one already resumed and
    /// waiting for the target.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn progress(&self) -> watch::Receiver<CycleProgress> {
        self.progress.clone()
    }

    pub async fn join(self) -> Result<CycleReport> {
        let id = self.id;
        self.handle
            .await
            .map_err(|err| {
                log_error!("render cycle {id} task ended abnormally: {err}");
                err
            })
            .context("render cycle task failed to join")
    }

    /// Cancels, then waits for the task to observe it.
    pub async fn supersede(self) -> Result<CycleReport> {
        self.cancel();
        self.join().await
    }
}

async fn drive_cycle<T>(
    mut cycle: RenderCycle,
    target: SharedTarget<T>,
    idle: Arc<dyn IdleHost>,
    idle_fallback: Duration,
    cancel_token: CancellationToken,
    progress_tx: watch::Sender<CycleProgress>,
    metrics: RenderMetrics,
) -> CycleReport
where
    T: RenderTarget + Send + 'static,
{
    let started_at = Utc::now();
    let mut fallback_resumes = 0usize;
    metrics.record_start().await;

    let outcome = loop {
        let step = {
            let mut guard = target.lock().await;
            // Checked under the lock: a superseding cycle may have cleared
            // the surface while this one waited for it.
            if cancel_token.is_cancelled() {
                cycle.cancel();
            }
            cycle.step(&mut *guard)
        };

        let _ = progress_tx.send(CycleProgress {
            steps: cycle.steps(),
            records_emitted: cycle.records_emitted(),
            finished: cycle.phase().is_terminal(),
        });

        match step {
            StepOutcome::Yielded(resume_at) => {
                log_debug!(
                    "render cycle {} yielded after step {} ({:?})",
                    cycle.id(),
                    cycle.steps(),
                    resume_at
                );
            }
            StepOutcome::Done => break CycleOutcome::Completed,
            StepOutcome::Cancelled => break CycleOutcome::Cancelled,
            StepOutcome::Aborted(err) => {
                log_warn!("render cycle {} aborted: {err}", cycle.id());
                break CycleOutcome::Aborted {
                    reason: err.to_string(),
                };
            }
        }

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                cycle.cancel();
                break CycleOutcome::Cancelled;
            }
            resume = next_slot(idle.as_ref(), idle_fallback) => {
                if resume == Resume::Fallback {
                    fallback_resumes += 1;
                }
            }
        }
    };

    let _ = progress_tx.send(CycleProgress {
        steps: cycle.steps(),
        records_emitted: cycle.records_emitted(),
        finished: true,
    });

    let report = CycleReport {
        cycle_id: cycle.id(),
        outcome,
        buckets: cycle.bucket_count(),
        records: cycle.record_count(),
        records_emitted: cycle.records_emitted(),
        steps: cycle.steps(),
        fallback_resumes,
        started_at,
        finished_at: Utc::now(),
    };

    match &report.outcome {
        CycleOutcome::Completed => log_info!(
            "render cycle {} completed: {} records in {} steps ({}ms)",
            report.cycle_id,
            report.records_emitted,
            report.steps,
            report.elapsed_ms()
        ),
        CycleOutcome::Cancelled => log_info!(
            "render cycle {} cancelled after {} steps",
            report.cycle_id,
            report.steps
        ),
        CycleOutcome::Aborted { .. } => {}
    }

    metrics.record_finish(report.clone()).await;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryCatalog, Record, Selection, UnknownCategoryPolicy};
    use crate::pipeline::{DatasetPipeline, EmptySelectionPolicy};
    use crate::render::MemoryTarget;
    use crate::scheduler::idle::{NeverIdle, SignalIdle, YieldNow};

    fn grouping(dates: &[(&str, usize)]) -> Grouping {
        let records: Vec<Record> = dates
            .iter()
            .flat_map(|(date, size)| (0..*size).map(move |i| Record::new(*date, "A").with_title(format!("{i}"))))
            .collect();
        let selected: Selection = ["A".to_string()].into_iter().collect();
        DatasetPipeline::new(
            CategoryCatalog::from_keys(["A"]),
            EmptySelectionPolicy::ShowNothing,
            UnknownCategoryPolicy::OwnGroup,
        )
        .group(&records, &selected)
        .grouping
    }

    fn scheduler(idle: Arc<dyn IdleHost>, metrics: RenderMetrics) -> ChunkedScheduler {
        ChunkedScheduler::new(20, idle, Duration::from_millis(16), metrics)
    }

    #[tokio::test]
    async fn runs_to_completion_with_idle_slots() {
        let metrics = RenderMetrics::new();
        let target = Arc::new(Mutex::new(MemoryTarget::new()));
        let handle = scheduler(Arc::new(YieldNow), metrics.clone())
            .start(grouping(&[("2024-05-02", 45), ("2024-05-01", 10)]), Arc::clone(&target));

        let report = handle.join().await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.steps, 4);
        assert_eq!(report.records_emitted, 55);
        assert_eq!(report.fallback_resumes, 0);
        assert_eq!(target.lock().await.entries().count(), 55);
        assert_eq!(metrics.snapshot().await.cycles_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_timer_keeps_progress_without_idle_slots() {
        let target = Arc::new(Mutex::new(MemoryTarget::new()));
        let start = tokio::time::Instant::now();
        let handle = scheduler(Arc::new(NeverIdle), RenderMetrics::new())
            .start(grouping(&[("2024-05-02", 60)]), Arc::clone(&target));

        let report = handle.join().await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.steps, 3);
        assert_eq!(report.fallback_resumes, 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(32), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(40), "{elapsed:?}");
    }

    #[tokio::test]
    async fn cancel_stops_a_waiting_cycle() {
        let idle = SignalIdle::new();
        let target = Arc::new(Mutex::new(MemoryTarget::new()));
        let handle = ChunkedScheduler::new(
            20,
            Arc::new(idle.clone()),
            Duration::from_secs(60),
            RenderMetrics::new(),
        )
        .start(grouping(&[("2024-05-02", 100)]), Arc::clone(&target));

        let mut progress = handle.progress();
        progress.wait_for(|p| p.steps >= 1).await.unwrap();

        let report = handle.supersede().await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Cancelled);
        assert_eq!(report.records_emitted, 20);

        idle.open();
        tokio::task::yield_now().await;
        assert_eq!(target.lock().await.entries().count(), 20);
    }

    struct PanickingTarget;

    impl RenderTarget for PanickingTarget {
        fn clear(&mut self) -> Result<(), crate::errors::TargetUnavailable> {
            panic!("surface torn down");
        }

        fn append(&mut self, _unit: crate::render::RenderUnit) -> Result<(), crate::errors::TargetUnavailable> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn panicked_cycle_task_surfaces_as_join_error() {
        let handle = scheduler(Arc::new(YieldNow), RenderMetrics::new())
            .start(grouping(&[("2024-05-02", 5)]), Arc::new(Mutex::new(PanickingTarget)));

        let err = handle.join().await.unwrap_err();
        assert!(err.to_string().contains("failed to join"), "{err}");
    }

    #[tokio::test]
    async fn detached_target_aborts_quietly() {
        let idle = SignalIdle::new();
        let target = Arc::new(Mutex::new(MemoryTarget::new()));
        let handle = ChunkedScheduler::new(
            20,
            Arc::new(idle.clone()),
            Duration::from_secs(60),
            RenderMetrics::new(),
        )
        .start(grouping(&[("2024-05-02", 100)]), Arc::clone(&target));

        handle.progress().wait_for(|p| p.steps >= 1).await.unwrap();
        target.lock().await.detach();
        idle.release();

        let report = handle.join().await.unwrap();
        assert!(matches!(report.outcome, CycleOutcome::Aborted { .. }));
        assert_eq!(report.records_emitted, 20);
    }
}
