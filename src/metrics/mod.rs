mod types;

pub use types::{CycleOutcome, CycleReport, MetricsSnapshot};

use std::sync::Arc;
use tokio::sync::Mutex;

const MAX_RECENT_CYCLES: usize = 20;

/// Counters shared between the session and its running cycles.
#[derive(Clone, Default)]
pub struct RenderMetrics {
    inner: Arc<Mutex<MetricsState>>,
}

#[derive(Default)]
struct MetricsState {
    recent_cycles: Vec<CycleReport>,
    cycles_started: u64,
    cycles_completed: u64,
    cycles_cancelled: u64,
    cycles_aborted: u64,
    steps: u64,
    fallback_resumes: u64,
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_start(&self) {
        self.inner.lock().await.cycles_started += 1;
    }

    pub async fn record_finish(&self, report: CycleReport) {
        let mut state = self.inner.lock().await;

        match report.outcome {
            CycleOutcome::Completed => state.cycles_completed += 1,
            CycleOutcome::Cancelled => state.cycles_cancelled += 1,
            CycleOutcome::Aborted { .. } => state.cycles_aborted += 1,
        }
        state.steps += report.steps as u64;
        state.fallback_resumes += report.fallback_resumes as u64;

        state.recent_cycles.push(report);
        if state.recent_cycles.len() > MAX_RECENT_CYCLES {
            state.recent_cycles.remove(0);
        }
    }

    pub async fn snapshot(&self) -> MetricsSnapshot {
        let state = self.inner.lock().await;
        MetricsSnapshot {
            recent_cycles: state.recent_cycles.clone(),
            cycles_started: state.cycles_started,
            cycles_completed: state.cycles_completed,
            cycles_cancelled: state.cycles_cancelled,
            cycles_aborted: state.cycles_aborted,
            steps: state.steps,
            fallback_resumes: state.fallback_resumes,
        }
    }

    pub async fn reset(&self) {
        *self.inner.lock().await = MetricsState::default();
    }
}
