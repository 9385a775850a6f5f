use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::log_debug;

/// Coalesces bursts of triggers into one, fired `quiet_period` after the
/// last [`RenderDebouncer::schedule`] call with that call's payload.
///
/// At most one timer is pending at any time. A trigger that fired but was
/// not yet taken by [`RenderDebouncer::fired`] is dropped if a newer one is
/// scheduled in the meantime.
pub struct RenderDebouncer<T> {
    quiet_period: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    fired_tx: mpsc::UnboundedSender<(u64, T)>,
    fired_rx: mpsc::UnboundedReceiver<(u64, T)>,
}

impl<T: Send + 'static> RenderDebouncer<T> {
    pub fn new(quiet_period: Duration) -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            quiet_period,
            generation: 0,
            pending: None,
            fired_tx,
            fired_rx,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Replaces any pending trigger with `trigger` and restarts the timer.
    pub fn schedule(&mut self, trigger: T) {
        self.cancel();

        self.generation += 1;
        let generation = self.generation;
        let quiet_period = self.quiet_period;
        let fired_tx = self.fired_tx.clone();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            let _ = fired_tx.send((generation, trigger));
        }));
        log_debug!("debounce generation {generation} scheduled");
    }

    /// Drops the pending trigger, fired or not. Returns whether a timer was
    /// still running.
    pub fn cancel(&mut self) -> bool {
        // Anything already sent carries an older generation from here on.
        self.generation += 1;
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Outstanding timers: 0 or 1.
    pub fn pending_count(&self) -> usize {
        self.pending
            .as_ref()
            .map(|handle| usize::from(!handle.is_finished()))
            .unwrap_or(0)
    }

    /// Resolves with the payload of the next trigger that survives the quiet
    /// period. Never resolves while nothing is scheduled.
    pub async fn fired(&mut self) -> T {
        loop {
            // `fired_tx` lives in `self`, so the channel never closes.
            let Some((generation, trigger)) = self.fired_rx.recv().await else {
                return std::future::pending().await;
            };
            if generation == self.generation {
                self.pending = None;
                return trigger;
            }
            log_debug!("dropping stale debounce generation {generation}");
        }
    }
}
