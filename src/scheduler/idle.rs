use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

pub type IdleFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Host-provided low-priority execution slot. The returned future resolves
/// when the host is idle enough to run one more render step. It may never
/// resolve; the scheduler races it against a timed fallback.
pub trait IdleHost: Send + Sync {
    fn idle_slot(&self) -> IdleFuture;
}

/// How a yielded step was resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Idle,
    Fallback,
}

/// Waits for the next idle slot, giving up after `fallback`.
pub async fn next_slot(host: &dyn IdleHost, fallback: Duration) -> Resume {
    let slot = host.idle_slot();
    tokio::select! {
        _ = slot => Resume::Idle,
        _ = tokio::time::sleep(fallback) => Resume::Fallback,
    }
}

/// Treats every scheduler turn as idle: resumes after one `yield_now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldNow;

impl IdleHost for YieldNow {
    fn idle_slot(&self) -> IdleFuture {
        Box::pin(tokio::task::yield_now())
    }
}

/// A host with no idle primitive at all. Every resume goes through the
/// fallback timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverIdle;

impl IdleHost for NeverIdle {
    fn idle_slot(&self) -> IdleFuture {
        Box::pin(std::future::pending())
    }
}

/// Idle slots granted explicitly by the host's event loop, one per
/// [`SignalIdle::release`]. [`SignalIdle::open`] turns it into a host that
/// is always idle.
#[derive(Debug, Default, Clone)]
pub struct SignalIdle {
    notify: Arc<Notify>,
    open: Arc<AtomicBool>,
}

impl SignalIdle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants one slot. A release with no waiter is kept for the next one.
    pub fn release(&self) {
        self.notify.notify_one();
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl IdleHost for SignalIdle {
    fn idle_slot(&self) -> IdleFuture {
        let notify = Arc::clone(&self.notify);
        let open = Arc::clone(&self.open);
        Box::pin(async move {
            let notified = notify.notified();
            tokio::pin!(notified);
            // Registered before the flag check so a concurrent `open` is not missed.
            notified.as_mut().enable();
            if open.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        })
    }
}
