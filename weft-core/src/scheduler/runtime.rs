//! Idle-time driver.
//!
//! The host decides when the engine may run. It exposes a single hook,
//! [`IdleHost::request_idle_work`], that schedules one callback for the
//! next idle period and passes it a [`Deadline`]. [`Runtime`] installs a
//! callback that runs one tick of the work loop and then requests the next
//! idle period, forever.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error};

use super::deadline::Deadline;
use super::engine::{Engine, TickOutcome};
use crate::element::Element;
use crate::host::{HostAdapter, NodeHandle};

/// A callback scheduled for the next idle period.
pub type IdleCallback = Box<dyn FnOnce(&dyn Deadline)>;

/// The scheduling hook a host provides.
pub trait IdleHost {
    /// Run `callback` once, the next time the host is idle.
    fn request_idle_work(&self, callback: IdleCallback);
}

impl<T: IdleHost + ?Sized> IdleHost for Arc<T> {
    fn request_idle_work(&self, callback: IdleCallback) {
        (**self).request_idle_work(callback)
    }
}

/// An idle host driven by hand.
///
/// Requests queue up until [`run_idle`](Self::run_idle) is called, which
/// runs the oldest one with the given deadline.
#[derive(Default)]
pub struct ManualIdleHost {
    pending: Mutex<VecDeque<IdleCallback>>,
}

impl ManualIdleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting for an idle period.
    pub fn pending_requests(&self) -> usize {
        self.pending.lock().len()
    }

    /// Run the oldest pending callback. Returns `false` if none was queued.
    pub fn run_idle(&self, deadline: &dyn Deadline) -> bool {
        // The lock must be released before the callback re-requests.
        let callback = self.pending.lock().pop_front();
        match callback {
            Some(callback) => {
                callback(deadline);
                true
            }
            None => false,
        }
    }
}

impl IdleHost for ManualIdleHost {
    fn request_idle_work(&self, callback: IdleCallback) {
        self.pending.lock().push_back(callback);
    }
}

/// Counters kept by a [`Runtime`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub ticks: u64,
    pub units_performed: u64,
    pub commits: u64,
    pub failed_passes: u64,
}

/// An engine wired to an idle host.
///
/// Cloning a runtime yields another handle to the same engine, which is how
/// event handlers trigger re-renders.
pub struct Runtime<H: HostAdapter> {
    engine: Arc<Mutex<Engine<H>>>,
    stats: Arc<Mutex<RuntimeStats>>,
}

impl<H: HostAdapter> Clone for Runtime<H> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<H: HostAdapter + 'static> Runtime<H> {
    /// Take ownership of `engine` and request the first idle period.
    pub fn start<I>(engine: Engine<H>, idle: Arc<I>) -> Self
    where
        I: IdleHost + ?Sized + 'static,
    {
        let runtime = Self {
            engine: Arc::new(Mutex::new(engine)),
            stats: Arc::new(Mutex::new(RuntimeStats::default())),
        };
        schedule_tick(
            Arc::clone(&runtime.engine),
            Arc::clone(&runtime.stats),
            idle,
        );
        debug!("runtime started");
        runtime
    }

    /// Schedule a render; the work happens during later idle periods.
    pub fn render(&self, element: Element, container: NodeHandle) {
        self.engine.lock().render(element, container);
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// Must not be called from inside an idle callback.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine<H>) -> R) -> R {
        f(&mut *self.engine.lock())
    }

    pub fn stats(&self) -> RuntimeStats {
        *self.stats.lock()
    }
}

fn schedule_tick<H, I>(
    engine: Arc<Mutex<Engine<H>>>,
    stats: Arc<Mutex<RuntimeStats>>,
    idle: Arc<I>,
) where
    H: HostAdapter + 'static,
    I: IdleHost + ?Sized + 'static,
{
    let next_idle = Arc::clone(&idle);
    idle.request_idle_work(Box::new(move |deadline: &dyn Deadline| {
        let outcome = engine.lock().work_loop(deadline);
        record(&stats, outcome);
        schedule_tick(engine, stats, next_idle);
    }));
}

fn record(stats: &Mutex<RuntimeStats>, outcome: crate::error::Result<TickOutcome>) {
    let mut stats = stats.lock();
    stats.ticks += 1;
    match outcome {
        Ok(outcome) => {
            stats.units_performed += outcome.units_performed as u64;
            if outcome.committed.is_some() {
                stats.commits += 1;
            }
        }
        Err(err) => {
            stats.failed_passes += 1;
            error!(error = %err, "reconciliation pass failed");
        }
    }
}
