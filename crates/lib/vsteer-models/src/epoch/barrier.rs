use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use crate::telemetry::TelemetryRecord;

/// Everything the collectors handed in during one monitoring run, one batch per collector in
/// the order the contributions arrived.
pub type RawTelemetry = Vec<Vec<TelemetryRecord>>;

/// The phase that runs once every collector of the run has contributed.
pub trait EpochHook: Send {
    type Output;
    fn on_epoch_complete(&mut self, raw: RawTelemetry) -> Self::Output;
}

#[derive(Debug)]
struct Shared<H> {
    store: RawTelemetry,
    hook: H,
}

/// One-shot completion barrier for a monitoring run.
///
/// Each collector calls [`EpochBarrier::contribute`] exactly once with its epoch buffer. The
/// append, the counter increment and the threshold check happen while the store lock is held,
/// and the hook runs under the same lock. Only the contribution whose increment returns the
/// configured total fires the hook, so it runs exactly once per run no matter how the
/// contributions interleave. The counter only grows; starting another run needs either a new
/// barrier or [`EpochBarrier::reset`], which takes `&mut self` and therefore cannot race with
/// contributions.
#[derive(Debug)]
pub struct EpochBarrier<H: EpochHook> {
    total: u32,
    completed: AtomicU32,
    shared: Mutex<Shared<H>>,
}

impl<H: EpochHook> EpochBarrier<H> {
    pub fn new(total: u32, hook: H) -> Self {
        if total == 0 {
            warn!("Epoch barrier created for zero collectors, it will never fire");
        }
        Self {
            total,
            completed: AtomicU32::new(0),
            shared: Mutex::new(Shared {
                store: RawTelemetry::new(),
                hook,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<H>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.completed() >= self.total && self.total > 0
    }

    /// Records still waiting for the barrier to fire.
    pub fn pending_records(&self) -> usize {
        self.lock().store.iter().map(Vec::len).sum()
    }

    /// Hands in the epoch buffer of one collector. Returns the hook's output for the
    /// contribution that completes the run and `None` for every other one.
    pub fn contribute(&self, batch: Vec<TelemetryRecord>) -> Option<H::Output> {
        let mut shared = self.lock();
        let records = batch.len();
        shared.store.push(batch);
        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        info!(
            "Collector contributed {} records, {} of {} collectors stopped",
            records, done, self.total
        );

        if done > self.total {
            warn!("Contribution after the run completed, kept until the next reset");
            return None;
        }
        if done < self.total {
            return None;
        }

        let raw = std::mem::take(&mut shared.store);
        Some(shared.hook.on_epoch_complete(raw))
    }

    /// Gives read access to the hook, e.g. to inspect the outcome of the last run.
    pub fn inspect<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.lock().hook)
    }

    /// Prepares the barrier for the next run: the counter goes back to zero and any late
    /// contributions are discarded.
    pub fn reset(&mut self) {
        *self.completed.get_mut() = 0;
        let shared = self.shared.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !shared.store.is_empty() {
            warn!(
                "Discarding {} late contributions on reset",
                shared.store.len()
            );
        }
        shared.store.clear();
    }

    pub fn into_hook(self) -> H {
        self.shared
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .hook
    }
}
