//! This module defines the unit of work the runner dispatches, split into an
//! explicit two-phase value.
//!
//! A [`PendingUnit`] is an (input, executor) pair that has not started. When
//! its batch is dispatched, the runner materializes it with
//! [`PendingUnit::dispatch`] into a [`UnitHandle`], which starts the
//! computation on its own thread. The handle is the only way to observe the
//! outcome. The thread itself is detached and never joined, so a unit that
//! outlives its batch's time budget finishes (or panics) on its own with
//! nobody waiting on it.
//!
//! A unit is created once and dispatched at most once; there is no way to
//! restart one.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::latch::CountLatch;

// -----------------------------------------------------------------------------
// Executor

/// The caller-supplied per-unit computation. One executor is shared by every
/// unit of a run, so it must not rely on exclusive access to anything except
/// the sub-input it is handed.
pub type Executor<I, O> = Arc<dyn Fn(I) -> O + Send + Sync>;

/// What a finished unit left behind: its output, or the message of the panic
/// that killed it.
pub type Outcome<O> = Result<O, String>;

// -----------------------------------------------------------------------------
// Pending unit

/// A unit of work that has not started yet: one input value paired with the
/// run's shared executor.
pub struct PendingUnit<I, O> {
    /// The sub-input, owned exclusively by this unit.
    input: I,
    /// The shared executor that will turn the input into an output.
    executor: Executor<I, O>,
}

impl<I, O> PendingUnit<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Pairs an input with the shared executor.
    pub fn new(input: I, executor: Executor<I, O>) -> PendingUnit<I, O> {
        PendingUnit { input, executor }
    }

    /// The input this unit will be run on.
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Consumes the unit and starts it on its own thread, returning the
    /// handle its outcome will arrive through.
    ///
    /// The thread runs the executor under `catch_unwind`, stores the outcome
    /// in the handle's slot, and only then counts down `latch` — so once the
    /// latch opens, every outcome of the batch is already in place. The
    /// thread is detached; dropping the handle does not stop it.
    pub fn dispatch(self, latch: Arc<CountLatch>) -> UnitHandle<O> {
        let slot = Arc::new(Mutex::new(None));
        let outcome_slot = Arc::clone(&slot);
        let PendingUnit { input, executor } = self;

        thread::spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor(input)))
                .map_err(|payload| panic_message(payload.as_ref()));
            *outcome_slot.lock() = Some(outcome);
            latch.count_down();
        });

        UnitHandle { slot }
    }
}

// -----------------------------------------------------------------------------
// Unit handle

/// The started half of a unit: holds the slot its thread writes the outcome
/// into.
pub struct UnitHandle<O> {
    slot: Arc<Mutex<Option<Outcome<O>>>>,
}

impl<O> UnitHandle<O> {
    /// Takes the unit's outcome. `None` means the unit has not finished yet;
    /// after a successful wait on the batch latch this is always `Some`.
    pub fn into_outcome(self) -> Option<Outcome<O>> {
        self.slot.lock().take()
    }
}

// -----------------------------------------------------------------------------
// Panic payloads

/// Renders a panic payload as a human-readable message, through the usual
/// `&str`-then-`String` downcast.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn dispatched_unit_delivers_its_output() {
        let executor: Executor<u64, u64> = Arc::new(|n| n * 2);
        let latch = Arc::new(CountLatch::with_count(1));
        let handle = PendingUnit::new(21, executor).dispatch(Arc::clone(&latch));

        latch.wait();
        assert_eq!(handle.into_outcome(), Some(Ok(42)));
    }

    #[test]
    fn panicking_unit_still_opens_the_latch() {
        let executor: Executor<u64, u64> = Arc::new(|_| panic!("unit exploded"));
        let latch = Arc::new(CountLatch::with_count(1));
        let handle = PendingUnit::new(0, executor).dispatch(Arc::clone(&latch));

        assert!(latch.wait_for(Duration::from_secs(5)));
        match handle.into_outcome() {
            Some(Err(message)) => assert!(message.contains("unit exploded")),
            other => panic!("expected a stored panic, got {other:?}"),
        }
    }
}
