//! The fork/join runner.
//!
//! A [`Runner`] owns one run's configuration: the input, the three
//! caller-supplied functions (partition, execute, merge) and the three
//! numeric knobs (part count, concurrency width, time budget). Calling
//! [`Runner::run`] drives the whole cycle: the input is split once, every
//! sub-input becomes a [`PendingUnit`], the units are grouped into batches
//! of at most `width`, the batches execute strictly one after another
//! against a shared depleting time budget, and the per-unit outputs are
//! merged back together in partition order.
//!
//! Concurrency is bounded by the batch boundaries alone: a batch dispatches
//! up to `width` units, each on its own thread, and the next batch does not
//! start until every unit of the current one has finished or the budget ran
//! out. The width is a caller-tuned ceiling, not a detected hardware limit.
//! Merging is likewise not first-finished-first-merged: outputs are always
//! collected in the order the partition function produced the sub-inputs,
//! no matter which unit completed first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::block::Blocks;
use crate::error::Error;
use crate::latch::CountLatch;
use crate::unit::{Executor, PendingUnit, UnitHandle};

// -----------------------------------------------------------------------------
// Caller-supplied functions

/// Splits one input into a collection of equivalent sub-inputs. The
/// requested count is advisory; see [`Runner::parts`].
pub type Partition<I> = Box<dyn FnOnce(I, usize) -> Vec<I>>;

/// Folds the per-unit outputs, in partition order, into the final output.
pub type Merge<O> = Box<dyn FnOnce(Vec<O>) -> O>;

// -----------------------------------------------------------------------------
// Runner

/// One fork/join run: configuration first, then a single call to
/// [`Runner::run`].
///
/// The numeric knobs are validated as they are assigned, so an invalid
/// configuration fails before any work could start. The function slots are
/// checked once at the top of `run`.
pub struct Runner<I, O> {
    /// The run's single input value, consumed by the partition function.
    input: I,
    partition: Option<Partition<I>>,
    execute: Option<Executor<I, O>>,
    merge: Option<Merge<O>>,
    /// How many sub-inputs to ask the partition function for.
    parts: usize,
    /// Maximum number of units in flight at once, which is the batch size.
    width: usize,
    /// Overall time budget in milliseconds, shared by every batch wait.
    /// Zero waits without bound.
    budget_millis: u64,
}

impl<I, O> Runner<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a runner over `input` with the default knobs: two parts, one
    /// unit in flight at a time, no time budget.
    pub fn new(input: I) -> Runner<I, O> {
        Runner {
            input,
            partition: None,
            execute: None,
            merge: None,
            parts: 2,
            width: 1,
            budget_millis: 0,
        }
    }

    /// Supplies the partition function. It is called exactly once per run,
    /// with the input and the configured part count.
    pub fn partition_with<F>(mut self, partition: F) -> Runner<I, O>
    where
        F: FnOnce(I, usize) -> Vec<I> + 'static,
    {
        self.partition = Some(Box::new(partition));
        self
    }

    /// Supplies the per-unit executor, shared by every unit of the run.
    pub fn execute_with<F>(mut self, execute: F) -> Runner<I, O>
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        self.execute = Some(Arc::new(execute));
        self
    }

    /// Supplies the merge function. It receives the unit outputs in
    /// partition order, regardless of completion order.
    pub fn merge_with<F>(mut self, merge: F) -> Runner<I, O>
    where
        F: FnOnce(Vec<O>) -> O + 'static,
    {
        self.merge = Some(Box::new(merge));
        self
    }

    /// Sets how many sub-inputs the partition function is asked for. Fails
    /// with [`Error::Configuration`] below two.
    ///
    /// The count is advisory: a partition strategy that cannot split evenly
    /// may return more or fewer sub-inputs, and the runner proceeds with
    /// whatever it actually got.
    pub fn parts(mut self, parts: usize) -> Result<Runner<I, O>, Error> {
        if parts < 2 {
            return Err(Error::Configuration(
                "an input cannot be split into fewer than two parts",
            ));
        }
        self.parts = parts;
        Ok(self)
    }

    /// Sets the concurrency width: the maximum number of units in flight at
    /// once, which is also the batch size. Fails with
    /// [`Error::Configuration`] at zero.
    pub fn width(mut self, width: usize) -> Result<Runner<I, O>, Error> {
        if width == 0 {
            return Err(Error::Configuration(
                "the concurrency width cannot be less than one",
            ));
        }
        self.width = width;
        Ok(self)
    }

    /// Sets the overall time budget in milliseconds. The budget is shared:
    /// each batch's wall time is paid out of what the previous batches left.
    /// Zero, the default, waits without bound.
    pub fn budget_millis(mut self, millis: u64) -> Runner<I, O> {
        self.budget_millis = millis;
        self
    }

    /// Runs the whole cycle and returns the merged output.
    ///
    /// The runner is consumed: a run happens exactly once, and there is
    /// nothing to reuse afterwards. On any error the run aborts with nothing
    /// merged. Units that were already started keep running detached — a
    /// timeout stops the waiting, not the work.
    pub fn run(self) -> Result<O, Error> {
        let Runner {
            input,
            partition,
            execute,
            merge,
            parts,
            width,
            budget_millis,
        } = self;

        let partition =
            partition.ok_or(Error::Configuration("no partition function was supplied"))?;
        let execute = execute.ok_or(Error::Configuration("no executor function was supplied"))?;
        let merge = merge.ok_or(Error::Configuration("no merge function was supplied"))?;

        // Split the input. The part count is advisory, so the unit count is
        // whatever the partition function actually produced.
        let units: Vec<PendingUnit<I, O>> = partition(input, parts)
            .into_iter()
            .map(|sub_input| PendingUnit::new(sub_input, Arc::clone(&execute)))
            .collect();
        let unit_count = units.len();

        // Group the units into batches of at most `width`. The ranges are
        // captured up front so the owned vector can be drained in order.
        let blocks = Blocks::new(&units, width)?;
        let batch_ranges: Vec<_> = (0..blocks.count()).filter_map(|i| blocks.range(i)).collect();
        debug!(
            "dispatching {} units in {} batches of up to {} in flight",
            unit_count,
            batch_ranges.len(),
            width
        );

        let mut budget = (budget_millis > 0).then(|| Duration::from_millis(budget_millis));
        let mut units = units.into_iter();
        let mut outputs: Vec<O> = Vec::with_capacity(unit_count);

        for (batch, range) in batch_ranges.iter().enumerate() {
            let latch = Arc::new(CountLatch::with_count(range.len()));
            let started = Instant::now();

            let handles: Vec<UnitHandle<O>> = units
                .by_ref()
                .take(range.len())
                .map(|unit| unit.dispatch(Arc::clone(&latch)))
                .collect();

            match budget {
                None => latch.wait(),
                Some(remaining) => {
                    if !latch.wait_for(remaining) {
                        return Err(Error::Timeout {
                            batch,
                            elapsed: started.elapsed(),
                        });
                    }
                    // An exhausted budget clamps to zero, and the next batch
                    // then times out immediately unless it is already done.
                    budget = Some(remaining.saturating_sub(started.elapsed()));
                }
            }
            trace!(
                "batch {}/{} finished in {:?}, budget left {:?}",
                batch + 1,
                batch_ranges.len(),
                started.elapsed(),
                budget
            );

            // Every unit of this batch has stored its outcome. Surface the
            // first panic in partition order, otherwise keep the outputs.
            for (offset, handle) in handles.into_iter().enumerate() {
                match handle.into_outcome() {
                    Some(Ok(output)) => outputs.push(output),
                    Some(Err(message)) => {
                        return Err(Error::Execution {
                            index: range.start + offset,
                            message,
                        });
                    }
                    None => unreachable!("the batch latch opened before a unit stored its outcome"),
                }
            }
        }

        Ok(merge(outputs))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Runner<Vec<u64>, u64> {
        Runner::new(vec![1u64, 2, 3, 4])
            .partition_with(|numbers: Vec<u64>, _| numbers.into_iter().map(|n| vec![n]).collect())
            .execute_with(|numbers: Vec<u64>| numbers.iter().sum::<u64>())
            .merge_with(|sums: Vec<u64>| sums.iter().sum())
    }

    #[test]
    fn rejects_fewer_than_two_parts() {
        assert!(matches!(
            configured().parts(1),
            Err(Error::Configuration(_))
        ));
        assert!(configured().parts(2).is_ok());
    }

    #[test]
    fn rejects_zero_width_before_run_is_callable() {
        assert!(matches!(configured().width(0), Err(Error::Configuration(_))));
        assert!(configured().width(1).is_ok());
    }

    #[test]
    fn run_requires_every_function() {
        let missing_partition = Runner::new(vec![1u64])
            .execute_with(|numbers: Vec<u64>| numbers.iter().sum::<u64>())
            .merge_with(|sums: Vec<u64>| sums.iter().sum());
        assert!(matches!(
            missing_partition.run(),
            Err(Error::Configuration("no partition function was supplied"))
        ));

        let missing_executor: Runner<Vec<u64>, u64> = Runner::new(vec![1u64])
            .partition_with(|numbers: Vec<u64>, _| vec![numbers])
            .merge_with(|sums: Vec<u64>| sums.iter().sum());
        assert!(matches!(
            missing_executor.run(),
            Err(Error::Configuration("no executor function was supplied"))
        ));

        let missing_merge = Runner::new(vec![1u64])
            .partition_with(|numbers: Vec<u64>, _| vec![numbers])
            .execute_with(|numbers: Vec<u64>| numbers.iter().sum::<u64>());
        assert!(matches!(
            missing_merge.run(),
            Err(Error::Configuration("no merge function was supplied"))
        ));
    }

    #[test]
    fn merges_in_partition_order_at_the_default_width() {
        assert_eq!(configured().run().unwrap(), 10);
    }
}
