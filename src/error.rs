//! The crate-wide error type.
//!
//! Every failure a run can produce is terminal: the runner never retries and
//! never returns a partially merged result. Callers that want a retry policy
//! build it on top of [`Runner::run`](crate::runner::Runner::run).

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while blocking a sequence or driving a run.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument outside its valid range, such as a zero block size.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The runner was configured incorrectly. Raised eagerly: by a setter
    /// handed an out-of-range value, or by `run()` before any work starts
    /// when a required function was never supplied.
    #[error("configuration error: {0}")]
    Configuration(&'static str),

    /// A batch failed to finish inside the remaining time budget. Units that
    /// were already started keep running detached; the runner only stops
    /// waiting for them.
    #[error("time budget exhausted while waiting on batch {batch} (gave up after {elapsed:?})")]
    Timeout { batch: usize, elapsed: Duration },

    /// A unit executor panicked. `index` is the unit's position in partition
    /// order and `message` the downcast panic payload.
    #[error("unit {index} panicked: {message}")]
    Execution { index: usize, message: String },
}
