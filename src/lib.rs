//! A batched fork/join runner aiming for caller-tuned parallelism.
//!
//! Tutti runs one computation as many: a caller-supplied partition function
//! splits the input into equivalent sub-inputs, every sub-input is executed
//! concurrently as its own unit of work, and a merge function folds the
//! per-unit outputs back into a single result — always in partition order,
//! never in completion order.
//!
//! Parallelism is bounded explicitly rather than by a shared pool: units are
//! grouped into batches of at most the configured width, and the batches run
//! strictly one after another, so no more than `width` units are ever in
//! flight at once. An optional time budget is shared by every batch; a batch
//! that exhausts what the earlier batches left fails the run with a timeout
//! instead of waiting further, and the in-flight work is left to finish on
//! its own.
//!
//! ```
//! use tutti::prelude::*;
//!
//! let total = Runner::new((1..=10).collect::<Vec<u64>>())
//!     .partition_with(|numbers, parts| {
//!         let size = usize::max(1, numbers.len() / parts);
//!         numbers.chunks(size).map(<[u64]>::to_vec).collect()
//!     })
//!     .execute_with(|numbers: Vec<u64>| numbers.iter().sum::<u64>())
//!     .merge_with(|sums| sums.iter().sum::<u64>())
//!     .parts(5)?
//!     .width(2)?
//!     .run()?;
//!
//! assert_eq!(total, 55);
//! # Ok::<(), tutti::error::Error>(())
//! ```

pub mod block;
pub mod error;
pub mod latch;
pub mod runner;
pub mod unit;

pub mod prelude {
    pub use crate::{block::Blocks, error::Error, runner::Runner};
}
