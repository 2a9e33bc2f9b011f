//! The classic demo scenario: one hundred numbers split into fifty advisory
//! parts at width one hundred. Each unit sums its group after a simulated
//! per-element delay, takes a ticket from a caller-supplied execution
//! counter so its report line can be told apart from its siblings, and the
//! merge stitches the groups back together in the original order.
//!
//! Run with `cargo run --example sum`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tutti::prelude::*;

/// A caller-owned monotonic ticket dispenser, threaded through the executor
/// closure instead of living in ambient global state.
struct ExecutionCounter(AtomicU64);

impl ExecutionCounter {
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Clone, Debug)]
struct Numbers(Vec<i64>);

#[derive(Debug)]
struct Summed {
    numbers: Vec<i64>,
    sum: i64,
}

fn main() -> Result<(), Error> {
    let counter = Arc::new(ExecutionCounter(AtomicU64::new(0)));
    let tickets = Arc::clone(&counter);

    let started = Instant::now();
    let result = Runner::new(Numbers((1..=100).collect()))
        .partition_with(|input: Numbers, parts| {
            let size = usize::max(1, input.0.len() / parts);
            input
                .0
                .chunks(size)
                .map(|chunk| Numbers(chunk.to_vec()))
                .collect()
        })
        .execute_with(move |input: Numbers| {
            let ticket = tickets.next();
            let begun = Instant::now();
            let mut sum = 0;
            for number in &input.0 {
                // Simulated per-element latency.
                thread::sleep(Duration::from_millis(10));
                sum += number;
            }
            println!("execution [{ticket}] finished in {:?}", begun.elapsed());
            Summed {
                numbers: input.0,
                sum,
            }
        })
        .merge_with(|outputs: Vec<Summed>| {
            let mut merged = Summed {
                numbers: Vec::new(),
                sum: 0,
            };
            for output in outputs {
                merged.numbers.extend(output.numbers);
                merged.sum += output.sum;
            }
            merged
        })
        .parts(50)?
        .width(100)?
        .run()?;

    println!(
        "sum = {} over {} numbers after {} executions in {:?}",
        result.sum,
        result.numbers.len(),
        counter.0.load(Ordering::Relaxed),
        started.elapsed()
    );
    Ok(())
}
