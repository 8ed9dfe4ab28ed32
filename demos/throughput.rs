//! Throughput demo: P producers and C consumers share one queue.
//!
//! Configure with environment variables:
//! `CAP` (queue capacity, default 4096), `P` (producers, default 4),
//! `C` (consumers, default 4), `N` (messages per producer, default 200000).
//!
//! ```text
//! CAP=1024 P=2 C=2 cargo run --release --example throughput
//! ```

use ring_mpmc::{Patience, RingQueue};
use std::env;
use std::error::Error;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Reads `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| format!("invalid {key}={raw:?}: {e}").into()),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    ring_mpmc::init_tracing();

    let capacity: usize = env_or("CAP", 1 << 12)?;
    let producers: u64 = env_or("P", 4)?;
    let consumers: usize = env_or("C", 4)?;
    let per_producer: u64 = env_or("N", 200_000)?;

    let queue = Arc::new(RingQueue::<u64>::new(capacity)?);
    let total = per_producer * producers;
    let consumed = Arc::new(AtomicU64::new(0));
    let mut handles = vec![];

    let start = Instant::now();

    for id in 0..producers {
        let q = queue.clone();
        handles.push(thread::Builder::new().name(format!("prod-{id}")).spawn(move || {
            for i in 0..per_producer {
                let stamp = (id << 48) | i;
                // Forever never reports Full.
                let _ = q.offer_with(stamp, Patience::Forever);
            }
        })?);
    }

    for id in 0..consumers {
        let q = queue.clone();
        let consumed = consumed.clone();
        handles.push(thread::Builder::new().name(format!("cons-{id}")).spawn(move || {
            while consumed.load(Ordering::Relaxed) < total {
                if q.poll().is_some() {
                    consumed.fetch_add(1, Ordering::Relaxed);
                }
            }
        })?);
    }

    for h in handles {
        h.join().map_err(|_| "worker thread panicked")?;
    }

    let secs = start.elapsed().as_secs_f64();
    println!(
        "Queue cap={} P={} C={} -> processed {} in {:.3} s ({:.0} msg/s)",
        queue.capacity(),
        producers,
        consumers,
        total,
        secs,
        total as f64 / secs
    );

    Ok(())
}
