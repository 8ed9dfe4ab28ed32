//! ring_mpmc - bounded lock-free MPMC ring queue
//!
//! A fixed-capacity circular array of slots, each tagged with a sequence
//! stamp that records which generation of producer or consumer owns it.
//! Producers claim positions by CAS on `tail`, consumers by CAS on `head`;
//! the stamp hands every value from exactly one producer to exactly one
//! consumer with release/acquire ordering. No locks, no condition variables:
//! full and empty queues are waited out with a spin-then-sleep
//! [backoff](BackoffConfig) bounded by a [`Patience`].
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use ring_mpmc::{Patience, RingQueue};
//!
//! let queue = Arc::new(RingQueue::<u64>::new(1024).unwrap());
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..100 {
//!             queue.offer_with(i, Patience::Forever).unwrap();
//!         }
//!     })
//! };
//!
//! let mut sum = 0;
//! for _ in 0..100 {
//!     sum += queue.poll_with(Patience::Forever).unwrap();
//! }
//! producer.join().unwrap();
//! assert_eq!(sum, (0..100).sum());
//! ```
#![warn(missing_docs)]

mod backoff;
mod error;
mod queue;
mod slot;
mod sync;
mod trace;

pub use backoff::{BackoffConfig, Patience};
pub use error::{InvalidCapacity, OfferError};
pub use queue::RingQueue;
pub use trace::init_tracing;
