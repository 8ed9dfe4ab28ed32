//! The bounded MPMC ring queue.

use std::fmt;

use crossbeam_utils::CachePadded;

use crate::backoff::{self, Backoff, BackoffConfig, Patience};
use crate::error::{InvalidCapacity, OfferError};
use crate::slot::{Phase, Slot};
use crate::sync::{AtomicU64, Ordering};
use crate::trace::{debug, trace};

/// Bounded lock-free multi-producer multi-consumer queue (Vyukov-style).
///
/// Producers and consumers race on two monotonically increasing counters,
/// `tail` and `head`, with compare-and-swap. Winning a CAS grants exclusive
/// access to one slot for one generation; the slot's sequence stamp then
/// hands the value from producer to consumer.
///
/// When the queue looks full (or empty) the operation backs off according
/// to its [`BackoffConfig`] and gives up once its [`Patience`] runs out.
///
/// ```
/// use ring_mpmc::RingQueue;
///
/// let queue = RingQueue::<&str>::new(8).unwrap();
/// queue.offer("job").unwrap();
/// assert_eq!(queue.poll(), Some("job"));
/// assert_eq!(queue.poll(), None);
/// ```
pub struct RingQueue<T> {
    /// Next position to consume.
    head: CachePadded<AtomicU64>,
    /// Next position to produce.
    tail: CachePadded<AtomicU64>,
    slots: Box<[Slot<T>]>,
    capacity: usize,
    mask: u64,
    config: BackoffConfig,
}

// SAFETY: values move between threads through the slot protocol only; each
// one is owned by exactly one thread at a time.
unsafe impl<T: Send> Send for RingQueue<T> {}
unsafe impl<T: Send> Sync for RingQueue<T> {}

impl<T> RingQueue<T> {
    /// Creates a queue with room for `capacity` values and the default
    /// [`BackoffConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCapacity`] unless `capacity` is a power of two and at
    /// least 2.
    pub fn new(capacity: usize) -> Result<Self, InvalidCapacity> {
        Self::with_config(capacity, BackoffConfig::default())
    }

    /// Creates a queue with an explicit backoff configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCapacity`] unless `capacity` is a power of two and at
    /// least 2.
    pub fn with_config(capacity: usize, config: BackoffConfig) -> Result<Self, InvalidCapacity> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(InvalidCapacity { capacity });
        }

        let slots = (0..capacity as u64).map(Slot::new).collect();
        debug!(capacity, ?config, "ring queue allocated");

        Ok(Self {
            head: CachePadded::new(AtomicU64::new(0)),
            tail: CachePadded::new(AtomicU64::new(0)),
            slots,
            capacity,
            mask: capacity as u64 - 1,
            config,
        })
    }

    /// Enqueues a value, backing off while the queue is full.
    ///
    /// Accepts a `T` or an `Option<T>`; offering `None` is rejected without
    /// touching the queue.
    ///
    /// # Errors
    ///
    /// - [`OfferError::InvalidArgument`] if the value is absent.
    /// - [`OfferError::Full`] if the queue stayed full for the configured
    ///   patience. The value is returned inside the error.
    #[inline]
    pub fn offer(&self, value: impl Into<Option<T>>) -> Result<(), OfferError<T>> {
        self.offer_with(value, self.config.get_patience())
    }

    /// Single attempt at enqueueing: fails as soon as the queue looks full.
    ///
    /// # Errors
    ///
    /// Same as [`offer`](Self::offer).
    #[inline]
    pub fn try_offer(&self, value: impl Into<Option<T>>) -> Result<(), OfferError<T>> {
        self.offer_with(value, Patience::Attempts(0))
    }

    /// Enqueues with an explicit patience instead of the configured one.
    ///
    /// # Errors
    ///
    /// Same as [`offer`](Self::offer).
    pub fn offer_with(
        &self,
        value: impl Into<Option<T>>,
        patience: Patience,
    ) -> Result<(), OfferError<T>> {
        let value: Option<T> = value.into();
        let Some(value) = value else {
            return Err(OfferError::InvalidArgument);
        };

        let mut backoff = Backoff::new(&self.config, patience);
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let slot = self.slot(tail);

            match slot.phase(tail) {
                Phase::Ready => {
                    if self
                        .tail
                        .compare_exchange_weak(
                            tail,
                            tail.wrapping_add(1),
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        // SAFETY: we own position `tail` and `slot` is its slot.
                        unsafe { slot.publish(tail, value) };
                        return Ok(());
                    }
                }
                Phase::Behind => {
                    if !backoff.snooze() {
                        trace!(tail, "offer gave up: queue full");
                        return Err(OfferError::Full(value));
                    }
                }
                Phase::Ahead => backoff::contended(),
            }
        }
    }

    /// Dequeues a value, backing off while the queue is empty.
    ///
    /// Returns `None` if the queue stayed empty for the configured patience.
    #[inline]
    pub fn poll(&self) -> Option<T> {
        self.poll_with(self.config.get_patience())
    }

    /// Single attempt at dequeueing: returns `None` as soon as the queue
    /// looks empty.
    #[inline]
    pub fn try_poll(&self) -> Option<T> {
        self.poll_with(Patience::Attempts(0))
    }

    /// Dequeues with an explicit patience instead of the configured one.
    pub fn poll_with(&self, patience: Patience) -> Option<T> {
        let mut backoff = Backoff::new(&self.config, patience);
        loop {
            let head = self.head.load(Ordering::Acquire);
            let slot = self.slot(head);

            match slot.phase(head.wrapping_add(1)) {
                Phase::Ready => {
                    if self
                        .head
                        .compare_exchange_weak(
                            head,
                            head.wrapping_add(1),
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        // SAFETY: we own position `head` and saw it published.
                        return Some(unsafe { slot.take(head, self.capacity as u64) });
                    }
                }
                Phase::Behind => {
                    if !backoff.snooze() {
                        trace!(head, "poll gave up: queue empty");
                        return None;
                    }
                }
                Phase::Ahead => backoff::contended(),
            }
        }
    }

    /// Number of slots. Fixed at construction.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of claimed but not yet consumed positions.
    ///
    /// Only a snapshot while other threads are active.
    pub fn len(&self) -> usize {
        loop {
            let tail = self.tail.load(Ordering::Acquire);
            let head = self.head.load(Ordering::Acquire);
            // Re-read tail so head and tail come from one moment.
            if self.tail.load(Ordering::Acquire) == tail {
                let len = tail.wrapping_sub(head);
                return len.min(self.capacity as u64) as usize;
            }
        }
    }

    /// Returns `true` if nothing is waiting to be consumed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if every slot is claimed.
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// The backoff configuration this queue was built with.
    pub const fn config(&self) -> &BackoffConfig {
        &self.config
    }

    #[inline]
    fn slot(&self, pos: u64) -> &Slot<T> {
        &self.slots[(pos & self.mask) as usize]
    }
}

impl<T> fmt::Debug for RingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingQueue")
            .field("capacity", &self.capacity)
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish()
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let mask = self.mask;

        let mut pos = head;
        while pos != tail {
            self.slots[(pos & mask) as usize].drop_published(pos);
            pos = pos.wrapping_add(1);
        }
    }
}
