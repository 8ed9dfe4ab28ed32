//! A single ring position and its sequence stamp.

use std::cmp::Ordering as CmpOrdering;
use std::mem::MaybeUninit;

use crate::sync::{AtomicU64, Ordering, UnsafeCell};

/// Where a slot's sequence stands relative to the position a caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// The slot is at the caller's generation and can be claimed.
    Ready,
    /// The slot is a lap behind: full for a producer, empty for a consumer.
    Behind,
    /// Another thread already claimed this position and has not finished.
    Ahead,
}

impl Phase {
    /// Classifies `sequence` against `expected`, tolerating counter wraparound.
    #[inline]
    pub(crate) fn of(sequence: u64, expected: u64) -> Self {
        match (sequence.wrapping_sub(expected) as i64).cmp(&0) {
            CmpOrdering::Equal => Self::Ready,
            CmpOrdering::Less => Self::Behind,
            CmpOrdering::Greater => Self::Ahead,
        }
    }
}

/// One ring position.
///
/// `sequence` starts at the slot's index and then cycles through:
/// - `pos`: writable by the producer claiming tail position `pos`
/// - `pos + 1`: holds that producer's value, readable by the consumer
///   claiming head position `pos`
/// - `pos + capacity`: drained, writable by the producer one lap later
#[repr(C)]
pub(crate) struct Slot<T> {
    sequence: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: `value` is only touched by the single thread holding the claim for
// the slot's current generation; the sequence stamp hands it over with
// release/acquire ordering.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) fn new(index: u64) -> Self {
        Self {
            sequence: AtomicU64::new(index),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    pub(crate) fn phase(&self, expected: u64) -> Phase {
        Phase::of(self.sequence.load(Ordering::Acquire), expected)
    }

    /// Writes `value` and hands the slot to the consumer of `pos`.
    ///
    /// # Safety
    ///
    /// The caller must have won the tail claim for `pos`, and this slot must
    /// be the one `pos` maps to.
    #[inline]
    pub(crate) unsafe fn publish(&self, pos: u64, value: T) {
        self.value.with_mut(|ptr| unsafe {
            (*ptr).write(value);
        });
        self.sequence.store(pos.wrapping_add(1), Ordering::Release);
    }

    /// Moves the value out and hands the slot to the producer one lap ahead.
    ///
    /// # Safety
    ///
    /// The caller must have won the head claim for `pos` after observing
    /// the slot `Ready` for `pos + 1`.
    #[inline]
    pub(crate) unsafe fn take(&self, pos: u64, capacity: u64) -> T {
        let value = self.value.with_mut(|ptr| unsafe { (*ptr).assume_init_read() });
        self.sequence.store(pos.wrapping_add(capacity), Ordering::Release);
        value
    }

    /// Stamps an empty slot as writable for `pos`.
    #[cfg(test)]
    pub(crate) fn reset(&self, pos: u64) {
        self.sequence.store(pos, Ordering::Relaxed);
    }

    /// Drops the value published for `pos`, if any.
    pub(crate) fn drop_published(&mut self, pos: u64) {
        if self.sequence.load(Ordering::Relaxed) == pos.wrapping_add(1) {
            // SAFETY: exclusive access, and the stamp says the producer of
            // `pos` finished writing.
            self.value.with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn phase_classification() {
        assert_eq!(Phase::of(5, 5), Phase::Ready);
        assert_eq!(Phase::of(4, 5), Phase::Behind);
        assert_eq!(Phase::of(6, 5), Phase::Ahead);
    }

    #[test]
    fn phase_survives_counter_wraparound() {
        assert_eq!(Phase::of(2, u64::MAX - 1), Phase::Ahead);
        assert_eq!(Phase::of(u64::MAX, 1), Phase::Behind);
        assert_eq!(Phase::of(0, u64::MAX), Phase::Ahead);
        assert_eq!(Phase::of(u64::MAX, u64::MAX), Phase::Ready);
    }

    #[test]
    fn publish_then_take_cycles_the_stamp() {
        let slot = Slot::new(3);
        assert_eq!(slot.phase(3), Phase::Ready);

        unsafe { slot.publish(3, String::from("hello")) };
        assert_eq!(slot.phase(3), Phase::Ahead);
        assert_eq!(slot.phase(4), Phase::Ready);

        let value = unsafe { slot.take(3, 8) };
        assert_eq!(value, "hello");
        assert_eq!(slot.phase(11), Phase::Ready);
        assert_eq!(slot.phase(12), Phase::Behind);
    }

    #[test]
    fn drop_published_only_drops_live_values() {
        use std::rc::Rc;

        let marker = Rc::new(());
        let mut slot = Slot::new(0);
        slot.drop_published(0);

        unsafe { slot.publish(0, Rc::clone(&marker)) };
        assert_eq!(Rc::strong_count(&marker), 2);
        slot.drop_published(0);
        assert_eq!(Rc::strong_count(&marker), 1);
    }
}
