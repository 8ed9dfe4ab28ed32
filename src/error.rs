use thiserror::Error;

/// The requested capacity is not a power of two of at least 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("capacity must be a power of two >= 2, got {capacity}")]
pub struct InvalidCapacity {
    /// The rejected capacity.
    pub capacity: usize,
}

/// Why [`RingQueue::offer`](crate::RingQueue::offer) did not enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OfferError<T> {
    /// The offered value was absent. Nothing was claimed.
    #[error("offered value is absent")]
    InvalidArgument,
    /// The queue stayed full until the caller's patience ran out. The value
    /// is handed back untouched.
    #[error("queue is full")]
    Full(T),
}

impl<T> OfferError<T> {
    /// Recovers the rejected value, if there was one.
    pub fn into_inner(self) -> Option<T> {
        match self {
            Self::InvalidArgument => None,
            Self::Full(value) => Some(value),
        }
    }

    /// Returns `true` if the queue was full.
    pub const fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}
