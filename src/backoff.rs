//! Retry policy for the "appears full" / "appears empty" paths.
//!
//! Each consecutive pause doubles the delay, starting at
//! [`BackoffConfig::initial`] and capped at [`BackoffConfig::ceiling`].
//! Delays at or below [`BackoffConfig::sleep_threshold`] busy-spin on the
//! processor's spin hint; longer delays put the thread to sleep. How many
//! pauses an operation is willing to take is its [`Patience`].

use std::time::{Duration, Instant};

use crate::sync::{self, hint};

const DEFAULT_INITIAL: Duration = Duration::from_nanos(1);
const DEFAULT_CEILING: Duration = Duration::from_nanos(1_000);
const DEFAULT_SLEEP_THRESHOLD: Duration = Duration::from_micros(50);
const DEFAULT_SPIN_ITERATIONS: u32 = 64;
const DEFAULT_PATIENCE: Patience = Patience::Attempts(64);

/// How long an operation keeps retrying a full (or empty) queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patience {
    /// Retry until the operation succeeds. `offer` then never reports
    /// [`Full`](crate::OfferError::Full) and `poll` never returns `None`.
    Forever,
    /// Give up after this many backoff pauses. `Attempts(0)` looks once.
    Attempts(u32),
    /// Give up once this much time has passed since the first pause.
    Timeout(Duration),
}

/// Backoff tuning for a [`RingQueue`](crate::RingQueue).
///
/// ```
/// use std::time::Duration;
/// use ring_mpmc::{BackoffConfig, Patience, RingQueue};
///
/// let config = BackoffConfig::new()
///     .ceiling(Duration::from_micros(100))
///     .patience(Patience::Timeout(Duration::from_millis(5)));
/// let queue = RingQueue::<u32>::with_config(64, config).unwrap();
/// assert_eq!(queue.config().get_patience(), Patience::Timeout(Duration::from_millis(5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    initial: Duration,
    ceiling: Duration,
    sleep_threshold: Duration,
    spin_iterations: u32,
    patience: Patience,
}

impl BackoffConfig {
    /// The default policy: 1ns doubling to 1000ns, a 50µs sleep threshold,
    /// 64 spin hints per pause and a patience of 64 pauses.
    pub const fn new() -> Self {
        Self {
            initial: DEFAULT_INITIAL,
            ceiling: DEFAULT_CEILING,
            sleep_threshold: DEFAULT_SLEEP_THRESHOLD,
            spin_iterations: DEFAULT_SPIN_ITERATIONS,
            patience: DEFAULT_PATIENCE,
        }
    }

    /// Delay of the first pause.
    #[must_use]
    pub fn initial(mut self, initial: Duration) -> Self {
        self.initial = initial;
        self
    }

    /// Upper bound for the doubling delay.
    #[must_use]
    pub fn ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Delays above this sleep instead of spinning.
    #[must_use]
    pub fn sleep_threshold(mut self, threshold: Duration) -> Self {
        self.sleep_threshold = threshold;
        self
    }

    /// Number of spin hints issued by a busy-spin pause.
    #[must_use]
    pub fn spin_iterations(mut self, spins: u32) -> Self {
        self.spin_iterations = spins;
        self
    }

    /// Default patience for `offer` and `poll`.
    #[must_use]
    pub fn patience(mut self, patience: Patience) -> Self {
        self.patience = patience;
        self
    }

    /// Delay of the first pause.
    pub const fn get_initial(&self) -> Duration {
        self.initial
    }

    /// Upper bound for the doubling delay.
    pub const fn get_ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Delays above this sleep instead of spinning.
    pub const fn get_sleep_threshold(&self) -> Duration {
        self.sleep_threshold
    }

    /// Spin hints per busy-spin pause.
    pub const fn get_spin_iterations(&self) -> u32 {
        self.spin_iterations
    }

    /// Default patience for `offer` and `poll`.
    pub const fn get_patience(&self) -> Patience {
        self.patience
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call backoff state. One is created for every `offer`/`poll`.
#[derive(Debug)]
pub(crate) struct Backoff<'a> {
    config: &'a BackoffConfig,
    patience: Patience,
    delay: Duration,
    pauses: u32,
    started: Option<Instant>,
}

impl<'a> Backoff<'a> {
    pub(crate) fn new(config: &'a BackoffConfig, patience: Patience) -> Self {
        Self {
            config,
            patience,
            delay: config.initial.min(config.ceiling),
            pauses: 0,
            started: None,
        }
    }

    /// Pauses before the next retry of a full/empty observation.
    ///
    /// Returns `false` without pausing once patience is exhausted.
    pub(crate) fn snooze(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }

        if self.delay > self.config.sleep_threshold {
            sync::sleep(self.delay);
        } else {
            for _ in 0..self.config.spin_iterations {
                hint::spin_loop();
            }
        }

        self.pauses = self.pauses.saturating_add(1);
        self.delay = self.delay.saturating_mul(2).min(self.config.ceiling);
        true
    }

    fn is_exhausted(&mut self) -> bool {
        match self.patience {
            Patience::Forever => false,
            Patience::Attempts(limit) => self.pauses >= limit,
            Patience::Timeout(limit) => self.started.get_or_insert_with(Instant::now).elapsed() >= limit,
        }
    }
}

/// Another thread is between claiming and publishing the slot we looked at.
#[inline]
pub(crate) fn contended() {
    hint::spin_loop();
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_up_to_ceiling() {
        let config = BackoffConfig::new()
            .initial(Duration::from_nanos(1))
            .ceiling(Duration::from_nanos(10))
            .spin_iterations(1)
            .patience(Patience::Forever);
        let mut backoff = Backoff::new(&config, config.get_patience());

        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(backoff.delay.as_nanos());
            assert!(backoff.snooze());
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 10, 10]);
    }

    #[test]
    fn initial_above_ceiling_is_clamped() {
        let config = BackoffConfig::new()
            .initial(Duration::from_micros(5))
            .ceiling(Duration::from_micros(1));
        let backoff = Backoff::new(&config, Patience::Forever);
        assert_eq!(backoff.delay, Duration::from_micros(1));
    }

    #[test]
    fn attempts_bound_the_number_of_pauses() {
        let config = BackoffConfig::new().spin_iterations(1);
        let mut backoff = Backoff::new(&config, Patience::Attempts(3));
        assert!(backoff.snooze());
        assert!(backoff.snooze());
        assert!(backoff.snooze());
        assert!(!backoff.snooze());
        assert!(!backoff.snooze());
        assert_eq!(backoff.pauses, 3);
    }

    #[test]
    fn zero_attempts_never_pause() {
        let config = BackoffConfig::new();
        let mut backoff = Backoff::new(&config, Patience::Attempts(0));
        assert!(!backoff.snooze());
        assert_eq!(backoff.pauses, 0);
    }

    #[test]
    fn timeout_gives_up_after_deadline() {
        let config = BackoffConfig::new()
            .initial(Duration::from_micros(100))
            .ceiling(Duration::from_micros(100))
            .sleep_threshold(Duration::ZERO);
        let mut backoff = Backoff::new(&config, Patience::Timeout(Duration::from_millis(2)));

        let start = Instant::now();
        while backoff.snooze() {}
        assert!(start.elapsed() >= Duration::from_millis(2));
        assert!(backoff.pauses > 0);
    }

    #[test]
    fn long_delays_sleep() {
        let config = BackoffConfig::new()
            .initial(Duration::from_millis(1))
            .ceiling(Duration::from_millis(1))
            .sleep_threshold(Duration::from_micros(10));
        let mut backoff = Backoff::new(&config, Patience::Attempts(1));

        let start = Instant::now();
        assert!(backoff.snooze());
        assert!(start.elapsed() >= Duration::from_millis(1));
    }

    #[test]
    fn default_matches_new() {
        assert_eq!(BackoffConfig::default(), BackoffConfig::new());
        assert_eq!(BackoffConfig::new().get_patience(), Patience::Attempts(64));
        assert!(BackoffConfig::new().get_ceiling() < BackoffConfig::new().get_sleep_threshold());
    }
}
