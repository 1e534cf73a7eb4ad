//! crates/fetch/src/clock.rs
//!
//! Time sources and the retry schedule.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of the current time and of blocking sleeps.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant::now`] and [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock whose time only moves when it is asked to sleep.
///
/// Every sleep is recorded so tests can assert on the retry schedule.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            state: Mutex::new(ManualState::default()),
        }
    }

    /// Moves time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
    }

    /// Sleeps requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Total simulated time since creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.lock().offset
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.lock().offset
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.offset += duration;
        state.sleeps.push(duration);
    }
}

/// Exponential retry schedule bounded by a total time budget.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Backoff {
    initial: Duration,
    budget: Duration,
}

impl Backoff {
    /// First delay between attempts.
    pub const DEFAULT_INITIAL: Duration = Duration::from_secs(1);
    /// Total time allowed for retries.
    pub const DEFAULT_BUDGET: Duration = Duration::from_secs(120);

    /// Creates a schedule starting at `initial` and doubling each retry.
    #[must_use]
    pub const fn new(initial: Duration, budget: Duration) -> Self {
        Self { initial, budget }
    }

    /// Default schedule with a different total budget.
    #[must_use]
    pub const fn with_budget(budget: Duration) -> Self {
        Self::new(Self::DEFAULT_INITIAL, budget)
    }

    /// First delay.
    #[must_use]
    pub const fn initial(&self) -> Duration {
        self.initial
    }

    /// Total retry budget.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Delay before retry number `retry` (zero based), clipped to what is
    /// left of the budget after `elapsed`. `None` once the budget is spent.
    #[must_use]
    pub fn delay(&self, retry: u32, elapsed: Duration) -> Option<Duration> {
        let remaining = self.budget.checked_sub(elapsed).filter(|left| !left.is_zero())?;
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let delay = self.initial.checked_mul(factor).unwrap_or(Duration::MAX);
        Some(delay.min(remaining))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL, Self::DEFAULT_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_one_second() {
        let backoff = Backoff::default();
        let delays: Vec<_> = (0..4)
            .map(|retry| backoff.delay(retry, Duration::ZERO).expect("budget"))
            .collect();
        assert_eq!(
            delays,
            [1, 2, 4, 8].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn last_delay_is_clipped_to_the_budget() {
        let backoff = Backoff::with_budget(Duration::from_secs(10));
        assert_eq!(
            backoff.delay(3, Duration::from_secs(7)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(backoff.delay(0, Duration::from_secs(10)), None);
        assert_eq!(backoff.delay(0, Duration::from_secs(11)), None);
    }

    #[test]
    fn huge_retry_counts_saturate() {
        let backoff = Backoff::default();
        assert_eq!(
            backoff.delay(40, Duration::ZERO),
            Some(Backoff::DEFAULT_BUDGET)
        );
    }

    #[test]
    fn manual_clock_only_moves_when_sleeping() {
        let clock = ManualClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_secs(2));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now() - before, Duration::from_millis(2500));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }
}
