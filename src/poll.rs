//! # Readiness Polling
//!
//! Some mutations finish asynchronously on the server: a new index has to
//! allocate shards, a new collection has to load its segments. After such a
//! convergence-sensitive statement the shell repeatedly runs a status check
//! until a convergence predicate holds or the attempt budget is spent.
//!
//! ```text
//! attempt 1 ── check ── converged? ──yes──> Converged(1, elapsed)
//!                          │ no
//!                        sleep(interval)
//! attempt 2 ── check ── ...
//!   ...
//! attempt N ── check ── not converged ────> TimedOut(N, elapsed)
//! ```
//!
//! A failed status check counts as a non-converged attempt. The poller never
//! aborts early and never skips the sleep; tracing only observes.
//!
//! Time is read through [`Clock`] so tests can run the full budget without
//! waiting for it.

use crate::config::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use std::fmt::Display;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Converged { attempts: u32, elapsed: Duration },
    TimedOut { attempts: u32, elapsed: Duration },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Converged { attempts, .. } | PollOutcome::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Converged { elapsed, .. } | PollOutcome::TimedOut { elapsed, .. } => {
                *elapsed
            }
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged { .. })
    }
}

pub struct ReadinessPoller {
    max_attempts: u32,
    interval: Duration,
    clock: Box<dyn Clock>,
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL)
    }
}

impl ReadinessPoller {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs `status_check` until `is_converged` accepts its result or the
    /// attempt budget is exhausted.
    pub fn poll<S, E, F, P>(&self, target: &str, mut status_check: F, is_converged: P) -> PollOutcome
    where
        F: FnMut() -> Result<S, E>,
        P: Fn(&S) -> bool,
        S: std::fmt::Debug,
        E: Display,
    {
        let started = self.clock.now();

        for attempt in 1..=self.max_attempts {
            let check_started = self.clock.now();
            let checked = status_check();
            let took = self.clock.now().saturating_duration_since(check_started);

            match checked {
                Ok(status) => {
                    debug!(
                        target: "dbshell::poll",
                        entity = %target, attempt, max = self.max_attempts, ?status, ?took,
                        "readiness check"
                    );
                    if is_converged(&status) {
                        let elapsed = self.clock.now().saturating_duration_since(started);
                        debug!(target: "dbshell::poll", entity = %target, attempt, ?elapsed, "converged");
                        return PollOutcome::Converged {
                            attempts: attempt,
                            elapsed,
                        };
                    }
                }
                Err(err) => {
                    debug!(
                        target: "dbshell::poll",
                        entity = %target, attempt, max = self.max_attempts, error = %err, ?took,
                        "readiness check failed"
                    );
                }
            }

            if attempt < self.max_attempts {
                self.clock.sleep(self.interval);
            }
        }

        PollOutcome::TimedOut {
            attempts: self.max_attempts,
            elapsed: self.clock.now().saturating_duration_since(started),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::Cell;

    /// Clock whose time only moves when something sleeps on it.
    pub(crate) struct FakeClock {
        origin: Instant,
        offset: Cell<Duration>,
        sleeps: Cell<u32>,
    }

    impl FakeClock {
        pub(crate) fn new() -> Rc<Self> {
            Rc::new(Self {
                origin: Instant::now(),
                offset: Cell::new(Duration::ZERO),
                sleeps: Cell::new(0),
            })
        }

        pub(crate) fn sleeps(&self) -> u32 {
            self.sleeps.get()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.origin + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.offset.set(self.offset.get() + duration);
            self.sleeps.set(self.sleeps.get() + 1);
        }
    }

    #[test]
    fn converges_on_first_check_without_sleeping() {
        let clock = FakeClock::new();
        let poller = ReadinessPoller::new(60, Duration::from_secs(1)).with_clock(clock.clone());

        let outcome = poller.poll("idx", || Ok::<_, String>("green"), |s| *s == "green");

        assert_eq!(outcome.attempts(), 1);
        assert!(outcome.is_converged());
        assert_eq!(clock.sleeps(), 0);
        assert_eq!(outcome.elapsed(), Duration::ZERO);
    }

    #[test]
    fn never_converging_times_out_after_full_budget() {
        let clock = FakeClock::new();
        let interval = Duration::from_secs(1);
        let poller = ReadinessPoller::new(5, interval).with_clock(clock.clone());
        let mut calls = 0;

        let outcome = poller.poll(
            "idx",
            || {
                calls += 1;
                Ok::<_, String>("red")
            },
            |s| *s == "green",
        );

        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                attempts: 5,
                elapsed: interval * 4,
            }
        );
        assert_eq!(calls, 5);
        assert!(outcome.elapsed() >= interval * (5 - 1));
    }

    #[test]
    fn errors_count_as_attempts_and_do_not_abort() {
        let clock = FakeClock::new();
        let poller = ReadinessPoller::new(10, Duration::from_millis(500)).with_clock(clock.clone());
        let mut calls = 0;

        let outcome = poller.poll(
            "idx",
            || {
                calls += 1;
                if calls < 3 {
                    Err("connection refused".to_string())
                } else {
                    Ok("yellow")
                }
            },
            |s| *s == "yellow",
        );

        assert_eq!(
            outcome,
            PollOutcome::Converged {
                attempts: 3,
                elapsed: Duration::from_millis(1000),
            }
        );
        assert_eq!(clock.sleeps(), 2);
    }

    #[test]
    fn real_clock_waits_between_attempts() {
        let interval = Duration::from_millis(10);
        let poller = ReadinessPoller::new(3, interval);

        let outcome = poller.poll("idx", || Ok::<_, String>(false), |ready| *ready);

        assert!(!outcome.is_converged());
        assert_eq!(outcome.attempts(), 3);
        assert!(outcome.elapsed() >= interval * 2);
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let poller = ReadinessPoller::new(0, Duration::from_secs(1)).with_clock(FakeClock::new());
        let outcome = poller.poll("idx", || Ok::<_, String>(1), |n| *n == 2);
        assert_eq!(outcome.attempts(), 1);
    }

    #[test]
    fn defaults_match_documented_budget() {
        let poller = ReadinessPoller::default();
        assert_eq!(poller.max_attempts(), 60);
        assert_eq!(poller.interval(), Duration::from_secs(1));
    }
}
