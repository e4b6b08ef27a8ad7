//! Anti-replay nonce factories.
//!
//! Signed requests embed a value that must never repeat for a given API key.
//! Both factories here are lock-free: all state lives in one `AtomicU64` and
//! every update is a single atomic read-modify-write, so callers can share a
//! factory across tasks without extra locking.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Produces the next nonce value. Never fails and never repeats.
pub trait NonceFactory: Send + Sync {
    fn create_value(&self) -> u64;
}

/// Wall-clock source, injectable so tests can pin or rewind time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}

/// Granularity of a current-time nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Time since the Unix epoch in this unit; instants before the epoch read as 0.
    pub fn since_epoch(self, instant: DateTime<Utc>) -> u64 {
        let value = match self {
            Self::Seconds => instant.timestamp(),
            Self::Milliseconds => instant.timestamp_millis(),
            Self::Microseconds => instant.timestamp_micros(),
            Self::Nanoseconds => instant.timestamp_nanos_opt().unwrap_or(i64::MAX),
        };
        u64::try_from(value).unwrap_or(0)
    }
}

/// 2013-01-01T00:00:00Z in epoch milliseconds.
pub const DEFAULT_EPOCH_ANCHOR_MS: i64 = 1_356_998_400_000;
pub const DEFAULT_QUANTUM: Duration = Duration::from_millis(250);

/// Counter seeded from `(now - anchor) / quantum` at construction and then
/// incremented on every call, independent of the clock.
///
/// Output stays monotonic even when called faster than once per quantum; the
/// counter simply runs ahead of the clock until calls slow down.
pub struct TimeAnchoredNonceFactory {
    counter: AtomicU64,
}

impl TimeAnchoredNonceFactory {
    pub fn new() -> Self {
        Self::with_clock(&SystemClock)
    }

    pub fn with_clock(clock: &dyn Clock) -> Self {
        let anchor = Utc
            .timestamp_millis_opt(DEFAULT_EPOCH_ANCHOR_MS)
            .single()
            .unwrap_or_default();
        Self::with_anchor(clock, anchor, DEFAULT_QUANTUM)
    }

    pub fn with_anchor(clock: &dyn Clock, anchor: DateTime<Utc>, quantum: Duration) -> Self {
        let elapsed_ms = (clock.now() - anchor).num_milliseconds().max(0) as u64;
        let quantum_ms = (quantum.as_millis() as u64).max(1);
        Self {
            counter: AtomicU64::new(elapsed_ms / quantum_ms),
        }
    }

    /// The value the next call will build on (last returned value, or the seed).
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for TimeAnchoredNonceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl NonceFactory for TimeAnchoredNonceFactory {
    fn create_value(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl fmt::Debug for TimeAnchoredNonceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeAnchoredNonceFactory")
            .field("current", &self.current())
            .finish()
    }
}

/// Current time at the configured granularity, clamped to `last + 1` whenever
/// the clock has not advanced past the previously returned value.
pub struct CurrentTimeNonceFactory<C: Clock = SystemClock> {
    unit: TimeUnit,
    clock: C,
    last: AtomicU64,
}

impl CurrentTimeNonceFactory<SystemClock> {
    pub fn new(unit: TimeUnit) -> Self {
        Self::with_clock(unit, SystemClock)
    }

    pub fn millis() -> Self {
        Self::new(TimeUnit::Milliseconds)
    }
}

impl<C: Clock> CurrentTimeNonceFactory<C> {
    pub fn with_clock(unit: TimeUnit, clock: C) -> Self {
        Self {
            unit,
            clock,
            last: AtomicU64::new(0),
        }
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }
}

impl<C: Clock> NonceFactory for CurrentTimeNonceFactory<C> {
    fn create_value(&self) -> u64 {
        let candidate = self.unit.since_epoch(self.clock.now());
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(candidate.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        candidate.max(previous + 1)
    }
}

impl<C: Clock> fmt::Debug for CurrentTimeNonceFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentTimeNonceFactory")
            .field("unit", &self.unit)
            .field("last", &self.last.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
