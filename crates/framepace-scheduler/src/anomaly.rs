//! Anomaly reporting for the per-frame path.
//!
//! The scheduler never fails a frame. Impossible inputs and internal
//! inconsistencies are corrected by clamping and reported to an
//! [`AnomalySink`], which keeps the numeric core free of logging policy.
//!
//! [`LogOnceSink`] is the default: it counts every report and emits a
//! `tracing` warning only the first time each [`AnomalyKind`] is seen, so a
//! condition that persists for thousands of frames produces one log line.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use tracing::{trace, warn};

/// Class of anomaly detected while scheduling a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    /// Raw frame delta was zero or negative
    NonPositiveDelta,
    /// Wall-clock sample was older than the previous one
    ClockWentBackwards,
    /// Planned tick count was negative and floored to zero
    NegativeTickCount,
    /// Consistency window derived from the rhythm had a negative bound
    NegativeTypicalBound,
    /// Idle delta fell below the minimum and was forced up
    IdleDeltaBelowMinimum,
    /// Reference accumulator drifted from the live accumulator
    AccumulatorDrift,
    /// Fixed frame rate of zero was requested and ignored
    InvalidFixedFps,
    /// Raw frame delta was not finite or exceeded the largest supported frame
    DeltaOutOfRange,
}

impl AnomalyKind {
    /// Number of anomaly kinds.
    pub const COUNT: usize = 8;

    /// All anomaly kinds, in counter order.
    pub const ALL: [AnomalyKind; Self::COUNT] = [
        AnomalyKind::NonPositiveDelta,
        AnomalyKind::ClockWentBackwards,
        AnomalyKind::NegativeTickCount,
        AnomalyKind::NegativeTypicalBound,
        AnomalyKind::IdleDeltaBelowMinimum,
        AnomalyKind::AccumulatorDrift,
        AnomalyKind::InvalidFixedFps,
        AnomalyKind::DeltaOutOfRange,
    ];

    const fn index(self) -> usize {
        match self {
            AnomalyKind::NonPositiveDelta => 0,
            AnomalyKind::ClockWentBackwards => 1,
            AnomalyKind::NegativeTickCount => 2,
            AnomalyKind::NegativeTypicalBound => 3,
            AnomalyKind::IdleDeltaBelowMinimum => 4,
            AnomalyKind::AccumulatorDrift => 5,
            AnomalyKind::InvalidFixedFps => 6,
            AnomalyKind::DeltaOutOfRange => 7,
        }
    }

    /// Short machine-friendly name.
    pub const fn name(self) -> &'static str {
        match self {
            AnomalyKind::NonPositiveDelta => "non_positive_delta",
            AnomalyKind::ClockWentBackwards => "clock_went_backwards",
            AnomalyKind::NegativeTickCount => "negative_tick_count",
            AnomalyKind::NegativeTypicalBound => "negative_typical_bound",
            AnomalyKind::IdleDeltaBelowMinimum => "idle_delta_below_minimum",
            AnomalyKind::AccumulatorDrift => "accumulator_drift",
            AnomalyKind::InvalidFixedFps => "invalid_fixed_fps",
            AnomalyKind::DeltaOutOfRange => "delta_out_of_range",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::NonPositiveDelta => write!(f, "Frame delta not positive"),
            AnomalyKind::ClockWentBackwards => write!(f, "Wall clock ran backwards"),
            AnomalyKind::NegativeTickCount => write!(f, "Negative physics tick count planned"),
            AnomalyKind::NegativeTypicalBound => {
                write!(f, "Negative bound in typical tick window")
            }
            AnomalyKind::IdleDeltaBelowMinimum => {
                write!(f, "Idle delta below minimum calculated")
            }
            AnomalyKind::AccumulatorDrift => write!(f, "Timers drifted away from each other"),
            AnomalyKind::InvalidFixedFps => write!(f, "Fixed fps of zero ignored"),
            AnomalyKind::DeltaOutOfRange => write!(f, "Frame delta not finite or too large"),
        }
    }
}

/// Counts per anomaly kind, as returned by [`AnomalySink::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnomalySnapshot {
    counts: [u64; AnomalyKind::COUNT],
}

impl AnomalySnapshot {
    /// Number of reports of `kind`.
    pub fn count(&self, kind: AnomalyKind) -> u64 {
        self.counts.get(kind.index()).copied().unwrap_or(0)
    }

    /// Total reports across all kinds.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }

    /// True if nothing was reported.
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Kinds with at least one report, paired with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (AnomalyKind, u64)> + '_ {
        AnomalyKind::ALL
            .iter()
            .map(|&kind| (kind, self.count(kind)))
            .filter(|&(_, count)| count > 0)
    }
}

/// Receiver for anomalies detected on the per-frame path.
///
/// # RT-Safety
///
/// [`report`](AnomalySink::report) is called from inside `advance` and must
/// not block. Implementations take `&self` so the numeric core can hold a
/// shared reference while mutating its own state.
pub trait AnomalySink: Send + Sync {
    /// Record one occurrence of `kind`.
    fn report(&self, kind: AnomalyKind);

    /// Counts recorded so far.
    fn snapshot(&self) -> AnomalySnapshot;
}

/// Atomic per-kind counters shared by the sink implementations.
#[derive(Debug, Default)]
pub struct AnomalyCounters {
    counts: [AtomicU64; AnomalyKind::COUNT],
}

impl AnomalyCounters {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter for `kind`, returning its previous value.
    #[inline]
    pub fn increment(&self, kind: AnomalyKind) -> u64 {
        self.counts
            .get(kind.index())
            .map_or(0, |counter| counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Read all counters.
    pub fn snapshot(&self) -> AnomalySnapshot {
        let mut snapshot = AnomalySnapshot::default();
        for (slot, counter) in snapshot.counts.iter_mut().zip(self.counts.iter()) {
            *slot = counter.load(Ordering::Relaxed);
        }
        snapshot
    }

    /// Zero all counters.
    pub fn reset(&self) {
        for counter in &self.counts {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Sink that logs each anomaly kind once and counts every occurrence.
#[derive(Debug, Default)]
pub struct LogOnceSink {
    counters: AnomalyCounters,
}

impl LogOnceSink {
    /// Create a sink with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the counters; each kind will be logged again on its next report.
    pub fn reset(&self) {
        self.counters.reset();
    }
}

impl AnomalySink for LogOnceSink {
    fn report(&self, kind: AnomalyKind) {
        let previous = self.counters.increment(kind);
        if previous == 0 {
            warn!(anomaly = kind.name(), "{}", kind);
        } else {
            trace!(anomaly = kind.name(), occurrences = previous + 1, "{}", kind);
        }
    }

    fn snapshot(&self) -> AnomalySnapshot {
        self.counters.snapshot()
    }
}

/// Sink that only counts. Useful for tests and embedders with their own logging.
#[derive(Debug, Default)]
pub struct CountingSink {
    counters: AnomalyCounters,
}

impl CountingSink {
    /// Create a sink with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnomalySink for CountingSink {
    #[inline]
    fn report(&self, kind: AnomalyKind) {
        self.counters.increment(kind);
    }

    fn snapshot(&self) -> AnomalySnapshot {
        self.counters.snapshot()
    }
}
