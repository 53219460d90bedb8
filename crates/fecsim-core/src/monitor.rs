//! Error Monitor — counter aggregation and the stopping decision
//!
//! Workers accumulate into private [`FrameCounters`] and periodically merge
//! them into one [`GlobalMonitor`] guarded by a mutex. The stopping
//! predicate is evaluated on the merged totals only, never on a worker's
//! private view, so the decision to leave a noise point always reflects
//! every batch reduced so far. Counters never decrease within a point;
//! [`FrameCounters::take`] hands the accumulated values to the reduction
//! and resets the local copy so nothing is counted twice.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Frame and bit tallies for one noise point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounters {
    /// Frames pushed through the chain.
    pub frames: u64,
    /// Frames with at least one residual information-bit error (or a failed
    /// integrity check).
    pub frame_errors: u64,
    /// Residual information-bit errors.
    pub bit_errors: u64,
}

impl FrameCounters {
    /// Record one finished frame.
    pub fn record(&mut self, bit_errors: u64, in_error: bool) {
        self.frames += 1;
        self.bit_errors += bit_errors;
        if in_error {
            self.frame_errors += 1;
        }
    }

    /// Add another tally into this one.
    pub fn merge(&mut self, other: &FrameCounters) {
        self.frames += other.frames;
        self.frame_errors += other.frame_errors;
        self.bit_errors += other.bit_errors;
    }

    /// Hand the accumulated values over and reset to zero.
    pub fn take(&mut self) -> FrameCounters {
        std::mem::take(self)
    }

    /// Frame error rate.
    pub fn fer(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.frame_errors as f64 / self.frames as f64
    }

    /// Bit error rate given the information length per frame.
    pub fn ber(&self, info_bits_per_frame: u64) -> f64 {
        let bits = self.frames * info_bits_per_frame;
        if bits == 0 {
            return 0.0;
        }
        self.bit_errors as f64 / bits as f64
    }
}

/// Why a noise point stopped sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    /// The frame-error target was reached (primary criterion).
    TargetReached,
    /// The optional frame budget ran out.
    FrameBudgetReached,
    /// The optional wall-time budget ran out.
    TimeBudgetReached,
    /// External cancellation was observed.
    Cancelled,
}

impl StopReason {
    /// Event tag attached to downstream result records. The legacy flag
    /// only changes this label, never the stopping arithmetic.
    pub fn label(&self, legacy: bool) -> &'static str {
        match (self, legacy) {
            (StopReason::TargetReached, false) => "frame-error-target",
            (StopReason::TargetReached, true) => "fe",
            (StopReason::FrameBudgetReached, false) => "frame-budget",
            (StopReason::FrameBudgetReached, true) => "n",
            (StopReason::TimeBudgetReached, false) => "time-budget",
            (StopReason::TimeBudgetReached, true) => "time",
            (StopReason::Cancelled, _) => "cancelled",
        }
    }
}

/// Stopping predicate configuration for one noise point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopCriteria {
    /// Stop once this many frame errors were observed. Required.
    pub max_frame_errors: u64,
    /// Optional cap on simulated frames.
    pub max_frames: Option<u64>,
    /// Optional cap on wall time spent in the point.
    pub stop_time: Option<Duration>,
}

impl StopCriteria {
    /// Stop as soon as `max_frame_errors` frame errors were seen.
    pub fn frame_errors(max_frame_errors: u64) -> Self {
        Self {
            max_frame_errors,
            max_frames: None,
            stop_time: None,
        }
    }

    /// Evaluate against merged totals. The frame-error target takes
    /// precedence over the budgets when several fire at once.
    pub fn evaluate(&self, totals: &FrameCounters, elapsed: Duration) -> Option<StopReason> {
        if totals.frame_errors >= self.max_frame_errors {
            return Some(StopReason::TargetReached);
        }
        if let Some(max_frames) = self.max_frames {
            if totals.frames >= max_frames {
                return Some(StopReason::FrameBudgetReached);
            }
        }
        if let Some(stop_time) = self.stop_time {
            if elapsed >= stop_time {
                return Some(StopReason::TimeBudgetReached);
            }
        }
        None
    }
}

const CAUSE_NONE: u8 = 0;
const CAUSE_TARGET: u8 = 1;
const CAUSE_FRAME_BUDGET: u8 = 2;
const CAUSE_TIME_BUDGET: u8 = 3;
const CAUSE_CANCELLED: u8 = 4;
const CAUSE_FAULT: u8 = 5;

/// Shared reduction target for one noise point.
///
/// The first stop cause to fire wins; later triggers are ignored so every
/// worker observes one consistent decision.
#[derive(Debug)]
pub struct GlobalMonitor {
    criteria: StopCriteria,
    totals: Mutex<FrameCounters>,
    stop: AtomicBool,
    cause: AtomicU8,
}

impl GlobalMonitor {
    pub fn new(criteria: StopCriteria) -> Self {
        Self {
            criteria,
            totals: Mutex::new(FrameCounters::default()),
            stop: AtomicBool::new(false),
            cause: AtomicU8::new(CAUSE_NONE),
        }
    }

    fn lock_totals(&self) -> std::sync::MutexGuard<'_, FrameCounters> {
        self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn trigger(&self, cause: u8) {
        let _ = self
            .cause
            .compare_exchange(CAUSE_NONE, cause, Ordering::AcqRel, Ordering::Relaxed);
        self.stop.store(true, Ordering::Release);
    }

    /// Merge a worker's local counters, evaluate the stopping predicate on
    /// the merged totals, and report whether the point should stop.
    pub fn reduce(&self, local: FrameCounters, elapsed: Duration) -> bool {
        let snapshot = {
            let mut totals = self.lock_totals();
            totals.merge(&local);
            *totals
        };
        if let Some(reason) = self.criteria.evaluate(&snapshot, elapsed) {
            self.trigger(match reason {
                StopReason::TargetReached => CAUSE_TARGET,
                StopReason::FrameBudgetReached => CAUSE_FRAME_BUDGET,
                StopReason::TimeBudgetReached => CAUSE_TIME_BUDGET,
                StopReason::Cancelled => CAUSE_CANCELLED,
            });
        }
        self.is_stopped()
    }

    /// Merge without evaluating. Used for a worker's final leftovers after
    /// the stop decision is already made.
    pub fn absorb(&self, local: FrameCounters) {
        self.lock_totals().merge(&local);
    }

    /// Record an external cancellation.
    pub fn cancel(&self) {
        self.trigger(CAUSE_CANCELLED);
    }

    /// Halt every worker after a runtime fault. The fault itself travels
    /// through the scheduler's failure slot, not through a stop reason.
    pub fn halt_on_fault(&self) {
        self.trigger(CAUSE_FAULT);
    }

    /// Cooperative stop flag, checked by workers between batches.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// The first stop cause, if it was a regular stop reason.
    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.cause.load(Ordering::Acquire) {
            CAUSE_TARGET => Some(StopReason::TargetReached),
            CAUSE_FRAME_BUDGET => Some(StopReason::FrameBudgetReached),
            CAUSE_TIME_BUDGET => Some(StopReason::TimeBudgetReached),
            CAUSE_CANCELLED => Some(StopReason::Cancelled),
            _ => None,
        }
    }

    /// Copy of the merged totals.
    pub fn snapshot(&self) -> FrameCounters {
        *self.lock_totals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_rates() {
        let mut c = FrameCounters::default();
        c.record(0, false);
        c.record(3, true);
        c.record(1, true);
        assert_eq!(c.frames, 3);
        assert_eq!(c.frame_errors, 2);
        assert_eq!(c.bit_errors, 4);
        assert!((c.fer() - 2.0 / 3.0).abs() < 1e-12);
        assert!((c.ber(8) - 4.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_take_resets() {
        let mut c = FrameCounters::default();
        c.record(2, true);
        let taken = c.take();
        assert_eq!(taken.frames, 1);
        assert_eq!(c, FrameCounters::default());
    }

    #[test]
    fn test_monotone_under_merges() {
        let monitor = GlobalMonitor::new(StopCriteria::frame_errors(1_000));
        let mut last = 0;
        for _ in 0..10 {
            let mut local = FrameCounters::default();
            local.record(1, true);
            local.record(0, false);
            monitor.reduce(local, Duration::ZERO);
            let now = monitor.snapshot();
            assert!(now.frames >= last);
            last = now.frames;
        }
        assert_eq!(monitor.snapshot().frames, 20);
    }

    #[test]
    fn test_target_reached() {
        let monitor = GlobalMonitor::new(StopCriteria::frame_errors(3));
        let mut local = FrameCounters::default();
        local.record(1, true);
        local.record(1, true);
        assert!(!monitor.reduce(local.take(), Duration::ZERO));

        local.record(1, true);
        assert!(monitor.reduce(local.take(), Duration::ZERO));
        assert_eq!(monitor.stop_reason(), Some(StopReason::TargetReached));
    }

    #[test]
    fn test_frame_budget() {
        let criteria = StopCriteria {
            max_frame_errors: u64::MAX,
            max_frames: Some(5),
            stop_time: None,
        };
        let monitor = GlobalMonitor::new(criteria);
        let mut local = FrameCounters::default();
        for _ in 0..5 {
            local.record(0, false);
        }
        assert!(monitor.reduce(local, Duration::ZERO));
        assert_eq!(monitor.stop_reason(), Some(StopReason::FrameBudgetReached));
    }

    #[test]
    fn test_time_budget() {
        let criteria = StopCriteria {
            max_frame_errors: u64::MAX,
            max_frames: None,
            stop_time: Some(Duration::from_millis(10)),
        };
        assert_eq!(
            criteria.evaluate(&FrameCounters::default(), Duration::from_millis(11)),
            Some(StopReason::TimeBudgetReached)
        );
        assert_eq!(
            criteria.evaluate(&FrameCounters::default(), Duration::from_millis(9)),
            None
        );
    }

    #[test]
    fn test_target_takes_precedence() {
        let criteria = StopCriteria {
            max_frame_errors: 1,
            max_frames: Some(1),
            stop_time: Some(Duration::ZERO),
        };
        let mut totals = FrameCounters::default();
        totals.record(1, true);
        assert_eq!(
            criteria.evaluate(&totals, Duration::from_secs(1)),
            Some(StopReason::TargetReached)
        );
    }

    #[test]
    fn test_first_cause_wins() {
        let monitor = GlobalMonitor::new(StopCriteria::frame_errors(1));
        monitor.cancel();
        let mut local = FrameCounters::default();
        local.record(1, true);
        monitor.reduce(local, Duration::ZERO);
        assert_eq!(monitor.stop_reason(), Some(StopReason::Cancelled));
    }

    #[test]
    fn test_fault_has_no_reason() {
        let monitor = GlobalMonitor::new(StopCriteria::frame_errors(1));
        monitor.halt_on_fault();
        assert!(monitor.is_stopped());
        assert_eq!(monitor.stop_reason(), None);
    }

    #[test]
    fn test_legacy_labels_are_cosmetic() {
        assert_eq!(StopReason::TargetReached.label(false), "frame-error-target");
        assert_eq!(StopReason::TargetReached.label(true), "fe");
        assert_eq!(StopReason::Cancelled.label(true), "cancelled");
    }
}
