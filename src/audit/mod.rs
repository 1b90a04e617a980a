//! Data-access auditing.
//!
//! # Data Flow
//! ```text
//! Model<T> operation ──▶ model.rs (ModelAuditor::observe) ──┐
//!                                                           ├─▶ TimingWindow ─▶ SlowPolicy ─▶ LogSink + warn!
//! Collection handle  ──▶ collection.rs (AuditedCollection) ─┘
//! ```
//!
//! # Design Decisions
//! - Auditors never cancel, retry or alter the operation they observe
//! - Success and failure are timed alike; the record carries the outcome
//! - A window dropped before it closes (the caller went away mid-operation)
//!   is reported with the `cancelled` outcome
//! - Only operations strictly above the threshold produce a record
//! - Durations come from `tokio::time::Instant` so tests can pause the clock

pub mod collection;
pub mod model;

use serde::Serialize;
use tokio::time::Instant;

pub use collection::{AuditedCollection, AuditedCursor, AuditedDatabase, QueryAuditor, QueryMethod};
pub use model::{ModelAuditor, ModelOp};

/// Default slow-operation threshold in milliseconds.
pub const DEFAULT_SLOW_THRESHOLD_MS: f64 = 100.0;

/// Round a millisecond value to two decimals.
pub fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

/// The interval between an operation's observed start and its completion.
///
/// Closing consumes the window, so each window yields at most one duration.
#[derive(Debug)]
pub struct TimingWindow {
    started: Instant,
}

impl TimingWindow {
    pub fn open() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Elapsed milliseconds, rounded to two decimals.
    pub fn close(self) -> f64 {
        round_ms(self.started.elapsed().as_secs_f64() * 1000.0)
    }
}

/// An open window that reports on close, or as cancelled when dropped first.
pub(crate) struct WindowGuard<R: FnOnce(f64, Outcome)> {
    armed: Option<(TimingWindow, R)>,
}

impl<R: FnOnce(f64, Outcome)> WindowGuard<R> {
    pub(crate) fn open(report: R) -> Self {
        Self::new(TimingWindow::open(), report)
    }

    pub(crate) fn new(window: TimingWindow, report: R) -> Self {
        Self {
            armed: Some((window, report)),
        }
    }

    pub(crate) fn close(mut self, outcome: Outcome) {
        self.fire(outcome);
    }

    fn fire(&mut self, outcome: Outcome) {
        if let Some((window, report)) = self.armed.take() {
            report(window.close(), outcome);
        }
    }
}

impl<R: FnOnce(f64, Outcome)> Drop for WindowGuard<R> {
    fn drop(&mut self) {
        self.fire(Outcome::Cancelled);
    }
}

/// Decides which durations are worth persisting.
#[derive(Debug, Clone, Copy)]
pub struct SlowPolicy {
    pub threshold_ms: f64,
}

impl SlowPolicy {
    pub fn new(threshold_ms: f64) -> Self {
        Self { threshold_ms }
    }

    /// Strictly greater than the threshold.
    pub fn is_slow(&self, duration_ms: f64) -> bool {
        duration_ms > self.threshold_ms
    }
}

impl Default for SlowPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SLOW_THRESHOLD_MS)
    }
}

/// How an observed operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Error,
    /// The operation's future was dropped before it resolved.
    Cancelled,
}

impl Outcome {
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Outcome::Ok
        } else {
            Outcome::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_threshold_is_strict() {
        let policy = SlowPolicy::default();
        assert!(!policy.is_slow(99.99));
        assert!(!policy.is_slow(100.0));
        assert!(policy.is_slow(100.01));
    }

    #[test]
    fn test_round_ms() {
        assert_eq!(round_ms(150.004), 150.0);
        assert_eq!(round_ms(100.005_1), 100.01);
        assert_eq!(round_ms(0.0), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_measures_elapsed() {
        let window = TimingWindow::open();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(window.close(), 150.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_guard_reports_cancelled() {
        let seen = std::cell::Cell::new(None);
        let guard = WindowGuard::open(|ms, outcome| seen.set(Some((ms, outcome))));
        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(guard);
        assert_eq!(seen.get(), Some((30.0, Outcome::Cancelled)));

        let guard = WindowGuard::open(|ms, outcome| seen.set(Some((ms, outcome))));
        guard.close(Outcome::Error);
        assert_eq!(seen.get(), Some((0.0, Outcome::Error)));
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(serde_json::to_value(Outcome::Cancelled).unwrap(), "cancelled");
        assert_eq!(serde_json::to_value(Outcome::Ok).unwrap(), "ok");
    }
}
