//! Debounced detection.
//!
//! Noisy sensors are only trusted once they agree with themselves for a few
//! polls in a row. A [`Debouncer`] counts consecutive matching samples and
//! reports a single [`DetectionEvent::Detected`] when the run reaches its
//! threshold. [`wait_until`] wraps the same counter in a bounded polling loop
//! for autonomous routines.
//!
//! ```ignore
//! use highstakes::detect::debounce::{Debouncer, wait_until, LOOPRATE};
//!
//! let mut debouncer = Debouncer::new(3);
//! let found = wait_until(&clock, &mut debouncer, Duration::from_millis(1500), LOOPRATE, || {
//!     goal_in_range()
//! })
//! .await;
//! ```

use std::time::Duration;

use crate::peripherals::Clock;

/// Default poll interval of every control loop.
pub const LOOPRATE: Duration = Duration::from_millis(20);

/// Result of feeding one sample to a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionEvent {
    /// The sample did not match; the run was reset.
    Miss,
    /// The run is growing but has not reached the threshold yet.
    Pending(u32),
    /// The run just reached the threshold. Fires once per run.
    Detected,
    /// The run is already past the threshold.
    Holding,
}

impl DetectionEvent {
    /// Whether the detector is currently reporting a detection.
    pub fn is_detected(self) -> bool {
        matches!(self, DetectionEvent::Detected | DetectionEvent::Holding)
    }
}

/// Counts consecutive positive samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debouncer {
    threshold: u32,
    count:     u32,
}

impl Debouncer {
    /// Creates a detector that fires after `threshold` consecutive matches.
    /// A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Debouncer {
            threshold: threshold.max(1),
            count:     0,
        }
    }

    /// Feeds one sample.
    pub fn poll(&mut self, matched: bool) -> DetectionEvent {
        if !matched {
            self.count = 0;
            return DetectionEvent::Miss;
        }
        self.count = self.count.saturating_add(1);
        if self.count < self.threshold {
            DetectionEvent::Pending(self.count)
        } else if self.count == self.threshold {
            DetectionEvent::Detected
        } else {
            DetectionEvent::Holding
        }
    }

    pub fn is_detected(&self) -> bool { self.count >= self.threshold }

    pub fn count(&self) -> u32 { self.count }

    pub fn threshold(&self) -> u32 { self.threshold }

    pub fn reset(&mut self) { self.count = 0; }
}

/// How a bounded wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Detected,
    TimedOut,
    /// The abort condition became true first.
    Aborted,
}

/// Polls `predicate` every `poll_interval` until `debouncer` reports a
/// detection or `timeout` elapses.
///
/// Returns `true` on detection and `false` on timeout. The debouncer is reset
/// before the first sample.
pub async fn wait_until<C: Clock>(
    clock: &C,
    debouncer: &mut Debouncer,
    timeout: Duration,
    poll_interval: Duration,
    predicate: impl FnMut() -> bool,
) -> bool {
    wait_until_or_abort(clock, debouncer, timeout, poll_interval, predicate, || false).await ==
        WaitOutcome::Detected
}

/// Like [`wait_until`], but also gives up as soon as `abort` returns `true`.
///
/// `abort` is checked before each sample.
pub async fn wait_until_or_abort<C: Clock>(
    clock: &C,
    debouncer: &mut Debouncer,
    timeout: Duration,
    poll_interval: Duration,
    mut predicate: impl FnMut() -> bool,
    mut abort: impl FnMut() -> bool,
) -> WaitOutcome {
    let start = clock.uptime();
    debouncer.reset();

    loop {
        if clock.uptime().saturating_sub(start) >= timeout {
            return WaitOutcome::TimedOut;
        }
        if abort() {
            return WaitOutcome::Aborted;
        }
        if debouncer.poll(predicate()).is_detected() {
            return WaitOutcome::Detected;
        }
        clock.sleep(poll_interval).await;
    }
}
