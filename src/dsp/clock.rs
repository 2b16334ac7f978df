//! Sample clock that turns session time into discrete ticks.
//!
//! The clock never integrates `delta`. Tick counts are derived from the
//! absolute elapsed time, so the total number of ticks only depends on how
//! much time has passed and not on how that time was chunked into updates.

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Tolerance for non-integral frequencies so that `0.3 * 10.0` lands on 3.
const TICK_EPSILON: f64 = 1e-9;

/// Number of whole tick boundaries in `span` at `hz`.
fn ticks_in(span: Duration, hz: f64) -> u64 {
    if hz <= 0.0 || !hz.is_finite() {
        return 0;
    }
    if hz.fract() == 0.0 && hz <= u32::MAX as f64 {
        return (span.as_nanos() * hz as u128 / NANOS_PER_SEC) as u64;
    }
    (span.as_secs_f64() * hz + TICK_EPSILON).floor() as u64
}

/// Generates ticks at a fixed frequency from the host's elapsed time.
///
/// Ticks are numbered from zero since the last reset and are consumed in
/// FIFO order with `pop_oldest_tick`. Playback sources map tick `t` onto
/// `t % len` to loop over finite data.
#[derive(Debug, Clone)]
pub struct ClockGenerator {
    frequency: f64,
    /// Elapsed time at which counting (re)started, shifted by paused spans.
    origin: Duration,
    current_time: Duration,
    /// Ticks carried over from before the last frequency change.
    base_ticks: u64,
    emitted: u64,
    popped: u64,
    running: bool,
    stopped_at: Option<Duration>,
}

impl ClockGenerator {
    /// Create a stopped clock. The first `start` anchors it at the current time.
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            origin: Duration::ZERO,
            current_time: Duration::ZERO,
            base_ticks: 0,
            emitted: 0,
            popped: 0,
            running: false,
            stopped_at: Some(Duration::ZERO),
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Change the rate. Ticks already generated are kept.
    pub fn set_frequency(&mut self, hz: f64) {
        if hz == self.frequency {
            return;
        }
        self.base_ticks = self.emitted;
        self.origin = self.current_time;
        if !self.running {
            self.stopped_at = Some(self.current_time);
        }
        self.frequency = hz;
    }

    pub fn start_time(&self) -> Duration {
        self.origin
    }

    /// Set the elapsed time at which tick counting begins.
    pub fn set_start_time(&mut self, start_time: Duration) {
        self.origin = start_time;
        self.stopped_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        if let Some(stopped_at) = self.stopped_at.take() {
            self.origin += self.current_time.saturating_sub(stopped_at);
        }
        self.running = true;
    }

    /// Stop counting. Time spent stopped never produces ticks.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.stopped_at = Some(self.current_time);
    }

    /// Drop all ticks and restart counting from the current time.
    pub fn reset(&mut self) {
        self.base_ticks = 0;
        self.emitted = 0;
        self.popped = 0;
        self.origin = self.current_time;
        self.stopped_at = if self.running {
            None
        } else {
            Some(self.current_time)
        };
    }

    /// Reset and run from `elapsed` on.
    pub fn restart(&mut self, elapsed: Duration) {
        self.current_time = elapsed;
        self.reset();
        self.set_start_time(elapsed);
        self.running = true;
    }

    pub fn update(&mut self, elapsed: Duration, _delta: Duration) {
        self.current_time = elapsed;
        if !self.running {
            return;
        }
        let total = self.base_ticks + ticks_in(elapsed.saturating_sub(self.origin), self.frequency);
        // Ticks are never revoked, even if the host hands us a smaller elapsed.
        self.emitted = self.emitted.max(total);
    }

    #[inline]
    pub fn num_new_ticks(&self) -> u64 {
        self.emitted - self.popped
    }

    /// Index of the oldest unconsumed tick, or `None` once drained.
    #[inline]
    pub fn pop_oldest_tick(&mut self) -> Option<u64> {
        if self.popped < self.emitted {
            let tick = self.popped;
            self.popped += 1;
            Some(tick)
        } else {
            None
        }
    }

    /// Mark every pending tick as consumed.
    pub fn clear_new_ticks(&mut self) {
        self.popped = self.emitted;
    }

    /// Ticks generated since the last reset.
    pub fn total_ticks(&self) -> u64 {
        self.emitted
    }

    pub fn current_time(&self) -> Duration {
        self.current_time
    }
}
