use crate::dsp::ClockGenerator;
use std::time::Duration;

/// State that may only be left on ticks of its interval clock.
///
/// The exit window is computed in `update` at the end of a tick and consumed
/// by transition checks on the following tick.
#[derive(Debug, Clone)]
pub struct TimerState {
    interval: Duration,
    first_tick_on_entry: bool,
    restart_on_entry: bool,
    clock: ClockGenerator,
    first_pending: bool,
    exit_window: bool,
}

impl TimerState {
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(Duration::from_micros(1));
        Self {
            interval,
            first_tick_on_entry: false,
            restart_on_entry: true,
            clock: ClockGenerator::new(1.0 / interval.as_secs_f64()),
            first_pending: false,
            exit_window: false,
        }
    }

    /// Open the exit window right after activation instead of one interval later.
    pub fn with_first_tick(mut self, enabled: bool) -> Self {
        self.first_tick_on_entry = enabled;
        self
    }

    pub fn with_restart_on_entry(mut self, enabled: bool) -> Self {
        self.restart_on_entry = enabled;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn first_tick_on_entry(&self) -> bool {
        self.first_tick_on_entry
    }

    pub fn restart_on_entry(&self) -> bool {
        self.restart_on_entry
    }

    pub fn can_exit(&self) -> bool {
        self.exit_window
    }

    pub fn on_activate(&mut self, elapsed: Duration) {
        if self.restart_on_entry || !self.clock.is_running() {
            self.clock.restart(elapsed);
        }
        self.first_pending = self.first_tick_on_entry;
        self.exit_window = false;
    }

    pub fn update(&mut self, elapsed: Duration, delta: Duration) {
        self.clock.update(elapsed, delta);
        self.exit_window = self.clock.num_new_ticks() > 0 || self.first_pending;
        self.clock.clear_new_ticks();
        self.first_pending = false;
    }

    pub fn reset(&mut self) {
        self.clock = ClockGenerator::new(1.0 / self.interval.as_secs_f64());
        self.first_pending = false;
        self.exit_window = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_exit_window_follows_clock() {
        let mut timer = TimerState::new(ms(500));
        timer.on_activate(ms(0));
        timer.update(ms(0), ms(0));
        assert!(!timer.can_exit());

        timer.update(ms(250), ms(250));
        assert!(!timer.can_exit());
        timer.update(ms(500), ms(250));
        assert!(timer.can_exit());
        timer.update(ms(750), ms(250));
        assert!(!timer.can_exit());
    }

    #[test]
    fn test_first_tick_on_entry() {
        let mut timer = TimerState::new(ms(500)).with_first_tick(true);
        timer.on_activate(ms(100));
        timer.update(ms(100), ms(0));
        assert!(timer.can_exit());
        timer.update(ms(200), ms(100));
        assert!(!timer.can_exit());
    }

    #[test]
    fn test_restart_on_entry_realigns_clock() {
        let mut timer = TimerState::new(ms(1000));
        timer.on_activate(ms(0));
        timer.update(ms(900), ms(900));
        timer.on_activate(ms(900));
        timer.update(ms(1000), ms(100));
        assert!(!timer.can_exit());
        timer.update(ms(1900), ms(900));
        assert!(timer.can_exit());
    }
}
