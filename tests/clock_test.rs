//! Sample clock determinism

use neurograph::dsp::ClockGenerator;
use proptest::prelude::*;
use std::time::Duration;

fn expected_ticks(elapsed: Duration, hz: u32) -> u64 {
    (elapsed.as_nanos() * hz as u128 / 1_000_000_000) as u64
}

#[test]
fn test_no_tick_at_start() {
    let mut clock = ClockGenerator::new(250.0);
    clock.restart(Duration::ZERO);
    clock.update(Duration::ZERO, Duration::ZERO);
    assert_eq!(clock.num_new_ticks(), 0);

    clock.update(Duration::from_millis(4), Duration::from_millis(4));
    assert_eq!(clock.pop_oldest_tick(), Some(0));
    assert_eq!(clock.pop_oldest_tick(), None);
}

#[test]
fn test_fractional_frequency_hits_boundaries() {
    let mut clock = ClockGenerator::new(0.5);
    clock.restart(Duration::ZERO);
    clock.update(Duration::from_millis(1_999), Duration::ZERO);
    assert_eq!(clock.total_ticks(), 0);
    clock.update(Duration::from_secs(2), Duration::ZERO);
    assert_eq!(clock.total_ticks(), 1);
}

#[test]
fn test_restart_late_anchors_at_restart_time() {
    let mut clock = ClockGenerator::new(10.0);
    clock.restart(Duration::from_secs(5));
    clock.update(Duration::from_millis(5_300), Duration::from_millis(300));
    assert_eq!(clock.total_ticks(), 3);
}

proptest! {
    #[test]
    fn test_ticks_depend_only_on_elapsed(
        hz in 1u32..2_000,
        steps in prop::collection::vec(0u64..250, 1..60)
    ) {
        let mut chunked = ClockGenerator::new(hz as f64);
        chunked.restart(Duration::ZERO);
        let mut elapsed = Duration::ZERO;
        for ms in &steps {
            let delta = Duration::from_millis(*ms);
            elapsed += delta;
            chunked.update(elapsed, delta);
        }

        let mut single = ClockGenerator::new(hz as f64);
        single.restart(Duration::ZERO);
        single.update(elapsed, elapsed);

        prop_assert_eq!(chunked.total_ticks(), single.total_ticks());
        prop_assert_eq!(chunked.total_ticks(), expected_ticks(elapsed, hz));
    }

    #[test]
    fn test_ticks_pop_in_order(
        hz in 1u32..500,
        steps in prop::collection::vec(1u64..100, 1..30)
    ) {
        let mut clock = ClockGenerator::new(hz as f64);
        clock.restart(Duration::ZERO);
        let mut elapsed = Duration::ZERO;
        let mut next = 0u64;
        for ms in &steps {
            elapsed += Duration::from_millis(*ms);
            clock.update(elapsed, Duration::from_millis(*ms));
            while let Some(tick) = clock.pop_oldest_tick() {
                prop_assert_eq!(tick, next);
                next += 1;
            }
            prop_assert_eq!(clock.num_new_ticks(), 0);
        }
        prop_assert_eq!(next, clock.total_ticks());
    }

    #[test]
    fn test_stopped_time_never_ticks(
        hz in 1u32..1_000,
        before_ms in 0u64..5_000,
        paused_ms in 0u64..5_000,
        after_ms in 0u64..5_000
    ) {
        let mut clock = ClockGenerator::new(hz as f64);
        clock.restart(Duration::ZERO);

        let t1 = Duration::from_millis(before_ms);
        clock.update(t1, t1);
        clock.stop();

        let t2 = t1 + Duration::from_millis(paused_ms);
        clock.update(t2, t2 - t1);
        prop_assert_eq!(clock.total_ticks(), expected_ticks(t1, hz));

        clock.start();
        let t3 = t2 + Duration::from_millis(after_ms);
        clock.update(t3, t3 - t2);

        let running = t1 + (t3 - t2);
        prop_assert_eq!(clock.total_ticks(), expected_ticks(running, hz));
    }
}
