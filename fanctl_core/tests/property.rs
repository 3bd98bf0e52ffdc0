use fanctl_core::controller::{FanState, STOP_AT, running_duty, transition};
use fanctl_core::sampler::{CALIBRATION_OFFSET, RunningAverage, SharedAverage, TemperatureSampler, WINDOW};
use proptest::prelude::*;

// Full 10-bit converter range.
fn raw_reading() -> impl Strategy<Value = u16> {
    0u16..=1023
}

proptest! {
    #[test]
    fn window_average_is_floor_of_calibrated_mean(
        readings in prop::collection::vec(raw_reading(), WINDOW as usize)
    ) {
        let shared = SharedAverage::new();
        let mut s = TemperatureSampler::new(shared.clone());
        for &r in &readings {
            s.on_conversion_complete(r);
        }
        let sum: i32 = readings
            .iter()
            .map(|&r| i32::from(r) + i32::from(CALIBRATION_OFFSET))
            .sum();
        let expected = sum.div_euclid(i32::from(WINDOW)).max(0);
        prop_assert_eq!(i32::from(shared.load()), expected);
        prop_assert_eq!(s.window().count(), 0);
    }

    #[test]
    fn first_sample_seeds_average(r in raw_reading()) {
        let shared = SharedAverage::new();
        let mut s = TemperatureSampler::new(shared.clone());
        s.on_conversion_complete(r);
        let seeded = (i32::from(r) + i32::from(CALIBRATION_OFFSET)).max(0);
        prop_assert_eq!(i32::from(shared.load()), seeded);
    }

    #[test]
    fn partial_window_keeps_previous_average(
        first in prop::collection::vec(raw_reading(), WINDOW as usize),
        partial in prop::collection::vec(raw_reading(), 1..(WINDOW as usize)),
    ) {
        let mut avg = RunningAverage::new();
        for &r in &first {
            avg.push(r);
        }
        let settled = avg.average();
        for &r in &partial {
            // 0 means the window sum was not positive; the next sample reseeds
            if settled != 0 {
                prop_assert_eq!(avg.push(r), settled);
            }
        }
    }

    #[test]
    fn readings_below_offset_are_not_clipped(
        low in prop::collection::vec(0u16..3, 1..(WINDOW as usize)),
        fill in 100u16..=1023,
    ) {
        let shared = SharedAverage::new();
        let mut s = TemperatureSampler::new(shared.clone());
        for &r in &low {
            s.on_conversion_complete(r);
        }
        for _ in low.len()..(WINDOW as usize) {
            s.on_conversion_complete(fill);
        }
        let sum: i32 = low.iter().map(|&r| i32::from(r) - 3).sum::<i32>()
            + (WINDOW as i32 - low.len() as i32) * (i32::from(fill) - 3);
        prop_assert_eq!(i32::from(shared.load()), sum.div_euclid(i32::from(WINDOW)));
    }

    #[test]
    fn running_duty_is_monotonic(a in 0u16..=1023, b in 0u16..=1023) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(running_duty(lo) <= running_duty(hi));
    }

    #[test]
    fn running_never_drives_at_or_below_stop(avg in 0u16..=STOP_AT, dwell in any::<u16>()) {
        let t = transition(FanState::Running, dwell, avg);
        prop_assert_eq!(t.duty, 0);
        prop_assert_eq!(t.state, FanState::Off);
    }

    #[test]
    fn startup_always_kicks(avg in any::<u16>(), dwell in any::<u16>()) {
        let t = transition(FanState::Startup, dwell, avg);
        prop_assert_eq!(t.state, FanState::FullSpeed);
        prop_assert_eq!(t.dwell, 0);
    }

    #[test]
    fn running_is_idempotent(avg in (STOP_AT + 1)..=1023u16, dwell in any::<u16>()) {
        let a = transition(FanState::Running, dwell, avg);
        let b = transition(a.state, a.dwell, avg);
        prop_assert_eq!(a, b);
    }
}
