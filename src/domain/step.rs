// Step calculation for range queries
use super::time_range::{TimeRangeOptions, TimeWindow};

const SECONDS_PER_DAY: u64 = 86_400;

/// Step boundaries the auto step snaps up to, in seconds.
const NICE_STEPS: [u64; 18] = [
    1, 2, 5, 10, 15, 30, // seconds
    60, 120, 300, 600, 900, 1800, // minutes
    3600, 7200, 10_800, 21_600, 43_200, // hours
    SECONDS_PER_DAY,
];

/// Auto step for a window drawn on `pixel_width` pixels: about one sample per
/// pixel, snapped up to the next round boundary.
pub fn compute_step_auto(window: &TimeWindow, pixel_width: u32) -> u64 {
    let raw = (window.duration_secs() / u64::from(pixel_width.max(1))).max(1);
    snap_up(raw)
}

fn snap_up(raw: u64) -> u64 {
    if raw > SECONDS_PER_DAY {
        return raw.div_ceil(SECONDS_PER_DAY) * SECONDS_PER_DAY;
    }
    NICE_STEPS
        .iter()
        .copied()
        .find(|&s| s >= raw)
        .unwrap_or(SECONDS_PER_DAY)
}

/// Step actually sent to the backend.
///
/// An explicit `step` replaces the auto step; `min_step` wins whenever it is
/// larger than either.
pub fn effective_step(options: &TimeRangeOptions, window: &TimeWindow, pixel_width: u32) -> u64 {
    let expected = options
        .step
        .unwrap_or_else(|| compute_step_auto(window, pixel_width));
    options.min_step.unwrap_or(expected).max(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time_range::TimeRange;
    use chrono::{TimeZone, Utc};

    fn window(duration_secs: i64) -> TimeWindow {
        let end = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        TimeWindow::new(end - chrono::Duration::seconds(duration_secs), end)
    }

    fn options(step: Option<u64>, min_step: Option<u64>) -> TimeRangeOptions {
        TimeRangeOptions {
            step,
            min_step,
            ..TimeRangeOptions::new(TimeRange::Relative { start: -3600, end: 0 })
        }
    }

    #[test]
    fn test_auto_step_one_hour_on_600px() {
        // 3600s / 600px = 6s, snapped to 10s
        assert_eq!(compute_step_auto(&window(3600), 600), 10);
    }

    #[test]
    fn test_auto_step_never_below_one_second() {
        assert_eq!(compute_step_auto(&window(60), 1920), 1);
        assert_eq!(compute_step_auto(&window(0), 100), 1);
        assert_eq!(compute_step_auto(&window(3600), 0), 3600);
    }

    #[test]
    fn test_auto_step_multi_day_rounds_to_days() {
        let step = compute_step_auto(&window(400 * 86_400), 100);
        assert_eq!(step % SECONDS_PER_DAY, 0);
        assert_eq!(step, 4 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_auto_step_is_monotonic() {
        let mut previous = 0;
        for hours in 1..200 {
            let step = compute_step_auto(&window(hours * 3600), 800);
            assert!(step >= previous, "step shrank at {hours}h");
            previous = step;
        }

        let mut previous = u64::MAX;
        for width in (100..4000).step_by(50) {
            let step = compute_step_auto(&window(86_400), width);
            assert!(step <= previous, "step grew at {width}px");
            previous = step;
        }
    }

    #[test]
    fn test_min_step_takes_precedence() {
        let w = window(3600);
        assert_eq!(effective_step(&options(None, Some(60)), &w, 600), 60);
        assert_eq!(effective_step(&options(Some(15), Some(60)), &w, 600), 60);
        assert_eq!(effective_step(&options(Some(120), Some(60)), &w, 600), 120);
        assert_eq!(effective_step(&options(Some(3), None), &w, 600), 3);
        assert_eq!(effective_step(&options(None, None), &w, 600), 10);
    }

    #[test]
    fn test_effective_step_respects_floor_for_all_widths() {
        let opts = options(None, Some(45));
        for width in [1, 10, 300, 600, 1200, 5000] {
            for secs in [60, 3600, 86_400, 7 * 86_400] {
                assert!(effective_step(&opts, &window(secs), width) >= 45);
            }
        }
    }
}
