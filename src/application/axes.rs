// Time axis presentation and gap filling
use crate::application::host::{TimeAxis, TimeUnit};
use crate::domain::dataset::{DataPoint, Dataset};
use crate::domain::time_range::TimeWindow;
use chrono::TimeDelta;

/// Pick the axis unit from the window length.
pub fn time_axis(window: &TimeWindow, stacked: bool) -> TimeAxis {
    let secs = window.duration_secs();
    let unit = match secs {
        0..=120 => TimeUnit::Second,
        121..=7_200 => TimeUnit::Minute,
        7_201..=172_800 => TimeUnit::Hour,
        172_801..=5_184_000 => TimeUnit::Day,
        _ => TimeUnit::Month,
    };
    TimeAxis {
        min: window.start,
        max: window.end,
        unit,
        stacked,
    }
}

/// Insert null points wherever two consecutive samples are more than one
/// step apart, and at the window edges when data starts late or stops early.
/// Keeps the renderer from drawing a straight line across missing data.
pub fn fill_gaps(datasets: &mut [Dataset], window: &TimeWindow, step: u64) {
    // A step too large for a TimeDelta is wider than any window: no gaps.
    let Some(step) = i64::try_from(step.max(1))
        .ok()
        .and_then(TimeDelta::try_seconds)
    else {
        return;
    };
    for dataset in datasets.iter_mut() {
        if dataset.data.is_empty() {
            continue;
        }

        let mut filled = Vec::with_capacity(dataset.data.len() + 2);
        let mut previous: Option<chrono::DateTime<chrono::Utc>> = None;
        for point in dataset.data.drain(..) {
            match previous {
                None if point.x - window.start > step => {
                    filled.push(DataPoint::gap(window.start));
                }
                Some(prev) if point.x - prev > step => {
                    filled.extend(prev.checked_add_signed(step).map(DataPoint::gap));
                }
                _ => {}
            }
            previous = Some(point.x);
            filled.push(point);
        }

        if let Some(last) = previous {
            if window.end - last > step {
                filled.extend(last.checked_add_signed(step).map(DataPoint::gap));
            }
        }
        dataset.data = filled;
    }
}
