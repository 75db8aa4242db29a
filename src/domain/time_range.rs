// Time range domain model
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

/// Largest relative offset or step accepted from options, about a century.
pub const MAX_SPAN_SECS: i64 = 100 * 366 * 86_400;

/// Requested time window, either anchored to "now" or fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    /// Signed offsets from now, in seconds.
    Relative { start: i64, end: i64 },
    Absolute {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Time range plus the step and refresh settings that travel with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRangeOptions {
    pub range: TimeRange,
    /// Explicit step in seconds, replaces the auto step.
    pub step: Option<u64>,
    /// Step floor in seconds.
    pub min_step: Option<u64>,
    /// Auto-refresh period in milliseconds.
    pub ms_update_interval: Option<u64>,
}

impl TimeRangeOptions {
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            step: None,
            min_step: None,
            ms_update_interval: None,
        }
    }
}

/// Concrete start/end instants produced by resolving a [`TimeRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window length in whole seconds. Negative windows report zero.
    pub fn duration_secs(&self) -> u64 {
        (self.end - self.start).num_seconds().max(0) as u64
    }
}

/// Source of "now" for relative ranges.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl TimeRange {
    /// Resolve into absolute instants.
    ///
    /// Relative ranges are re-anchored on every call. The anchor is truncated
    /// to whole seconds so that redraws within the same second resolve to the
    /// same window and don't trigger a new query.
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeWindow {
        match *self {
            TimeRange::Relative { start, end } => {
                let anchor = now.trunc_subsecs(0);
                TimeWindow::new(shift(anchor, start), shift(anchor, end))
            }
            TimeRange::Absolute { start, end } => TimeWindow::new(start, end),
        }
    }
}

/// `anchor + secs`, clamped to the range `DateTime<Utc>` can hold.
fn shift(anchor: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    TimeDelta::try_seconds(secs)
        .and_then(|delta| anchor.checked_add_signed(delta))
        .unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    /// Clock that only moves when told to.
    pub struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self(Mutex::new(now))
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn instant(secs: i64, millis: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, millis * 1_000_000).unwrap()
    }

    #[test]
    fn test_relative_range_anchors_to_now() {
        let range = TimeRange::Relative { start: -3600, end: 0 };
        let window = range.resolve(instant(1_700_000_000, 0));

        assert_eq!(window.start, instant(1_699_996_400, 0));
        assert_eq!(window.end, instant(1_700_000_000, 0));
        assert_eq!(window.duration_secs(), 3600);
    }

    #[test]
    fn test_relative_range_stable_within_a_second() {
        let range = TimeRange::Relative { start: -60, end: -10 };
        let first = range.resolve(instant(1_700_000_000, 120));
        let second = range.resolve(instant(1_700_000_000, 980));
        assert_eq!(first, second);

        let later = range.resolve(instant(1_700_000_001, 5));
        assert_eq!(later.start - first.start, Duration::seconds(1));
    }

    #[test]
    fn test_absolute_range_passes_through() {
        let start = instant(1_600_000_000, 250);
        let end = instant(1_600_003_600, 750);
        let range = TimeRange::Absolute { start, end };

        let a = range.resolve(instant(1_700_000_000, 0));
        let b = range.resolve(instant(1_800_000_000, 0));
        assert_eq!(a, TimeWindow::new(start, end));
        assert_eq!(a, b);
    }

    #[test]
    fn test_inverted_window_is_not_rejected() {
        let range = TimeRange::Relative { start: 0, end: -60 };
        let window = range.resolve(instant(1_700_000_000, 0));
        assert!(window.end < window.start);
        assert_eq!(window.duration_secs(), 0);
    }

    #[test]
    fn test_offsets_past_the_calendar_clamp_instead_of_overflowing() {
        let now = instant(1_700_000_000, 0);

        let range = TimeRange::Relative { start: -10_000_000_000_000, end: 0 };
        let window = range.resolve(now);
        assert_eq!(window.start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(window.end, now);

        let range = TimeRange::Relative { start: i64::MIN, end: i64::MAX };
        let window = range.resolve(now);
        assert_eq!(window.start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(window.end, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_a_century_either_way_resolves_exactly() {
        let now = instant(1_700_000_000, 0);
        let range = TimeRange::Relative { start: -MAX_SPAN_SECS, end: MAX_SPAN_SECS };
        let window = range.resolve(now);
        assert_eq!(now - window.start, Duration::seconds(MAX_SPAN_SECS));
        assert_eq!(window.end - now, Duration::seconds(MAX_SPAN_SECS));
    }
}
