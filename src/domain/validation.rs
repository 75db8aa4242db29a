// Validation of caller options into ChartOptions
use super::options::{ChartOptions, PartialOptions, Queries, Query};
use super::time_range::{TimeRange, TimeRangeOptions, MAX_SPAN_SECS};
use crate::error::ConfigError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

const MIN_UPDATE_INTERVAL_MS: i64 = 1000;

impl PartialOptions {
    /// Check the options and merge them over the defaults.
    ///
    /// Checks run in a fixed order and stop at the first failure.
    pub fn validate(&self) -> Result<ChartOptions, ConfigError> {
        let queries = match &self.query {
            None => return Err(ConfigError::MissingQuery),
            Some(queries) if is_blank(queries) => return Err(ConfigError::MissingQuery),
            Some(queries) => queries.normalize(),
        };

        let raw = self
            .time_range
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or(ConfigError::MissingTimeRange)?;
        let time_range = parse_time_range(raw)?;

        if matches!(&self.border_color, Some(colors) if colors.is_empty()) {
            return Err(ConfigError::EmptyPalette("borderColor"));
        }
        if matches!(&self.background_color, Some(colors) if colors.is_empty()) {
            return Err(ConfigError::EmptyPalette("backgroundColor"));
        }

        Ok(ChartOptions::assemble(self, queries, time_range))
    }
}

fn is_blank(queries: &Queries) -> bool {
    queries.is_empty()
        || matches!(queries, Queries::One(Query::Expr(expr)) if expr.trim().is_empty())
}

/// Look a key up under its snake_case name, then its camelCase name.
fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| object.get(*name))
        .find(|v| !v.is_null())
}

fn parse_time_range(raw: &Value) -> Result<TimeRangeOptions, ConfigError> {
    let object = raw.as_object().ok_or(ConfigError::TimeRangeNotObject)?;

    let kind = match field(object, &["type"]) {
        Some(Value::String(kind)) => kind.as_str(),
        _ => return Err(ConfigError::TimeRangeTypeNotString),
    };
    if kind != "relative" && kind != "absolute" {
        return Err(ConfigError::InvalidTimeRangeType(kind.to_string()));
    }

    let start = field(object, &["start"]).ok_or(ConfigError::MissingStart)?;
    let end = field(object, &["end"]).ok_or(ConfigError::MissingEnd)?;

    let range = if kind == "relative" {
        TimeRange::Relative {
            start: parse_offset(start).ok_or(ConfigError::InvalidStart)?,
            end: parse_offset(end).ok_or(ConfigError::InvalidEnd)?,
        }
    } else {
        TimeRange::Absolute {
            start: parse_instant(start).ok_or(ConfigError::InvalidStart)?,
            end: parse_instant(end).ok_or(ConfigError::InvalidEnd)?,
        }
    };

    let ms_update_interval = match field(object, &["ms_update_interval", "msUpdateInterval"]) {
        None => None,
        Some(value) => {
            let interval = value
                .as_f64()
                .ok_or(ConfigError::UpdateIntervalNotNumber)?
                .trunc() as i64;
            if interval < MIN_UPDATE_INTERVAL_MS {
                return Err(ConfigError::UpdateIntervalTooShort(interval));
            }
            Some(interval as u64)
        }
    };

    Ok(TimeRangeOptions {
        range,
        step: parse_step(object, &["step"], "step")?,
        min_step: parse_step(object, &["min_step", "minStep"], "minStep")?,
        ms_update_interval,
    })
}

/// Whole seconds, at most [`MAX_SPAN_SECS`] either side of now.
fn parse_offset(value: &Value) -> Option<i64> {
    let offset = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?,
        _ => return None,
    };
    (offset.unsigned_abs() <= MAX_SPAN_SECS as u64).then_some(offset)
}

/// RFC 3339 strings or epoch milliseconds.
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_step(
    object: &Map<String, Value>,
    names: &[&str],
    label: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match field(object, names) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .filter(|step| (1..=MAX_SPAN_SECS as u64).contains(step))
            .map(Some)
            .ok_or(ConfigError::InvalidStep(label)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn partial(time_range: Value) -> PartialOptions {
        PartialOptions {
            time_range: Some(time_range),
            ..PartialOptions::new().with_query("up")
        }
    }

    fn reject(options: PartialOptions) -> ConfigError {
        match options.validate() {
            Ok(_) => panic!("options should have been rejected"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_relative_range_is_accepted() {
        let options = partial(json!({
            "type": "relative",
            "start": -3600,
            "end": 0,
            "min_step": 60,
            "msUpdateInterval": 5000
        }))
        .validate()
        .unwrap();

        assert_eq!(
            options.time_range.range,
            TimeRange::Relative { start: -3600, end: 0 }
        );
        assert_eq!(options.time_range.min_step, Some(60));
        assert_eq!(options.time_range.ms_update_interval, Some(5000));
        assert_eq!(options.queries.len(), 1);
    }

    #[test]
    fn test_absolute_range_accepts_rfc3339_and_millis() {
        let options = partial(json!({
            "type": "absolute",
            "start": "2024-01-01T00:00:00Z",
            "end": 1_704_070_800_000i64
        }))
        .validate()
        .unwrap();

        match options.time_range.range {
            TimeRange::Absolute { start, end } => {
                assert_eq!(start.timestamp(), 1_704_067_200);
                assert_eq!(end.timestamp(), 1_704_070_800);
            }
            other => panic!("unexpected range {other:?}"),
        }
    }

    #[test]
    fn test_checks_run_in_order() {
        let no_query = PartialOptions {
            time_range: None,
            ..PartialOptions::new()
        };
        assert_eq!(reject(no_query), ConfigError::MissingQuery);

        let blank = PartialOptions::new().with_query("  ");
        assert_eq!(reject(blank), ConfigError::MissingQuery);

        let empty_list = PartialOptions::new().with_queries(Vec::new());
        assert_eq!(reject(empty_list), ConfigError::MissingQuery);

        let no_range = PartialOptions::new().with_query("up");
        assert_eq!(reject(no_range), ConfigError::MissingTimeRange);

        assert_eq!(reject(partial(json!("last hour"))), ConfigError::TimeRangeNotObject);
        assert_eq!(
            reject(partial(json!({"start": -60, "end": 0}))),
            ConfigError::TimeRangeTypeNotString
        );
        assert_eq!(
            reject(partial(json!({"type": "sliding", "start": -60, "end": 0}))),
            ConfigError::InvalidTimeRangeType("sliding".into())
        );
        assert_eq!(
            reject(partial(json!({"type": "relative", "end": 0}))),
            ConfigError::MissingStart
        );
        assert_eq!(
            reject(partial(json!({"type": "relative", "start": -60}))),
            ConfigError::MissingEnd
        );
    }

    #[test]
    fn test_start_end_must_match_type() {
        assert_eq!(
            reject(partial(json!({"type": "relative", "start": "2024-01-01T00:00:00Z", "end": 0}))),
            ConfigError::InvalidStart
        );
        assert_eq!(
            reject(partial(json!({
                "type": "absolute", "start": "2024-01-01T00:00:00Z", "end": "tomorrow"
            }))),
            ConfigError::InvalidEnd
        );
        assert_eq!(
            reject(partial(json!({"type": "absolute", "start": true, "end": 0}))),
            ConfigError::InvalidStart
        );
    }

    #[test]
    fn test_update_interval_below_one_second_is_rejected() {
        assert_eq!(
            reject(partial(json!({
                "type": "relative", "start": -60, "end": 0, "msUpdateInterval": 500
            }))),
            ConfigError::UpdateIntervalTooShort(500)
        );
        assert_eq!(
            reject(partial(json!({
                "type": "relative", "start": -60, "end": 0, "ms_update_interval": "5s"
            }))),
            ConfigError::UpdateIntervalNotNumber
        );

        let ok = partial(json!({
            "type": "relative", "start": -60, "end": 0, "msUpdateInterval": 1000
        }));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_step_and_palette_checks() {
        assert_eq!(
            reject(partial(json!({"type": "relative", "start": -60, "end": 0, "step": 0}))),
            ConfigError::InvalidStep("step")
        );
        assert_eq!(
            reject(partial(json!({"type": "relative", "start": -60, "end": 0, "minStep": -5}))),
            ConfigError::InvalidStep("minStep")
        );

        let mut options = partial(json!({"type": "relative", "start": -60, "end": 0}));
        options.border_color = Some(Vec::new());
        assert_eq!(reject(options), ConfigError::EmptyPalette("borderColor"));
    }

    #[test]
    fn test_offsets_and_steps_beyond_a_century_are_rejected() {
        assert_eq!(
            reject(partial(json!({"type": "relative", "start": -10_000_000_000_000i64, "end": 0}))),
            ConfigError::InvalidStart
        );
        assert_eq!(
            reject(partial(json!({"type": "relative", "start": -60, "end": i64::MAX}))),
            ConfigError::InvalidEnd
        );
        assert_eq!(
            reject(partial(json!({"type": "relative", "start": i64::MIN, "end": 0}))),
            ConfigError::InvalidStart
        );
        assert_eq!(
            reject(partial(json!({
                "type": "relative", "start": -60, "end": 0, "step": 10_000_000_000_000_000u64
            }))),
            ConfigError::InvalidStep("step")
        );
        assert_eq!(
            reject(partial(json!({
                "type": "relative", "start": -60, "end": 0, "min_step": u64::MAX
            }))),
            ConfigError::InvalidStep("minStep")
        );

        let edge = partial(json!({
            "type": "relative", "start": -MAX_SPAN_SECS, "end": MAX_SPAN_SECS, "step": MAX_SPAN_SECS
        }));
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_typed_time_range_round_trips_through_raw_shape() {
        let typed = TimeRangeOptions {
            step: Some(30),
            ms_update_interval: Some(10_000),
            ..TimeRangeOptions::new(TimeRange::Absolute {
                start: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                end: Utc.timestamp_opt(1_700_003_600, 0).unwrap(),
            })
        };
        let options = PartialOptions::new()
            .with_query("up")
            .with_time_range(typed)
            .validate()
            .unwrap();
        assert_eq!(options.time_range, typed);
    }
}
