// Chart options - what to query, how to window time, how to render
use super::dataset::{Dataset, InterpolationMode};
use super::series::{Metric, QueryResult};
use super::time_range::{TimeRange, TimeRangeOptions};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Connection parameters for a Prometheus server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrometheusConnection {
    pub endpoint: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub auth: Option<Auth>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    "/api/v1".to_string()
}

impl PrometheusConnection {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            base_url: default_base_url(),
            timeout_ms: None,
            auth: None,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Auth {
    Basic { username: String, password: String },
    Bearer { bearer: String },
}

/// A query that produces its own result without a Prometheus connection.
#[async_trait]
pub trait ComputedQuery: Send + Sync {
    async fn execute(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: u64,
    ) -> anyhow::Result<QueryResult>;
}

#[derive(Clone)]
pub enum Query {
    /// PromQL expression sent to the backend.
    Expr(String),
    Computed(Arc<dyn ComputedQuery>),
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Expr(expr) => f.debug_tuple("Expr").field(expr).finish(),
            Query::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Query {
    fn from(expr: &str) -> Self {
        Query::Expr(expr.to_string())
    }
}

impl From<String> for Query {
    fn from(expr: String) -> Self {
        Query::Expr(expr)
    }
}

/// One query or an ordered list of them.
#[derive(Debug, Clone)]
pub enum Queries {
    One(Query),
    Many(Vec<Query>),
}

impl Queries {
    pub fn normalize(&self) -> Vec<Query> {
        match self {
            Queries::One(query) => vec![query.clone()],
            Queries::Many(queries) => queries.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Queries::Many(queries) if queries.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Right,
    #[default]
    Center,
    Start,
    End,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBaseline {
    Top,
    Hanging,
    #[default]
    Middle,
    Alphabetic,
    Ideographic,
    Bottom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
    Inherit,
}

/// Text painted over the chart surface with its own styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayMessage {
    pub message: Option<String>,
    pub font: String,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub direction: TextDirection,
}

/// Caller-side overlay template; unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialOverlayMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub text_align: Option<TextAlign>,
    #[serde(default)]
    pub text_baseline: Option<TextBaseline>,
    #[serde(default)]
    pub direction: Option<TextDirection>,
    /// Only the loading overlay honours this.
    #[serde(default)]
    pub disabled: bool,
}

pub type SeriesHook = Arc<dyn Fn(&Metric) -> Option<String> + Send + Sync>;
pub type DatasetHook = Arc<dyn Fn(Vec<Dataset>) -> Vec<Dataset> + Send + Sync>;

pub struct MessageDefaults {
    pub message: Option<&'static str>,
    pub font: &'static str,
    pub text_align: TextAlign,
    pub text_baseline: TextBaseline,
    pub direction: TextDirection,
}

impl MessageDefaults {
    fn apply(&self, partial: Option<&PartialOverlayMessage>) -> OverlayMessage {
        let partial = partial.cloned().unwrap_or_default();
        OverlayMessage {
            message: partial.message.or(self.message.map(str::to_string)),
            font: partial.font.unwrap_or_else(|| self.font.to_string()),
            text_align: partial.text_align.unwrap_or(self.text_align),
            text_baseline: partial.text_baseline.unwrap_or(self.text_baseline),
            direction: partial.direction.unwrap_or(self.direction),
        }
    }
}

/// Defaults applied under every [`PartialOptions`].
pub struct Defaults {
    pub fill_gaps: bool,
    pub tension: f64,
    pub cubic_interpolation_mode: InterpolationMode,
    pub stepped: bool,
    pub fill: bool,
    pub stacked: bool,
    pub border_width: f64,
    pub border_color: &'static [&'static str],
    pub background_color: &'static [&'static str],
    pub no_data_msg: MessageDefaults,
    pub error_msg: MessageDefaults,
    pub loading_msg: MessageDefaults,
}

const MESSAGE_FONT: &str = "16px normal 'Helvetica Nueue'";

const PALETTE: &[&str] = &[
    "rgba(255, 99, 132, 1)",
    "rgba(54, 162, 235, 1)",
    "rgba(255, 206, 86, 1)",
    "rgba(75, 192, 192, 1)",
    "rgba(153, 102, 255, 1)",
    "rgba(255, 159, 64, 1)",
];

pub const DEFAULTS: Defaults = Defaults {
    fill_gaps: false,
    tension: 0.4,
    cubic_interpolation_mode: InterpolationMode::Default,
    stepped: false,
    fill: false,
    stacked: false,
    border_width: 3.0,
    border_color: PALETTE,
    background_color: PALETTE,
    no_data_msg: MessageDefaults {
        message: Some("No data to display"),
        font: MESSAGE_FONT,
        text_align: TextAlign::Center,
        text_baseline: TextBaseline::Middle,
        direction: TextDirection::Ltr,
    },
    error_msg: MessageDefaults {
        message: None,
        font: MESSAGE_FONT,
        text_align: TextAlign::Center,
        text_baseline: TextBaseline::Middle,
        direction: TextDirection::Ltr,
    },
    loading_msg: MessageDefaults {
        message: Some("Loading data..."),
        font: MESSAGE_FONT,
        text_align: TextAlign::Center,
        text_baseline: TextBaseline::Middle,
        direction: TextDirection::Ltr,
    },
};

/// Options as supplied by the caller. Everything is optional here; the
/// required parts are checked by validation.
#[derive(Clone, Default)]
pub struct PartialOptions {
    pub prometheus: Option<PrometheusConnection>,
    pub query: Option<Queries>,
    /// Kept in its raw shape so validation can report malformed input.
    pub time_range: Option<Value>,
    pub fill_gaps: Option<bool>,
    pub tension: Option<f64>,
    pub cubic_interpolation_mode: Option<InterpolationMode>,
    pub stepped: Option<bool>,
    pub fill: Option<bool>,
    pub stacked: Option<bool>,
    pub border_width: Option<f64>,
    pub border_color: Option<Vec<String>>,
    pub background_color: Option<Vec<String>>,
    pub no_data_msg: Option<PartialOverlayMessage>,
    pub error_msg: Option<PartialOverlayMessage>,
    pub loading_msg: Option<PartialOverlayMessage>,
    pub find_in_label_map: Option<SeriesHook>,
    pub find_in_border_color_map: Option<SeriesHook>,
    pub find_in_background_color_map: Option<SeriesHook>,
    pub data_set_hook: Option<DatasetHook>,
}

impl fmt::Debug for PartialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialOptions")
            .field("prometheus", &self.prometheus)
            .field("query", &self.query)
            .field("time_range", &self.time_range)
            .finish_non_exhaustive()
    }
}

impl PartialOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(Queries::One(query.into()));
        self
    }

    pub fn with_queries(mut self, queries: Vec<Query>) -> Self {
        self.query = Some(Queries::Many(queries));
        self
    }

    pub fn with_prometheus(mut self, connection: PrometheusConnection) -> Self {
        self.prometheus = Some(connection);
        self
    }

    /// Set a typed time range, stored in the same raw shape a config file
    /// produces.
    pub fn with_time_range(mut self, options: TimeRangeOptions) -> Self {
        self.time_range = Some(time_range_to_value(&options));
        self
    }
}

fn time_range_to_value(options: &TimeRangeOptions) -> Value {
    let mut object = Map::new();
    match options.range {
        TimeRange::Relative { start, end } => {
            object.insert("type".into(), "relative".into());
            object.insert("start".into(), start.into());
            object.insert("end".into(), end.into());
        }
        TimeRange::Absolute { start, end } => {
            object.insert("type".into(), "absolute".into());
            object.insert(
                "start".into(),
                start.to_rfc3339_opts(SecondsFormat::AutoSi, true).into(),
            );
            object.insert(
                "end".into(),
                end.to_rfc3339_opts(SecondsFormat::AutoSi, true).into(),
            );
        }
    }
    if let Some(step) = options.step {
        object.insert("step".into(), step.into());
    }
    if let Some(min_step) = options.min_step {
        object.insert("min_step".into(), min_step.into());
    }
    if let Some(interval) = options.ms_update_interval {
        object.insert("ms_update_interval".into(), interval.into());
    }
    Value::Object(object)
}

/// Fully defaulted, validated options for one render cycle.
#[derive(Clone)]
pub struct ChartOptions {
    pub prometheus: Option<PrometheusConnection>,
    pub queries: Vec<Query>,
    pub time_range: TimeRangeOptions,
    pub fill_gaps: bool,
    pub tension: f64,
    pub cubic_interpolation_mode: InterpolationMode,
    pub stepped: bool,
    pub fill: bool,
    pub stacked: bool,
    pub border_width: f64,
    pub border_color: Vec<String>,
    pub background_color: Vec<String>,
    pub no_data_msg: OverlayMessage,
    pub error_msg: OverlayMessage,
    pub loading_msg: Option<OverlayMessage>,
    pub find_in_label_map: Option<SeriesHook>,
    pub find_in_border_color_map: Option<SeriesHook>,
    pub find_in_background_color_map: Option<SeriesHook>,
    pub data_set_hook: Option<DatasetHook>,
}

impl fmt::Debug for ChartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartOptions")
            .field("prometheus", &self.prometheus)
            .field("queries", &self.queries)
            .field("time_range", &self.time_range)
            .field("fill_gaps", &self.fill_gaps)
            .field("stacked", &self.stacked)
            .finish_non_exhaustive()
    }
}

impl ChartOptions {
    /// Merge the caller's non-validated fields over [`DEFAULTS`].
    pub(crate) fn assemble(
        partial: &PartialOptions,
        queries: Vec<Query>,
        time_range: TimeRangeOptions,
    ) -> Self {
        let palette = |colors: &Option<Vec<String>>, fallback: &[&str]| {
            colors
                .clone()
                .unwrap_or_else(|| fallback.iter().map(|c| c.to_string()).collect())
        };
        let loading_msg = match &partial.loading_msg {
            Some(msg) if msg.disabled => None,
            msg => Some(DEFAULTS.loading_msg.apply(msg.as_ref())),
        };

        Self {
            prometheus: partial.prometheus.clone(),
            queries,
            time_range,
            fill_gaps: partial.fill_gaps.unwrap_or(DEFAULTS.fill_gaps),
            tension: partial.tension.unwrap_or(DEFAULTS.tension),
            cubic_interpolation_mode: partial
                .cubic_interpolation_mode
                .unwrap_or(DEFAULTS.cubic_interpolation_mode),
            stepped: partial.stepped.unwrap_or(DEFAULTS.stepped),
            fill: partial.fill.unwrap_or(DEFAULTS.fill),
            stacked: partial.stacked.unwrap_or(DEFAULTS.stacked),
            border_width: partial.border_width.unwrap_or(DEFAULTS.border_width),
            border_color: palette(&partial.border_color, DEFAULTS.border_color),
            background_color: palette(&partial.background_color, DEFAULTS.background_color),
            no_data_msg: DEFAULTS.no_data_msg.apply(partial.no_data_msg.as_ref()),
            error_msg: DEFAULTS.error_msg.apply(partial.error_msg.as_ref()),
            loading_msg,
            find_in_label_map: partial.find_in_label_map.clone(),
            find_in_border_color_map: partial.find_in_border_color_map.clone(),
            find_in_background_color_map: partial.find_in_background_color_map.clone(),
            data_set_hook: partial.data_set_hook.clone(),
        }
    }

    pub fn update_interval(&self) -> Option<std::time::Duration> {
        self.time_range
            .ms_update_interval
            .map(std::time::Duration::from_millis)
    }
}
