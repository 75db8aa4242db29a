// Infrastructure layer - Chart configuration loaded from file and environment
use crate::domain::dataset::InterpolationMode;
use crate::domain::options::{
    PartialOptions, PartialOverlayMessage, PrometheusConnection, Queries, Query,
};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;

pub const DEFAULT_CONFIG_PATH: &str = "config/chart";
const ENV_PREFIX: &str = "CHART";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChartFileConfig {
    #[serde(default)]
    pub prometheus: Option<PrometheusConnection>,
    #[serde(default)]
    pub query: Option<QueryConfig>,
    #[serde(default)]
    pub time_range: Option<serde_json::Value>,
    #[serde(default)]
    pub fill_gaps: Option<bool>,
    #[serde(default)]
    pub tension: Option<f64>,
    #[serde(default)]
    pub cubic_interpolation_mode: Option<InterpolationMode>,
    #[serde(default)]
    pub stepped: Option<bool>,
    #[serde(default)]
    pub fill: Option<bool>,
    #[serde(default)]
    pub stacked: Option<bool>,
    #[serde(default)]
    pub border_width: Option<f64>,
    #[serde(default)]
    pub border_color: Option<Vec<String>>,
    #[serde(default)]
    pub background_color: Option<Vec<String>>,
    #[serde(default)]
    pub no_data_msg: Option<PartialOverlayMessage>,
    #[serde(default)]
    pub error_msg: Option<PartialOverlayMessage>,
    #[serde(default)]
    pub loading_msg: Option<PartialOverlayMessage>,
    #[serde(default)]
    pub vars: HashMap<String, String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A single PromQL expression or a list of them.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum QueryConfig {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ChartFileConfig {
    /// Convert into caller options, expanding `${var}` placeholders in the
    /// queries. Hooks are never set from a file.
    pub fn into_partial_options(self) -> PartialOptions {
        let vars = self.vars;
        let query = self.query.map(|q| match q {
            QueryConfig::One(expr) => Queries::One(Query::Expr(prepare_query(&expr, &vars))),
            QueryConfig::Many(exprs) => Queries::Many(
                exprs
                    .iter()
                    .map(|expr| Query::Expr(prepare_query(expr, &vars)))
                    .collect(),
            ),
        });

        PartialOptions {
            prometheus: self.prometheus,
            query,
            time_range: self.time_range,
            fill_gaps: self.fill_gaps,
            tension: self.tension,
            cubic_interpolation_mode: self.cubic_interpolation_mode,
            stepped: self.stepped,
            fill: self.fill,
            stacked: self.stacked,
            border_width: self.border_width,
            border_color: self.border_color,
            background_color: self.background_color,
            no_data_msg: self.no_data_msg,
            error_msg: self.error_msg,
            loading_msg: self.loading_msg,
            ..PartialOptions::default()
        }
    }
}

/// Load `path` (any format the config crate recognises by extension) with
/// `CHART__SECTION__KEY` environment overrides on top.
pub fn load_chart_config(path: &str) -> anyhow::Result<ChartFileConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to load chart config from {}", path))?;

    settings
        .try_deserialize()
        .with_context(|| format!("Invalid chart config in {}", path))
}

/// Replace template variables in a query string
pub fn prepare_query(query: &str, vars: &HashMap<String, String>) -> String {
    let mut result = query.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}
