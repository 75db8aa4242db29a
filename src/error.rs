// Error types for option validation and refresh cycles
use thiserror::Error;

use crate::application::host::ChartId;

/// Malformed or missing chart options. Raised before any query or timer is
/// scheduled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("options.query is undefined")]
    MissingQuery,

    #[error("options.timeRange is undefined")]
    MissingTimeRange,

    #[error("options.timeRange must be an object")]
    TimeRangeNotObject,

    #[error("options.timeRange.type must be a string")]
    TimeRangeTypeNotString,

    #[error("options.timeRange.type must be either \"relative\" or \"absolute\", got {0:?}")]
    InvalidTimeRangeType(String),

    #[error("options.timeRange.start is undefined")]
    MissingStart,

    #[error("options.timeRange.end is undefined")]
    MissingEnd,

    #[error("options.timeRange.start must be a timestamp (absolute) or integer seconds (relative)")]
    InvalidStart,

    #[error("options.timeRange.end must be a timestamp (absolute) or integer seconds (relative)")]
    InvalidEnd,

    #[error("options.timeRange.msUpdateInterval must be an integer")]
    UpdateIntervalNotNumber,

    #[error("options.timeRange.msUpdateInterval must be at least 1000ms, got {0}ms")]
    UpdateIntervalTooShort(i64),

    #[error("options.timeRange.{0} must be a positive integer number of seconds")]
    InvalidStep(&'static str),

    #[error("options.{0} must contain at least one color")]
    EmptyPalette(&'static str),
}

/// A refresh cycle failed while querying the backend.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("query #{index} failed: {source}")]
    Query {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("query #{index} is a PromQL expression but no Prometheus connection is configured")]
    MissingConnection { index: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("refresh error: {0}")]
    Refresh(#[from] RefreshError),

    #[error("chart {0} is not initialized")]
    UnknownChart(ChartId),
}

pub type Result<T> = std::result::Result<T, Error>;
