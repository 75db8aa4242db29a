// Library root - Chart to Prometheus refresh pipeline
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use application::controller::{
    LifecycleController, PerChartState, RefreshCompletion, RefreshTask, UpdateDecision,
};
pub use application::host::{
    ChartCommand, ChartHost, ChartId, Surface, TimeAxis, TimeUnit, UpdateRequester,
};
pub use application::query_executor::QueryExecutor;
pub use application::runtime::ChartDriver;
pub use domain::options::{ChartOptions, PartialOptions, PrometheusConnection, Query};
pub use domain::time_range::{TimeRange, TimeRangeOptions};
pub use error::{ConfigError, Error, RefreshError, Result};
