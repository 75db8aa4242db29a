// Application layer - Refresh pipeline and chart lifecycle
pub mod axes;
pub mod controller;
pub mod dispatcher;
pub mod host;
pub mod merge;
pub mod overlay;
pub mod query_executor;
pub mod runtime;
