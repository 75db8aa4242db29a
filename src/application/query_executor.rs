// Backend trait for range query execution
use crate::domain::options::PrometheusConnection;
use crate::domain::series::QueryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a range query over `[start, end]` sampled every `step` seconds.
    async fn range_query(
        &self,
        connection: &PrometheusConnection,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: u64,
    ) -> anyhow::Result<QueryResult>;
}
