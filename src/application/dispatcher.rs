// Query dispatch - one concurrent request per configured query
use crate::application::query_executor::QueryExecutor;
use crate::domain::options::{ChartOptions, Query};
use crate::domain::series::QueryResult;
use crate::domain::time_range::TimeWindow;
use crate::error::RefreshError;
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;

/// Build the dispatch future for one refresh cycle.
///
/// All queries run concurrently. Results come back in query order; the first
/// failure fails the whole cycle.
pub fn dispatch(
    executor: Arc<dyn QueryExecutor>,
    options: &ChartOptions,
    window: TimeWindow,
    step: u64,
) -> BoxFuture<'static, Result<Vec<QueryResult>, RefreshError>> {
    let requests: Vec<_> = options
        .queries
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, query)| {
            let executor = executor.clone();
            let connection = options.prometheus.clone();
            async move {
                let result = match query {
                    Query::Expr(expr) => {
                        let connection =
                            connection.ok_or(RefreshError::MissingConnection { index })?;
                        tracing::debug!(
                            "Dispatching query #{} against {}: {}",
                            index,
                            connection.endpoint,
                            expr
                        );
                        executor
                            .range_query(&connection, &expr, window.start, window.end, step)
                            .await
                    }
                    Query::Computed(computed) => {
                        tracing::debug!("Running computed query #{}", index);
                        computed.execute(window.start, window.end, step).await
                    }
                };
                result.map_err(|source| RefreshError::Query { index, source })
            }
        })
        .collect();

    try_join_all(requests).boxed()
}
