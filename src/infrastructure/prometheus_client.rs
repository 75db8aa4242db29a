// Prometheus HTTP API client implementation
use crate::application::query_executor::QueryExecutor;
use crate::domain::options::{Auth, PrometheusConnection};
use crate::domain::series::{Metric, QueryResult, Sample, Series};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const METRIC_NAME_LABEL: &str = "__name__";

#[derive(Debug, Clone, Default)]
pub struct PrometheusClient {
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<RangeData>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Vec<MatrixSeries>,
}

#[derive(Debug, Deserialize)]
struct MatrixSeries {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, String)>,
}

impl PrometheusClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn build_query_url(
        connection: &PrometheusConnection,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: u64,
    ) -> String {
        format!(
            "{}/{}/query_range?query={}&start={}&end={}&step={}",
            connection.endpoint.trim_end_matches('/'),
            connection.base_url.trim_matches('/'),
            urlencoding::encode(query),
            format_timestamp(start),
            format_timestamp(end),
            step
        )
    }

    fn parse_response(body: &str) -> Result<QueryResult> {
        let response: ApiResponse =
            serde_json::from_str(body).context("Failed to parse Prometheus response")?;

        if response.status != "success" {
            anyhow::bail!(
                "Prometheus query error ({}): {}",
                response.error_type.as_deref().unwrap_or("unknown"),
                response.error.as_deref().unwrap_or("no error message")
            );
        }

        let data = response
            .data
            .context("Prometheus response has no data section")?;
        if data.result_type != "matrix" {
            anyhow::bail!(
                "Expected a matrix result from query_range, got {}",
                data.result_type
            );
        }

        let series = data
            .result
            .into_iter()
            .map(|mut s| {
                let name = s.metric.remove(METRIC_NAME_LABEL);
                let values = s
                    .values
                    .iter()
                    .filter_map(|(ts, raw)| {
                        let time = parse_timestamp(*ts)?;
                        match raw.parse::<f64>() {
                            Ok(value) => Some(Sample::new(time, value)),
                            Err(_) => {
                                tracing::warn!("Skipping unparseable sample value {:?}", raw);
                                None
                            }
                        }
                    })
                    .collect();
                Series::new(Metric::new(name, s.metric), values)
            })
            .collect();

        Ok(QueryResult::new(series))
    }
}

/// Seconds with millisecond precision, as the HTTP API expects.
fn format_timestamp(time: DateTime<Utc>) -> String {
    let millis = time.timestamp_millis();
    format!("{}.{:03}", millis.div_euclid(1000), millis.rem_euclid(1000))
}

fn parse_timestamp(secs: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt((secs * 1000.0).round() as i64).single()
}

#[async_trait]
impl QueryExecutor for PrometheusClient {
    async fn range_query(
        &self,
        connection: &PrometheusConnection,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: u64,
    ) -> Result<QueryResult> {
        let url = Self::build_query_url(connection, query, start, end, step);
        tracing::debug!("Executing range query: {}", url);

        let mut request = self.http.get(&url).header("Accept", "application/json");
        if let Some(timeout_ms) = connection.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }
        request = match &connection.auth {
            Some(Auth::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            Some(Auth::Bearer { bearer }) => request.bearer_auth(bearer),
            None => request,
        };
        for (key, value) in &connection.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .context("Failed to send request to Prometheus")?;

        // Prometheus reports query errors as 4xx/5xx with a JSON error body.
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Prometheus response")?;
        if !status.is_success() {
            let err = match Self::parse_response(&body) {
                Err(err) => err,
                Ok(_) => anyhow::anyhow!("unexpected success body"),
            };
            return Err(err.context(format!("Prometheus query failed with status {}", status)));
        }

        Self::parse_response(&body)
    }
}
