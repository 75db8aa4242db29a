// Series domain models returned by query execution
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a series: metric name plus its label set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Metric {
    pub name: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl Metric {
    pub fn new(name: Option<String>, labels: BTreeMap<String, String>) -> Self {
        Self { name, labels }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.labels.is_empty()
    }
}

/// Prometheus text form: `name{k="v",...}`.
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        if self.labels.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, (key, value)) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=\"{}\"", key, value)?;
        }
        f.write_str("}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(time: DateTime<Utc>, value: f64) -> Self {
        Self { time, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub metric: Metric,
    pub values: Vec<Sample>,
}

impl Series {
    pub fn new(metric: Metric, values: Vec<Sample>) -> Self {
        Self { metric, values }
    }
}

/// Output of a single query, series kept in backend order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub series: Vec<Series>,
}

impl QueryResult {
    pub fn new(series: Vec<Series>) -> Self {
        Self { series }
    }
}
