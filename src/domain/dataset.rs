// Render-ready dataset models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A point on the chart. `y` is `None` for inserted gap markers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub x: DateTime<Utc>,
    pub y: Option<f64>,
}

impl DataPoint {
    pub fn new(x: DateTime<Utc>, y: f64) -> Self {
        Self { x, y: Some(y) }
    }

    pub fn gap(x: DateTime<Utc>) -> Self {
        Self { x, y: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    #[default]
    Default,
    Monotone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<DataPoint>,
    pub tension: f64,
    pub cubic_interpolation_mode: InterpolationMode,
    pub stepped: bool,
    pub fill: bool,
    pub background_color: String,
    pub border_color: String,
    pub border_width: f64,
    pub hidden: bool,
}

/// Hidden flag per dataset label, captured before a refresh replaces the
/// collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityMap {
    hidden: HashMap<String, bool>,
}

impl VisibilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture visibility from an existing collection. `is_visible` reports
    /// the host's view of each dataset by index.
    pub fn snapshot(datasets: &[Dataset], is_visible: impl Fn(usize) -> bool) -> Self {
        let hidden = datasets
            .iter()
            .enumerate()
            .map(|(i, ds)| (ds.label.clone(), !is_visible(i)))
            .collect();
        Self { hidden }
    }

    pub fn insert(&mut self, label: impl Into<String>, hidden: bool) {
        self.hidden.insert(label.into(), hidden);
    }

    /// Unknown labels are visible.
    pub fn is_hidden(&self, label: &str) -> bool {
        self.hidden.get(label).copied().unwrap_or(false)
    }
}
