// Hosting chart interface and the commands it accepts
use crate::domain::dataset::Dataset;
use crate::domain::options::{TextAlign, TextBaseline, TextDirection};
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::mpsc;

/// Identity of a chart registered with the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChartId(pub u64);

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chart-{}", self.0)
    }
}

/// Unit the time axis ticks are labelled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Month,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    pub min: DateTime<Utc>,
    pub max: DateTime<Utc>,
    pub unit: TimeUnit,
    pub stacked: bool,
}

/// Text drawing primitives of the chart surface.
pub trait Surface {
    fn clear(&mut self);
    fn save(&mut self);
    fn restore(&mut self);
    fn set_font(&mut self, font: &str);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);
    fn set_direction(&mut self, direction: TextDirection);
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
}

/// The chart that the controller keeps in sync.
pub trait ChartHost {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn datasets(&self) -> &[Dataset];
    fn set_datasets(&mut self, datasets: Vec<Dataset>);

    /// Whether the dataset at `index` is currently shown. Hosts that track
    /// visibility outside the dataset (legend toggles) override this.
    fn is_dataset_visible(&self, index: usize) -> bool {
        self.datasets().get(index).is_some_and(|ds| !ds.hidden)
    }

    /// Show or hide one dataset, as a legend click would.
    fn set_dataset_visibility(&mut self, index: usize, visible: bool) {
        let mut datasets = self.datasets().to_vec();
        let Some(dataset) = datasets.get_mut(index) else {
            return;
        };
        dataset.hidden = !visible;
        self.set_datasets(datasets);
    }

    fn resize(&mut self, width: u32, height: u32);

    fn set_time_axis(&mut self, axis: TimeAxis);

    /// Draw the datasets. Overlays are painted separately by the controller.
    fn draw(&mut self);

    fn surface(&mut self) -> &mut dyn Surface;
}

/// Messages delivered to a running chart driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartCommand {
    /// Run an update (render cycle + draw).
    Update,
    Resize { width: u32, height: u32 },
    SetVisibility { index: usize, visible: bool },
    Destroy,
}

/// Cloneable handle that posts commands to a chart driver.
#[derive(Debug, Clone)]
pub struct UpdateRequester {
    tx: mpsc::UnboundedSender<ChartCommand>,
}

impl UpdateRequester {
    pub fn new(tx: mpsc::UnboundedSender<ChartCommand>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChartCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Returns false once the driver is gone.
    pub fn send(&self, command: ChartCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn request_update(&self) -> bool {
        self.send(ChartCommand::Update)
    }
}
