// Headless chart host that prints each render to stdout
use crate::application::host::{ChartHost, Surface, TimeAxis};
use crate::domain::dataset::Dataset;
use crate::domain::options::{TextAlign, TextBaseline, TextDirection};

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 400;

/// Keeps only the text of the most recent overlay; the console has no pixels.
#[derive(Debug, Default)]
pub struct TextSurface {
    overlay: Option<String>,
    depth: usize,
}

impl TextSurface {
    pub fn overlay(&self) -> Option<&str> {
        self.overlay.as_deref()
    }
}

impl Surface for TextSurface {
    fn clear(&mut self) {
        self.overlay = None;
    }

    fn save(&mut self) {
        self.depth += 1;
    }

    fn restore(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn set_font(&mut self, _font: &str) {}

    fn set_text_align(&mut self, _align: TextAlign) {}

    fn set_text_baseline(&mut self, _baseline: TextBaseline) {}

    fn set_direction(&mut self, _direction: TextDirection) {}

    fn fill_text(&mut self, text: &str, _x: f64, _y: f64) {
        println!("  [overlay] {}", text);
        self.overlay = Some(text.to_string());
    }
}

#[derive(Debug)]
pub struct ConsoleChart {
    width: u32,
    height: u32,
    datasets: Vec<Dataset>,
    axis: Option<TimeAxis>,
    surface: TextSurface,
    renders: u64,
}

impl Default for ConsoleChart {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl ConsoleChart {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            datasets: Vec::new(),
            axis: None,
            surface: TextSurface::default(),
            renders: 0,
        }
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }

    pub fn text_surface(&self) -> &TextSurface {
        &self.surface
    }

    fn summary(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.datasets.len() + 1);
        if let Some(axis) = &self.axis {
            lines.push(format!(
                "render #{} {}x{} [{} .. {}] unit={:?}{}",
                self.renders,
                self.width,
                self.height,
                axis.min.to_rfc3339(),
                axis.max.to_rfc3339(),
                axis.unit,
                if axis.stacked { " stacked" } else { "" }
            ));
        } else {
            lines.push(format!("render #{} {}x{}", self.renders, self.width, self.height));
        }

        for (i, ds) in self.datasets.iter().enumerate() {
            let points = ds.data.iter().filter(|p| p.y.is_some()).count();
            let gaps = ds.data.len() - points;
            let last = ds
                .data
                .iter()
                .rev()
                .find_map(|p| p.y)
                .map(|y| format!("{:.3}", y))
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "  {}{} {} points={} gaps={} last={} color={}",
                if self.is_dataset_visible(i) { "" } else { "(hidden) " },
                i,
                ds.label,
                points,
                gaps,
                last,
                ds.border_color
            ));
        }
        lines
    }
}

impl ChartHost for ConsoleChart {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    fn set_datasets(&mut self, datasets: Vec<Dataset>) {
        self.datasets = datasets;
    }

    fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!("Console chart resized to {}x{}", width, height);
        self.width = width;
        self.height = height;
    }

    fn set_time_axis(&mut self, axis: TimeAxis) {
        self.axis = Some(axis);
    }

    fn draw(&mut self) {
        self.renders += 1;
        for line in self.summary() {
            println!("{}", line);
        }
    }

    fn surface(&mut self) -> &mut dyn Surface {
        &mut self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::host::TimeUnit;
    use crate::domain::dataset::DataPoint;
    use chrono::{TimeZone, Utc};

    fn dataset(label: &str, data: Vec<DataPoint>) -> Dataset {
        Dataset {
            label: label.to_string(),
            data,
            tension: 0.4,
            cubic_interpolation_mode: Default::default(),
            stepped: false,
            fill: false,
            background_color: "transparent".to_string(),
            border_color: "red".to_string(),
            border_width: 3.0,
            hidden: false,
        }
    }

    #[test]
    fn test_summary_lists_datasets() {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let t1 = Utc.timestamp_opt(1_700_000_060, 0).unwrap();
        let mut chart = ConsoleChart::new(640, 320);
        chart.set_time_axis(TimeAxis {
            min: t0,
            max: t1,
            unit: TimeUnit::Second,
            stacked: false,
        });
        chart.set_datasets(vec![
            dataset("up", vec![DataPoint::new(t0, 1.0), DataPoint::gap(t1)]),
            dataset("down", vec![]),
        ]);
        chart.set_dataset_visibility(1, false);
        chart.draw();

        let lines = chart.summary();
        assert_eq!(chart.renders(), 1);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("render #1 640x320"));
        assert!(lines[1].contains("up points=1 gaps=1 last=1.000"));
        assert!(lines[2].contains("(hidden) 1 down"));
        assert!(lines[2].contains("last=-"));
    }

    #[test]
    fn test_text_surface_keeps_last_overlay() {
        let mut chart = ConsoleChart::default();
        chart.surface().fill_text("Loading data...", 400.0, 200.0);
        assert_eq!(chart.text_surface().overlay(), Some("Loading data..."));

        chart.surface().clear();
        assert_eq!(chart.text_surface().overlay(), None);
    }
}
