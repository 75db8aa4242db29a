// Result merge - query results into the chart's dataset collection
use crate::domain::dataset::{DataPoint, Dataset, VisibilityMap};
use crate::domain::options::{ChartOptions, SeriesHook};
use crate::domain::series::{QueryResult, Series};

/// Label for the series at cumulative position `index`.
pub fn select_label(options: &ChartOptions, series: &Series, index: usize) -> String {
    from_hook(&options.find_in_label_map, series).unwrap_or_else(|| {
        if series.metric.is_empty() {
            format!("Serie {}", index + 1)
        } else {
            series.metric.to_string()
        }
    })
}

pub fn select_background_color(options: &ChartOptions, series: &Series, index: usize) -> String {
    from_hook(&options.find_in_background_color_map, series)
        .unwrap_or_else(|| cycle(&options.background_color, index))
}

pub fn select_border_color(options: &ChartOptions, series: &Series, index: usize) -> String {
    from_hook(&options.find_in_border_color_map, series)
        .unwrap_or_else(|| cycle(&options.border_color, index))
}

fn from_hook(hook: &Option<SeriesHook>, series: &Series) -> Option<String> {
    hook.as_ref().and_then(|hook| hook(&series.metric))
}

fn cycle(palette: &[String], index: usize) -> String {
    // Palettes are checked non-empty during validation.
    palette
        .get(index % palette.len().max(1))
        .cloned()
        .unwrap_or_default()
}

/// Concatenate every query's series, in query order then backend order.
///
/// Colors are picked from the cumulative series index so adding a query does
/// not recolor the series of the queries before it.
pub fn build_datasets(
    results: &[QueryResult],
    options: &ChartOptions,
    visibility: &VisibilityMap,
) -> Vec<Dataset> {
    results
        .iter()
        .flat_map(|result| result.series.iter())
        .enumerate()
        .map(|(index, series)| {
            let label = select_label(options, series, index);
            Dataset {
                hidden: visibility.is_hidden(&label),
                data: series
                    .values
                    .iter()
                    .map(|sample| DataPoint::new(sample.time, sample.value))
                    .collect(),
                tension: options.tension,
                cubic_interpolation_mode: options.cubic_interpolation_mode,
                stepped: options.stepped,
                fill: options.fill,
                background_color: select_background_color(options, series, index),
                border_color: select_border_color(options, series, index),
                border_width: options.border_width,
                label,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::tests::series;
    use crate::domain::options::PartialOptions;
    use crate::domain::series::Metric;
    use crate::domain::time_range::{TimeRange, TimeRangeOptions};
    use std::sync::Arc;

    fn options(partial: PartialOptions) -> ChartOptions {
        partial
            .with_query("up")
            .with_time_range(TimeRangeOptions::new(TimeRange::Relative {
                start: -3600,
                end: 0,
            }))
            .validate()
            .unwrap()
    }

    fn result(names: &[&str]) -> QueryResult {
        QueryResult::new(
            names
                .iter()
                .map(|name| series(name, &[(1_700_000_000, 1.0)]))
                .collect(),
        )
    }

    #[test]
    fn test_query_then_series_order() {
        let opts = options(PartialOptions::new());
        for n in 0..4 {
            for m in 0..4 {
                let results: Vec<QueryResult> = (0..n)
                    .map(|q| {
                        let names: Vec<String> = (0..m).map(|s| format!("q{q}_s{s}")).collect();
                        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                        result(&refs)
                    })
                    .collect();

                let datasets = build_datasets(&results, &opts, &VisibilityMap::new());
                assert_eq!(datasets.len(), n * m);

                let expected: Vec<String> = (0..n)
                    .flat_map(|q| (0..m).map(move |s| format!("q{q}_s{s}")))
                    .collect();
                let labels: Vec<String> = datasets.into_iter().map(|d| d.label).collect();
                assert_eq!(labels, expected);
            }
        }
    }

    #[test]
    fn test_colors_use_cumulative_index() {
        let opts = options(PartialOptions {
            border_color: Some(vec!["red".into(), "green".into(), "blue".into()]),
            ..PartialOptions::new()
        });
        let results = vec![result(&["a", "b"]), result(&["c", "d"])];

        let datasets = build_datasets(&results, &opts, &VisibilityMap::new());
        let borders: Vec<&str> = datasets.iter().map(|d| d.border_color.as_str()).collect();
        assert_eq!(borders, vec!["red", "green", "blue", "red"]);
        assert_eq!(datasets[0].background_color, "rgba(255, 99, 132, 1)");
        assert_eq!(datasets[3].background_color, "rgba(75, 192, 192, 1)");
    }

    #[test]
    fn test_hooks_override_then_fall_back() {
        let opts = options(PartialOptions {
            find_in_label_map: Some(Arc::new(|metric: &Metric| {
                metric.label("job").map(|job| format!("job {job}"))
            })),
            find_in_border_color_map: Some(Arc::new(|metric: &Metric| {
                (metric.label("job") == Some("api")).then(|| "orange".to_string())
            })),
            ..PartialOptions::new()
        });
        let results = vec![QueryResult::new(vec![
            Series::new(Metric::named("up").with_label("job", "api"), Vec::new()),
            Series::new(Metric::named("up").with_label("instance", "b"), Vec::new()),
            Series::new(Metric::default(), Vec::new()),
        ])];

        let datasets = build_datasets(&results, &opts, &VisibilityMap::new());
        assert_eq!(datasets[0].label, "job api");
        assert_eq!(datasets[0].border_color, "orange");
        assert_eq!(datasets[1].label, "up{instance=\"b\"}");
        assert_eq!(datasets[1].border_color, "rgba(54, 162, 235, 1)");
        assert_eq!(datasets[2].label, "Serie 3");
    }

    #[test]
    fn test_visibility_is_reapplied_by_label() {
        let opts = options(PartialOptions::new());
        let mut visibility = VisibilityMap::new();
        visibility.insert("b", true);
        visibility.insert("gone", true);
        visibility.insert("a", false);

        let datasets = build_datasets(&[result(&["a", "b", "c"])], &opts, &visibility);
        let hidden: Vec<bool> = datasets.iter().map(|d| d.hidden).collect();
        assert_eq!(hidden, vec![false, true, false]);
    }

    #[test]
    fn test_samples_become_points_with_styling() {
        let opts = options(PartialOptions {
            stepped: Some(true),
            border_width: Some(1.5),
            ..PartialOptions::new()
        });
        let results = vec![QueryResult::new(vec![series(
            "up",
            &[(100, 1.0), (115, 0.0)],
        )])];

        let datasets = build_datasets(&results, &opts, &VisibilityMap::new());
        let ds = &datasets[0];
        assert_eq!(ds.data.len(), 2);
        assert_eq!(ds.data[1].y, Some(0.0));
        assert_eq!(ds.data[1].x.timestamp(), 115);
        assert!(ds.stepped);
        assert_eq!(ds.border_width, 1.5);
        assert_eq!(ds.tension, 0.4);
    }
}
