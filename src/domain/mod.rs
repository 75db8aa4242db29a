// Domain layer - Time windows, series, datasets and chart options
pub mod dataset;
pub mod options;
pub mod series;
pub mod step;
pub mod time_range;
pub mod validation;
