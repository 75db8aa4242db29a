// Presentation layer - Chart hosts the driver renders into
pub mod console_chart;
