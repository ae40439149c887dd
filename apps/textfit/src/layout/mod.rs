// Layout: font metrics and box measurement.
// Every bounds check re-measures from the live document, so a style write is
// visible to the very next measurement.

pub mod font_metrics;
pub mod measure;

pub use font_metrics::{get_metrics, FontFamily, FontMetricTable, LINE_HEIGHT};
pub use measure::{Measurer, MetricsMeasurer};
