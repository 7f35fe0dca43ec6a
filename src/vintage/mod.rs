//! Vintage cohort engine: per-product triangular grids over the plan horizon

mod engine;
mod grid;
mod metric;
mod timing;

pub use engine::{CohortEngine, ProductVintages};
pub use grid::{GridSet, VintageGrid, GRID_SIZE};
pub use metric::{CellContext, ComputeFn, Metric, MetricDef, METRIC_TABLE};
pub use timing::timing_weight;
