//! Triangular vintage-by-quarter storage

use serde::{Deserialize, Serialize};

use super::metric::Metric;
use crate::calendar::HORIZON_QUARTERS;

/// Grid side length
pub const GRID_SIZE: usize = HORIZON_QUARTERS as usize;

/// Values of one metric for every (vintage, quarter) pair of a product.
///
/// Only cells with `vintage <= quarter` are ever written; reads below the
/// diagonal return 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VintageGrid {
    pub metric: Metric,
    values: [[f64; GRID_SIZE]; GRID_SIZE],
}

impl VintageGrid {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            values: [[0.0; GRID_SIZE]; GRID_SIZE],
        }
    }

    fn in_triangle(vintage: u32, quarter: u32) -> bool {
        vintage >= 1 && vintage <= quarter && quarter <= HORIZON_QUARTERS
    }

    /// Value at origination quarter `vintage`, calendar quarter `quarter` (both 1-indexed)
    pub fn get(&self, vintage: u32, quarter: u32) -> f64 {
        if Self::in_triangle(vintage, quarter) {
            self.values[vintage as usize - 1][quarter as usize - 1]
        } else {
            0.0
        }
    }

    pub(crate) fn set(&mut self, vintage: u32, quarter: u32, value: f64) {
        debug_assert!(
            Self::in_triangle(vintage, quarter),
            "cell ({}, {}) outside the vintage triangle",
            vintage,
            quarter
        );
        if Self::in_triangle(vintage, quarter) {
            self.values[vintage as usize - 1][quarter as usize - 1] = value;
        }
    }

    /// Column sum: all vintages alive in `quarter`
    pub fn quarter_total(&self, quarter: u32) -> f64 {
        (1..=quarter.min(HORIZON_QUARTERS)).map(|v| self.get(v, quarter)).sum()
    }

    /// Sum of a vintage's values from origination through `quarter`
    pub fn cumulative(&self, vintage: u32, quarter: u32) -> f64 {
        (vintage..=quarter.min(HORIZON_QUARTERS)).map(|k| self.get(vintage, k)).sum()
    }

    /// Row of a vintage indexed by calendar quarter (index 0 = quarter 1)
    pub fn row(&self, vintage: u32) -> [f64; GRID_SIZE] {
        let mut row = [0.0; GRID_SIZE];
        for q in vintage.max(1)..=HORIZON_QUARTERS {
            row[q as usize - 1] = self.get(vintage, q);
        }
        row
    }
}

/// One grid per metric, indexed in metric-table order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSet {
    grids: Vec<VintageGrid>,
}

impl GridSet {
    pub fn new() -> Self {
        Self {
            grids: Metric::ALL.iter().map(|m| VintageGrid::new(*m)).collect(),
        }
    }

    pub fn grid(&self, metric: Metric) -> &VintageGrid {
        &self.grids[metric.index()]
    }

    pub(crate) fn grid_mut(&mut self, metric: Metric) -> &mut VintageGrid {
        &mut self.grids[metric.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &VintageGrid> {
        self.grids.iter()
    }
}

impl Default for GridSet {
    fn default() -> Self {
        Self::new()
    }
}
