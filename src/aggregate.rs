//! Divisional and bank-wide roll-up of vintage grids

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assumptions::Division;
use crate::calendar::HORIZON_QUARTERS;
use crate::vintage::{Metric, ProductVintages, GRID_SIZE};

/// Quarterly series over the plan horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries(pub [f64; GRID_SIZE]);

impl MetricSeries {
    pub fn zero() -> Self {
        MetricSeries([0.0; GRID_SIZE])
    }

    /// Value in `quarter` (1-indexed); 0 outside the horizon
    pub fn at(&self, quarter: u32) -> f64 {
        if quarter == 0 || quarter > HORIZON_QUARTERS {
            0.0
        } else {
            self.0[quarter as usize - 1]
        }
    }

    pub fn add_assign(&mut self, other: &MetricSeries) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += b;
        }
    }

}

impl Default for MetricSeries {
    fn default() -> Self {
        Self::zero()
    }
}

/// Per-metric quarterly series plus risk-weighted loan exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTotals {
    series: Vec<MetricSeries>,
    /// Sum of performing plus non-performing stock times product risk weight
    pub risk_weighted_exposure: MetricSeries,
}

impl MetricTotals {
    pub fn new() -> Self {
        Self {
            series: vec![MetricSeries::zero(); Metric::ALL.len()],
            risk_weighted_exposure: MetricSeries::zero(),
        }
    }

    /// Add every vintage of one product, column by column
    pub fn add_product(&mut self, product: &ProductVintages) {
        for metric in Metric::ALL {
            let grid = product.grid(metric);
            let series = &mut self.series[metric.index()];
            for q in 1..=HORIZON_QUARTERS {
                series.0[q as usize - 1] += grid.quarter_total(q);
            }
        }
        for q in 1..=HORIZON_QUARTERS {
            self.risk_weighted_exposure.0[q as usize - 1] +=
                product.loan_exposure(q) * product.risk_weight;
        }
    }

    pub fn add_totals(&mut self, other: &MetricTotals) {
        for (mine, theirs) in self.series.iter_mut().zip(other.series.iter()) {
            mine.add_assign(theirs);
        }
        self.risk_weighted_exposure.add_assign(&other.risk_weighted_exposure);
    }

    pub fn series(&self, metric: Metric) -> &MetricSeries {
        &self.series[metric.index()]
    }

    pub fn at(&self, metric: Metric, quarter: u32) -> f64 {
        self.series(metric).at(quarter)
    }
}

impl Default for MetricTotals {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals for one division
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionTotals {
    pub division: Division,
    pub totals: MetricTotals,
}

/// Bank-wide totals across divisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTotals {
    pub totals: MetricTotals,
}

impl BankTotals {
    pub fn from_divisions(divisions: &[DivisionTotals]) -> Self {
        let mut totals = MetricTotals::new();
        for division in divisions {
            totals.add_totals(&division.totals);
        }
        Self { totals }
    }

    pub fn at(&self, metric: Metric, quarter: u32) -> f64 {
        self.totals.at(metric, quarter)
    }
}

/// Sum product grids into one series set per division, in reporting order
pub fn aggregate_divisions(products: &[ProductVintages]) -> Vec<DivisionTotals> {
    Division::ALL
        .par_iter()
        .filter_map(|&division| {
            let members: Vec<&ProductVintages> =
                products.iter().filter(|p| p.division == division).collect();
            if members.is_empty() {
                return None;
            }
            let mut totals = MetricTotals::new();
            for product in &members {
                totals.add_product(product);
            }
            debug!(
                "Division {}: {} products, closing gross book value {:.4}",
                division,
                members.len(),
                totals.at(Metric::GrossBookValue, HORIZON_QUARTERS)
            );
            Some(DivisionTotals { division, totals })
        })
        .collect()
}
