//! Plan runner: one complete, self-contained simulation per call
//!
//! Pre-loads assumptions once; every `run` builds its grids, totals and
//! statements from scratch, so nothing leaks between runs.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aggregate::{aggregate_divisions, BankTotals, DivisionTotals};
use crate::assumptions::{Assumptions, Division};
use crate::error::Result;
use crate::statements::{StatementBuilder, StatementResult};
use crate::vintage::{CohortEngine, ProductVintages};

/// Everything produced by one plan run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub generated_at: DateTime<Utc>,
    pub products: Vec<ProductVintages>,
    pub divisions: Vec<DivisionTotals>,
    pub bank: BankTotals,
    pub statements: StatementResult,
}

impl PlanResult {
    pub fn product(&self, division: Division, code: &str) -> Option<&ProductVintages> {
        self.products
            .iter()
            .find(|p| p.division == division && p.code.eq_ignore_ascii_case(code))
    }

    pub fn division(&self, division: Division) -> Option<&DivisionTotals> {
        self.divisions.iter().find(|d| d.division == division)
    }
}

/// Pre-loaded plan runner
///
/// # Example
/// ```ignore
/// let runner = PlanRunner::from_csv()?;
/// let result = runner.run()?;
/// println!("{:?}", result.statements.summary());
/// ```
#[derive(Debug, Clone)]
pub struct PlanRunner {
    assumptions: Assumptions,
}

impl PlanRunner {
    /// Create runner with the built-in reference plan
    pub fn new() -> Result<Self> {
        Ok(Self {
            assumptions: Assumptions::default_plan()?,
        })
    }

    /// Create runner by loading assumptions from CSV files
    pub fn from_csv() -> Result<Self> {
        Ok(Self {
            assumptions: Assumptions::from_csv()?,
        })
    }

    /// Create runner from specific assumptions directory
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        Ok(Self {
            assumptions: Assumptions::from_csv_path(path)?,
        })
    }

    /// Create runner with pre-built assumptions
    pub fn with_assumptions(assumptions: Assumptions) -> Self {
        Self { assumptions }
    }

    /// Run the full plan: vintages, aggregation, statements
    pub fn run(&self) -> Result<PlanResult> {
        let products = CohortEngine::new(&self.assumptions).run_all()?;
        let divisions = aggregate_divisions(&products);
        let bank = BankTotals::from_divisions(&divisions);
        let statements = StatementBuilder::new(&self.assumptions.bank).build(&bank)?;

        info!(
            "Plan run complete: {} products, {} divisions",
            products.len(),
            divisions.len()
        );

        Ok(PlanResult {
            generated_at: Utc::now(),
            products,
            divisions,
            bank,
            statements,
        })
    }

    /// Get reference to assumptions for inspection
    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    /// Get mutable reference to assumptions for customization
    pub fn assumptions_mut(&mut self) -> &mut Assumptions {
        &mut self.assumptions
    }
}
