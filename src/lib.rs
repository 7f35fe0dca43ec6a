//! Bank Plan - Vintage-cohort credit engine for a five-year banking industrial plan
//!
//! This library provides:
//! - Typed plan assumptions loaded from CSV tables (divisions, products, bank policy)
//! - Per-product vintage grids: origination, amortization, default, recovery, ECL, revenue
//! - Divisional and bank-wide quarterly aggregation
//! - Consolidated income statement, balance sheet, regulatory capital and KPIs
//! - CSV/JSON export of all results

pub mod aggregate;
pub mod assumptions;
pub mod calendar;
pub mod error;
pub mod export;
pub mod plan;
pub mod statements;
pub mod vintage;

// Re-export commonly used types
pub use aggregate::{BankTotals, DivisionTotals, MetricSeries};
pub use assumptions::{Assumptions, Division, ProductParams};
pub use error::{EngineError, Result};
pub use plan::{PlanResult, PlanRunner};
pub use statements::{StatementResult, StatementRow};
pub use vintage::{CohortEngine, Metric, ProductVintages, VintageGrid};
