//! Error types for plan loading and simulation

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while resolving assumptions or running the plan.
///
/// Any error aborts the whole run; no partial plan is produced.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required parameter has no value.
    #[error("Missing parameter '{parameter}' for {scope}")]
    ParameterMissing {
        /// Parameter key as it appears in the assumption tables.
        parameter: String,
        /// Consuming scope: `bank`, a division code, or `DIV/PRODUCT`.
        scope: String,
    },

    /// A parameter is present but outside its domain.
    #[error("Parameter '{parameter}' for {scope} is out of range: {value} ({expected})")]
    ParameterOutOfRange {
        /// Parameter key.
        parameter: String,
        /// Consuming scope.
        scope: String,
        /// The offending value.
        value: f64,
        /// Human-readable domain.
        expected: &'static str,
    },

    /// Structural configuration problem (unknown category, malformed table).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A computed vintage cell is non-finite or breaks a stock invariant.
    #[error(
        "Integrity defect in {scope} {metric} at vintage {vintage}, quarter {quarter}: {value}"
    )]
    IntegrityDefect {
        /// `DIV/PRODUCT` of the offending grid.
        scope: String,
        /// Metric label.
        metric: &'static str,
        /// Origination quarter.
        vintage: u32,
        /// Calendar quarter.
        quarter: u32,
        /// The offending value.
        value: f64,
    },

    /// Total assets differ from liabilities plus equity beyond tolerance.
    #[error(
        "Balance sheet does not balance in quarter {quarter}: assets {assets:.6}, liabilities and equity {liabilities_and_equity:.6}"
    )]
    BalanceSheetImbalance {
        /// Calendar quarter.
        quarter: u32,
        /// Total assets.
        assets: f64,
        /// Total liabilities plus total equity.
        liabilities_and_equity: f64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn missing(parameter: impl Into<String>, scope: impl Into<String>) -> Self {
        EngineError::ParameterMissing {
            parameter: parameter.into(),
            scope: scope.into(),
        }
    }

    pub(crate) fn out_of_range(
        parameter: impl Into<String>,
        scope: impl Into<String>,
        value: f64,
        expected: &'static str,
    ) -> Self {
        EngineError::ParameterOutOfRange {
            parameter: parameter.into(),
            scope: scope.into(),
            value,
            expected,
        }
    }
}
