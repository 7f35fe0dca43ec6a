//! Plan assumptions: divisions, products, bank-level rates and policies

mod bank;
mod division;
mod product;
pub mod loader;

pub use bank::{BankParams, CapitalParams, CreditPolicy, FundingWeights, LiquidityPolicy, YearSchedule};
pub use division::{Division, DivisionParams};
pub use product::{AmortizationType, CollateralChannel, CollateralKind, ProductParams};
pub use loader::RawTables;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Container for all resolved plan assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    pub bank: BankParams,
    /// Divisions with at least one product, in reporting order
    pub divisions: Vec<DivisionParams>,
}

impl Assumptions {
    /// Reference plan shipped with the crate
    pub fn default_plan() -> Result<Self> {
        RawTables::embedded()?.resolve()
    }

    /// Load assumptions from CSV files in the default location (data/assumptions/)
    pub fn from_csv() -> Result<Self> {
        Self::from_csv_path(Path::new(loader::DEFAULT_ASSUMPTIONS_PATH))
    }

    /// Load assumptions from CSV files in a specific directory
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        RawTables::load_from(path)?.resolve()
    }

    /// All products across divisions, in reporting order
    pub fn products(&self) -> impl Iterator<Item = &ProductParams> {
        self.divisions.iter().flat_map(|d| d.products.iter())
    }

    pub fn division(&self, division: Division) -> Option<&DivisionParams> {
        self.divisions.iter().find(|d| d.division == division)
    }

    pub fn product(&self, division: Division, code: &str) -> Option<&ProductParams> {
        self.division(division)
            .and_then(|d| d.products.iter().find(|p| p.code.eq_ignore_ascii_case(code)))
    }
}
