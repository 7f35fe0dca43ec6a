//! Business divisions of the bank

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::bank::YearSchedule;
use super::product::ProductParams;
use crate::calendar::schedule_value;
use crate::error::EngineError;

/// Lending division owning an ordered list of products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Division {
    /// Real-estate lending
    RealEstate,
    /// Small and medium enterprise lending
    Sme,
    /// Lending backed by public guarantee schemes
    PublicGuarantee,
}

impl Division {
    /// All divisions in reporting order
    pub const ALL: [Division; 3] = [Division::RealEstate, Division::Sme, Division::PublicGuarantee];

    /// Short code used in assumption tables and exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Division::RealEstate => "RE",
            Division::Sme => "SME",
            Division::PublicGuarantee => "PG",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Division::RealEstate => "Real Estate",
            Division::Sme => "SME",
            Division::PublicGuarantee => "Public Guarantee",
        }
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Division {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RE" | "REAL_ESTATE" | "REAL ESTATE" => Ok(Division::RealEstate),
            "SME" => Ok(Division::Sme),
            "PG" | "PUBLIC_GUARANTEE" | "PUBLIC GUARANTEE" => Ok(Division::PublicGuarantee),
            other => Err(EngineError::Configuration(format!("Unknown division: {}", other))),
        }
    }
}

/// A division's origination volumes and its product list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionParams {
    pub division: Division,

    /// Annual origination volume by plan year
    pub annual_volume: YearSchedule,

    /// Products in reporting order
    pub products: Vec<ProductParams>,
}

impl DivisionParams {
    /// Annual volume in force during `quarter`
    pub fn annual_volume_at(&self, quarter: u32) -> f64 {
        schedule_value(&self.annual_volume, quarter)
    }
}
