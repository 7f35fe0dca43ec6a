//! Lending product parameters: amortization profile, credit risk and collateral

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::Division;
use crate::error::EngineError;

/// Principal repayment profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmortizationType {
    /// Full principal repaid in the maturity quarter
    Bullet,
    /// Equal installments after the pre-amortization period
    Amortizing,
}

impl AmortizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmortizationType::Bullet => "bullet",
            AmortizationType::Amortizing => "amortizing",
        }
    }
}

impl FromStr for AmortizationType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullet" => Ok(AmortizationType::Bullet),
            "amortizing" | "amortising" => Ok(AmortizationType::Amortizing),
            other => Err(EngineError::Configuration(format!(
                "Unknown amortization type: {}",
                other
            ))),
        }
    }
}

/// Source of recoveries on defaulted exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollateralKind {
    /// Mortgage or pledge on a real asset, recovered through enforcement
    RealAsset,
    /// Public guarantee fund, recovered through a claim on the fund
    GuaranteeFund,
}

impl CollateralKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollateralKind::RealAsset => "real_asset",
            CollateralKind::GuaranteeFund => "guarantee",
        }
    }
}

/// One recovery channel of a product
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollateralChannel {
    pub kind: CollateralKind,

    /// Share of exposure covered (LTV for real assets, guaranteed share for the fund)
    pub coverage: f64,

    /// Fraction of the covered amount eventually recovered
    pub recovery_rate: f64,

    /// Quarters between default and recovery
    pub timing_quarters: u32,
}

impl CollateralChannel {
    /// Expected recovery per unit of defaulted exposure
    pub fn recovery_share(&self) -> f64 {
        self.coverage * self.recovery_rate
    }
}

/// Fully resolved parameters of a single lending product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductParams {
    /// Owning division
    pub division: Division,

    /// Product code, unique within the division
    pub code: String,

    pub name: String,

    /// Share of divisional annual origination volume
    pub mix: f64,

    pub amortization: AmortizationType,

    /// Contractual maturity in quarters
    pub maturity_quarters: u32,

    /// Interest-only quarters before amortization starts
    pub pre_amortization_quarters: u32,

    /// Annual danger (default) rate
    pub danger_rate: f64,

    /// Loss given default, explicit or derived from collateral
    pub lgd: f64,

    /// Annual coupon spread over the reference rate
    pub spread: f64,

    /// Up-front fee as a fraction of originated amount
    pub upfront_fee: f64,

    /// Annual default-interest rate accrued on non-performing exposure
    pub penalty_rate: f64,

    /// Quarter since origination (1-indexed) at which defaults peak
    pub default_timing: u32,

    /// Recovery channels, at most one per kind
    pub collateral: Vec<CollateralChannel>,

    /// Credit risk weight applied to gross book value
    pub risk_weight: f64,
}

impl ProductParams {
    /// `DIV/CODE` label used in logs and errors
    pub fn scope(&self) -> String {
        format!("{}/{}", self.division.as_str(), self.code)
    }

    /// Quarterly danger rate
    pub fn quarterly_danger_rate(&self) -> f64 {
        self.danger_rate / 4.0
    }

    /// Sum of channel recovery shares, capped at 1
    pub fn blended_recovery_rate(&self) -> f64 {
        self.collateral
            .iter()
            .map(CollateralChannel::recovery_share)
            .sum::<f64>()
            .min(1.0)
    }

    /// LGD implied by the collateral channels: `max(0, 1 - sum(coverage * rate))`
    pub fn collateral_lgd(collateral: &[CollateralChannel]) -> f64 {
        let recovered: f64 = collateral.iter().map(CollateralChannel::recovery_share).sum();
        (1.0 - recovered).max(0.0)
    }

    /// Risk weight blended by guaranteed share
    pub fn blended_risk_weight(guaranteed_share: f64, rw_guaranteed: f64, rw_unguaranteed: f64) -> f64 {
        guaranteed_share * rw_guaranteed + (1.0 - guaranteed_share) * rw_unguaranteed
    }

    /// Elapsed quarter (0-indexed) in which the last principal is repaid
    pub fn final_repayment_offset(&self) -> u32 {
        self.maturity_quarters.saturating_sub(1)
    }
}
