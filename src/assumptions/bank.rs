//! Bank-level parameters: rates, cost schedules, balance sheet policy, capital stack

use serde::{Deserialize, Serialize};

use crate::calendar::{schedule_value, PLAN_YEARS};

/// Annual schedule indexed by plan year
pub type YearSchedule = [f64; PLAN_YEARS];

/// Non-performing loan workout policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditPolicy {
    /// Quarters a vintage stays in workout before write-offs start
    pub workout_quarters: u32,
    /// Annual share of non-performing exposure written off after workout
    pub write_off_rate: f64,
}

/// Cash buffers and treasury portfolio allocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPolicy {
    /// Liquidity buffer as a share of customer deposits
    pub buffer_ratio: f64,
    /// Floor on the liquidity buffer
    pub minimum_cash: f64,
    /// Central bank minimum reserve as a share of deposits
    pub reserve_ratio: f64,
    /// Share of the securities portfolio held in government bonds
    pub govies_allocation: f64,
    pub govies_yield: f64,
    pub corporate_yield: f64,
}

impl LiquidityPolicy {
    /// Cash required for a given deposit base: buffer plus minimum reserve
    pub fn required_cash(&self, deposits: f64) -> f64 {
        self.minimum_cash.max(deposits * self.buffer_ratio) + deposits * self.reserve_ratio
    }

    /// Annual yield of the securities portfolio
    pub fn blended_yield(&self) -> f64 {
        self.govies_allocation * self.govies_yield
            + (1.0 - self.govies_allocation) * self.corporate_yield
    }
}

/// Split of the wholesale funding plug across instruments; weights sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingWeights {
    pub ecb: f64,
    pub debt_securities: f64,
    pub interbank: f64,
}

impl FundingWeights {
    pub fn total(&self) -> f64 {
        self.ecb + self.debt_securities + self.interbank
    }
}

/// Regulatory capital parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalParams {
    /// Risk weight applied to the securities portfolio
    pub market_risk_weight: f64,
    /// Basic-indicator factor on annualized revenue
    pub operational_risk_factor: f64,
    pub pillar1_requirement: f64,
    pub pillar2_requirement: f64,
    pub conservation_buffer: f64,
    pub countercyclical_buffer: f64,
}

impl CapitalParams {
    /// Overall CET1 requirement (P1 + P2R + combined buffer)
    pub fn srep_requirement(&self) -> f64 {
        self.pillar1_requirement
            + self.pillar2_requirement
            + self.conservation_buffer
            + self.countercyclical_buffer
    }
}

/// Resolved bank-level assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankParams {
    // Annual schedules
    /// Base reference rate (6M Euribor) by plan year
    pub reference_rate: YearSchedule,
    /// Year-end headcount
    pub fte: YearSchedule,
    /// Average cost per FTE
    pub avg_salary: YearSchedule,
    /// Non-personnel operating costs (marketing, consulting, premises, G&A)
    pub other_costs: YearSchedule,
    pub dividend_payout: YearSchedule,
    pub capex: YearSchedule,

    // Rates
    pub deposit_rate: f64,
    pub funding_rate: f64,
    pub tax_rate: f64,
    /// Annual growth of customer deposits
    pub deposit_growth: f64,
    /// Annual depreciation rate on fixed assets
    pub depreciation_rate: f64,
    /// Annual deposit guarantee contribution as a share of deposits
    pub fitd_rate: f64,

    // Opening balance sheet
    pub initial_deposits: f64,
    pub initial_funding: f64,
    pub initial_securities: f64,
    pub initial_fixed_assets: f64,
    pub share_capital: f64,
    pub initial_retained_earnings: f64,
    pub initial_fte: f64,

    // Policies
    pub credit: CreditPolicy,
    pub liquidity: LiquidityPolicy,
    pub funding_weights: FundingWeights,
    pub capital: CapitalParams,
}

impl BankParams {
    /// Reference rate in force during `quarter`
    pub fn reference_rate_at(&self, quarter: u32) -> f64 {
        schedule_value(&self.reference_rate, quarter)
    }

    pub fn dividend_payout_at(&self, quarter: u32) -> f64 {
        schedule_value(&self.dividend_payout, quarter)
    }

    /// Headcount interpolated linearly from the prior year-end to the current year-end
    pub fn fte_at(&self, quarter: u32) -> f64 {
        let year_idx = crate::calendar::year_index(quarter);
        let start = if year_idx == 0 { self.initial_fte } else { self.fte[year_idx - 1] };
        let end = self.fte[year_idx];
        let fraction = crate::calendar::quarter_in_year(quarter) as f64 / 4.0;
        start + (end - start) * fraction
    }

    pub fn opening_equity(&self) -> f64 {
        self.share_capital + self.initial_retained_earnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Assumptions;

    #[test]
    fn test_required_cash_uses_floor() {
        let policy = LiquidityPolicy {
            buffer_ratio: 0.10,
            minimum_cash: 50.0,
            reserve_ratio: 0.01,
            govies_allocation: 0.6,
            govies_yield: 0.02,
            corporate_yield: 0.04,
        };
        // Buffer floor binds: 50 + 1% of 100
        assert!((policy.required_cash(100.0) - 51.0).abs() < 1e-10);
        // Ratio binds: 10% + 1% of 1000
        assert!((policy.required_cash(1000.0) - 110.0).abs() < 1e-10);
        assert!((policy.blended_yield() - 0.028).abs() < 1e-12);
    }

    #[test]
    fn test_srep_requirement() {
        let capital = Assumptions::default_plan().unwrap().bank.capital;
        assert!((capital.srep_requirement() - 0.095).abs() < 1e-12);
    }

    #[test]
    fn test_fte_interpolation() {
        let mut bank = Assumptions::default_plan().unwrap().bank;
        bank.initial_fte = 40.0;
        bank.fte = [80.0, 100.0, 100.0, 100.0, 100.0];
        assert!((bank.fte_at(1) - 50.0).abs() < 1e-10);
        assert!((bank.fte_at(4) - 80.0).abs() < 1e-10);
        assert!((bank.fte_at(6) - 90.0).abs() < 1e-10);
        assert!((bank.fte_at(12) - 100.0).abs() < 1e-10);
    }
}
