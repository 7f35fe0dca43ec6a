//! Consolidated statement output structures

use serde::{Deserialize, Serialize};

use crate::calendar::{quarter_in_year, year_of};

/// Consolidated line items for one quarter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    // Timing
    pub quarter: u32,
    pub year: u32,
    pub quarter_in_year: u32,

    // Credit flows
    pub originations: f64,
    pub defaults: f64,
    pub recoveries: f64,
    pub write_offs: f64,

    // Income statement
    pub loan_interest_income: f64,
    pub penalty_interest: f64,
    pub interest_income: f64,
    pub deposit_interest_expense: f64,
    pub funding_interest_expense: f64,
    pub interest_expense: f64,
    pub net_interest_income: f64,
    pub net_commission: f64,
    pub treasury_income: f64,
    pub total_revenue: f64,
    pub fte: f64,
    pub personnel_costs: f64,
    pub other_costs: f64,
    pub fitd_contribution: f64,
    pub depreciation: f64,
    pub other_operating_costs: f64,
    pub operating_costs: f64,
    pub loan_loss_provisions: f64,
    pub gross_profit: f64,
    pub tax: f64,
    pub net_profit: f64,
    pub dividends: f64,

    // Assets
    pub gross_loans: f64,
    pub performing_loans: f64,
    pub non_performing_loans: f64,
    pub ecl_reserve: f64,
    pub npl_reserve: f64,
    pub loss_reserve: f64,
    pub net_loans: f64,
    pub govies: f64,
    pub corporate_bonds: f64,
    pub securities: f64,
    pub liquidity_buffer: f64,
    pub minimum_reserve: f64,
    pub cash: f64,
    pub capex: f64,
    pub fixed_assets: f64,
    pub total_assets: f64,

    // Liabilities and equity
    pub customer_deposits: f64,
    pub ecb_funding: f64,
    pub debt_securities: f64,
    pub interbank_funding: f64,
    pub wholesale_funding: f64,
    pub total_liabilities: f64,
    pub share_capital: f64,
    pub retained_earnings: f64,
    pub total_equity: f64,

    // Capital
    pub credit_rwa: f64,
    pub market_rwa: f64,
    pub operational_rwa: f64,
    pub total_rwa: f64,
    pub cet1_capital: f64,
    pub cet1_ratio: f64,
    pub tier1_ratio: f64,
    pub total_capital_ratio: f64,
    pub srep_requirement: f64,
    pub capital_requirement: f64,
    pub capital_surplus: f64,

    // KPIs (annualized where applicable)
    pub roe: f64,
    pub roa: f64,
    pub nim: f64,
    pub cost_income: f64,
    pub npl_ratio: f64,
    pub coverage_ratio: f64,
    pub loan_to_deposit: f64,
    pub efficiency_ratio: f64,
}

impl StatementRow {
    pub fn new(quarter: u32) -> Self {
        Self {
            quarter,
            year: year_of(quarter),
            quarter_in_year: quarter_in_year(quarter),
            ..Default::default()
        }
    }

    /// Named line items in presentation order
    pub fn line_items(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("originations", self.originations),
            ("defaults", self.defaults),
            ("recoveries", self.recoveries),
            ("write_offs", self.write_offs),
            ("loan_interest_income", self.loan_interest_income),
            ("penalty_interest", self.penalty_interest),
            ("interest_income", self.interest_income),
            ("deposit_interest_expense", self.deposit_interest_expense),
            ("funding_interest_expense", self.funding_interest_expense),
            ("interest_expense", self.interest_expense),
            ("net_interest_income", self.net_interest_income),
            ("net_commission", self.net_commission),
            ("treasury_income", self.treasury_income),
            ("total_revenue", self.total_revenue),
            ("fte", self.fte),
            ("personnel_costs", self.personnel_costs),
            ("other_costs", self.other_costs),
            ("fitd_contribution", self.fitd_contribution),
            ("depreciation", self.depreciation),
            ("other_operating_costs", self.other_operating_costs),
            ("operating_costs", self.operating_costs),
            ("loan_loss_provisions", self.loan_loss_provisions),
            ("gross_profit", self.gross_profit),
            ("tax", self.tax),
            ("net_profit", self.net_profit),
            ("dividends", self.dividends),
            ("gross_loans", self.gross_loans),
            ("performing_loans", self.performing_loans),
            ("non_performing_loans", self.non_performing_loans),
            ("ecl_reserve", self.ecl_reserve),
            ("npl_reserve", self.npl_reserve),
            ("loss_reserve", self.loss_reserve),
            ("net_loans", self.net_loans),
            ("govies", self.govies),
            ("corporate_bonds", self.corporate_bonds),
            ("securities", self.securities),
            ("liquidity_buffer", self.liquidity_buffer),
            ("minimum_reserve", self.minimum_reserve),
            ("cash", self.cash),
            ("capex", self.capex),
            ("fixed_assets", self.fixed_assets),
            ("total_assets", self.total_assets),
            ("customer_deposits", self.customer_deposits),
            ("ecb_funding", self.ecb_funding),
            ("debt_securities", self.debt_securities),
            ("interbank_funding", self.interbank_funding),
            ("wholesale_funding", self.wholesale_funding),
            ("total_liabilities", self.total_liabilities),
            ("share_capital", self.share_capital),
            ("retained_earnings", self.retained_earnings),
            ("total_equity", self.total_equity),
            ("credit_rwa", self.credit_rwa),
            ("market_rwa", self.market_rwa),
            ("operational_rwa", self.operational_rwa),
            ("total_rwa", self.total_rwa),
            ("cet1_capital", self.cet1_capital),
            ("cet1_ratio", self.cet1_ratio),
            ("tier1_ratio", self.tier1_ratio),
            ("total_capital_ratio", self.total_capital_ratio),
            ("srep_requirement", self.srep_requirement),
            ("capital_requirement", self.capital_requirement),
            ("capital_surplus", self.capital_surplus),
            ("roe", self.roe),
            ("roa", self.roa),
            ("nim", self.nim),
            ("cost_income", self.cost_income),
            ("npl_ratio", self.npl_ratio),
            ("coverage_ratio", self.coverage_ratio),
            ("loan_to_deposit", self.loan_to_deposit),
            ("efficiency_ratio", self.efficiency_ratio),
        ]
    }
}

/// Quarterly statements over the plan horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    pub rows: Vec<StatementRow>,
}

impl StatementResult {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, row: StatementRow) {
        self.rows.push(row);
    }

    /// Row for `quarter` (1-indexed)
    pub fn quarter(&self, quarter: u32) -> Option<&StatementRow> {
        self.rows.iter().find(|r| r.quarter == quarter)
    }

    /// Sum of a flow line item over a plan year
    pub fn year_total(&self, year: u32, line: fn(&StatementRow) -> f64) -> f64 {
        self.rows.iter().filter(|r| r.year == year).map(line).sum()
    }

    /// Get summary statistics
    pub fn summary(&self) -> StatementSummary {
        let total_net_profit: f64 = self.rows.iter().map(|r| r.net_profit).sum();
        let total_dividends: f64 = self.rows.iter().map(|r| r.dividends).sum();
        let total_originations: f64 = self.rows.iter().map(|r| r.originations).sum();
        let min_cet1_ratio = self
            .rows
            .iter()
            .map(|r| r.cet1_ratio)
            .fold(f64::INFINITY, f64::min);
        let peak_wholesale_funding = self
            .rows
            .iter()
            .map(|r| r.wholesale_funding)
            .fold(0.0, f64::max);

        let last = self.rows.last();

        StatementSummary {
            total_quarters: self.rows.len() as u32,
            total_originations,
            total_net_profit,
            total_dividends,
            final_total_assets: last.map(|r| r.total_assets).unwrap_or(0.0),
            final_total_equity: last.map(|r| r.total_equity).unwrap_or(0.0),
            final_cet1_ratio: last.map(|r| r.cet1_ratio).unwrap_or(0.0),
            min_cet1_ratio: if min_cet1_ratio.is_finite() { min_cet1_ratio } else { 0.0 },
            final_roe: last.map(|r| r.roe).unwrap_or(0.0),
            final_npl_ratio: last.map(|r| r.npl_ratio).unwrap_or(0.0),
            peak_wholesale_funding,
        }
    }
}

/// Summary statistics for a plan run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    pub total_quarters: u32,
    pub total_originations: f64,
    pub total_net_profit: f64,
    pub total_dividends: f64,
    pub final_total_assets: f64,
    pub final_total_equity: f64,
    pub final_cet1_ratio: f64,
    pub min_cet1_ratio: f64,
    pub final_roe: f64,
    pub final_npl_ratio: f64,
    pub peak_wholesale_funding: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_row_timing() {
        let row = StatementRow::new(6);
        assert_eq!(row.year, 2);
        assert_eq!(row.quarter_in_year, 2);
        assert_eq!(row.net_profit, 0.0);
    }

    #[test]
    fn test_summary_and_year_totals() {
        let mut result = StatementResult::new();
        for q in 1..=8 {
            let mut row = StatementRow::new(q);
            row.net_profit = 1.0;
            row.cet1_ratio = 0.10 + q as f64 * 0.01;
            row.total_assets = 100.0 * q as f64;
            result.add_row(row);
        }
        let summary = result.summary();
        assert_eq!(summary.total_quarters, 8);
        assert_eq!(summary.total_net_profit, 8.0);
        assert!((summary.min_cet1_ratio - 0.11).abs() < 1e-12);
        assert_eq!(summary.final_total_assets, 800.0);
        assert_eq!(result.year_total(2, |r| r.net_profit), 4.0);
        assert_eq!(result.quarter(3).map(|r| r.quarter), Some(3));
    }

    #[test]
    fn test_line_items_are_unique() {
        let items = StatementRow::new(1).line_items();
        let mut names: Vec<&str> = items.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), items.len());
    }
}
