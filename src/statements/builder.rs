//! Consolidated statement builder
//!
//! Quarters are processed strictly in order. Interest on wholesale funding and
//! treasury income accrue on opening balances, so the funding plug of a quarter
//! never feeds back into that quarter's profit.

use log::{debug, info, warn};

use super::capital::{market_rwa, operational_rwa};
use super::kpi::{annualized, average_balance, ratio};
use super::rows::{StatementResult, StatementRow};
use super::state::BalanceState;
use crate::aggregate::BankTotals;
use crate::assumptions::BankParams;
use crate::calendar::{quarters, schedule_value};
use crate::error::{EngineError, Result};
use crate::vintage::Metric;

/// Relative tolerance of the balance sheet identity
pub const BALANCE_TOLERANCE: f64 = 1e-6;

/// Builds income statement, balance sheet, capital and KPIs from bank totals
pub struct StatementBuilder<'a> {
    bank: &'a BankParams,
}

impl<'a> StatementBuilder<'a> {
    pub fn new(bank: &'a BankParams) -> Self {
        Self { bank }
    }

    pub fn build(&self, totals: &BankTotals) -> Result<StatementResult> {
        let mut result = StatementResult::new();
        let mut state = BalanceState::from_bank(self.bank);

        for quarter in quarters() {
            let row = self.calculate_quarter(quarter, totals, &mut state)?;
            result.add_row(row);
        }

        let summary = result.summary();
        info!(
            "Statements built: cumulative net profit {:.2}, final CET1 ratio {:.2}%",
            summary.total_net_profit,
            summary.final_cet1_ratio * 100.0
        );
        Ok(result)
    }

    fn calculate_quarter(
        &self,
        quarter: u32,
        totals: &BankTotals,
        state: &mut BalanceState,
    ) -> Result<StatementRow> {
        let mut row = StatementRow::new(quarter);

        self.calculate_credit(quarter, totals, &mut row);
        self.calculate_income(quarter, state, &mut row);
        self.calculate_balance_sheet(quarter, state, &mut row)?;
        self.calculate_capital(quarter, totals, state, &mut row);
        self.calculate_kpis(quarter, state, &mut row);

        debug!(
            "Q{}: net profit {:.4}, total assets {:.4}, CET1 {:.4}",
            quarter, row.net_profit, row.total_assets, row.cet1_ratio
        );

        state.advance(&row);
        Ok(row)
    }

    /// Credit lines taken straight from the vintage aggregates
    fn calculate_credit(&self, quarter: u32, totals: &BankTotals, row: &mut StatementRow) {
        row.originations = totals.at(Metric::Origination, quarter);
        row.defaults = totals.at(Metric::Default, quarter);
        row.recoveries = totals.at(Metric::Recovery, quarter);
        row.write_offs = totals.at(Metric::WriteOff, quarter);

        row.loan_interest_income = totals.at(Metric::InterestIncome, quarter);
        row.penalty_interest = totals.at(Metric::PenaltyInterest, quarter);
        row.net_commission = totals.at(Metric::UpfrontFee, quarter);
        row.loan_loss_provisions = totals.at(Metric::LossProvision, quarter);

        row.performing_loans = totals.at(Metric::Performing, quarter);
        row.non_performing_loans = totals.at(Metric::NonPerforming, quarter);
        // Recoveries and write-offs leave the book through the NPL stock
        row.gross_loans = row.performing_loans + row.non_performing_loans;
        row.ecl_reserve = totals.at(Metric::Ecl, quarter);
        row.npl_reserve = totals.at(Metric::NplProvision, quarter);
        row.loss_reserve = row.ecl_reserve + row.npl_reserve;
        row.net_loans = row.gross_loans - row.loss_reserve;
    }

    fn calculate_income(&self, quarter: u32, state: &BalanceState, row: &mut StatementRow) {
        let bank = self.bank;

        row.customer_deposits = state.deposits * (1.0 + bank.deposit_growth / 4.0);

        // Interest
        row.interest_income = row.loan_interest_income + row.penalty_interest;
        row.deposit_interest_expense = row.customer_deposits * bank.deposit_rate / 4.0;
        row.funding_interest_expense = state.wholesale_funding * bank.funding_rate / 4.0;
        row.interest_expense = row.deposit_interest_expense + row.funding_interest_expense;
        row.net_interest_income = row.interest_income - row.interest_expense;
        row.treasury_income = state.securities * bank.liquidity.blended_yield() / 4.0;
        row.total_revenue = row.net_interest_income + row.net_commission + row.treasury_income;

        // Operating costs
        row.fte = bank.fte_at(quarter);
        row.personnel_costs = row.fte * schedule_value(&bank.avg_salary, quarter) / 4.0;
        row.other_costs = schedule_value(&bank.other_costs, quarter) / 4.0;
        row.fitd_contribution = row.customer_deposits * bank.fitd_rate / 4.0;
        row.depreciation = state.fixed_assets * bank.depreciation_rate / 4.0;
        row.other_operating_costs = row.other_costs + row.fitd_contribution + row.depreciation;
        row.operating_costs = row.personnel_costs + row.other_operating_costs;

        // Bottom line
        row.gross_profit = row.total_revenue - row.operating_costs - row.loan_loss_provisions;
        row.tax = (row.gross_profit * bank.tax_rate).max(0.0);
        row.net_profit = row.gross_profit - row.tax;
        row.dividends = row.net_profit.max(0.0) * bank.dividend_payout_at(quarter);
    }

    fn calculate_balance_sheet(
        &self,
        quarter: u32,
        state: &BalanceState,
        row: &mut StatementRow,
    ) -> Result<()> {
        let bank = self.bank;

        // Fixed assets
        row.capex = schedule_value(&bank.capex, quarter) / 4.0;
        row.fixed_assets = state.fixed_assets + row.capex - row.depreciation;

        // Equity
        row.share_capital = bank.share_capital;
        row.retained_earnings = state.retained_earnings + row.net_profit - row.dividends;
        row.total_equity = row.share_capital + row.retained_earnings;

        // Liquidity requirement
        row.liquidity_buffer = bank
            .liquidity
            .minimum_cash
            .max(row.customer_deposits * bank.liquidity.buffer_ratio);
        row.minimum_reserve = row.customer_deposits * bank.liquidity.reserve_ratio;
        row.cash = row.liquidity_buffer + row.minimum_reserve;

        // Wholesale funding plug covers loans, fixed assets and cash not funded by deposits and equity
        row.wholesale_funding = (row.net_loans + row.fixed_assets + row.cash
            - row.customer_deposits
            - row.total_equity)
            .max(0.0);
        if row.wholesale_funding > 0.0 && state.wholesale_funding == 0.0 {
            warn!(
                "Wholesale funding required from Q{}: {:.4}",
                quarter, row.wholesale_funding
            );
        }
        let weights = &bank.funding_weights;
        row.ecb_funding = row.wholesale_funding * weights.ecb;
        row.debt_securities = row.wholesale_funding * weights.debt_securities;
        row.interbank_funding = row.wholesale_funding * weights.interbank;
        row.total_liabilities = row.customer_deposits + row.wholesale_funding;

        // Residual liquidity into securities
        row.securities = row.customer_deposits + row.wholesale_funding + row.total_equity
            - row.net_loans
            - row.fixed_assets
            - row.cash;
        row.govies = row.securities * bank.liquidity.govies_allocation;
        row.corporate_bonds = row.securities - row.govies;

        // Securities close the sheet, so the identity holds by construction and the
        // check only guards against floating-point drift in the residual
        row.total_assets = row.net_loans + row.securities + row.cash + row.fixed_assets;
        check_balance(quarter, row.total_assets, row.total_liabilities + row.total_equity)
    }

    fn calculate_capital(
        &self,
        quarter: u32,
        totals: &BankTotals,
        state: &BalanceState,
        row: &mut StatementRow,
    ) {
        let capital = &self.bank.capital;

        row.credit_rwa = totals.totals.risk_weighted_exposure.at(quarter);
        row.market_rwa = market_rwa(row.securities, capital.market_risk_weight);

        let mut revenues = state.revenue_history.clone();
        revenues.push(row.total_revenue);
        row.operational_rwa = operational_rwa(&revenues, capital.operational_risk_factor);

        row.total_rwa = row.credit_rwa + row.market_rwa + row.operational_rwa;
        row.cet1_capital = row.total_equity;
        row.cet1_ratio = ratio(row.cet1_capital, row.total_rwa);
        // No additional tier 1 or tier 2 instruments
        row.tier1_ratio = row.cet1_ratio;
        row.total_capital_ratio = row.tier1_ratio;

        row.srep_requirement = capital.srep_requirement();
        row.capital_requirement = row.total_rwa * row.srep_requirement;
        row.capital_surplus = row.cet1_capital - row.capital_requirement;
        if row.capital_surplus < 0.0 {
            warn!(
                "Q{}: CET1 ratio {:.2}% below requirement {:.2}%",
                quarter,
                row.cet1_ratio * 100.0,
                row.srep_requirement * 100.0
            );
        }
    }

    fn calculate_kpis(&self, quarter: u32, state: &BalanceState, row: &mut StatementRow) {
        row.roe = ratio(
            annualized(row.net_profit),
            average_balance(quarter, state.total_equity, row.total_equity),
        );
        row.roa = ratio(
            annualized(row.net_profit),
            average_balance(quarter, state.total_assets, row.total_assets),
        );
        row.nim = ratio(
            annualized(row.net_interest_income),
            average_balance(
                quarter,
                state.net_loans + state.securities,
                row.net_loans + row.securities,
            ),
        );
        row.cost_income = ratio(row.operating_costs, row.total_revenue);
        row.npl_ratio = ratio(row.non_performing_loans, row.gross_loans);
        row.coverage_ratio = ratio(row.loss_reserve, row.non_performing_loans);
        row.loan_to_deposit = ratio(row.net_loans, row.customer_deposits);
        row.efficiency_ratio = ratio(row.operating_costs, row.net_interest_income + row.net_commission);
    }
}

/// Verify total assets equal liabilities plus equity within tolerance
pub fn check_balance(quarter: u32, assets: f64, liabilities_and_equity: f64) -> Result<()> {
    let tolerance = BALANCE_TOLERANCE * assets.abs().max(1.0);
    if (assets - liabilities_and_equity).abs() > tolerance {
        return Err(EngineError::BalanceSheetImbalance {
            quarter,
            assets,
            liabilities_and_equity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_divisions;
    use crate::vintage::CohortEngine;
    use crate::Assumptions;
    use approx::assert_relative_eq;

    fn build_default() -> (Assumptions, BankTotals, StatementResult) {
        let assumptions = Assumptions::default_plan().unwrap();
        let products = CohortEngine::new(&assumptions).run_all().unwrap();
        let bank = BankTotals::from_divisions(&aggregate_divisions(&products));
        let statements = StatementBuilder::new(&assumptions.bank).build(&bank).unwrap();
        (assumptions, bank, statements)
    }

    #[test]
    fn test_balance_sheet_identity_every_quarter() {
        let (_, _, statements) = build_default();
        assert_eq!(statements.rows.len(), 20);
        for row in &statements.rows {
            assert_relative_eq!(
                row.total_assets,
                row.total_liabilities + row.total_equity,
                epsilon = 1e-6 * row.total_assets.max(1.0)
            );
        }
    }

    #[test]
    fn test_income_statement_composition() {
        let (_, bank, statements) = build_default();
        for row in &statements.rows {
            let q = row.quarter;
            assert_relative_eq!(
                row.interest_income,
                bank.at(Metric::InterestIncome, q) + bank.at(Metric::PenaltyInterest, q),
                epsilon = 1e-9
            );
            assert_relative_eq!(
                row.net_interest_income,
                row.interest_income - row.interest_expense,
                epsilon = 1e-9
            );
            assert_relative_eq!(
                row.gross_profit,
                row.total_revenue - row.operating_costs - row.loan_loss_provisions,
                epsilon = 1e-9
            );
            assert!(row.tax >= 0.0);
            assert_relative_eq!(row.net_profit, row.gross_profit - row.tax, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_gross_loans_are_performing_plus_non_performing() {
        let (_, bank, statements) = build_default();
        for row in &statements.rows {
            assert_relative_eq!(
                row.gross_loans,
                row.performing_loans + row.non_performing_loans,
                epsilon = 1e-9
            );
            assert_relative_eq!(row.net_loans, row.gross_loans - row.loss_reserve, epsilon = 1e-9);
        }
        // Recovered and written-off principal no longer sits in gross loans
        let last = statements.rows.last().unwrap();
        let recovered_or_written_off: f64 = statements
            .rows
            .iter()
            .map(|r| r.recoveries + r.write_offs)
            .sum();
        assert!(recovered_or_written_off > 0.0);
        assert_relative_eq!(
            last.gross_loans,
            bank.at(Metric::GrossBookValue, 20) - recovered_or_written_off,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_deposits_grow_quarterly() {
        let (assumptions, _, statements) = build_default();
        let growth = 1.0 + assumptions.bank.deposit_growth / 4.0;
        assert_relative_eq!(
            statements.rows[0].customer_deposits,
            assumptions.bank.initial_deposits * growth,
            epsilon = 1e-9
        );
        for pair in statements.rows.windows(2) {
            assert_relative_eq!(
                pair[1].customer_deposits,
                pair[0].customer_deposits * growth,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_retained_earnings_roll_forward() {
        let (assumptions, _, statements) = build_default();
        let mut previous = assumptions.bank.initial_retained_earnings;
        for row in &statements.rows {
            let payout = assumptions.bank.dividend_payout_at(row.quarter);
            assert_relative_eq!(row.dividends, row.net_profit.max(0.0) * payout, epsilon = 1e-9);
            assert_relative_eq!(
                row.retained_earnings,
                previous + row.net_profit - row.dividends,
                epsilon = 1e-9
            );
            previous = row.retained_earnings;
        }
    }

    #[test]
    fn test_funding_interest_accrues_on_opening_balance() {
        let (assumptions, _, statements) = build_default();
        let rate = assumptions.bank.funding_rate / 4.0;
        assert_relative_eq!(
            statements.rows[0].funding_interest_expense,
            assumptions.bank.initial_funding * rate,
            epsilon = 1e-12
        );
        for pair in statements.rows.windows(2) {
            assert_relative_eq!(
                pair[1].funding_interest_expense,
                pair[0].wholesale_funding * rate,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_capital_ratios() {
        let (assumptions, bank, statements) = build_default();
        for row in &statements.rows {
            assert_relative_eq!(
                row.credit_rwa,
                bank.totals.risk_weighted_exposure.at(row.quarter),
                epsilon = 1e-9
            );
            assert_relative_eq!(row.market_rwa, row.securities * 0.10, epsilon = 1e-9);
            assert_relative_eq!(row.cet1_ratio, row.total_equity / row.total_rwa, epsilon = 1e-12);
            assert_eq!(row.tier1_ratio, row.cet1_ratio);
            assert_relative_eq!(
                row.capital_surplus,
                row.cet1_capital - row.total_rwa * assumptions.bank.capital.srep_requirement(),
                epsilon = 1e-9
            );
        }
        // First quarter operational RWA uses the single available quarter
        let first = &statements.rows[0];
        assert_relative_eq!(first.operational_rwa, first.total_revenue * 4.0 * 0.15, epsilon = 1e-9);
    }

    #[test]
    fn test_kpis() {
        let (_, _, statements) = build_default();
        let first = &statements.rows[0];
        assert_relative_eq!(first.roe, first.net_profit * 4.0 / first.total_equity, epsilon = 1e-12);

        let (q1, q2) = (&statements.rows[0], &statements.rows[1]);
        let avg_equity = (q1.total_equity + q2.total_equity) / 2.0;
        assert_relative_eq!(q2.roe, q2.net_profit * 4.0 / avg_equity, epsilon = 1e-12);
        assert_relative_eq!(q2.loan_to_deposit, q2.net_loans / q2.customer_deposits, epsilon = 1e-12);
        assert_relative_eq!(q2.npl_ratio, q2.non_performing_loans / q2.gross_loans, epsilon = 1e-12);
    }

    #[test]
    fn test_funding_plug_when_loans_exceed_deposits() {
        let mut assumptions = Assumptions::default_plan().unwrap();
        assumptions.bank.initial_deposits = 100.0;
        let products = CohortEngine::new(&assumptions).run_all().unwrap();
        let bank = BankTotals::from_divisions(&aggregate_divisions(&products));
        let statements = StatementBuilder::new(&assumptions.bank).build(&bank).unwrap();

        let last = statements.rows.last().unwrap();
        assert!(last.wholesale_funding > 0.0);
        // Plug leaves no surplus liquidity
        assert_relative_eq!(last.securities, 0.0, epsilon = 1e-6);
        assert_relative_eq!(
            last.ecb_funding + last.debt_securities + last.interbank_funding,
            last.wholesale_funding,
            epsilon = 1e-9
        );
        assert_relative_eq!(last.ecb_funding, last.wholesale_funding * 0.40, epsilon = 1e-9);
        assert_relative_eq!(
            last.total_assets,
            last.total_liabilities + last.total_equity,
            epsilon = 1e-6 * last.total_assets
        );
    }

    #[test]
    fn test_no_plug_when_deposits_fund_the_book() {
        let (_, _, statements) = build_default();
        for row in &statements.rows {
            assert_eq!(row.wholesale_funding, 0.0);
            assert!(row.securities > 0.0);
        }
    }

    #[test]
    fn test_check_balance() {
        assert!(check_balance(1, 1000.0, 1000.0 + 1e-7).is_ok());
        assert!(matches!(
            check_balance(3, 1000.0, 990.0),
            Err(EngineError::BalanceSheetImbalance { quarter: 3, .. })
        ));
    }
}
