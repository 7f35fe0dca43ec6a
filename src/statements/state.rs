//! Balance sheet state carried from one quarter to the next

use super::rows::StatementRow;
use crate::assumptions::BankParams;

/// Closing balances of the previous quarter
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceState {
    pub deposits: f64,
    pub wholesale_funding: f64,
    pub securities: f64,
    pub fixed_assets: f64,
    pub net_loans: f64,
    pub total_assets: f64,
    pub retained_earnings: f64,
    pub total_equity: f64,

    /// Total revenue of every completed quarter, oldest first
    pub revenue_history: Vec<f64>,
}

impl BalanceState {
    /// Opening balance sheet before the first plan quarter
    pub fn from_bank(bank: &BankParams) -> Self {
        let cash = bank.liquidity.required_cash(bank.initial_deposits);
        Self {
            deposits: bank.initial_deposits,
            wholesale_funding: bank.initial_funding,
            securities: bank.initial_securities,
            fixed_assets: bank.initial_fixed_assets,
            net_loans: 0.0,
            total_assets: bank.initial_securities + cash + bank.initial_fixed_assets,
            retained_earnings: bank.initial_retained_earnings,
            total_equity: bank.opening_equity(),
            revenue_history: Vec::new(),
        }
    }

    /// Closing balances of `row` become the next quarter's opening balances
    pub fn advance(&mut self, row: &StatementRow) {
        self.deposits = row.customer_deposits;
        self.wholesale_funding = row.wholesale_funding;
        self.securities = row.securities;
        self.fixed_assets = row.fixed_assets;
        self.net_loans = row.net_loans;
        self.total_assets = row.total_assets;
        self.retained_earnings = row.retained_earnings;
        self.total_equity = row.total_equity;
        self.revenue_history.push(row.total_revenue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Assumptions;

    #[test]
    fn test_opening_state_from_bank() {
        let bank = Assumptions::default_plan().unwrap().bank;
        let state = BalanceState::from_bank(&bank);
        assert_eq!(state.deposits, bank.initial_deposits);
        assert_eq!(state.total_equity, bank.share_capital + bank.initial_retained_earnings);
        assert!(state.revenue_history.is_empty());
    }

    #[test]
    fn test_advance_rolls_closing_into_opening() {
        let bank = Assumptions::default_plan().unwrap().bank;
        let mut state = BalanceState::from_bank(&bank);
        let mut row = StatementRow::new(1);
        row.customer_deposits = 1850.0;
        row.securities = 900.0;
        row.total_revenue = 12.5;
        row.retained_earnings = 3.0;
        state.advance(&row);
        assert_eq!(state.deposits, 1850.0);
        assert_eq!(state.securities, 900.0);
        assert_eq!(state.retained_earnings, 3.0);
        assert_eq!(state.revenue_history, vec![12.5]);
    }
}
