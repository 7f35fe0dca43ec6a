//! Consolidated income statement, balance sheet, capital and KPIs

mod builder;
mod capital;
mod kpi;
mod rows;
mod state;

pub use builder::{check_balance, StatementBuilder, BALANCE_TOLERANCE};
pub use capital::{market_rwa, operational_rwa, OPERATIONAL_RISK_WINDOW};
pub use kpi::{annualized, average_balance, ratio};
pub use rows::{StatementResult, StatementRow, StatementSummary};
pub use state::BalanceState;
