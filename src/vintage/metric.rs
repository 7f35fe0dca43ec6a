//! Vintage metrics and the ordered table of their cell formulas
//!
//! Each entry computes one cell from the product parameters and the cells
//! already written for the same (vintage, quarter) or earlier quarters.
//! Table order is dependency order: a formula may read the current cell of any
//! metric listed before it and the opening (prior-quarter) cell of any metric.

use serde::{Deserialize, Serialize};

use super::grid::GridSet;
use super::timing::timing_weight;
use crate::assumptions::{AmortizationType, CreditPolicy, ProductParams};

/// Quantities tracked per vintage and quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Origination,
    Default,
    Amortization,
    GrossBookValue,
    Performing,
    Ecl,
    NetPerforming,
    Recovery,
    WriteOff,
    NonPerforming,
    DiscountedRecovery,
    NetNonPerforming,
    NplProvision,
    InterestIncome,
    PenaltyInterest,
    UpfrontFee,
    LossProvision,
}

impl Metric {
    /// All metrics in computation order
    pub const ALL: [Metric; 17] = [
        Metric::Origination,
        Metric::Default,
        Metric::Amortization,
        Metric::GrossBookValue,
        Metric::Performing,
        Metric::Ecl,
        Metric::NetPerforming,
        Metric::Recovery,
        Metric::WriteOff,
        Metric::NonPerforming,
        Metric::DiscountedRecovery,
        Metric::NetNonPerforming,
        Metric::NplProvision,
        Metric::InterestIncome,
        Metric::PenaltyInterest,
        Metric::UpfrontFee,
        Metric::LossProvision,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Origination => "origination",
            Metric::Default => "default",
            Metric::Amortization => "amortization",
            Metric::GrossBookValue => "gross_book_value",
            Metric::Performing => "performing",
            Metric::Ecl => "ecl",
            Metric::NetPerforming => "net_performing",
            Metric::Recovery => "recovery",
            Metric::WriteOff => "write_off",
            Metric::NonPerforming => "non_performing",
            Metric::DiscountedRecovery => "discounted_recovery",
            Metric::NetNonPerforming => "net_non_performing",
            Metric::NplProvision => "npl_provision",
            Metric::InterestIncome => "interest_income",
            Metric::PenaltyInterest => "penalty_interest",
            Metric::UpfrontFee => "upfront_fee",
            Metric::LossProvision => "loss_provision",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Balances and repayments, which a consistent run never drives below zero
    pub fn must_be_non_negative(&self) -> bool {
        matches!(
            self,
            Metric::Amortization
                | Metric::GrossBookValue
                | Metric::Performing
                | Metric::Ecl
                | Metric::NetPerforming
                | Metric::NonPerforming
        )
    }
}

/// Inputs visible to a cell formula
pub struct CellContext<'a> {
    pub product: &'a ProductParams,
    pub credit: &'a CreditPolicy,
    /// Divisional annual volume in the vintage's origination year
    pub annual_volume: f64,
    /// Reference rate in the cell's calendar year
    pub reference_rate: f64,
    pub vintage: u32,
    pub quarter: u32,
    pub grids: &'a GridSet,
}

impl CellContext<'_> {
    /// Quarters since origination (0 at origination)
    pub fn elapsed(&self) -> u32 {
        self.quarter - self.vintage
    }

    pub fn is_origination_quarter(&self) -> bool {
        self.quarter == self.vintage
    }

    /// Current cell of a metric computed earlier in the table
    pub fn current(&self, metric: Metric) -> f64 {
        self.grids.grid(metric).get(self.vintage, self.quarter)
    }

    /// Prior-quarter cell; 0 in the origination quarter
    pub fn opening(&self, metric: Metric) -> f64 {
        if self.is_origination_quarter() {
            0.0
        } else {
            self.grids.grid(metric).get(self.vintage, self.quarter - 1)
        }
    }

    pub fn at(&self, metric: Metric, quarter: u32) -> f64 {
        self.grids.grid(metric).get(self.vintage, quarter)
    }

    /// Sum from origination through the current quarter
    pub fn cumulative(&self, metric: Metric) -> f64 {
        self.grids.grid(metric).cumulative(self.vintage, self.quarter)
    }

    /// Annual customer rate
    pub fn customer_rate(&self) -> f64 {
        self.reference_rate + self.product.spread
    }
}

/// Cell formula
pub type ComputeFn = fn(&CellContext) -> f64;

/// One row of the metric table
pub struct MetricDef {
    pub metric: Metric,
    pub compute: ComputeFn,
}

/// Metric formulas in dependency order
pub const METRIC_TABLE: &[MetricDef] = &[
    MetricDef { metric: Metric::Origination, compute: origination },
    MetricDef { metric: Metric::Default, compute: defaulted },
    MetricDef { metric: Metric::Amortization, compute: amortization },
    MetricDef { metric: Metric::GrossBookValue, compute: gross_book_value },
    MetricDef { metric: Metric::Performing, compute: performing },
    MetricDef { metric: Metric::Ecl, compute: ecl },
    MetricDef { metric: Metric::NetPerforming, compute: net_performing },
    MetricDef { metric: Metric::Recovery, compute: recovery },
    MetricDef { metric: Metric::WriteOff, compute: write_off },
    MetricDef { metric: Metric::NonPerforming, compute: non_performing },
    MetricDef { metric: Metric::DiscountedRecovery, compute: discounted_recovery },
    MetricDef { metric: Metric::NetNonPerforming, compute: net_non_performing },
    MetricDef { metric: Metric::NplProvision, compute: npl_provision },
    MetricDef { metric: Metric::InterestIncome, compute: interest_income },
    MetricDef { metric: Metric::PenaltyInterest, compute: penalty_interest },
    MetricDef { metric: Metric::UpfrontFee, compute: upfront_fee },
    MetricDef { metric: Metric::LossProvision, compute: loss_provision },
];

fn origination(ctx: &CellContext) -> f64 {
    if ctx.is_origination_quarter() {
        ctx.annual_volume * ctx.product.mix / 4.0
    } else {
        0.0
    }
}

/// Defaults accrue on opening performing stock until contractual maturity.
///
/// At most a quarter of the opening performing stock defaults in one quarter,
/// so performing stays at or above half its opening value before repayments.
fn defaulted(ctx: &CellContext) -> f64 {
    let elapsed = ctx.elapsed();
    if elapsed >= ctx.product.maturity_quarters {
        return 0.0;
    }
    ctx.opening(Metric::Performing)
        * ctx.product.quarterly_danger_rate()
        * timing_weight(elapsed + 1, ctx.product.default_timing)
}

/// Repays the principal still performing after this quarter's default.
///
/// Performing principal reaches zero in the quarter at elapsed `maturity - 1`.
fn amortization(ctx: &CellContext) -> f64 {
    let elapsed = ctx.elapsed();
    let last = ctx.product.final_repayment_offset();
    let repayable = ctx.opening(Metric::GrossBookValue) + ctx.current(Metric::Origination)
        - ctx.current(Metric::Default)
        - ctx.cumulative(Metric::Default);

    match ctx.product.amortization {
        AmortizationType::Bullet => {
            if elapsed == last {
                repayable
            } else {
                0.0
            }
        }
        AmortizationType::Amortizing => {
            let first = ctx.product.pre_amortization_quarters.max(1).min(last);
            if elapsed >= first && elapsed <= last {
                repayable / (ctx.product.maturity_quarters - elapsed) as f64
            } else {
                0.0
            }
        }
    }
}

fn gross_book_value(ctx: &CellContext) -> f64 {
    ctx.opening(Metric::GrossBookValue) + ctx.current(Metric::Origination)
        - ctx.current(Metric::Amortization)
        - ctx.current(Metric::Default)
}

fn performing(ctx: &CellContext) -> f64 {
    ctx.current(Metric::GrossBookValue) - ctx.cumulative(Metric::Default)
}

/// Stage 1 expected loss over the next quarter
fn ecl(ctx: &CellContext) -> f64 {
    ctx.current(Metric::Performing) * ctx.product.quarterly_danger_rate() * ctx.product.lgd
}

fn net_performing(ctx: &CellContext) -> f64 {
    ctx.current(Metric::Performing) - ctx.current(Metric::Ecl)
}

/// Cash recovered on defaults that reached their channel's recovery quarter
fn recovery(ctx: &CellContext) -> f64 {
    let elapsed = ctx.elapsed();
    let gross: f64 = ctx
        .product
        .collateral
        .iter()
        .filter(|c| elapsed >= c.timing_quarters)
        .map(|c| ctx.at(Metric::Default, ctx.quarter - c.timing_quarters) * c.recovery_share())
        .sum();
    let available = ctx.opening(Metric::NonPerforming) + ctx.current(Metric::Default);
    gross.min(available)
}

/// Write-offs start once the vintage has spent the workout period in default
fn write_off(ctx: &CellContext) -> f64 {
    let entry = (ctx.vintage..=ctx.quarter).find(|&k| ctx.at(Metric::Default, k) > 0.0);
    match entry {
        Some(k) if ctx.quarter - k >= ctx.credit.workout_quarters => {
            let opening = ctx.opening(Metric::NonPerforming);
            let remaining = opening + ctx.current(Metric::Default) - ctx.current(Metric::Recovery);
            (opening * ctx.credit.write_off_rate / 4.0).min(remaining)
        }
        _ => 0.0,
    }
}

fn non_performing(ctx: &CellContext) -> f64 {
    ctx.opening(Metric::NonPerforming) + ctx.current(Metric::Default)
        - ctx.current(Metric::WriteOff)
        - ctx.current(Metric::Recovery)
}

/// Present value of expected collateral recoveries on the non-performing stock
fn discounted_recovery(ctx: &CellContext) -> f64 {
    let npl = ctx.current(Metric::NonPerforming);
    if npl == 0.0 {
        return 0.0;
    }
    let quarterly_rate = ctx.customer_rate() / 4.0;
    ctx.product
        .collateral
        .iter()
        .map(|c| {
            let periods = (c.timing_quarters + ctx.elapsed()) as i32;
            npl * c.recovery_share() / (1.0 + quarterly_rate).powi(periods)
        })
        .sum()
}

fn net_non_performing(ctx: &CellContext) -> f64 {
    ctx.current(Metric::DiscountedRecovery)
}

/// Shortfall of discounted recoveries against the non-performing stock
fn npl_provision(ctx: &CellContext) -> f64 {
    (ctx.current(Metric::NonPerforming) - ctx.current(Metric::NetNonPerforming)).max(0.0)
}

fn interest_income(ctx: &CellContext) -> f64 {
    ctx.current(Metric::Performing) * ctx.customer_rate() / 4.0
}

fn penalty_interest(ctx: &CellContext) -> f64 {
    ctx.current(Metric::NonPerforming) * ctx.product.penalty_rate / 4.0
        * ctx.product.blended_recovery_rate()
}

fn upfront_fee(ctx: &CellContext) -> f64 {
    if ctx.is_origination_quarter() {
        ctx.current(Metric::Origination) * ctx.product.upfront_fee
    } else {
        0.0
    }
}

/// Day-one annual expected loss at origination, ECL increases afterwards
fn loss_provision(ctx: &CellContext) -> f64 {
    if ctx.is_origination_quarter() {
        ctx.current(Metric::Origination) * ctx.product.danger_rate * ctx.product.lgd
    } else {
        (ctx.current(Metric::Ecl) - ctx.opening(Metric::Ecl)).max(0.0)
    }
}
