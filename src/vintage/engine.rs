//! Cohort engine: walks the metric table over every vintage of every product

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::grid::{GridSet, VintageGrid};
use super::metric::{CellContext, Metric, METRIC_TABLE};
use crate::assumptions::{Assumptions, Division, ProductParams};
use crate::calendar::HORIZON_QUARTERS;
use crate::error::{EngineError, Result};

/// Relative tolerance for rounding noise on balances
const STOCK_TOLERANCE: f64 = 1e-9;

/// All vintage grids of one product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVintages {
    pub division: Division,
    pub code: String,
    pub name: String,
    /// Risk weight carried for capital aggregation
    pub risk_weight: f64,
    pub grids: GridSet,
}

impl ProductVintages {
    pub fn scope(&self) -> String {
        format!("{}/{}", self.division.as_str(), self.code)
    }

    pub fn grid(&self, metric: Metric) -> &VintageGrid {
        self.grids.grid(metric)
    }

    /// Metric summed over all vintages alive in `quarter`
    pub fn quarter_total(&self, metric: Metric, quarter: u32) -> f64 {
        self.grids.grid(metric).quarter_total(quarter)
    }

    /// Outstanding loan exposure: performing plus non-performing stock.
    ///
    /// Recovered and written-off principal has left this exposure even though
    /// gross book value keeps the cumulative defaults.
    pub fn loan_exposure(&self, quarter: u32) -> f64 {
        self.quarter_total(Metric::Performing, quarter)
            + self.quarter_total(Metric::NonPerforming, quarter)
    }
}

/// Vintage cohort engine over a resolved set of assumptions
pub struct CohortEngine<'a> {
    assumptions: &'a Assumptions,
}

impl<'a> CohortEngine<'a> {
    pub fn new(assumptions: &'a Assumptions) -> Self {
        Self { assumptions }
    }

    /// Run every product in parallel; the first failure aborts the run
    pub fn run_all(&self) -> Result<Vec<ProductVintages>> {
        let products: Vec<&ProductParams> = self.assumptions.products().collect();
        info!("Running vintage cohorts for {} products", products.len());

        products
            .par_iter()
            .map(|product| self.run_product(product))
            .collect()
    }

    /// Populate all grids of one product, vintage by vintage, quarter by quarter
    pub fn run_product(&self, product: &ProductParams) -> Result<ProductVintages> {
        let division = self
            .assumptions
            .division(product.division)
            .ok_or_else(|| EngineError::missing("annual_volume", product.division.as_str()))?;
        let bank = &self.assumptions.bank;
        let scope = product.scope();

        let mut grids = GridSet::new();

        for vintage in 1..=HORIZON_QUARTERS {
            let annual_volume = division.annual_volume_at(vintage);

            for quarter in vintage..=HORIZON_QUARTERS {
                let reference_rate = bank.reference_rate_at(quarter);

                for def in METRIC_TABLE {
                    let value = {
                        let ctx = CellContext {
                            product,
                            credit: &bank.credit,
                            annual_volume,
                            reference_rate,
                            vintage,
                            quarter,
                            grids: &grids,
                        };
                        (def.compute)(&ctx)
                    };

                    let origination = grids.grid(Metric::Origination).get(vintage, vintage);
                    check_cell(&scope, def.metric, vintage, quarter, value, origination)?;
                    grids.grid_mut(def.metric).set(vintage, quarter, value);
                }
            }
        }

        debug!(
            "{}: originated {:.4}, closing gross book value {:.4}",
            scope,
            (1..=HORIZON_QUARTERS)
                .map(|q| grids.grid(Metric::Origination).quarter_total(q))
                .sum::<f64>(),
            grids.grid(Metric::GrossBookValue).quarter_total(HORIZON_QUARTERS)
        );

        Ok(ProductVintages {
            division: product.division,
            code: product.code.clone(),
            name: product.name.clone(),
            risk_weight: product.risk_weight,
            grids,
        })
    }
}

fn check_cell(
    scope: &str,
    metric: Metric,
    vintage: u32,
    quarter: u32,
    value: f64,
    origination: f64,
) -> Result<()> {
    let tolerance = STOCK_TOLERANCE * origination.abs().max(1.0);
    let negative = metric.must_be_non_negative() && value < -tolerance;
    if !value.is_finite() || negative {
        return Err(EngineError::IntegrityDefect {
            scope: scope.to_string(),
            metric: metric.as_str(),
            vintage,
            quarter,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{AmortizationType, CollateralChannel, CollateralKind};
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-9;

    /// Default plan with a single real-estate product and flat volume
    fn single_product_plan(product: ProductParams, annual_volume: f64) -> Assumptions {
        let mut assumptions = Assumptions::default_plan().unwrap();
        assumptions.divisions.retain(|d| d.division == Division::RealEstate);
        assumptions.divisions[0].annual_volume = [annual_volume; 5];
        assumptions.divisions[0].products = vec![product];
        assumptions
    }

    fn test_product(amortization: AmortizationType, maturity: u32, danger_rate: f64) -> ProductParams {
        ProductParams {
            division: Division::RealEstate,
            code: "TST".to_string(),
            name: "Test".to_string(),
            mix: 1.0,
            amortization,
            maturity_quarters: maturity,
            pre_amortization_quarters: 0,
            danger_rate,
            lgd: 0.4,
            spread: 0.03,
            upfront_fee: 0.01,
            penalty_rate: 0.03,
            default_timing: 4,
            collateral: vec![
                CollateralChannel {
                    kind: CollateralKind::RealAsset,
                    coverage: 0.7,
                    recovery_rate: 0.6,
                    timing_quarters: 3,
                },
                CollateralChannel {
                    kind: CollateralKind::GuaranteeFund,
                    coverage: 0.2,
                    recovery_rate: 0.8,
                    timing_quarters: 2,
                },
            ],
            risk_weight: 0.75,
        }
    }

    fn run(product: ProductParams, annual_volume: f64) -> ProductVintages {
        let assumptions = single_product_plan(product.clone(), annual_volume);
        CohortEngine::new(&assumptions).run_product(&product).unwrap()
    }

    #[test]
    fn test_riskless_bullet_repays_at_maturity() {
        // Quarterly origination of 100
        let result = run(test_product(AmortizationType::Bullet, 8, 0.0), 400.0);
        let gbv = result.grid(Metric::GrossBookValue);
        let amort = result.grid(Metric::Amortization);

        for q in 1..=7 {
            assert_relative_eq!(gbv.get(1, q), 100.0, epsilon = EPS);
            assert_eq!(amort.get(1, q), 0.0);
        }
        assert_relative_eq!(amort.get(1, 8), 100.0, epsilon = EPS);
        assert_relative_eq!(gbv.get(1, 8), 0.0, epsilon = EPS);
        assert_relative_eq!(gbv.get(1, 9), 0.0, epsilon = EPS);
    }

    #[test]
    fn test_riskless_amortizing_reaches_zero_at_maturity() {
        let result = run(test_product(AmortizationType::Amortizing, 12, 0.0), 400.0);
        let gbv = result.grid(Metric::GrossBookValue);

        assert_relative_eq!(gbv.get(1, 1), 100.0, epsilon = EPS);
        // Equal installments of 100 / 11
        assert_relative_eq!(gbv.get(1, 2), 100.0 - 100.0 / 11.0, epsilon = EPS);
        assert!(gbv.get(1, 11) > 0.0);
        assert_relative_eq!(gbv.get(1, 12), 0.0, epsilon = EPS);
        assert_relative_eq!(gbv.get(1, 13), 0.0, epsilon = EPS);
    }

    #[test]
    fn test_pre_amortization_defers_installments() {
        let mut product = test_product(AmortizationType::Amortizing, 12, 0.0);
        product.pre_amortization_quarters = 4;
        let result = run(product, 400.0);
        let gbv = result.grid(Metric::GrossBookValue);

        for q in 1..=4 {
            assert_relative_eq!(gbv.get(1, q), 100.0, epsilon = EPS);
        }
        // First installment is GBV / (maturity - pre-amortization)
        assert_relative_eq!(gbv.get(1, 5), 100.0 - 100.0 / 8.0, epsilon = EPS);
        assert_relative_eq!(gbv.get(1, 12), 0.0, epsilon = EPS);
    }

    #[test]
    fn test_triangularity() {
        let result = run(test_product(AmortizationType::Amortizing, 12, 0.08), 400.0);
        for grid in result.grids.iter() {
            for v in 2..=HORIZON_QUARTERS {
                for q in 1..v {
                    assert_eq!(grid.get(v, q), 0.0, "{:?} ({}, {})", grid.metric, v, q);
                }
            }
        }
    }

    #[test]
    fn test_roll_forward_identities() {
        let result = run(test_product(AmortizationType::Amortizing, 16, 0.10), 400.0);
        let orig = result.grid(Metric::Origination);
        let amort = result.grid(Metric::Amortization);
        let default = result.grid(Metric::Default);
        let gbv = result.grid(Metric::GrossBookValue);
        let performing = result.grid(Metric::Performing);
        let npl = result.grid(Metric::NonPerforming);
        let write_off = result.grid(Metric::WriteOff);
        let recovery = result.grid(Metric::Recovery);
        let ecl = result.grid(Metric::Ecl);

        for v in 1..=HORIZON_QUARTERS {
            assert_relative_eq!(gbv.get(v, v), orig.get(v, v), epsilon = EPS);
            assert_relative_eq!(npl.get(v, v), default.get(v, v), epsilon = EPS);
            for q in v..=HORIZON_QUARTERS {
                let opening = if q == v { 0.0 } else { gbv.get(v, q - 1) };
                assert_relative_eq!(
                    gbv.get(v, q),
                    opening + orig.get(v, q) - amort.get(v, q) - default.get(v, q),
                    epsilon = EPS
                );
                assert_relative_eq!(
                    performing.get(v, q),
                    gbv.get(v, q) - default.cumulative(v, q),
                    epsilon = EPS
                );
                assert!(performing.get(v, q) >= -EPS);
                assert!(ecl.get(v, q) <= performing.get(v, q) + EPS);

                if q > v {
                    assert_relative_eq!(
                        npl.get(v, q),
                        npl.get(v, q - 1) + default.get(v, q) - write_off.get(v, q) - recovery.get(v, q),
                        epsilon = EPS
                    );
                }
            }
        }
    }

    #[test]
    fn test_origination_from_division_volume_and_mix() {
        let mut product = test_product(AmortizationType::Bullet, 8, 0.05);
        product.mix = 0.2;
        let result = run(product, 200.0);
        let orig = result.grid(Metric::Origination);
        for v in 1..=4 {
            assert_relative_eq!(orig.get(v, v), 10.0, epsilon = EPS);
            assert_eq!(orig.get(v, v + 1), 0.0);
        }
    }

    #[test]
    fn test_no_default_in_origination_quarter_or_after_maturity() {
        let result = run(test_product(AmortizationType::Bullet, 6, 0.10), 400.0);
        let default = result.grid(Metric::Default);
        assert_eq!(default.get(1, 1), 0.0);
        assert!(default.get(1, 2) > 0.0);
        for q in 7..=HORIZON_QUARTERS {
            assert_eq!(default.get(1, q), 0.0);
        }
    }

    #[test]
    fn test_default_uses_opening_performing_stock() {
        let result = run(test_product(AmortizationType::Bullet, 8, 0.10), 400.0);
        let default = result.grid(Metric::Default);
        let performing = result.grid(Metric::Performing);

        let expected = 100.0 * 0.025 * crate::vintage::timing_weight(2, 4);
        assert_relative_eq!(default.get(1, 2), expected, epsilon = EPS);

        // Defaulted principal no longer carries default risk
        let expected = performing.get(1, 4) * 0.025 * crate::vintage::timing_weight(5, 4);
        assert_relative_eq!(default.get(1, 5), expected, epsilon = EPS);
        assert!(performing.get(1, 4) < result.grid(Metric::GrossBookValue).get(1, 4));
    }

    #[test]
    fn test_full_danger_rate_keeps_performing_non_negative() {
        for amortization in [AmortizationType::Bullet, AmortizationType::Amortizing] {
            let product = test_product(amortization, 20, 1.0);
            let assumptions = single_product_plan(product.clone(), 400.0);
            let result = CohortEngine::new(&assumptions).run_product(&product);
            assert!(result.is_ok(), "{:?}: {:?}", amortization, result.err());

            let result = result.unwrap();
            let performing = result.grid(Metric::Performing);
            let ecl = result.grid(Metric::Ecl);
            for v in 1..=HORIZON_QUARTERS {
                for q in v..=HORIZON_QUARTERS {
                    assert!(performing.get(v, q) >= -EPS, "performing ({}, {})", v, q);
                    assert!(ecl.get(v, q) <= performing.get(v, q) + EPS, "ecl ({}, {})", v, q);
                }
            }
        }
    }

    #[test]
    fn test_upfront_fee_and_day_one_provision() {
        let result = run(test_product(AmortizationType::Bullet, 8, 0.10), 400.0);
        assert_relative_eq!(result.grid(Metric::UpfrontFee).get(3, 3), 1.0, epsilon = EPS);
        assert_eq!(result.grid(Metric::UpfrontFee).get(3, 4), 0.0);
        // 100 * 10% * 40%
        assert_relative_eq!(result.grid(Metric::LossProvision).get(3, 3), 4.0, epsilon = EPS);
    }

    #[test]
    fn test_interest_income_on_performing_stock() {
        let result = run(test_product(AmortizationType::Bullet, 8, 0.0), 400.0);
        // Year 1 reference rate 3.25% plus 3% spread
        let expected = 100.0 * (0.0325 + 0.03) / 4.0;
        assert_relative_eq!(result.grid(Metric::InterestIncome).get(1, 1), expected, epsilon = EPS);
    }

    #[test]
    fn test_recovery_lags_default_by_channel_timing() {
        let result = run(test_product(AmortizationType::Bullet, 8, 0.10), 400.0);
        let default = result.grid(Metric::Default);
        let recovery = result.grid(Metric::Recovery);

        // Guarantee channel pays after 2 quarters, real asset after 3
        assert_eq!(recovery.get(1, 2), 0.0);
        assert_eq!(recovery.get(1, 3), 0.0);
        assert_relative_eq!(recovery.get(1, 4), default.get(1, 2) * 0.16, epsilon = EPS);
        assert_relative_eq!(
            recovery.get(1, 5),
            default.get(1, 3) * 0.16 + default.get(1, 2) * 0.42,
            epsilon = EPS
        );
    }

    #[test]
    fn test_write_off_waits_for_workout_period() {
        let result = run(test_product(AmortizationType::Amortizing, 20, 0.10), 400.0);
        let write_off = result.grid(Metric::WriteOff);
        let npl = result.grid(Metric::NonPerforming);

        // First default in quarter 2, workout of 8 quarters
        for q in 1..10 {
            assert_eq!(write_off.get(1, q), 0.0);
        }
        assert_relative_eq!(write_off.get(1, 10), npl.get(1, 9) * 0.5 / 4.0, epsilon = EPS);
    }

    #[test]
    fn test_net_non_performing_equals_discounted_recoveries() {
        let result = run(test_product(AmortizationType::Amortizing, 16, 0.10), 400.0);
        let npl = result.grid(Metric::NonPerforming);
        let nbv = result.grid(Metric::NetNonPerforming);
        let provision = result.grid(Metric::NplProvision);

        let d: f64 = (0.0325 + 0.03) / 4.0;
        let expected = npl.get(1, 3) * (0.42 / (1.0 + d).powi(5) + 0.16 / (1.0 + d).powi(4));
        assert_relative_eq!(nbv.get(1, 3), expected, epsilon = EPS);
        assert_relative_eq!(provision.get(1, 3), npl.get(1, 3) - expected, epsilon = EPS);
    }

    #[test]
    fn test_negative_stock_is_integrity_defect() {
        let result = check_cell("RE/TST", Metric::GrossBookValue, 2, 5, -1.0, 100.0);
        assert!(matches!(result, Err(EngineError::IntegrityDefect { vintage: 2, quarter: 5, .. })));
        assert!(check_cell("RE/TST", Metric::GrossBookValue, 2, 5, -1e-12, 100.0).is_ok());
        assert!(check_cell("RE/TST", Metric::InterestIncome, 2, 5, f64::NAN, 100.0).is_err());
    }

    #[test]
    fn test_run_all_default_plan() {
        let assumptions = Assumptions::default_plan().unwrap();
        let products = CohortEngine::new(&assumptions).run_all().unwrap();
        assert_eq!(products.len(), 14);
        assert_eq!(products[0].scope(), "RE/CBL");
        assert!(products.iter().all(|p| p.quarter_total(Metric::GrossBookValue, 20) >= 0.0));
    }
}
