//! CSV-based assumption loader
//!
//! Reads the plan tables from `data/assumptions/` and resolves them into typed
//! parameters. Blank cells deserialize as absent values; resolution reports the
//! first absent or out-of-range value together with the product, division or
//! bank scope that needs it.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use super::bank::{BankParams, CapitalParams, CreditPolicy, FundingWeights, LiquidityPolicy, YearSchedule};
use super::product::{AmortizationType, CollateralChannel, CollateralKind, ProductParams};
use super::{Assumptions, Division, DivisionParams};
use crate::calendar::PLAN_YEARS;
use crate::error::{EngineError, Result};

/// Default path to assumptions directory
pub const DEFAULT_ASSUMPTIONS_PATH: &str = "data/assumptions";

pub const PRODUCTS_FILE: &str = "products.csv";
pub const VOLUMES_FILE: &str = "division_volumes.csv";
pub const SCHEDULES_FILE: &str = "bank_schedules.csv";
pub const PARAMETERS_FILE: &str = "bank_parameters.csv";

const MIX_TOLERANCE: f64 = 1e-9;

/// Raw row of `products.csv`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRow {
    pub division: String,
    pub code: String,
    pub name: Option<String>,
    pub mix: Option<f64>,
    pub amortization: Option<String>,
    pub maturity_quarters: Option<u32>,
    pub pre_amortization_quarters: Option<u32>,
    pub danger_rate: Option<f64>,
    pub lgd: Option<f64>,
    pub spread: Option<f64>,
    pub upfront_fee: Option<f64>,
    pub penalty_rate: Option<f64>,
    pub default_timing: Option<u32>,
    pub real_asset_coverage: Option<f64>,
    pub real_asset_recovery: Option<f64>,
    pub real_asset_timing: Option<u32>,
    pub guarantee_coverage: Option<f64>,
    pub guarantee_recovery: Option<f64>,
    pub guarantee_timing: Option<u32>,
    pub risk_weight: Option<f64>,
    pub rw_guaranteed: Option<f64>,
    pub rw_unguaranteed: Option<f64>,
}

/// Raw row of a five-year table (`division_volumes.csv`, `bank_schedules.csv`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleRow {
    #[serde(alias = "division")]
    pub key: String,
    pub y1: Option<f64>,
    pub y2: Option<f64>,
    pub y3: Option<f64>,
    pub y4: Option<f64>,
    pub y5: Option<f64>,
}

impl ScheduleRow {
    fn resolve(&self, scope: &str) -> Result<YearSchedule> {
        let values = [self.y1, self.y2, self.y3, self.y4, self.y5];
        let mut schedule = [0.0; PLAN_YEARS];
        for (idx, value) in values.iter().enumerate() {
            schedule[idx] =
                value.ok_or_else(|| EngineError::missing(format!("{}.y{}", self.key, idx + 1), scope))?;
        }
        Ok(schedule)
    }
}

/// Raw row of `bank_parameters.csv`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScalarRow {
    pub key: String,
    pub value: Option<f64>,
}

/// Unresolved assumption tables as read from disk
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub products: Vec<ProductRow>,
    pub volumes: Vec<ScheduleRow>,
    pub schedules: Vec<ScheduleRow>,
    pub parameters: Vec<ScalarRow>,
}

fn read_table<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

fn read_file<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    let file = std::fs::File::open(dir.join(name))?;
    read_table(file)
}

impl RawTables {
    /// Load all tables from the default path
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_ASSUMPTIONS_PATH))
    }

    /// Load all tables from a specific directory
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading assumption tables from {}", path.display());
        Ok(Self {
            products: read_file(path, PRODUCTS_FILE)?,
            volumes: read_file(path, VOLUMES_FILE)?,
            schedules: read_file(path, SCHEDULES_FILE)?,
            parameters: read_file(path, PARAMETERS_FILE)?,
        })
    }

    /// Built-in reference plan shipped with the crate
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            products: read_table(include_str!("../../data/assumptions/products.csv").as_bytes())?,
            volumes: read_table(include_str!("../../data/assumptions/division_volumes.csv").as_bytes())?,
            schedules: read_table(include_str!("../../data/assumptions/bank_schedules.csv").as_bytes())?,
            parameters: read_table(include_str!("../../data/assumptions/bank_parameters.csv").as_bytes())?,
        })
    }

    /// Resolve raw tables into typed assumptions
    pub fn resolve(&self) -> Result<Assumptions> {
        let bank = resolve_bank(&self.schedules, &self.parameters)?;

        let mut volumes: HashMap<Division, YearSchedule> = HashMap::new();
        for row in &self.volumes {
            let division: Division = row.key.parse()?;
            let schedule = row.resolve(division.as_str())?;
            if volumes.insert(division, schedule).is_some() {
                return Err(EngineError::Configuration(format!(
                    "Duplicate volume row for division {}",
                    division
                )));
            }
        }

        let mut products_by_division: HashMap<Division, Vec<ProductParams>> = HashMap::new();
        let mut seen = HashSet::new();
        for row in &self.products {
            let product = resolve_product(row)?;
            if !seen.insert((product.division, product.code.clone())) {
                return Err(EngineError::Configuration(format!(
                    "Duplicate product {}",
                    product.scope()
                )));
            }
            products_by_division.entry(product.division).or_default().push(product);
        }

        let mut divisions = Vec::new();
        for division in Division::ALL {
            let Some(products) = products_by_division.remove(&division) else {
                continue;
            };
            let annual_volume = *volumes
                .get(&division)
                .ok_or_else(|| EngineError::missing("annual_volume", division.as_str()))?;
            for (idx, volume) in annual_volume.iter().enumerate() {
                if *volume < 0.0 {
                    return Err(EngineError::out_of_range(
                        format!("annual_volume.y{}", idx + 1),
                        division.as_str(),
                        *volume,
                        ">= 0",
                    ));
                }
            }

            let mix_total: f64 = products.iter().map(|p| p.mix).sum();
            if mix_total > 1.0 + MIX_TOLERANCE {
                return Err(EngineError::out_of_range("mix", division.as_str(), mix_total, "sum <= 1"));
            }
            if mix_total < 1.0 - MIX_TOLERANCE {
                warn!(
                    "Product mix for division {} sums to {:.4}; remaining volume is not originated",
                    division, mix_total
                );
            }

            divisions.push(DivisionParams {
                division,
                annual_volume,
                products,
            });
        }

        Ok(Assumptions { bank, divisions })
    }
}

fn require<T>(value: Option<T>, parameter: &str, scope: &str) -> Result<T> {
    value.ok_or_else(|| EngineError::missing(parameter, scope))
}

fn unit_interval(value: f64, parameter: &str, scope: &str) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(EngineError::out_of_range(parameter, scope, value, "within [0, 1]"))
    }
}

fn non_negative(value: f64, parameter: &str, scope: &str) -> Result<f64> {
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::out_of_range(parameter, scope, value, ">= 0"))
    }
}

fn resolve_channel(
    kind: CollateralKind,
    coverage: Option<f64>,
    recovery: Option<f64>,
    timing: Option<u32>,
    scope: &str,
) -> Result<Option<CollateralChannel>> {
    if coverage.is_none() && recovery.is_none() && timing.is_none() {
        return Ok(None);
    }
    let prefix = kind.as_str();
    let coverage_key = format!("{}_coverage", prefix);
    let recovery_key = format!("{}_recovery", prefix);
    let timing_key = format!("{}_timing", prefix);

    let coverage = unit_interval(require(coverage, &coverage_key, scope)?, &coverage_key, scope)?;
    let recovery_rate = unit_interval(require(recovery, &recovery_key, scope)?, &recovery_key, scope)?;
    let timing_quarters = require(timing, &timing_key, scope)?;

    Ok(Some(CollateralChannel {
        kind,
        coverage,
        recovery_rate,
        timing_quarters,
    }))
}

fn resolve_product(row: &ProductRow) -> Result<ProductParams> {
    let division: Division = row.division.parse()?;
    let code = row.code.trim().to_string();
    if code.is_empty() {
        return Err(EngineError::Configuration(format!(
            "Product without code in division {}",
            division
        )));
    }
    let scope = format!("{}/{}", division.as_str(), code);
    let scope = scope.as_str();

    let mix = unit_interval(require(row.mix, "mix", scope)?, "mix", scope)?;
    let amortization: AmortizationType = require(row.amortization.as_deref(), "amortization", scope)?.parse()?;

    let maturity_quarters = require(row.maturity_quarters, "maturity_quarters", scope)?;
    if maturity_quarters < 1 {
        return Err(EngineError::out_of_range(
            "maturity_quarters",
            scope,
            maturity_quarters as f64,
            ">= 1",
        ));
    }
    let pre_amortization_quarters = row.pre_amortization_quarters.unwrap_or(0);
    if pre_amortization_quarters >= maturity_quarters {
        return Err(EngineError::out_of_range(
            "pre_amortization_quarters",
            scope,
            pre_amortization_quarters as f64,
            "< maturity_quarters",
        ));
    }

    let danger_rate = unit_interval(require(row.danger_rate, "danger_rate", scope)?, "danger_rate", scope)?;
    let spread = require(row.spread, "spread", scope)?;
    let upfront_fee = unit_interval(require(row.upfront_fee, "upfront_fee", scope)?, "upfront_fee", scope)?;
    let penalty_rate = non_negative(require(row.penalty_rate, "penalty_rate", scope)?, "penalty_rate", scope)?;
    let default_timing = require(row.default_timing, "default_timing", scope)?;
    if default_timing < 1 {
        return Err(EngineError::out_of_range("default_timing", scope, 0.0, ">= 1"));
    }

    let collateral: Vec<CollateralChannel> = [
        resolve_channel(
            CollateralKind::RealAsset,
            row.real_asset_coverage,
            row.real_asset_recovery,
            row.real_asset_timing,
            scope,
        )?,
        resolve_channel(
            CollateralKind::GuaranteeFund,
            row.guarantee_coverage,
            row.guarantee_recovery,
            row.guarantee_timing,
            scope,
        )?,
    ]
    .into_iter()
    .flatten()
    .collect();

    let lgd = match row.lgd {
        Some(lgd) => unit_interval(lgd, "lgd", scope)?,
        None if collateral.is_empty() => return Err(EngineError::missing("lgd", scope)),
        None => ProductParams::collateral_lgd(&collateral),
    };

    let risk_weight = match (row.risk_weight, row.rw_guaranteed, row.rw_unguaranteed) {
        (Some(rw), _, _) => non_negative(rw, "risk_weight", scope)?,
        (None, Some(rw_g), Some(rw_u)) => {
            let guaranteed = collateral
                .iter()
                .find(|c| c.kind == CollateralKind::GuaranteeFund)
                .map(|c| c.coverage)
                .unwrap_or(0.0);
            let rw_g = non_negative(rw_g, "rw_guaranteed", scope)?;
            let rw_u = non_negative(rw_u, "rw_unguaranteed", scope)?;
            ProductParams::blended_risk_weight(guaranteed, rw_g, rw_u)
        }
        _ => return Err(EngineError::missing("risk_weight", scope)),
    };

    Ok(ProductParams {
        division,
        name: row.name.clone().unwrap_or_else(|| code.clone()),
        code,
        mix,
        amortization,
        maturity_quarters,
        pre_amortization_quarters,
        danger_rate,
        lgd,
        spread,
        upfront_fee,
        penalty_rate,
        default_timing,
        collateral,
        risk_weight,
    })
}

/// Keyed lookup over `bank_parameters.csv`
struct ScalarTable {
    values: HashMap<String, f64>,
}

impl ScalarTable {
    fn new(rows: &[ScalarRow]) -> Result<Self> {
        let mut values = HashMap::new();
        for row in rows {
            let Some(value) = row.value else { continue };
            if values.insert(row.key.clone(), value).is_some() {
                return Err(EngineError::Configuration(format!(
                    "Duplicate bank parameter {}",
                    row.key
                )));
            }
        }
        Ok(Self { values })
    }

    fn get(&self, key: &str) -> Result<f64> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| EngineError::missing(key, "bank"))
    }

    fn rate(&self, key: &str) -> Result<f64> {
        unit_interval(self.get(key)?, key, "bank")
    }

    fn amount(&self, key: &str) -> Result<f64> {
        non_negative(self.get(key)?, key, "bank")
    }
}

fn resolve_bank(schedule_rows: &[ScheduleRow], parameter_rows: &[ScalarRow]) -> Result<BankParams> {
    let mut schedules: HashMap<&str, YearSchedule> = HashMap::new();
    for row in schedule_rows {
        if schedules.insert(row.key.as_str(), row.resolve("bank")?).is_some() {
            return Err(EngineError::Configuration(format!(
                "Duplicate bank schedule {}",
                row.key
            )));
        }
    }
    let schedule = |key: &str| -> Result<YearSchedule> {
        schedules
            .get(key)
            .copied()
            .ok_or_else(|| EngineError::missing(key, "bank"))
    };

    let scalars = ScalarTable::new(parameter_rows)?;

    let dividend_payout = schedule("dividend_payout")?;
    for (idx, payout) in dividend_payout.iter().enumerate() {
        unit_interval(*payout, &format!("dividend_payout.y{}", idx + 1), "bank")?;
    }

    let workout = scalars.amount("workout_quarters")?;
    let funding_weights = FundingWeights {
        ecb: scalars.rate("funding_weight_ecb")?,
        debt_securities: scalars.rate("funding_weight_debt")?,
        interbank: scalars.rate("funding_weight_interbank")?,
    };
    if (funding_weights.total() - 1.0).abs() > MIX_TOLERANCE {
        return Err(EngineError::out_of_range(
            "funding_weights",
            "bank",
            funding_weights.total(),
            "weights sum to 1",
        ));
    }

    Ok(BankParams {
        reference_rate: schedule("reference_rate")?,
        fte: schedule("fte")?,
        avg_salary: schedule("avg_salary")?,
        other_costs: schedule("other_costs")?,
        dividend_payout,
        capex: schedule("capex")?,
        deposit_rate: scalars.get("deposit_rate")?,
        funding_rate: scalars.get("funding_rate")?,
        tax_rate: scalars.rate("tax_rate")?,
        deposit_growth: scalars.get("deposit_growth")?,
        depreciation_rate: scalars.rate("depreciation_rate")?,
        fitd_rate: scalars.rate("fitd_rate")?,
        initial_deposits: scalars.amount("initial_deposits")?,
        initial_funding: scalars.amount("initial_funding")?,
        initial_securities: scalars.amount("initial_securities")?,
        initial_fixed_assets: scalars.amount("initial_fixed_assets")?,
        share_capital: scalars.amount("share_capital")?,
        initial_retained_earnings: scalars.get("initial_retained_earnings")?,
        initial_fte: scalars.amount("initial_fte")?,
        credit: CreditPolicy {
            workout_quarters: workout.round() as u32,
            write_off_rate: scalars.rate("write_off_rate")?,
        },
        liquidity: LiquidityPolicy {
            buffer_ratio: scalars.rate("liquidity_buffer_ratio")?,
            minimum_cash: scalars.amount("minimum_cash")?,
            reserve_ratio: scalars.rate("reserve_requirement_ratio")?,
            govies_allocation: scalars.rate("govies_allocation")?,
            govies_yield: scalars.get("govies_yield")?,
            corporate_yield: scalars.get("corporate_yield")?,
        },
        funding_weights,
        capital: CapitalParams {
            market_risk_weight: scalars.amount("market_risk_weight")?,
            operational_risk_factor: scalars.amount("operational_risk_factor")?,
            pillar1_requirement: scalars.rate("pillar1_requirement")?,
            pillar2_requirement: scalars.rate("pillar2_requirement")?,
            conservation_buffer: scalars.rate("conservation_buffer")?,
            countercyclical_buffer: scalars.rate("countercyclical_buffer")?,
        },
    })
}
