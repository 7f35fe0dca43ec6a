//! Quarter calendar for the five-year plan horizon

/// Number of quarters in the plan horizon
pub const HORIZON_QUARTERS: u32 = 20;

/// Number of plan years
pub const PLAN_YEARS: usize = 5;

/// Plan year (1-5) containing quarter `q` (1-indexed)
pub fn year_of(quarter: u32) -> u32 {
    (quarter + 3) / 4
}

/// Quarter within its plan year (1-4)
pub fn quarter_in_year(quarter: u32) -> u32 {
    (quarter - 1) % 4 + 1
}

/// Zero-based index into a per-year schedule
pub fn year_index(quarter: u32) -> usize {
    (year_of(quarter) as usize).saturating_sub(1).min(PLAN_YEARS - 1)
}

/// Iterator over all plan quarters
pub fn quarters() -> impl Iterator<Item = u32> {
    1..=HORIZON_QUARTERS
}

/// Annual schedule value in force during `quarter`
pub fn schedule_value(schedule: &[f64; PLAN_YEARS], quarter: u32) -> f64 {
    schedule[year_index(quarter)]
}
