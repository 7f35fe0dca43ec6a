//! Default timing profile

/// Quarters either side of the target where the weight stays at 1
const PLATEAU_HALF_WIDTH: i64 = 2;

/// Gaussian decay coefficient outside the plateau
const DECAY: f64 = 0.1;

/// Relative default intensity for the `k`-th quarter of a vintage's life (1-indexed).
///
/// Flat at 1 within two quarters of `target`, then `exp(-0.1 (k - target)^2)`.
/// The profile is not normalized, so its sum over the horizon is not 1.
pub fn timing_weight(k: u32, target: u32) -> f64 {
    let distance = k as i64 - target as i64;
    if distance.abs() <= PLATEAU_HALF_WIDTH {
        1.0
    } else {
        (-DECAY * (distance * distance) as f64).exp()
    }
}
