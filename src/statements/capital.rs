//! Risk-weighted assets and capital adequacy

/// Revenue quarters averaged for the operational-risk charge
pub const OPERATIONAL_RISK_WINDOW: usize = 12;

/// Operational RWA from the average of the trailing (up to 12) quarterly revenues.
///
/// `revenues` runs oldest to newest and includes the current quarter.
pub fn operational_rwa(revenues: &[f64], factor: f64) -> f64 {
    if revenues.is_empty() {
        return 0.0;
    }
    let window = &revenues[revenues.len().saturating_sub(OPERATIONAL_RISK_WINDOW)..];
    let average = window.iter().sum::<f64>() / window.len() as f64;
    average * 4.0 * factor
}

/// Market RWA on the securities portfolio
pub fn market_rwa(securities: f64, risk_weight: f64) -> f64 {
    securities * risk_weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operational_rwa_progressive_average() {
        // One quarter: 10 * 4 * 15%
        assert!((operational_rwa(&[10.0], 0.15) - 6.0).abs() < 1e-10);
        // Two quarters averaged
        assert!((operational_rwa(&[10.0, 20.0], 0.15) - 9.0).abs() < 1e-10);
    }

    #[test]
    fn test_operational_rwa_trailing_window() {
        let mut revenues = vec![100.0; 4];
        revenues.extend(vec![10.0; 12]);
        // Only the last 12 quarters count
        assert!((operational_rwa(&revenues, 0.15) - 6.0).abs() < 1e-10);
        assert_eq!(operational_rwa(&[], 0.15), 0.0);
    }

    #[test]
    fn test_market_rwa() {
        assert!((market_rwa(500.0, 0.10) - 50.0).abs() < 1e-10);
    }
}
