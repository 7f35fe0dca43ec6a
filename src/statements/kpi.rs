//! Ratio helpers for performance indicators

/// `numerator / denominator`, or 0 when the denominator is zero
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Average of opening and closing balance; the first quarter uses the closing balance
pub fn average_balance(quarter: u32, opening: f64, closing: f64) -> f64 {
    if quarter <= 1 {
        closing
    } else {
        (opening + closing) / 2.0
    }
}

/// Quarterly flow expressed as an annual rate
pub fn annualized(quarterly: f64) -> f64 {
    quarterly * 4.0
}
