//! Guarded arithmetic for rollups
//!
//! Financial percentages are rounded to 2 decimals and averaged risk scores
//! to 3; downstream consumers format on that assumption.

/// Decimal places for every percentage (ROI, high-risk share, savings share)
pub const PERCENT_PLACES: u32 = 2;

/// Decimal places for averaged risk scores
pub const RISK_SCORE_PLACES: u32 = 3;

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// `100 * numerator / denominator`, or `None` when the denominator is zero
/// or the result is not finite
pub fn percent_of(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let percent = 100.0 * numerator / denominator;
    percent.is_finite().then_some(percent)
}

/// Rounded percentage with the zero-denominator case collapsed to 0
pub fn percent_or_zero(numerator: f64, denominator: f64) -> f64 {
    percent_of(numerator, denominator)
        .map(|p| round_to(p, PERCENT_PLACES))
        .unwrap_or(0.0)
}
