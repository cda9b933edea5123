pub mod atr;
pub mod bollinger;
pub mod engine;
pub mod ma;
pub mod macd;
pub mod rsi;
pub mod volume;

use error_stack::Report;

use crate::error::IndicatorError;
use crate::model::PricePoint;

/// A technical analysis indicator that operates on a slice of price points.
///
/// Points must be in ascending chronological order (oldest first).
pub trait Indicator: Send + Sync {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of points required to produce at least one output value.
    fn required_points(&self) -> usize;

    /// Calculate indicator values from price points.
    ///
    /// Returns one value per output point, aligned to the end of the input.
    /// The number of values may be less than the number of input points
    /// depending on the indicator's lookback.
    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>>;
}

/// Extract close prices from a slice of price points.
pub fn close_prices(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.close).collect()
}

/// Extract volumes from a slice of price points.
pub fn volumes(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.volume as f64).collect()
}

/// Keep a value only if it is a real number.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Latest and one-step-prior values of an output series.
pub fn last_two(values: &[f64]) -> (Option<f64>, Option<f64>) {
    let n = values.len();
    let current = values.last().copied().and_then(finite);
    let previous = n.checked_sub(2).and_then(|i| finite(values[i]));
    (current, previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_filters_nan_and_infinity() {
        assert_eq!(finite(1.5), Some(1.5));
        assert_eq!(finite(f64::NAN), None);
        assert_eq!(finite(f64::INFINITY), None);
    }

    #[test]
    fn last_two_handles_short_series() {
        assert_eq!(last_two(&[]), (None, None));
        assert_eq!(last_two(&[3.0]), (Some(3.0), None));
        assert_eq!(last_two(&[1.0, 2.0, 3.0]), (Some(3.0), Some(2.0)));
    }
}
