use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, close_prices};
use crate::model::PricePoint;

/// RSI (Relative Strength Index) using Wilder's smoothing method.
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// RSI values from a close-price slice; the first value covers the first
    /// `period` changes.
    pub fn calculate_prices(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if prices.len() < self.required_points() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_points(),
                available: prices.len(),
            });
        }

        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        // Seed using simple average of first `period` gains/losses
        let mut avg_gain: f64 = deltas[..self.period]
            .iter()
            .map(|&d| d.max(0.0))
            .sum::<f64>()
            / self.period as f64;
        let mut avg_loss: f64 = deltas[..self.period]
            .iter()
            .map(|&d| (-d).max(0.0))
            .sum::<f64>()
            / self.period as f64;

        let mut results = Vec::with_capacity(deltas.len() - self.period + 1);
        results.push(rsi_value(avg_gain, avg_loss));

        let weight = (self.period - 1) as f64;
        for &delta in &deltas[self.period..] {
            avg_gain = (avg_gain * weight + delta.max(0.0)) / self.period as f64;
            avg_loss = (avg_loss * weight + (-delta).max(0.0)) / self.period as f64;
            results.push(rsi_value(avg_gain, avg_loss));
        }

        Ok(results)
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn required_points(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_prices(&close_prices(points))
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::series_from_closes;

    #[test]
    fn rsi_insufficient_data() {
        let rsi = Rsi::new(14).unwrap();
        let series = series_from_closes(&[1.0; 14]);
        assert!(rsi.calculate(series.points()).is_err());
    }

    #[test]
    fn rsi_needs_one_more_than_period() {
        let rsi = Rsi::new(14).unwrap();
        let series = series_from_closes(&[1.0; 15]);
        assert_eq!(rsi.calculate(series.points()).unwrap().len(), 1);
    }

    #[test]
    fn rsi_period_zero_invalid() {
        assert!(Rsi::new(0).is_err());
    }

    #[test]
    fn rsi_rising_series_returns_exactly_100() {
        let rsi = Rsi::new(14).unwrap();
        let closes: Vec<f64> = (1..=60).map(|i| i as f64).collect();
        let values = rsi.calculate_prices(&closes).unwrap();
        assert!(values.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn rsi_flat_series_returns_exactly_100() {
        let rsi = Rsi::new(14).unwrap();
        let values = rsi.calculate_prices(&[50.0; 30]).unwrap();
        assert!(values.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = Rsi::new(3).unwrap();
        let values = rsi.calculate_prices(&[4.0, 3.0, 2.0, 1.0]).unwrap();
        assert!((values[0] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_known_value() {
        // deltas +1, -1, +2 -> avg_gain = 1, avg_loss = 1/3 -> rs = 3 -> 75
        let rsi = Rsi::new(3).unwrap();
        let values = rsi.calculate_prices(&[10.0, 11.0, 10.0, 12.0]).unwrap();
        assert!((values[0] - 75.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_wilder_step() {
        // seed as above, next delta -3:
        // avg_gain = (1*2 + 0)/3 = 2/3, avg_loss = (1/3*2 + 3)/3 = 11/9
        // rs = 6/11 -> 100 - 100/(17/11) = 600/17
        let rsi = Rsi::new(3).unwrap();
        let values = rsi
            .calculate_prices(&[10.0, 11.0, 10.0, 12.0, 9.0])
            .unwrap();
        assert_eq!(values.len(), 2);
        assert!((values[1] - 600.0 / 17.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_stays_within_bounds() {
        let rsi = Rsi::new(14).unwrap();
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + 15.0 * ((i as f64) * 0.37).sin() + (i % 7) as f64)
            .collect();
        for v in rsi.calculate_prices(&closes).unwrap() {
            assert!((0.0..=100.0).contains(&v), "rsi out of range: {v}");
        }
    }

    #[test]
    fn rsi_output_length() {
        let rsi = Rsi::new(14).unwrap();
        let values = rsi.calculate_prices(&[100.0_f64; 20]).unwrap();
        // 20 prices -> 19 deltas -> 1 seed + 5 subsequent = 6 values
        assert_eq!(values.len(), 20 - 14);
    }
}
