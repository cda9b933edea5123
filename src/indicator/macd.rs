use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::{Ema, EmaSeed};
use crate::indicator::{Indicator, close_prices};
use crate::model::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
}

pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    seed: EmaSeed,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
        seed: EmaSeed,
    ) -> Result<Self, Report<IndicatorError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        if fast_period >= slow_period {
            bail!(IndicatorError::InvalidParameter {
                name: "fast_period must be < slow_period".into(),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            signal_period,
            seed,
        })
    }

    /// MACD and signal line values, aligned to the end of `prices`.
    pub fn calculate_prices(
        &self,
        prices: &[f64],
    ) -> Result<Vec<MacdPoint>, Report<IndicatorError>> {
        if prices.len() < self.required_points() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_points(),
                available: prices.len(),
            });
        }

        let fast_ema = Ema::new(self.fast_period, self.seed)?.calculate_values(prices)?;
        let slow_ema = Ema::new(self.slow_period, self.seed)?.calculate_values(prices)?;

        // Both series end on the last price; the slow one may start later.
        let offset = fast_ema.len() - slow_ema.len();
        let macd_line: Vec<f64> = fast_ema[offset..]
            .iter()
            .zip(slow_ema.iter())
            .map(|(f, s)| f - s)
            .collect();

        let signal_line = Ema::new(self.signal_period, self.seed)?.calculate_values(&macd_line)?;
        let signal_offset = macd_line.len() - signal_line.len();

        Ok(macd_line[signal_offset..]
            .iter()
            .zip(signal_line.iter())
            .map(|(&macd, &signal)| MacdPoint { macd, signal })
            .collect())
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_points(&self) -> usize {
        match self.seed {
            EmaSeed::FirstValue => 1,
            EmaSeed::Sma => self.slow_period + self.signal_period - 1,
        }
    }

    /// Returns MACD line values only.
    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>> {
        Ok(self
            .calculate_prices(&close_prices(points))?
            .into_iter()
            .map(|p| p.macd)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::series_from_closes;

    #[test]
    fn macd_invalid_fast_ge_slow() {
        assert!(Macd::new(26, 12, 9, EmaSeed::FirstValue).is_err());
    }

    #[test]
    fn macd_period_zero_invalid() {
        assert!(Macd::new(0, 26, 9, EmaSeed::FirstValue).is_err());
    }

    #[test]
    fn macd_sma_seed_insufficient_data() {
        let macd = Macd::new(12, 26, 9, EmaSeed::Sma).unwrap();
        assert!(macd.calculate(series_from_closes(&[1.0; 30]).points()).is_err());
    }

    #[test]
    fn macd_first_value_seed_covers_every_point() {
        let macd = Macd::new(12, 26, 9, EmaSeed::FirstValue).unwrap();
        let closes: Vec<f64> = (1..=40).map(|i| i as f64).collect();
        let values = macd.calculate_prices(&closes).unwrap();
        assert_eq!(values.len(), 40);
        // Both EMAs start at the first price.
        assert_eq!(values[0].macd, 0.0);
        assert_eq!(values[0].signal, 0.0);
    }

    #[test]
    fn macd_sma_seed_output_length() {
        let macd = Macd::new(3, 5, 3, EmaSeed::Sma).unwrap();
        let closes: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        // macd line: 12 - 5 + 1 = 8 values, signal: 8 - 3 + 1 = 6
        assert_eq!(macd.calculate_prices(&closes).unwrap().len(), 6);
    }

    #[test]
    fn macd_flat_prices_returns_zero() {
        for seed in [EmaSeed::FirstValue, EmaSeed::Sma] {
            let macd = Macd::new(3, 5, 3, seed).unwrap();
            let values = macd.calculate(series_from_closes(&[10.0; 10]).points()).unwrap();
            for v in &values {
                assert!(v.abs() < 1e-9, "expected 0 for flat prices, got {v}");
            }
        }
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let macd = Macd::new(12, 26, 9, EmaSeed::FirstValue).unwrap();
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let last = *macd.calculate_prices(&closes).unwrap().last().unwrap();
        assert!(last.macd > 0.0);
        assert!(last.macd > last.signal);
    }
}
