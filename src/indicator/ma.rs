use error_stack::{Report, bail};
use serde::Deserialize;

use crate::error::IndicatorError;
use crate::indicator::{Indicator, close_prices};
use crate::model::PricePoint;

/// Simple Moving Average.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }

    /// Calculate SMA values from a raw value slice.
    pub fn calculate_values(&self, values: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if values.len() < self.period {
            bail!(IndicatorError::InsufficientData {
                required: self.period,
                available: values.len(),
            });
        }
        Ok(values
            .windows(self.period)
            .map(|w| w.iter().sum::<f64>() / self.period as f64)
            .collect())
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_values(&close_prices(points))
    }
}

/// How the first EMA value is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaSeed {
    /// Start from the first raw value; output has one value per input.
    #[default]
    FirstValue,
    /// Start from the SMA of the first `period` values; output starts at
    /// index `period - 1`.
    Sma,
}

/// Exponential Moving Average.
pub struct Ema {
    period: usize,
    seed: EmaSeed,
}

impl Ema {
    pub fn new(period: usize, seed: EmaSeed) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period, seed })
    }

    /// Calculate EMA values from a raw value slice.
    pub fn calculate_values(&self, values: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        let required = self.required_points();
        if values.len() < required {
            bail!(IndicatorError::InsufficientData {
                required,
                available: values.len(),
            });
        }

        let k = 2.0 / (self.period as f64 + 1.0);
        let (mut ema, rest) = match self.seed {
            EmaSeed::FirstValue => (values[0], &values[1..]),
            EmaSeed::Sma => (
                values[..self.period].iter().sum::<f64>() / self.period as f64,
                &values[self.period..],
            ),
        };

        let mut results = Vec::with_capacity(rest.len() + 1);
        results.push(ema);
        for &value in rest {
            ema = value * k + ema * (1.0 - k);
            results.push(ema);
        }

        Ok(results)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn required_points(&self) -> usize {
        match self.seed {
            EmaSeed::FirstValue => 1,
            EmaSeed::Sma => self.period,
        }
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_values(&close_prices(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::series_from_closes;

    #[test]
    fn sma_period_zero_invalid() {
        assert!(Sma::new(0).is_err());
    }

    #[test]
    fn sma_insufficient_data() {
        let sma = Sma::new(5).unwrap();
        let series = series_from_closes(&[1.0; 4]);
        assert!(sma.calculate(series.points()).is_err());
    }

    #[test]
    fn sma_known_value() {
        let sma = Sma::new(3).unwrap();
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let values = sma.calculate(series.points()).unwrap();
        // (1+2+3)/3 = 2.0, (2+3+4)/3 = 3.0
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!((values[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ema_period_zero_invalid() {
        assert!(Ema::new(0, EmaSeed::FirstValue).is_err());
    }

    #[test]
    fn ema_first_value_seed_starts_at_first_price() {
        let ema = Ema::new(3, EmaSeed::FirstValue).unwrap();
        let values = ema.calculate_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(values.len(), 4);
        // k = 0.5: 1.0, 1.5, 2.25, 3.125
        assert!((values[0] - 1.0).abs() < 1e-9);
        assert!((values[1] - 1.5).abs() < 1e-9);
        assert!((values[2] - 2.25).abs() < 1e-9);
        assert!((values[3] - 3.125).abs() < 1e-9);
    }

    #[test]
    fn ema_sma_seed_starts_at_window_mean() {
        let ema = Ema::new(3, EmaSeed::Sma).unwrap();
        let values = ema.calculate_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(values.len(), 2);
        // seed = 2.0, then 4*0.5 + 2*0.5 = 3.0
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!((values[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ema_sma_seed_insufficient_data() {
        let ema = Ema::new(5, EmaSeed::Sma).unwrap();
        assert!(ema.calculate_values(&[1.0; 4]).is_err());
        let ema = Ema::new(5, EmaSeed::FirstValue).unwrap();
        assert!(ema.calculate_values(&[1.0; 4]).is_ok());
    }

    #[test]
    fn seeding_strategies_diverge_then_converge() {
        // Jump from 10 to 20 after the first point: first-value seeding drags
        // the early EMA toward 10, SMA seeding does not.
        let mut prices = vec![10.0];
        prices.extend(std::iter::repeat_n(20.0, 199));

        let first = Ema::new(12, EmaSeed::FirstValue)
            .unwrap()
            .calculate_values(&prices)
            .unwrap();
        let sma = Ema::new(12, EmaSeed::Sma)
            .unwrap()
            .calculate_values(&prices)
            .unwrap();

        // Align on the shared tail.
        let offset = first.len() - sma.len();
        let early_gap = (first[offset] - sma[0]).abs();
        let late_gap = (first.last().unwrap() - sma.last().unwrap()).abs();
        assert!(early_gap > 0.1, "early gap {early_gap}");
        assert!(late_gap < 1e-6, "late gap {late_gap}");
    }

    #[test]
    fn ema_flat_prices() {
        for seed in [EmaSeed::FirstValue, EmaSeed::Sma] {
            let ema = Ema::new(3, seed).unwrap();
            let series = series_from_closes(&[10.0; 6]);
            for v in ema.calculate(series.points()).unwrap() {
                assert!((v - 10.0).abs() < 1e-9);
            }
        }
    }
}
