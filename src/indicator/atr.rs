use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::model::PricePoint;

/// Average True Range as a simple rolling mean of true range.
///
/// True range at step i is `max(high - low, |high - prev_close|,
/// |low - prev_close|)`, so the first value needs `period + 1` rows.
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }
}

fn true_ranges(points: &[PricePoint]) -> Vec<f64> {
    points
        .windows(2)
        .map(|w| {
            let prev_close = w[0].close;
            let (high, low) = (w[1].high, w[1].low);
            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn required_points(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if points.len() < self.required_points() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_points(),
                available: points.len(),
            });
        }
        Ok(true_ranges(points)
            .windows(self.period)
            .map(|w| w.iter().sum::<f64>() / self.period as f64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{series_from_closes, series_from_rows};

    #[test]
    fn atr_period_zero_invalid() {
        assert!(Atr::new(0).is_err());
    }

    #[test]
    fn atr_insufficient_data() {
        let atr = Atr::new(14).unwrap();
        assert!(atr.calculate(series_from_closes(&[10.0; 14]).points()).is_err());
        assert!(atr.calculate(series_from_closes(&[10.0; 15]).points()).is_ok());
    }

    #[test]
    fn atr_zero_volatility_is_zero() {
        let atr = Atr::new(14).unwrap();
        let values = atr.calculate(series_from_closes(&[42.0; 30]).points()).unwrap();
        assert!(values.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn atr_uses_gap_from_previous_close() {
        // Gap up: prev close 10, bar 14..12 -> TR = |14 - 10| = 4
        let atr = Atr::new(1).unwrap();
        let series = series_from_rows(&[(10.0, 10.0, 10.0, 1), (14.0, 12.0, 13.0, 1)]);
        let values = atr.calculate(series.points()).unwrap();
        assert_eq!(values, vec![4.0]);
    }

    #[test]
    fn atr_is_simple_mean_of_true_range() {
        let atr = Atr::new(2).unwrap();
        let series = series_from_rows(&[
            (10.0, 10.0, 10.0, 1),
            (11.0, 9.0, 10.0, 1),  // TR 2
            (12.0, 10.0, 11.0, 1), // TR 2
            (11.0, 5.0, 6.0, 1),   // TR 6
        ]);
        let values = atr.calculate(series.points()).unwrap();
        assert_eq!(values.len(), 2);
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!((values[1] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn atr_non_negative() {
        let atr = Atr::new(14).unwrap();
        let rows: Vec<(f64, f64, f64, u64)> = (0..60)
            .map(|i| {
                let c = 100.0 + 10.0 * ((i as f64) * 0.5).sin();
                (c + 1.5, c - 2.0, c, 1)
            })
            .collect();
        for v in atr.calculate(series_from_rows(&rows).points()).unwrap() {
            assert!(v >= 0.0);
        }
    }
}
