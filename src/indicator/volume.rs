use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, volumes};
use crate::model::PricePoint;

/// Volume moving average: simple average of trading volume over a period.
pub struct VolumeMa {
    period: usize,
}

impl VolumeMa {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }
}

/// `true` when `volume` reaches `multiplier` times the average. An average of
/// zero never counts as a spike.
pub fn is_spike(volume: f64, average: f64, multiplier: f64) -> bool {
    average > 0.0 && volume >= average * multiplier
}

impl Indicator for VolumeMa {
    fn name(&self) -> &str {
        "volume_ma"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>> {
        let vols = volumes(points);
        if vols.len() < self.period {
            bail!(IndicatorError::InsufficientData {
                required: self.period,
                available: vols.len(),
            });
        }
        Ok(vols
            .windows(self.period)
            .map(|w| w.iter().sum::<f64>() / self.period as f64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::series_from_rows;

    fn rows_with_volumes(vols: &[u64]) -> Vec<(f64, f64, f64, u64)> {
        vols.iter().map(|&v| (100.0, 100.0, 100.0, v)).collect()
    }

    #[test]
    fn volume_ma_period_zero_invalid() {
        assert!(VolumeMa::new(0).is_err());
    }

    #[test]
    fn volume_ma_insufficient_data() {
        let vma = VolumeMa::new(5).unwrap();
        let series = series_from_rows(&rows_with_volumes(&[1; 4]));
        assert!(vma.calculate(series.points()).is_err());
    }

    #[test]
    fn volume_ma_known_value() {
        let vma = VolumeMa::new(3).unwrap();
        let series = series_from_rows(&rows_with_volumes(&[1, 2, 3, 4]));
        let values = vma.calculate(series.points()).unwrap();
        // (1+2+3)/3 = 2.0, (2+3+4)/3 = 3.0
        assert!((values[0] - 2.0).abs() < 1e-9);
        assert!((values[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn spike_threshold_is_inclusive() {
        assert!(is_spike(150.0, 100.0, 1.5));
        assert!(!is_spike(149.0, 100.0, 1.5));
    }

    #[test]
    fn zero_average_is_not_a_spike() {
        assert!(!is_spike(0.0, 0.0, 1.5));
    }
}
