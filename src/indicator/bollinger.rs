use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::Sma;
use crate::indicator::{Indicator, close_prices};
use crate::model::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Position of `price` inside the band (%B). `None` when the band has no
    /// width.
    pub fn percent_b(&self, price: f64) -> Option<f64> {
        let width = self.upper - self.lower;
        if width <= 0.0 {
            return None;
        }
        Some((price - self.lower) / width)
    }
}

pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        if std_dev_multiplier <= 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: "std_dev_multiplier must be > 0".into(),
            });
        }
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }

    /// Band values using the population standard deviation of each window.
    pub fn calculate_bands(&self, prices: &[f64]) -> Result<Vec<Bands>, Report<IndicatorError>> {
        if prices.len() < self.period {
            bail!(IndicatorError::InsufficientData {
                required: self.period,
                available: prices.len(),
            });
        }

        let sma = Sma::new(self.period)?.calculate_values(prices)?;

        let bands = prices
            .windows(self.period)
            .zip(sma.iter())
            .map(|(window, &middle)| {
                let variance =
                    window.iter().map(|&p| (p - middle).powi(2)).sum::<f64>() / self.period as f64;
                let std_dev = variance.sqrt();
                Bands {
                    upper: middle + self.std_dev_multiplier * std_dev,
                    middle,
                    lower: middle - self.std_dev_multiplier * std_dev,
                }
            })
            .collect();

        Ok(bands)
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn required_points(&self) -> usize {
        self.period
    }

    /// Returns middle band (SMA) values only.
    fn calculate(&self, points: &[PricePoint]) -> Result<Vec<f64>, Report<IndicatorError>> {
        Ok(self
            .calculate_bands(&close_prices(points))?
            .into_iter()
            .map(|b| b.middle)
            .collect())
    }
}
