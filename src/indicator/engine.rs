use error_stack::{Report, ResultExt, bail};

use crate::config::IndicatorConfig;
use crate::error::IndicatorError;
use crate::indicator::atr::Atr;
use crate::indicator::bollinger::BollingerBands;
use crate::indicator::ma::Ema;
use crate::indicator::macd::Macd;
use crate::indicator::rsi::Rsi;
use crate::indicator::volume::VolumeMa;
use crate::indicator::{Indicator, close_prices, finite, last_two};
use crate::model::{IndicatorSnapshot, PriceSeries};

/// Derives an [`IndicatorSnapshot`] from a price series.
///
/// The core indicators (RSI, MACD, Bollinger, volume MA) need `min_history`
/// points or the whole snapshot is rejected. Trend EMAs stay undefined below
/// `trend_min_history` points and ATR below `atr_period + 1` points.
pub struct IndicatorEngine {
    rsi: Rsi,
    macd: Macd,
    bollinger: BollingerBands,
    trend_fast: Ema,
    trend_slow: Ema,
    volume: VolumeMa,
    atr: Atr,
    min_history: usize,
    trend_min_history: usize,
}

impl IndicatorEngine {
    pub fn new(config: &IndicatorConfig) -> Result<Self, Report<IndicatorError>> {
        let rsi = Rsi::new(config.rsi_period)?;
        let macd = Macd::new(
            config.macd_fast,
            config.macd_slow,
            config.macd_signal,
            config.ema_seed,
        )?;
        let bollinger = BollingerBands::new(config.bollinger_period, config.bollinger_std_dev)?;
        let trend_fast = Ema::new(config.trend_fast, config.ema_seed)?;
        let trend_slow = Ema::new(config.trend_slow, config.ema_seed)?;
        let volume = VolumeMa::new(config.volume_period)?;
        let atr = Atr::new(config.atr_period)?;

        // Previous-step values need one extra point on top of each lookback.
        let core_required = [
            rsi.required_points() + 1,
            macd.required_points() + 1,
            bollinger.required_points(),
            volume.required_points(),
        ]
        .into_iter()
        .max()
        .unwrap_or(1);

        let trend_required = trend_fast
            .required_points()
            .max(trend_slow.required_points());

        Ok(Self {
            rsi,
            macd,
            bollinger,
            trend_fast,
            trend_slow,
            volume,
            atr,
            min_history: config.min_history.max(core_required),
            trend_min_history: config.trend_min_history.max(trend_required),
        })
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    pub fn trend_min_history(&self) -> usize {
        self.trend_min_history
    }

    pub fn snapshot(
        &self,
        series: &PriceSeries,
    ) -> Result<IndicatorSnapshot, Report<IndicatorError>> {
        if series.len() < self.min_history {
            bail!(IndicatorError::InsufficientData {
                required: self.min_history,
                available: series.len(),
            });
        }

        let points = series.points();
        let closes = close_prices(points);
        let last = series.last();

        let (rsi, rsi_prev) = last_two(
            &self
                .rsi
                .calculate_prices(&closes)
                .attach_with(|| failed(&self.rsi))?,
        );

        let macd = self
            .macd
            .calculate_prices(&closes)
            .attach_with(|| failed(&self.macd))?;
        let macd_line: Vec<f64> = macd.iter().map(|p| p.macd).collect();
        let signal_line: Vec<f64> = macd.iter().map(|p| p.signal).collect();
        let (macd_now, macd_prev) = last_two(&macd_line);
        let (signal_now, signal_prev) = last_two(&signal_line);

        let bands = self
            .bollinger
            .calculate_bands(&closes)
            .attach_with(|| failed(&self.bollinger))?
            .last()
            .copied();

        let volume_ma = self
            .volume
            .calculate(points)
            .attach_with(|| failed(&self.volume))?
            .last()
            .copied()
            .and_then(finite);

        let (ema_fast, ema_slow) = if series.len() >= self.trend_min_history {
            let fast = self
                .trend_fast
                .calculate_values(&closes)
                .attach_with(|| failed(&self.trend_fast))?;
            let slow = self
                .trend_slow
                .calculate_values(&closes)
                .attach_with(|| failed(&self.trend_slow))?;
            (last_two(&fast).0, last_two(&slow).0)
        } else {
            (None, None)
        };

        let atr = if series.len() >= self.atr.required_points() {
            let values = self
                .atr
                .calculate(points)
                .attach_with(|| failed(&self.atr))?;
            last_two(&values).0
        } else {
            None
        };

        Ok(IndicatorSnapshot {
            rsi,
            rsi_prev,
            macd: macd_now,
            macd_signal: signal_now,
            macd_prev,
            macd_signal_prev: signal_prev,
            sma20: bands.and_then(|b| finite(b.middle)),
            band_upper: bands.and_then(|b| finite(b.upper)),
            band_lower: bands.and_then(|b| finite(b.lower)),
            ema50: ema_fast,
            ema200: ema_slow,
            volume_ma20: volume_ma,
            atr14: atr,
            last_close: last.close,
            last_volume: last.volume,
        })
    }
}

fn failed(indicator: &dyn Indicator) -> String {
    format!("indicator: {}", indicator.name())
}
