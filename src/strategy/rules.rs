//! Rule groups of the scoring table. Each group returns at most one
//! `(points, reason)` pair; branches inside a group are checked in priority
//! order.

use error_stack::{Report, bail};

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::indicator::bollinger::Bands;
use crate::indicator::volume::is_spike;
use crate::model::{IndicatorSnapshot, Reason};

pub const OVERSOLD_POINTS: i32 = 30;
pub const RSI_LOW_POINTS: i32 = 15;
pub const GOLDEN_CROSS_POINTS: i32 = 40;
pub const BULLISH_ALIGNED_POINTS: i32 = 10;
pub const BAND_LOWER_TOUCH_POINTS: i32 = 30;
pub const BAND_UPPER_BREAKOUT_POINTS: i32 = -20;
pub const VOLUME_SPIKE_POINTS: i32 = 15;
pub const OVERBOUGHT_POINTS: i32 = -20;
pub const BAND_UPPER_NEAR_POINTS: i32 = -10;

pub type Hit = Option<(i32, Reason)>;

/// Snapshot fields every score depends on, all defined.
#[derive(Debug, Clone, Copy)]
pub struct CoreInputs {
    pub price: f64,
    pub rsi: f64,
    pub macd: f64,
    pub signal: f64,
    pub macd_prev: f64,
    pub signal_prev: f64,
    pub bands: Bands,
}

fn require(value: Option<f64>, field: &'static str) -> Result<f64, Report<ScoringError>> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => bail!(ScoringError::Undefined { field }),
    }
}

impl CoreInputs {
    pub fn from_snapshot(snapshot: &IndicatorSnapshot) -> Result<Self, Report<ScoringError>> {
        let upper = require(snapshot.band_upper, "band_upper")?;
        let lower = require(snapshot.band_lower, "band_lower")?;
        Ok(Self {
            price: require(Some(snapshot.last_close), "last_close")?,
            rsi: require(snapshot.rsi, "rsi")?,
            macd: require(snapshot.macd, "macd")?,
            signal: require(snapshot.macd_signal, "macd_signal")?,
            macd_prev: require(snapshot.macd_prev, "macd_prev")?,
            signal_prev: require(snapshot.macd_signal_prev, "macd_signal_prev")?,
            bands: Bands {
                upper,
                middle: snapshot.sma20.unwrap_or((upper + lower) / 2.0),
                lower,
            },
        })
    }
}

/// Regime filter: price and the fast EMA must both sit above the slow EMA.
pub fn trend_gate(snapshot: &IndicatorSnapshot) -> Result<(), Report<ScoringError>> {
    let (Some(fast), Some(slow)) = (snapshot.ema50, snapshot.ema200) else {
        bail!(ScoringError::InsufficientTrendHistory);
    };
    if snapshot.last_close > slow && fast > slow {
        Ok(())
    } else {
        Err(Report::new(ScoringError::TrendRejected)
            .attach(format!("price={} ema50={fast} ema200={slow}", snapshot.last_close)))
    }
}

pub fn rsi_group(inputs: &CoreInputs, config: &ScoringConfig) -> Hit {
    if inputs.rsi <= config.rsi_oversold {
        Some((OVERSOLD_POINTS, Reason::Oversold))
    } else if inputs.rsi <= config.rsi_low {
        Some((RSI_LOW_POINTS, Reason::RsiLow))
    } else {
        None
    }
}

pub fn macd_group(inputs: &CoreInputs) -> Hit {
    let crossed_up = inputs.macd_prev < inputs.signal_prev && inputs.macd > inputs.signal;
    if crossed_up {
        Some((GOLDEN_CROSS_POINTS, Reason::GoldenCross))
    } else if inputs.macd > inputs.signal {
        Some((BULLISH_ALIGNED_POINTS, Reason::BullishAligned))
    } else {
        None
    }
}

/// Skipped entirely when the band has no width.
pub fn bollinger_group(inputs: &CoreInputs, config: &ScoringConfig) -> Hit {
    let percent_b = inputs.bands.percent_b(inputs.price)?;
    if percent_b <= config.band_touch_ratio {
        Some((BAND_LOWER_TOUCH_POINTS, Reason::BandLowerTouch))
    } else if percent_b >= config.band_breakout_ratio {
        Some((BAND_UPPER_BREAKOUT_POINTS, Reason::BandUpperBreakout))
    } else {
        None
    }
}

pub fn volume_group(snapshot: &IndicatorSnapshot, config: &ScoringConfig) -> Hit {
    let average = snapshot.volume_ma20?;
    is_spike(
        snapshot.last_volume as f64,
        average,
        config.volume_spike_multiplier,
    )
    .then_some((VOLUME_SPIKE_POINTS, Reason::VolumeSpike))
}

pub fn overbought_group(inputs: &CoreInputs, config: &ScoringConfig) -> Hit {
    (inputs.rsi >= config.rsi_overbought).then_some((OVERBOUGHT_POINTS, Reason::Overbought))
}

pub fn band_upper_near_group(inputs: &CoreInputs, config: &ScoringConfig) -> Hit {
    (inputs.price >= config.band_near_ratio * inputs.bands.upper)
        .then_some((BAND_UPPER_NEAR_POINTS, Reason::BandUpperNear))
}
