use std::fmt;

use chrono::NaiveDate;
use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// Listing market of an instrument. Determines the quote currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    Kr,
    Us,
}

impl Market {
    pub fn currency(self) -> &'static str {
        match self {
            Self::Kr => "KRW",
            Self::Us => "USD",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kr => write!(f, "KR"),
            Self::Us => write!(f, "US"),
        }
    }
}

/// A watchlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub market: Market,
    #[serde(default)]
    pub name: Option<String>,
}

impl Instrument {
    /// Instrument for a bare ticker; `.KS`/`.KQ` suffixes are Korean listings.
    pub fn from_id(id: &str) -> Self {
        let market = if id.ends_with(".KS") || id.ends_with(".KQ") {
            Market::Kr
        } else {
            Market::Us
        };
        Self {
            id: id.to_owned(),
            market,
            name: None,
        }
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One daily OHLCV row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Validated OHLCV history for a single instrument, oldest first.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series, rejecting non-positive prices and unordered or
    /// duplicated dates.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, Report<SeriesError>> {
        if points.is_empty() {
            bail!(SeriesError::Empty);
        }

        for (index, p) in points.iter().enumerate() {
            for (label, value) in [
                ("open", p.open),
                ("high", p.high),
                ("low", p.low),
                ("close", p.close),
            ] {
                if !value.is_finite() || value <= 0.0 {
                    bail!(SeriesError::InvalidPrice {
                        index,
                        reason: format!("{label} = {value}"),
                    });
                }
            }
            if p.low > p.high {
                bail!(SeriesError::InvalidPrice {
                    index,
                    reason: format!("low {} above high {}", p.low, p.high),
                });
            }
        }

        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].date <= w[0].date)
        {
            bail!(SeriesError::Unordered { index: index + 1 });
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn last(&self) -> &PricePoint {
        // Non-empty by construction.
        &self.points[self.points.len() - 1]
    }
}

/// Latest indicator values for one series. `None` means the value could not
/// be derived (short history or a degenerate computation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub rsi: Option<f64>,
    pub rsi_prev: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_prev: Option<f64>,
    pub macd_signal_prev: Option<f64>,
    pub sma20: Option<f64>,
    pub band_upper: Option<f64>,
    pub band_lower: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub volume_ma20: Option<f64>,
    pub atr14: Option<f64>,
    pub last_close: f64,
    pub last_volume: u64,
}

/// Rationale tag attached to a signal by a scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    Oversold,
    RsiLow,
    GoldenCross,
    BullishAligned,
    BandLowerTouch,
    BandUpperBreakout,
    VolumeSpike,
    Overbought,
    BandUpperNear,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oversold => "oversold",
            Self::RsiLow => "rsi-low",
            Self::GoldenCross => "golden-cross",
            Self::BullishAligned => "bullish-aligned",
            Self::BandLowerTouch => "band-lower-touch",
            Self::BandUpperBreakout => "band-upper-breakout",
            Self::VolumeSpike => "volume-spike",
            Self::Overbought => "overbought",
            Self::BandUpperNear => "band-upper-near",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Buy,
    Sell,
    Neutral,
}

/// Scored, explainable outcome for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument_id: String,
    pub score: i32,
    pub reasons: Vec<Reason>,
    pub price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub snapshot: IndicatorSnapshot,
}

impl Signal {
    pub fn bias(&self) -> Bias {
        match self.score {
            s if s > 0 => Bias::Buy,
            s if s < 0 => Bias::Sell,
            _ => Bias::Neutral,
        }
    }

    pub fn reason_list(&self) -> String {
        self.reasons
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    fn day(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64)
    }

    /// Series where every OHLC field equals the close.
    pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint {
                date: day(i),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1_000,
            })
            .collect();
        PriceSeries::new(points).unwrap()
    }

    pub fn series_from_rows(rows: &[(f64, f64, f64, u64)]) -> PriceSeries {
        let points = rows
            .iter()
            .enumerate()
            .map(|(i, &(high, low, close, volume))| PricePoint {
                date: day(i),
                open: close,
                high,
                low,
                close,
                volume,
            })
            .collect();
        PriceSeries::new(points).unwrap()
    }
}
