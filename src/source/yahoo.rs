use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Deserialize;
use tracing::info;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::model::{Instrument, PricePoint, PriceSeries};
use crate::source::PriceSource;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";

/// Daily history from the Yahoo Finance chart endpoint.
pub struct YahooSource {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    range: String,
}

impl YahooSource {
    pub fn new(config: &SourceConfig) -> Result<Self, Report<SourceError>> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .change_context(SourceError::Request {
                instrument: "client".into(),
            })?;
        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(5u32));
        Ok(Self {
            client,
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
            range: config.range.clone(),
        })
    }
}

impl PriceSource for YahooSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn fetch_series<'a>(
        &'a self,
        instrument: &'a Instrument,
    ) -> BoxFuture<'a, Result<PriceSeries, Report<SourceError>>> {
        Box::pin(async move {
            self.rate_limiter.until_ready().await;

            let id = instrument.id.as_str();
            let url = format!("{YAHOO_CHART_URL}/{id}");
            let params = [("interval", "1d"), ("range", self.range.as_str())];

            let response = self
                .client
                .get(&url)
                .query(&params)
                .send()
                .await
                .change_context(SourceError::Request {
                    instrument: id.into(),
                })?;

            if !response.status().is_success() {
                return Err(Report::new(SourceError::Request {
                    instrument: id.into(),
                })
                .attach(format!("HTTP status: {}", response.status())));
            }

            let body: ChartResponse =
                response
                    .json()
                    .await
                    .change_context(SourceError::ResponseParse {
                        instrument: id.into(),
                    })?;

            let points = body.into_points(id)?;
            info!(instrument = id, fetched = points.len(), "yahoo history fetch complete");

            PriceSeries::new(points).change_context(SourceError::NoData {
                instrument: id.into(),
            })
        })
    }
}

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<Quote>,
}

/// Column arrays; any entry may be `null` for halted or partial sessions.
#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Rows with a missing or non-positive price are dropped; a missing
    /// volume counts as 0.
    /// A repeated date keeps the later row.
    fn into_points(self, id: &str) -> Result<Vec<PricePoint>, Report<SourceError>> {
        let no_data = || SourceError::NoData {
            instrument: id.into(),
        };

        if let Some(error) = self.chart.error.filter(|e| !e.is_null()) {
            return Err(Report::new(no_data()).attach(format!("yahoo error: {error}")));
        }

        let result = self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| Report::new(no_data()))?;
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .unwrap_or_default();

        let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

        let mut points: Vec<PricePoint> = Vec::with_capacity(result.timestamp.len());
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let (Some(open), Some(high), Some(low), Some(close)) = (
                at(&quote.open, i),
                at(&quote.high, i),
                at(&quote.low, i),
                at(&quote.close, i),
            ) else {
                continue;
            };
            // Halted sessions can report zero prices.
            if [open, high, low, close]
                .iter()
                .any(|v| !v.is_finite() || *v <= 0.0)
            {
                continue;
            }
            let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
                continue;
            };
            let point = PricePoint {
                date,
                open,
                high,
                low,
                close,
                volume: at(&quote.volume, i).unwrap_or(0.0).max(0.0) as u64,
            };
            match points.last_mut() {
                Some(last) if last.date == date => *last = point,
                _ => points.push(point),
            }
        }

        if points.is_empty() {
            return Err(Report::new(no_data()));
        }
        Ok(points)
    }
}
