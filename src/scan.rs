use std::sync::Arc;
use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AnalyzeError;
use crate::indicator::engine::IndicatorEngine;
use crate::model::{IndicatorSnapshot, Instrument, PriceSeries, Signal};
use crate::source::{PriceSource, fetch_with_retry};
use crate::strategy::ScoringEngine;

/// Per-instrument pipeline: snapshot, then score.
pub fn analyze(
    instrument_id: &str,
    series: &PriceSeries,
    indicators: &IndicatorEngine,
    scorer: &ScoringEngine,
) -> Result<Signal, Report<AnalyzeError>> {
    let snapshot = indicators
        .snapshot(series)
        .change_context(AnalyzeError::Indicators)?;
    scorer
        .score(instrument_id, snapshot)
        .change_context(AnalyzeError::NotScored)
}

/// What happened to one instrument during a scan.
#[derive(Debug)]
enum Disposition {
    NoData,
    Excluded { analysed: bool },
    Scored(Box<Signal>),
}

/// Result of one scan over a watchlist. Every scored signal is kept, in
/// watchlist order.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub scan_id: Uuid,
    pub requested: usize,
    pub fetched: usize,
    pub analysed: usize,
    pub signals: Vec<Signal>,
}

impl ScanOutcome {
    /// No instrument produced a usable snapshot.
    pub fn is_empty_of_data(&self) -> bool {
        self.analysed == 0
    }
}

pub struct Scanner {
    source: Arc<dyn PriceSource>,
    indicators: Arc<IndicatorEngine>,
    scorer: Arc<ScoringEngine>,
    fetch_attempts: u32,
    retry_delay: Duration,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn PriceSource>,
        indicators: IndicatorEngine,
        scorer: ScoringEngine,
    ) -> Self {
        Self {
            source,
            indicators: Arc::new(indicators),
            scorer: Arc::new(scorer),
            fetch_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.fetch_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    /// Analyse every instrument on its own task. One failing instrument never
    /// aborts the scan.
    pub async fn scan(&self, instruments: &[Instrument]) -> ScanOutcome {
        let scan_id = Uuid::new_v4();
        info!(%scan_id, instruments = instruments.len(), "scan started");

        let handles: Vec<_> = instruments
            .iter()
            .cloned()
            .map(|instrument| {
                let source = Arc::clone(&self.source);
                let indicators = Arc::clone(&self.indicators);
                let scorer = Arc::clone(&self.scorer);
                let (attempts, delay) = (self.fetch_attempts, self.retry_delay);
                tokio::spawn(async move {
                    process_instrument(
                        source.as_ref(),
                        &instrument,
                        &indicators,
                        &scorer,
                        attempts,
                        delay,
                    )
                    .await
                })
            })
            .collect();

        let mut outcome = ScanOutcome {
            scan_id,
            requested: instruments.len(),
            ..ScanOutcome::default()
        };

        // Awaiting in spawn order keeps signals in watchlist order.
        for (handle, instrument) in handles.into_iter().zip(instruments) {
            let disposition = match handle.await {
                Ok(d) => d,
                Err(e) => {
                    warn!(instrument = %instrument.id, error = %e, "analysis task failed");
                    Disposition::NoData
                }
            };
            match disposition {
                Disposition::NoData => {}
                Disposition::Excluded { analysed } => {
                    outcome.fetched += 1;
                    outcome.analysed += usize::from(analysed);
                }
                Disposition::Scored(signal) => {
                    outcome.fetched += 1;
                    outcome.analysed += 1;
                    outcome.signals.push(*signal);
                }
            }
        }

        info!(
            %scan_id,
            requested = outcome.requested,
            fetched = outcome.fetched,
            analysed = outcome.analysed,
            scored = outcome.signals.len(),
            "scan complete"
        );
        outcome
    }

    /// Indicator snapshots without scoring or trend gating, in input order.
    /// Instruments without usable history are left out.
    pub async fn snapshots(
        &self,
        instruments: &[Instrument],
    ) -> Vec<(Instrument, IndicatorSnapshot)> {
        let tasks = instruments.iter().map(|instrument| async move {
            let series = match fetch_with_retry(
                self.source.as_ref(),
                instrument,
                self.fetch_attempts,
                self.retry_delay,
            )
            .await
            {
                Ok(series) => series,
                Err(e) => {
                    warn!(instrument = %instrument.id, error = ?e, "no price data");
                    return None;
                }
            };
            match self.indicators.snapshot(&series) {
                Ok(snapshot) => Some((instrument.clone(), snapshot)),
                Err(e) => {
                    warn!(instrument = %instrument.id, error = ?e, "indicators unavailable");
                    None
                }
            }
        });
        join_all(tasks).await.into_iter().flatten().collect()
    }
}

async fn process_instrument(
    source: &dyn PriceSource,
    instrument: &Instrument,
    indicators: &IndicatorEngine,
    scorer: &ScoringEngine,
    attempts: u32,
    delay: Duration,
) -> Disposition {
    let series = match fetch_with_retry(source, instrument, attempts, delay).await {
        Ok(series) => series,
        Err(e) => {
            warn!(instrument = %instrument.id, error = ?e, "no price data");
            return Disposition::NoData;
        }
    };

    match analyze(&instrument.id, &series, indicators, scorer) {
        Ok(signal) => {
            debug!(
                instrument = %instrument.id,
                score = signal.score,
                reasons = %signal.reason_list(),
                "instrument scored"
            );
            Disposition::Scored(Box::new(signal))
        }
        Err(e) => {
            let analysed = matches!(e.current_context(), AnalyzeError::NotScored);
            debug!(instrument = %instrument.id, error = ?e, "instrument excluded");
            Disposition::Excluded { analysed }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use futures::future::BoxFuture;

    use super::*;
    use crate::config::{Features, IndicatorConfig, ScoringConfig};
    use crate::error::SourceError;
    use crate::model::Reason;
    use crate::model::fixtures::series_from_closes;

    /// In-memory source; unknown ids fail.
    struct StubSource {
        series: HashMap<String, PriceSeries>,
    }

    impl PriceSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn fetch_series<'a>(
            &'a self,
            instrument: &'a Instrument,
        ) -> BoxFuture<'a, Result<PriceSeries, Report<SourceError>>> {
            Box::pin(async move {
                self.series.get(&instrument.id).cloned().ok_or_else(|| {
                    Report::new(SourceError::NoData {
                        instrument: instrument.id.clone(),
                    })
                })
            })
        }
    }

    fn oversold_closes() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..45).map(|i| 200.0 - 2.0 * i as f64).collect();
        closes.extend(std::iter::repeat_n(112.0, 15));
        closes
    }

    fn scanner(series: Vec<(&str, Vec<f64>)>, features: Features) -> Scanner {
        let source = StubSource {
            series: series
                .into_iter()
                .map(|(id, closes)| (id.to_owned(), series_from_closes(&closes)))
                .collect(),
        };
        let scorer = ScoringEngine::new(ScoringConfig {
            features,
            ..ScoringConfig::default()
        });
        Scanner::new(
            Arc::new(source),
            IndicatorEngine::new(&IndicatorConfig::default()).unwrap(),
            scorer,
        )
        .with_retry(1, Duration::ZERO)
    }

    fn indicators() -> IndicatorEngine {
        IndicatorEngine::new(&IndicatorConfig::default()).unwrap()
    }

    #[test]
    fn falling_then_flat_series_is_oversold() {
        let series = series_from_closes(&oversold_closes());
        let signal = analyze(
            "X",
            &series,
            &indicators(),
            &ScoringEngine::new(ScoringConfig::default()),
        )
        .unwrap();
        assert!(signal.snapshot.rsi.unwrap() <= 30.0);
        assert_eq!(signal.reasons.first(), Some(&Reason::Oversold));
        assert!(signal.score >= 30);
    }

    #[test]
    fn short_series_with_trend_gate_yields_no_signal() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();
        let gated = ScoringEngine::new(ScoringConfig {
            features: Features {
                trend_gate: true,
                ..Features::default()
            },
            ..ScoringConfig::default()
        });
        let result = analyze("X", &series_from_closes(&closes), &indicators(), &gated);
        assert!(result.is_err());
    }

    #[test]
    fn medium_series_with_trend_gate_is_not_scored() {
        let gated = ScoringEngine::new(ScoringConfig {
            features: Features {
                trend_gate: true,
                ..Features::default()
            },
            ..ScoringConfig::default()
        });
        let err = analyze(
            "X",
            &series_from_closes(&oversold_closes()),
            &indicators(),
            &gated,
        )
        .unwrap_err();
        assert!(matches!(err.current_context(), AnalyzeError::NotScored));
    }

    #[tokio::test]
    async fn scan_keeps_watchlist_order_and_skips_bad_instruments() {
        let scanner = scanner(
            vec![
                ("A", oversold_closes()),
                ("SHORT", vec![100.0; 10]),
                ("B", oversold_closes()),
            ],
            Features::default(),
        );
        let instruments: Vec<Instrument> = ["A", "MISSING", "SHORT", "B"]
            .into_iter()
            .map(Instrument::from_id)
            .collect();

        let outcome = scanner.scan(&instruments).await;
        assert_eq!(outcome.requested, 4);
        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.analysed, 2);
        let ids: Vec<&str> = outcome
            .signals
            .iter()
            .map(|s| s.instrument_id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(!outcome.is_empty_of_data());
    }

    #[tokio::test]
    async fn snapshots_ignore_trend_gate() {
        let scanner = scanner(
            vec![("A", oversold_closes()), ("B", oversold_closes())],
            Features {
                trend_gate: true,
                ..Features::default()
            },
        );
        let instruments: Vec<Instrument> = ["A", "MISSING", "B"]
            .into_iter()
            .map(Instrument::from_id)
            .collect();

        // 60 rows cannot satisfy the trend gate.
        assert!(scanner.scan(&instruments).await.signals.is_empty());

        let snapshots = scanner.snapshots(&instruments).await;
        let ids: Vec<&str> = snapshots.iter().map(|(i, _)| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert!(snapshots[0].1.rsi.is_some());
    }

    #[tokio::test]
    async fn scan_without_any_data_reports_empty() {
        let scanner = scanner(vec![], Features::default());
        let outcome = scanner
            .scan(&[Instrument::from_id("AAPL"), Instrument::from_id("MSFT")])
            .await;
        assert!(outcome.signals.is_empty());
        assert!(outcome.is_empty_of_data());
    }
}
