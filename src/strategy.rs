pub mod rank;
pub mod rules;

use error_stack::Report;

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::model::{IndicatorSnapshot, Signal};
use crate::strategy::rules::CoreInputs;

/// Turns an indicator snapshot into a scored [`Signal`].
///
/// Rule groups are additive; within a group only the first matching branch
/// contributes. Reasons are appended in evaluation order.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(
        &self,
        instrument_id: &str,
        snapshot: IndicatorSnapshot,
    ) -> Result<Signal, Report<ScoringError>> {
        let features = self.config.features;

        // The regime filter short-circuits before any rule runs.
        if features.trend_gate {
            rules::trend_gate(&snapshot)?;
        }

        let inputs = CoreInputs::from_snapshot(&snapshot)?;

        let hits = [
            rules::rsi_group(&inputs, &self.config),
            rules::macd_group(&inputs),
            rules::bollinger_group(&inputs, &self.config),
            features
                .volume
                .then(|| rules::volume_group(&snapshot, &self.config))
                .flatten(),
            rules::overbought_group(&inputs, &self.config),
            rules::band_upper_near_group(&inputs, &self.config),
        ];

        let mut score = 0;
        let mut reasons = Vec::new();
        for (points, reason) in hits.into_iter().flatten() {
            score += points;
            reasons.push(reason);
        }

        let (stop_loss, take_profit) = match snapshot.atr14 {
            Some(atr) if features.atr_risk => (
                Some((inputs.price - self.config.stop_loss_atr * atr).max(0.0)),
                Some(inputs.price + self.config.take_profit_atr * atr),
            ),
            _ => (None, None),
        };

        Ok(Signal {
            instrument_id: instrument_id.to_owned(),
            score,
            reasons,
            price: inputs.price,
            stop_loss,
            take_profit,
            snapshot,
        })
    }
}
