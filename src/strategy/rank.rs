use serde::Serialize;

use crate::config::RankingConfig;
use crate::model::Signal;

/// Published signals split by strength, each tier sorted by score
/// descending. Ties keep scan order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ranking {
    pub strong: Vec<Signal>,
    pub watch: Vec<Signal>,
}

impl Ranking {
    pub fn is_empty(&self) -> bool {
        self.strong.is_empty() && self.watch.is_empty()
    }

    /// All published signals as one list, best first.
    pub fn flat(&self) -> Vec<&Signal> {
        // Every strong score is >= every watch score, so concatenation is
        // already ordered.
        self.strong.iter().chain(self.watch.iter()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    publish_threshold: i32,
    strong_threshold: i32,
}

impl Ranker {
    pub fn new(publish_threshold: i32, strong_threshold: i32) -> Self {
        Self {
            publish_threshold,
            strong_threshold,
        }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(config.publish_threshold, config.strong_threshold)
    }

    /// Signals at or above the publication threshold, best first.
    pub fn publish(&self, signals: Vec<Signal>) -> Vec<Signal> {
        let mut published: Vec<Signal> = signals
            .into_iter()
            .filter(|s| s.score >= self.publish_threshold)
            .collect();
        // `sort_by` is stable.
        published.sort_by(|a, b| b.score.cmp(&a.score));
        published
    }

    pub fn rank(&self, signals: Vec<Signal>) -> Ranking {
        let (strong, watch) = self
            .publish(signals)
            .into_iter()
            .partition(|s| s.score >= self.strong_threshold);
        Ranking { strong, watch }
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}
