pub mod terminal;

use crate::model::Instrument;
use crate::scan::ScanOutcome;
use crate::strategy::rank::Ranking;

/// Sink for scan results and summarizer output.
pub trait Notifier: Send + Sync {
    fn notify_scan(&self, instruments: &[Instrument], outcome: &ScanOutcome, ranking: &Ranking);

    fn notify_summary(&self, title: &str, text: &str);
}
