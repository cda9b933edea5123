use crate::model::{Bias, Instrument, Market, Reason, Signal};
use crate::notifier::Notifier;
use crate::scan::ScanOutcome;
use crate::strategy::rank::Ranking;

/// Logs ranked signals through `tracing`.
pub struct TerminalNotifier {
    watch_preview: usize,
}

impl TerminalNotifier {
    pub fn new(watch_preview: usize) -> Self {
        Self { watch_preview }
    }
}

impl Default for TerminalNotifier {
    fn default() -> Self {
        Self::new(5)
    }
}

/// KRW quotes have no minor unit.
pub fn format_price(price: f64, market: Market) -> String {
    match market {
        Market::Kr => format!("{price:.0} {}", market.currency()),
        Market::Us => format!("{price:.2} {}", market.currency()),
    }
}

fn lookup<'a>(instruments: &'a [Instrument], id: &str) -> Option<&'a Instrument> {
    instruments.iter().find(|i| i.id == id)
}

fn describe(instruments: &[Instrument], signal: &Signal) -> (String, String) {
    let fallback;
    let instrument = match lookup(instruments, &signal.instrument_id) {
        Some(i) => i,
        None => {
            fallback = Instrument::from_id(&signal.instrument_id);
            &fallback
        }
    };
    let risk = match (signal.stop_loss, signal.take_profit) {
        (Some(stop), Some(target)) => format!(
            "stop {} / target {}",
            format_price(stop, instrument.market),
            format_price(target, instrument.market)
        ),
        _ => "no risk levels".to_owned(),
    };
    (
        format!(
            "{} ({}) @ {}",
            instrument.label(),
            instrument.id,
            format_price(signal.price, instrument.market)
        ),
        risk,
    )
}

/// Scored signals leaning bearish or flagged overbought, most bearish first.
pub fn sell_side(signals: &[Signal]) -> Vec<&Signal> {
    let mut sells: Vec<&Signal> = signals
        .iter()
        .filter(|s| s.bias() == Bias::Sell || s.reasons.contains(&Reason::Overbought))
        .collect();
    sells.sort_by_key(|s| s.score);
    sells
}

impl Notifier for TerminalNotifier {
    fn notify_scan(&self, instruments: &[Instrument], outcome: &ScanOutcome, ranking: &Ranking) {
        if outcome.is_empty_of_data() {
            tracing::warn!(
                scan_id = %outcome.scan_id,
                requested = outcome.requested,
                "no data: nothing in the watchlist could be analysed"
            );
            return;
        }

        let sells = sell_side(&outcome.signals);
        if ranking.is_empty() && sells.is_empty() {
            tracing::info!(
                scan_id = %outcome.scan_id,
                analysed = outcome.analysed,
                "no signals found"
            );
            return;
        }

        for signal in &ranking.strong {
            let (headline, risk) = describe(instruments, signal);
            tracing::warn!(
                tier = "strong",
                score = signal.score,
                bias = ?signal.bias(),
                reasons = %signal.reason_list(),
                risk = %risk,
                "STRONG: {headline}"
            );
        }

        for signal in ranking.watch.iter().take(self.watch_preview) {
            let (headline, risk) = describe(instruments, signal);
            tracing::info!(
                tier = "watch",
                score = signal.score,
                bias = ?signal.bias(),
                reasons = %signal.reason_list(),
                risk = %risk,
                "WATCH: {headline}"
            );
        }

        let hidden = ranking.watch.len().saturating_sub(self.watch_preview);
        if hidden > 0 {
            tracing::info!(hidden, "more watch-tier signals not shown");
        }

        for signal in sells {
            let (headline, _) = describe(instruments, signal);
            tracing::warn!(
                tier = "sell",
                score = signal.score,
                bias = ?signal.bias(),
                reasons = %signal.reason_list(),
                "SELL: {headline}"
            );
        }
    }

    fn notify_summary(&self, title: &str, text: &str) {
        tracing::info!(title, "summary:\n{}", text.trim_end());
    }
}
