use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use tokio::process::Command;
use tracing::debug;

use crate::config::SummarizerConfig;
use crate::error::SummarizerError;
use crate::model::{IndicatorSnapshot, Signal};

/// External natural-language summarizer: text prompt in, free-form text out.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, prompt: String) -> BoxFuture<'_, Result<String, Report<SummarizerError>>>;
}

/// Runs `<command> <args...> <prompt>` and returns its stdout.
pub struct CommandSummarizer {
    command: String,
    args: Vec<String>,
}

impl CommandSummarizer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, prompt: String) -> BoxFuture<'_, Result<String, Report<SummarizerError>>> {
        Box::pin(async move {
            debug!(command = %self.command, prompt_len = prompt.len(), "running summarizer");

            let output = Command::new(&self.command)
                .args(&self.args)
                .arg(&prompt)
                .output()
                .await
                .change_context(SummarizerError::Spawn {
                    command: self.command.clone(),
                })?;

            if !output.status.success() {
                return Err(Report::new(SummarizerError::ExitStatus {
                    status: output.status.to_string(),
                })
                .attach(String::from_utf8_lossy(&output.stderr).trim().to_owned()));
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })
    }
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_owned(), |v| format!("{v:.2}"))
}

fn indicator_block(id: &str, s: &IndicatorSnapshot) -> String {
    format!(
        "- Ticker: {id}\n  \
Price: {price:.2}\n  \
RSI (14): {rsi}\n  \
MACD Line: {macd}, Signal Line: {signal} (Prev MACD: {macd_prev}, Prev Signal: {signal_prev})\n  \
Bollinger Bands: Lower {lower}, Mid {mid}, Upper {upper}\n",
        price = s.last_close,
        rsi = fmt_value(s.rsi),
        macd = fmt_value(s.macd),
        signal = fmt_value(s.macd_signal),
        macd_prev = fmt_value(s.macd_prev),
        signal_prev = fmt_value(s.macd_signal_prev),
        lower = fmt_value(s.band_lower),
        mid = fmt_value(s.sma20),
        upper = fmt_value(s.band_upper),
    )
}

/// Plain-text technical digest of scored signals, one block each.
pub fn digest(signals: &[&Signal]) -> String {
    let mut out = String::new();
    for signal in signals {
        out.push_str(&indicator_block(&signal.instrument_id, &signal.snapshot));
        out.push_str(&format!(
            "  Score: {} [{}]\n\n",
            signal.score,
            signal.reason_list()
        ));
    }
    out
}

/// Digest of raw indicator snapshots, independent of scoring.
pub fn snapshot_digest(entries: &[(&str, &IndicatorSnapshot)]) -> String {
    let mut out = String::new();
    for (id, snapshot) in entries {
        out.push_str(&indicator_block(id, snapshot));
        out.push('\n');
    }
    out
}

/// Prompt asking for a single best pick among the digested instruments.
pub fn compare_prompt(digest: &str) -> String {
    format!(
        "You chair an investment committee with two advisers: a short-term \
technical strategist focused on entry timing, and a patient long-term investor \
who buys dips. Using only the technical data below, summarise each adviser's \
view in one or two lines, then choose exactly ONE instrument as the top pick.\n\n\
[Technical data]\n{digest}\n\
[Guidelines]\n\
1. Compare RSI (oversold/overbought), MACD (trend change, golden cross) and \
where price sits inside the Bollinger Bands.\n\
2. Explain why the top pick has the best short-term upside or the lowest \
downside risk.\n\
3. Explain why each other instrument ranked lower.\n\
4. Finish with an entry strategy and the indicator levels that would \
invalidate it.\n"
    )
}

/// Prompt summarising a ranked scan.
pub fn scan_prompt(digest: &str) -> String {
    format!(
        "Below are the highest-scoring instruments from today's technical scan. \
For each one, explain in two sentences what the indicators suggest and the \
main risk. Be concise and factual.\n\n{digest}"
    )
}
