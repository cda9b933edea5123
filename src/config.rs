use std::collections::HashSet;
use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::indicator::ma::EmaSeed;
use crate::model::Instrument;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Yahoo,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Directory holding `<id>.json` files for the `file` source.
    pub data_dir: String,
    /// Yahoo chart range, e.g. `"6mo"` or `"1y"`.
    pub range: String,
    pub fetch_attempts: u32,
    pub fetch_retry_delay_ms: u64,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Yahoo,
            data_dir: "./data".into(),
            range: "1y".into(),
            fetch_attempts: 3,
            fetch_retry_delay_ms: 1000,
            requests_per_second: 5,
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub trend_fast: usize,
    pub trend_slow: usize,
    pub volume_period: usize,
    pub atr_period: usize,
    pub ema_seed: EmaSeed,
    /// Shortest series accepted for a snapshot.
    pub min_history: usize,
    /// Shortest series for which trend EMAs are trusted.
    pub trend_min_history: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            trend_fast: 50,
            trend_slow: 200,
            volume_period: 20,
            atr_period: 14,
            ema_seed: EmaSeed::FirstValue,
            min_history: 50,
            trend_min_history: 220,
        }
    }
}

/// Optional rule groups. RSI, MACD and Bollinger groups always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Features {
    pub volume: bool,
    pub trend_gate: bool,
    pub atr_risk: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            volume: true,
            trend_gate: false,
            atr_risk: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub rsi_oversold: f64,
    pub rsi_low: f64,
    pub rsi_overbought: f64,
    pub band_touch_ratio: f64,
    pub band_breakout_ratio: f64,
    pub band_near_ratio: f64,
    pub volume_spike_multiplier: f64,
    pub stop_loss_atr: f64,
    pub take_profit_atr: f64,
    pub features: Features,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_low: 40.0,
            rsi_overbought: 70.0,
            band_touch_ratio: 0.05,
            band_breakout_ratio: 1.0,
            band_near_ratio: 0.97,
            volume_spike_multiplier: 1.5,
            stop_loss_atr: 1.5,
            take_profit_atr: 2.0,
            features: Features::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub publish_threshold: i32,
    pub strong_threshold: i32,
    /// How many watch-tier entries the report shows.
    pub watch_preview: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            publish_threshold: 40,
            strong_threshold: 60,
            watch_preview: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_summarizer_command")]
    pub command: String,
    /// Arguments placed before the prompt.
    #[serde(default = "default_summarizer_args")]
    pub args: Vec<String>,
    #[serde(default = "default_true")]
    pub summarize_scan: bool,
}

fn default_summarizer_command() -> String {
    "gemini".into()
}

fn default_summarizer_args() -> Vec<String> {
    vec!["-p".into()]
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_summarizer_command(),
            args: default_summarizer_args(),
            summarize_scan: true,
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

fn invalid(field: String) -> Report<ConfigError> {
    Report::new(ConfigError::Validation { field })
}

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(&config.general)?;
    validate_source(&config.source)?;
    validate_indicators(&config.indicators)?;
    validate_scoring(&config.scoring)?;
    validate_ranking(&config.ranking)?;
    validate_instruments(&config.instruments)?;
    Ok(())
}

fn validate_general(general: &GeneralConfig) -> Result<(), Report<ConfigError>> {
    if !["text", "json"].contains(&general.log_format.as_str()) {
        return Err(invalid(format!(
            "general.log_format \"{}\" is not valid",
            general.log_format
        )));
    }
    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), Report<ConfigError>> {
    if source.fetch_attempts == 0 {
        return Err(invalid("source.fetch_attempts must be > 0".into()));
    }
    if source.requests_per_second == 0 {
        return Err(invalid("source.requests_per_second must be > 0".into()));
    }
    if source.timeout_secs == 0 {
        return Err(invalid("source.timeout_secs must be > 0".into()));
    }
    Ok(())
}

fn validate_indicators(ind: &IndicatorConfig) -> Result<(), Report<ConfigError>> {
    let periods = [
        ("rsi_period", ind.rsi_period),
        ("macd_fast", ind.macd_fast),
        ("macd_slow", ind.macd_slow),
        ("macd_signal", ind.macd_signal),
        ("bollinger_period", ind.bollinger_period),
        ("trend_fast", ind.trend_fast),
        ("trend_slow", ind.trend_slow),
        ("volume_period", ind.volume_period),
        ("atr_period", ind.atr_period),
    ];
    if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
        return Err(invalid(format!("indicators.{name} must be > 0")));
    }
    if ind.macd_fast >= ind.macd_slow {
        return Err(invalid("indicators.macd_fast must be < macd_slow".into()));
    }
    if ind.trend_fast >= ind.trend_slow {
        return Err(invalid("indicators.trend_fast must be < trend_slow".into()));
    }
    if ind.bollinger_std_dev <= 0.0 {
        return Err(invalid("indicators.bollinger_std_dev must be > 0".into()));
    }

    let core_window = (ind.rsi_period + 2)
        .max(ind.bollinger_period)
        .max(ind.volume_period);
    if ind.min_history < core_window {
        return Err(invalid(format!(
            "indicators.min_history {} is shorter than the core window {core_window}",
            ind.min_history
        )));
    }
    if ind.trend_min_history < ind.trend_slow {
        return Err(invalid(format!(
            "indicators.trend_min_history {} is shorter than trend_slow {}",
            ind.trend_min_history, ind.trend_slow
        )));
    }
    Ok(())
}

fn validate_scoring(scoring: &ScoringConfig) -> Result<(), Report<ConfigError>> {
    if !(scoring.rsi_oversold <= scoring.rsi_low && scoring.rsi_low < scoring.rsi_overbought) {
        return Err(invalid(
            "scoring: expected rsi_oversold <= rsi_low < rsi_overbought".into(),
        ));
    }
    if scoring.band_touch_ratio >= scoring.band_breakout_ratio {
        return Err(invalid(
            "scoring.band_touch_ratio must be < band_breakout_ratio".into(),
        ));
    }
    if scoring.volume_spike_multiplier <= 0.0 {
        return Err(invalid(
            "scoring.volume_spike_multiplier must be > 0".into(),
        ));
    }
    if scoring.stop_loss_atr < 0.0 || scoring.take_profit_atr < 0.0 {
        return Err(invalid("scoring: ATR multiples must be >= 0".into()));
    }
    Ok(())
}

fn validate_ranking(ranking: &RankingConfig) -> Result<(), Report<ConfigError>> {
    if ranking.strong_threshold < ranking.publish_threshold {
        return Err(invalid(
            "ranking.strong_threshold must be >= publish_threshold".into(),
        ));
    }
    Ok(())
}

fn validate_instruments(instruments: &[Instrument]) -> Result<(), Report<ConfigError>> {
    let mut seen = HashSet::new();
    for instrument in instruments {
        if instrument.id.trim().is_empty() {
            return Err(invalid("instruments: empty id".into()));
        }
        if !seen.insert(instrument.id.as_str()) {
            return Err(invalid(format!(
                "instruments: duplicate id \"{}\"",
                instrument.id
            )));
        }
    }
    Ok(())
}
