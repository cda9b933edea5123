use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum SeriesError {
    #[display("price series is empty")]
    Empty,
    #[display("invalid price at row {index}: {reason}")]
    InvalidPrice { index: usize, reason: String },
    #[display("timestamps not strictly increasing at row {index}")]
    Unordered { index: usize },
}

#[derive(Debug, Display, Error)]
pub enum SourceError {
    #[display("request for {instrument} failed")]
    Request { instrument: String },
    #[display("failed to parse response for {instrument}")]
    ResponseParse { instrument: String },
    #[display("no price data for {instrument}")]
    NoData { instrument: String },
    #[display("failed to read price file for {instrument}")]
    ReadFile { instrument: String },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum ScoringError {
    #[display("indicator {field} is undefined")]
    Undefined { field: &'static str },
    #[display("trend filter needs more history")]
    InsufficientTrendHistory,
    #[display("rejected by trend filter")]
    TrendRejected,
}

#[derive(Debug, Display, Error)]
pub enum SummarizerError {
    #[display("failed to spawn summarizer `{command}`")]
    Spawn { command: String },
    #[display("summarizer exited with status {status}")]
    ExitStatus { status: String },
}

#[derive(Debug, Display, Error)]
pub enum AnalyzeError {
    #[display("indicator computation failed")]
    Indicators,
    #[display("instrument not scored")]
    NotScored,
}
