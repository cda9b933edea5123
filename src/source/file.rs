use std::path::PathBuf;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use tracing::debug;

use crate::error::SourceError;
use crate::model::{Instrument, PricePoint, PriceSeries};
use crate::source::PriceSource;

/// Reads `<data_dir>/<id>.json`, a JSON array of
/// `{ "date", "open", "high", "low", "close", "volume" }` rows.
pub struct FileSource {
    data_dir: PathBuf,
}

impl FileSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path_for(&self, instrument: &Instrument) -> PathBuf {
        self.data_dir.join(format!("{}.json", instrument.id))
    }
}

impl PriceSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn fetch_series<'a>(
        &'a self,
        instrument: &'a Instrument,
    ) -> BoxFuture<'a, Result<PriceSeries, Report<SourceError>>> {
        Box::pin(async move {
            let path = self.path_for(instrument);
            let content = tokio::fs::read_to_string(&path)
                .await
                .change_context(SourceError::ReadFile {
                    instrument: instrument.id.clone(),
                })
                .attach_with(|| format!("path: {}", path.display()))?;

            let points: Vec<PricePoint> =
                serde_json::from_str(&content).change_context(SourceError::ResponseParse {
                    instrument: instrument.id.clone(),
                })?;

            debug!(instrument = %instrument.id, rows = points.len(), "price file loaded");

            PriceSeries::new(points).change_context(SourceError::NoData {
                instrument: instrument.id.clone(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::model::Market;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("stock-radar-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn instrument(id: &str) -> Instrument {
        Instrument {
            id: id.into(),
            market: Market::Kr,
            name: None,
        }
    }

    #[tokio::test]
    async fn reads_series_from_json() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("005930.KS.json"),
            r#"[
                {"date": "2024-01-02", "open": 78000, "high": 79000, "low": 77500, "close": 78500, "volume": 1200000},
                {"date": "2024-01-03", "open": 78500, "high": 78800, "low": 76900, "close": 77000, "volume": 1500000}
            ]"#,
        )
        .unwrap();

        let source = FileSource::new(&dir);
        let series = source.fetch_series(&instrument("005930.KS")).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().close, 77000.0);
        assert_eq!(series.last().volume, 1_500_000);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let source = FileSource::new(temp_dir());
        let err = source.fetch_series(&instrument("NOPE")).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            SourceError::ReadFile { .. }
        ));
    }

    #[tokio::test]
    async fn unordered_rows_rejected() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("AAPL.json"),
            r#"[
                {"date": "2024-01-03", "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1},
                {"date": "2024-01-02", "open": 1, "high": 1, "low": 1, "close": 1, "volume": 1}
            ]"#,
        )
        .unwrap();
        let source = FileSource::new(&dir);
        let err = source.fetch_series(&instrument("AAPL")).await.unwrap_err();
        assert!(matches!(err.current_context(), SourceError::NoData { .. }));

        std::fs::remove_dir_all(dir).unwrap();
    }
}
