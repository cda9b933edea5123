pub mod file;
pub mod yahoo;

use std::time::Duration;

use error_stack::Report;
use futures::future::BoxFuture;
use tokio::time::sleep;
use tracing::warn;

use crate::error::SourceError;
use crate::model::{Instrument, PriceSeries};

/// Provider of daily price history.
///
/// Uses `BoxFuture` (from `futures` crate) instead of `async fn` in trait
/// to keep the trait object-safe (`dyn PriceSource`).
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch the daily OHLCV history of one instrument, oldest first.
    fn fetch_series<'a>(
        &'a self,
        instrument: &'a Instrument,
    ) -> BoxFuture<'a, Result<PriceSeries, Report<SourceError>>>;
}

/// Fetch with a bounded number of attempts and a fixed delay between them.
/// Returns the last error once all attempts fail.
pub async fn fetch_with_retry(
    source: &dyn PriceSource,
    instrument: &Instrument,
    attempts: u32,
    delay: Duration,
) -> Result<PriceSeries, Report<SourceError>> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.fetch_series(instrument).await {
            Ok(series) => return Ok(series),
            Err(e) if attempt < attempts => {
                warn!(
                    source = source.name(),
                    instrument = %instrument.id,
                    attempt,
                    error = %e,
                    "fetch failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e.attach(format!("gave up after {attempts} attempts"))),
        }
    }
}
