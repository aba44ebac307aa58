pub mod broker;
pub mod cache_file;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::analysis::CandleList;
use crate::domain::{Granularity, Instrument};
use crate::errors::{Error, Result};

/// What to fetch: an instrument/granularity plus either an explicit
/// time window or a trailing candle count.
#[derive(Debug, Clone)]
pub struct CandleRequest {
    pub instrument: Instrument,
    pub granularity: Granularity,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub count: Option<usize>,
}

impl CandleRequest {
    pub fn validate(&self) -> Result<()> {
        match (self.count, self.to) {
            (Some(_), Some(_)) => Err(Error::config(
                "Candle request cannot combine a count with an end time".to_string(),
            )),
            (None, None) => Err(Error::config(
                "Candle request needs either a count or an end time".to_string(),
            )),
            (Some(0), _) => Err(Error::config(
                "Candle request count must be positive".to_string(),
            )),
            _ => {
                if let (Some(from), Some(to)) = (self.from, self.to) {
                    if from >= to {
                        return Err(Error::config(format!(
                            "Candle request window is empty: {} >= {}",
                            from, to
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
pub trait FetchCandles {
    // Either produce a candle list OR fail so the next source can try
    async fn fetch_candles(&self, request: &CandleRequest) -> Result<CandleList>;

    /// A unique identifier for this implementation (so that afterwards we know which one we used).
    fn signature(&self) -> &'static str;
}

/// Try each candle source in order, returning the first success along
/// with the signature of the source that produced it.
pub async fn get_candles_with_fallback(
    sources: &[Box<dyn FetchCandles>],
    request: &CandleRequest,
) -> Result<(CandleList, &'static str)> {
    request.validate()?;
    for source in sources {
        match source.fetch_candles(request).await {
            Ok(candles) => {
                let signature = source.signature();
                return Ok((candles, signature));
            }
            Err(e) => {
                log::info!("Candle source '{}' failed: {}", source.signature(), e);
                // Continue to the next source
            }
        }
    }
    Err(Error::data(format!(
        "All candle sources failed for {} {}",
        request.instrument, request.granularity
    )))
}
