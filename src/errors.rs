//! Crate-wide error taxonomy.
//!
//! Validation failures (`Config`, `Data`) are never retried; `External`
//! carries a `retryable` flag so the fetch layer knows whether backing off
//! and trying again is worthwhile (rate limits, 5xx) or pointless (bad
//! request parameters).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration: bad thresholds, malformed instrument name, etc.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid or insufficient input data (too few candles, mismatched
    /// sequence lengths, zero-height candle).
    #[error("Data error: {0}")]
    Data(String),

    /// Exact-match lookup that found nothing. A miss here is a hard error,
    /// not a silent None (callers pass timestamps they believe exist).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Market-data fetch failure.
    #[error("External service error: {message}")]
    External { message: String, retryable: bool },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn external(msg: impl Into<String>, retryable: bool) -> Self {
        Error::External {
            message: msg.into(),
            retryable,
        }
    }

    /// Only `External` failures are ever worth retrying, and only when the
    /// broker said so (429 / 5xx).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::External { retryable: true, .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level failures (timeouts, connection resets) are worth
        // one more attempt; everything else surfaces as-is.
        let retryable = err.is_timeout() || err.is_connect();
        Error::External {
            message: err.to_string(),
            retryable,
        }
    }
}
