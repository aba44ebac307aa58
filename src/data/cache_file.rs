//! Binary candle cache: avoids hammering the broker when a recent
//! fetch for the same instrument/granularity is already on disk.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analysis::CandleList;
use crate::config::BROKER;
use crate::data::{CandleRequest, FetchCandles};
use crate::domain::{Granularity, Instrument};
use crate::errors::{Error, Result};
use crate::utils::time_utils::{how_many_seconds_ago, utc_now_as_timestamp_ms};

/// Bump when the serialised layout of CandleList changes.
pub const CANDLE_CACHE_VERSION: f64 = 1.0;

/// Serialized cache wrapper. Uses bincode for ~10-20x faster
/// serialization vs JSON.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheFile {
    pub version: f64,
    pub timestamp_ms: i64,
    pub instrument: Instrument,
    pub granularity: Granularity,
    pub data: CandleList,
}

impl CacheFile {
    pub fn new(data: CandleList) -> Self {
        Self {
            version: CANDLE_CACHE_VERSION,
            timestamp_ms: utc_now_as_timestamp_ms(),
            instrument: data.instrument().clone(),
            granularity: data.granularity(),
            data,
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::data(format!("Failed to open cache file {:?}: {}", path, e)))?;
        let mut reader = BufReader::new(file);
        bincode::deserialize_from(&mut reader)
            .map_err(|e| Error::data(format!("Failed to deserialize cache {:?}: {}", path, e)))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::data(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        let file = File::create(path)
            .map_err(|e| Error::data(format!("Failed to create file {:?}: {}", path, e)))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)
            .map_err(|e| Error::data(format!("Failed to serialize cache to {:?}: {}", path, e)))
    }

    pub fn cache_path(cache_dir: &Path, instrument: &Instrument, granularity: Granularity) -> PathBuf {
        cache_dir.join(format!("candles_{}_{}.bin", instrument, granularity))
    }

    /// Reject stale or mismatched cache contents.
    pub fn check_validity(&self, request: &CandleRequest, max_age_secs: i64) -> Result<()> {
        if self.version != CANDLE_CACHE_VERSION {
            return Err(Error::data(format!(
                "Cache version mismatch: file v{} vs required v{}",
                self.version, CANDLE_CACHE_VERSION
            )));
        }
        if self.instrument != request.instrument || self.granularity != request.granularity {
            return Err(Error::data(format!(
                "Cache holds {} {}, request wants {} {}",
                self.instrument, self.granularity, request.instrument, request.granularity
            )));
        }
        let seconds_ago = how_many_seconds_ago(self.timestamp_ms);
        if seconds_ago > max_age_secs {
            return Err(Error::data(format!(
                "Cache too old: created {} seconds ago (limit: {} seconds)",
                seconds_ago, max_age_secs
            )));
        }
        // Deserialization bypasses CandleList::new, so a corrupt file
        // could otherwise smuggle malformed candles into the detector
        self.data.validate()?;
        Ok(())
    }
}

/// Candle source backed by the local binary cache.
pub struct CacheSource {
    pub cache_dir: PathBuf,
    pub max_age_secs: i64,
}

impl CacheSource {
    pub fn new(cache_dir: PathBuf) -> Self {
        CacheSource {
            cache_dir,
            max_age_secs: BROKER.limits.candle_acceptable_age_sec,
        }
    }
}

#[async_trait]
impl FetchCandles for CacheSource {
    fn signature(&self) -> &'static str {
        "Local Cache"
    }

    async fn fetch_candles(&self, request: &CandleRequest) -> Result<CandleList> {
        let path = CacheFile::cache_path(&self.cache_dir, &request.instrument, request.granularity);
        let max_age_secs = self.max_age_secs;
        let request = request.clone();

        // Blocking file IO off the async runtime
        let cache = tokio::task::spawn_blocking(move || -> Result<CacheFile> {
            let cache = CacheFile::load_from_path(&path)?;
            cache.check_validity(&request, max_age_secs)?;
            Ok(cache)
        })
        .await
        .map_err(|e| Error::data(format!("Cache read task panicked: {}", e)))??;

        log::info!(
            "Loaded {} cached candles for {} {}",
            cache.data.len(),
            cache.instrument,
            cache.granularity
        );
        Ok(cache.data)
    }
}

/// Persist a freshly fetched candle list, but only when it came from
/// the broker (re-writing data we just read from the cache is useless).
pub fn write_candles_locally(
    source_signature: &'static str,
    cache_dir: &Path,
    candles: &CandleList,
) -> Result<()> {
    if source_signature != "Broker REST API" {
        log::debug!("Skipping cache write (data not from broker)");
        return Ok(());
    }
    let path = CacheFile::cache_path(cache_dir, candles.instrument(), candles.granularity());
    CacheFile::new(candles.clone()).save_to_path(&path)?;
    log::info!("Cache written: {:?}", path);
    Ok(())
}
