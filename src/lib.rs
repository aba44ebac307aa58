#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod errors;
pub mod utils;

// Re-export commonly used types
pub use analysis::{AnalysisReport, BinarySeq, CandleList, PivotDetector, SegmentList};
pub use domain::{Candle, Granularity, Instrument};
pub use errors::{Error, Result};

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::Parser;

use crate::config::{ANALYSIS, BrokerApiConfig, MergeConfig, PivotConfig};
use crate::data::broker::BrokerRestSource;
use crate::data::cache_file::{CacheSource, write_candles_locally};
use crate::data::{CandleRequest, FetchCandles, get_candles_with_fallback};

// CLI argument parsing
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Instrument to analyse, e.g. EUR_USD
    #[arg(long, default_value = "EUR_USD")]
    pub instrument: String,

    /// Candle granularity (D, H12, H8, H6, H4, H1, M30, M15, M5, M1)
    #[arg(long, default_value = "H4")]
    pub granularity: String,

    /// How many of the most recent candles to fetch (ignored when --to is set)
    #[arg(long, default_value_t = 500)]
    pub count: usize,

    /// Window start, RFC3339 (e.g. 2024-01-01T00:00:00Z)
    #[arg(long)]
    pub from: Option<String>,

    /// Window end, RFC3339; replaces --count
    #[arg(long)]
    pub to: Option<String>,

    /// Fractional rally needed to commit a low pivot
    #[arg(long, default_value_t = ANALYSIS.pivot.th_up)]
    pub th_up: f64,

    /// Fractional sell-off needed to commit a high pivot (negative)
    #[arg(long, default_value_t = ANALYSIS.pivot.th_down, allow_hyphen_values = true)]
    pub th_down: f64,

    /// Segments spanning fewer candles than this get merged away
    #[arg(long, default_value_t = ANALYSIS.merge.min_n_candles)]
    pub min_candles: usize,

    /// Segments moving fewer pips than this get merged away
    #[arg(long, default_value_t = ANALYSIS.merge.min_diff_pips)]
    pub min_pips: f64,

    /// Use API as primary source instead of the local cache
    #[arg(long, default_value_t = false)]
    pub prefer_api: bool,

    /// Directory holding the binary candle cache
    #[arg(long, default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    fn candle_request(&self) -> Result<CandleRequest> {
        let instrument = Instrument::new(&self.instrument)?;
        let granularity = Granularity::from_str(&self.granularity)
            .map_err(|_| Error::config(format!("Unknown granularity '{}'", self.granularity)))?;
        let request = CandleRequest {
            instrument,
            granularity,
            from: self.from.as_deref().map(parse_rfc3339).transpose()?,
            to: self.to.as_deref().map(parse_rfc3339).transpose()?,
            count: if self.to.is_some() {
                None
            } else {
                Some(self.count)
            },
        };
        request.validate()?;
        Ok(request)
    }
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::config(format!("Bad timestamp '{}': {}", raw, e)))
}

/// Fetch candles, detect pivots, build and merge segments, and bundle
/// everything into a report. The whole pipeline the binary runs.
pub async fn run_analysis(args: &Cli) -> Result<AnalysisReport> {
    let request = args.candle_request()?;
    let pivot_config = PivotConfig::new(args.th_up, args.th_down)?;
    let merge_config = MergeConfig {
        min_n_candles: args.min_candles,
        min_diff_pips: args.min_pips,
    };

    let api_token = std::env::var("BROKER_API_TOKEN").ok();
    let broker: Box<dyn FetchCandles> =
        Box::new(BrokerRestSource::new(BrokerApiConfig::default(), api_token)?);
    let cache: Box<dyn FetchCandles> = Box::new(CacheSource::new(args.cache_dir.clone()));

    // Cache first by default; --prefer-api flips the order
    let sources = if args.prefer_api {
        vec![broker, cache]
    } else {
        vec![cache, broker]
    };

    let (candles, signature) = get_candles_with_fallback(&sources, &request).await?;
    log::info!(
        "Analysing {} {} candles for {} (source: {})",
        candles.len(),
        candles.granularity(),
        candles.instrument(),
        signature
    );

    if let Err(e) = write_candles_locally(signature, &args.cache_dir, &candles) {
        log::error!("Failed to write cache: {}", e);
    }

    let pivots = PivotDetector::new(&candles, pivot_config).detect()?;
    let raw_segments = SegmentList::from_pivots(&candles, &pivots)?;
    let merged_segments = raw_segments.merge_segments(&merge_config)?;

    AnalysisReport::build(&candles, &pivots, &raw_segments, &merged_segments)
}
