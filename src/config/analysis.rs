//! Analysis and computation configuration.
//!
//! Every component takes its config struct explicitly at construction.
//! The const table below only supplies defaults for the CLI; nothing in
//! the analysis code reads it ambiently.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Thresholds for ZigZag pivot detection.
///
/// Both are fractional price moves measured from the running extreme:
/// `th_up` (> 0) is the rally needed to commit a low pivot, `th_down`
/// (< 0) the sell-off needed to commit a high pivot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PivotConfig {
    pub th_up: f64,
    pub th_down: f64,
}

impl PivotConfig {
    pub fn new(th_up: f64, th_down: f64) -> Result<Self> {
        if th_up <= 0.0 {
            return Err(Error::config(format!(
                "th_up must be positive, got {}",
                th_up
            )));
        }
        if th_down >= 0.0 {
            return Err(Error::config(format!(
                "th_down must be negative, got {}",
                th_down
            )));
        }
        Ok(PivotConfig { th_up, th_down })
    }
}

/// Thresholds for segment consolidation.
///
/// A segment violating EITHER threshold (too few candles, or too small a
/// pip range) gets merged into a neighbour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MergeConfig {
    pub min_n_candles: usize,
    pub min_diff_pips: f64,
}

/// The Master Analysis Configuration
pub struct AnalysisConfig {
    pub pivot: PivotConfig,
    pub merge: MergeConfig,
}

pub const ANALYSIS: AnalysisConfig = AnalysisConfig {
    pivot: PivotConfig {
        // 2% reversal either way has worked well for D/H4 forex data
        th_up: 0.02,
        th_down: -0.02,
    },
    merge: MergeConfig {
        min_n_candles: 10,
        min_diff_pips: 200.0,
    },
};
