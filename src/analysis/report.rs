//! Final analysis artefact: everything the run produced, in one
//! serialisable struct ready for JSON output.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::candle_list::{CandleList, SeqAttr};
use crate::analysis::pivots::{Pivot, PivotList};
use crate::analysis::segments::{Segment, SegmentList};
use crate::errors::{Error, Result};
use crate::utils::maths_utils;

/// Binary-sequence statistics for one candle attribute.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SequenceStats {
    pub attribute: String,
    pub sequence: String,
    pub zeros: f64,
    pub zeros_normalized: f64,
    pub longest_stretch: usize,
    pub entropy: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnalysisReport {
    pub instrument: String,
    pub granularity: String,
    pub candle_count: usize,
    pub first_time: DateTime<Utc>,
    pub last_time: DateTime<Utc>,
    /// Highest bid high and lowest bid low across the run
    pub price_high: f64,
    pub price_low: f64,
    pub pivots: Vec<Pivot>,
    pub segments_raw: Vec<Segment>,
    pub segments_merged: Vec<Segment>,
    pub sequences: Vec<SequenceStats>,
    pub formation_counts: BTreeMap<String, usize>,
}

impl AnalysisReport {
    pub fn build(
        clist: &CandleList,
        pivots: &PivotList,
        raw: &SegmentList,
        merged: &SegmentList,
    ) -> Result<AnalysisReport> {
        let mut sequences = Vec::with_capacity(SeqAttr::ALL.len());
        for attr in SeqAttr::ALL {
            let seq = clist.binary_seq(attr);
            sequences.push(SequenceStats {
                attribute: attr.name().to_string(),
                zeros: seq.number_of_zeros(false),
                zeros_normalized: seq.number_of_zeros(true),
                longest_stretch: seq.longest_stretch(),
                entropy: seq.entropy(),
                sequence: seq.to_string(),
            });
        }

        let mut formation_counts = BTreeMap::new();
        for formation in clist.formations() {
            *formation_counts
                .entry(format!("{:?}", formation))
                .or_insert(0) += 1;
        }

        Ok(AnalysisReport {
            instrument: clist.instrument().to_string(),
            granularity: clist.granularity().to_string(),
            candle_count: clist.len(),
            first_time: clist.first_time(),
            last_time: clist.last_time(),
            price_high: maths_utils::get_max(&clist.highs()),
            price_low: maths_utils::get_min(&clist.lows()),
            pivots: pivots.pivots().to_vec(),
            segments_raw: raw.segments().to_vec(),
            segments_merged: merged.segments().to_vec(),
            sequences,
            formation_counts,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::data(format!("Failed to serialise report: {}", e)))
    }
}
