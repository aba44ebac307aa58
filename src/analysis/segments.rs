//! Trend segments between consecutive pivots, and the merge pass that
//! absorbs insignificant segments into a neighbour.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::candle_list::CandleList;
use crate::analysis::pivots::PivotList;
use crate::config::MergeConfig;
use crate::domain::{Granularity, Instrument};
use crate::errors::{Error, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One directional leg of price action, spanning an inclusive index
/// range of the candle list it was derived from.
///
/// Endpoints are pivot prices (bid low at an upswing start, bid high at
/// its end), not candle opens/closes, so re-deriving the price diff
/// from the endpoints is always exact.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Segment {
    pub start_idx: usize,
    pub end_idx: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_price: f64,
    pub end_price: f64,
    pub direction: Direction,
    pub diff_pips: f64,
}

impl Segment {
    fn from_endpoints(
        start_idx: usize,
        end_idx: usize,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        start_price: f64,
        end_price: f64,
        instrument: &Instrument,
    ) -> Result<Segment> {
        // A single-candle span is legal: a wide-range spike candle can
        // commit both pivots of a pair at the same index.
        if end_idx < start_idx {
            return Err(Error::data(format!(
                "Segment indices run backwards: {}..={}",
                start_idx, end_idx
            )));
        }
        let diff_pips = instrument.calculate_pips(end_price - start_price);
        let direction = if diff_pips >= 0.0 {
            Direction::Up
        } else {
            Direction::Down
        };
        Ok(Segment {
            start_idx,
            end_idx,
            start_time,
            end_time,
            start_price,
            end_price,
            direction,
            diff_pips,
        })
    }

    /// Number of candles the segment covers, endpoints included.
    /// Adjoining segments share their boundary candle.
    pub fn candle_count(&self) -> usize {
        self.end_idx - self.start_idx + 1
    }

    /// Join `other` onto the end of this segment. The result runs from
    /// this segment's start to `other`'s end, with direction and pips
    /// recomputed from the combined endpoints.
    pub fn append(&self, other: &Segment, instrument: &Instrument) -> Result<Segment> {
        if self.end_idx != other.start_idx {
            return Err(Error::data(format!(
                "Cannot append segment starting at {} onto one ending at {}",
                other.start_idx, self.end_idx
            )));
        }
        Segment::from_endpoints(
            self.start_idx,
            other.end_idx,
            self.start_time,
            other.end_time,
            self.start_price,
            other.end_price,
            instrument,
        )
    }

    /// Join `other` onto the front of this segment.
    pub fn prepend(&self, other: &Segment, instrument: &Instrument) -> Result<Segment> {
        other.append(self, instrument)
    }

    fn violates(&self, config: &MergeConfig) -> bool {
        self.candle_count() < config.min_n_candles || self.diff_pips.abs() < config.min_diff_pips
    }
}

/// An ordered, contiguous chain of segments over one candle list.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SegmentList {
    instrument: Instrument,
    granularity: Granularity,
    segments: Vec<Segment>,
}

impl SegmentList {
    /// Build the raw (pre-merge) segment chain: one segment per pair of
    /// consecutive pivots.
    pub fn from_pivots(clist: &CandleList, pivots: &PivotList) -> Result<SegmentList> {
        if pivots.len() < 2 {
            return Err(Error::data(format!(
                "Need at least 2 pivots to build segments, got {}",
                pivots.len()
            )));
        }
        let instrument = clist.instrument().clone();
        let segments = pivots
            .pivots()
            .iter()
            .tuple_windows()
            .map(|(a, b)| {
                Segment::from_endpoints(a.index, b.index, a.time, b.time, a.price, b.price, &instrument)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SegmentList {
            instrument,
            granularity: clist.granularity(),
            segments,
        })
    }

    /// Build a list from pre-made segments, checking they chain
    /// head-to-tail (shared boundary index and price).
    pub fn from_segments(
        instrument: Instrument,
        granularity: Granularity,
        segments: Vec<Segment>,
    ) -> Result<SegmentList> {
        if segments.is_empty() {
            return Err(Error::data("Segment list cannot be empty".to_string()));
        }
        for (a, b) in segments.iter().tuple_windows() {
            if a.end_idx != b.start_idx || a.end_price != b.start_price {
                return Err(Error::data(format!(
                    "Segments are not contiguous at index {}",
                    a.end_idx
                )));
            }
        }
        Ok(SegmentList {
            instrument,
            granularity,
            segments,
        })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Exact-match lookup by a segment's starting timestamp.
    pub fn fetch_by_start(&self, time: DateTime<Utc>) -> Result<&Segment> {
        self.segments
            .iter()
            .find(|s| s.start_time == time)
            .ok_or_else(|| Error::not_found(format!("No segment starts at {}", time)))
    }

    /// Exact-match lookup by a segment's ending timestamp.
    pub fn fetch_by_end(&self, time: DateTime<Utc>) -> Result<&Segment> {
        self.segments
            .iter()
            .find(|s| s.end_time == time)
            .ok_or_else(|| Error::not_found(format!("No segment ends at {}", time)))
    }

    /// Repeatedly absorb segments that fall below the significance
    /// thresholds (too few candles, or too small a pip move) into a
    /// neighbour, returning a new list. The original is untouched.
    ///
    /// Neighbour choice for a violator, in order:
    ///   1. a neighbour with the violator's own direction,
    ///   2. the merge producing the larger absolute pip move,
    ///   3. the previous neighbour on an exact tie.
    ///
    /// Each round removes one segment, so the loop always terminates;
    /// a single remaining segment is kept even if it still violates.
    pub fn merge_segments(&self, config: &MergeConfig) -> Result<SegmentList> {
        let mut segments = self.segments.clone();

        while segments.len() > 1 {
            let Some(v) = segments.iter().position(|s| s.violates(config)) else {
                break;
            };

            let with_prev = if v > 0 {
                Some(segments[v - 1].append(&segments[v], &self.instrument)?)
            } else {
                None
            };
            let with_next = if v < segments.len() - 1 {
                Some(segments[v].append(&segments[v + 1], &self.instrument)?)
            } else {
                None
            };

            // (merged segment, whether it replaces the previous neighbour)
            let (merged, into_prev) = match (with_prev, with_next) {
                (Some(p), None) => (p, true),
                (None, Some(n)) => (n, false),
                (Some(p), Some(n)) => {
                    let violator_dir = segments[v].direction;
                    let prev_same = segments[v - 1].direction == violator_dir;
                    let next_same = segments[v + 1].direction == violator_dir;
                    let take_prev = if prev_same != next_same {
                        prev_same
                    } else {
                        // Previous neighbour wins an exact tie
                        p.diff_pips.abs() >= n.diff_pips.abs()
                    };
                    if take_prev { (p, true) } else { (n, false) }
                }
                (None, None) => unreachable!("len > 1 guarantees a neighbour"),
            };

            debug!(
                "Merging segment {}..={} into {}, now {}..={} ({:.1} pips)",
                segments[v].start_idx,
                segments[v].end_idx,
                if into_prev { "previous" } else { "next" },
                merged.start_idx,
                merged.end_idx,
                merged.diff_pips
            );
            if into_prev {
                segments[v - 1] = merged;
                segments.remove(v);
            } else {
                segments[v] = merged;
                segments.remove(v + 1);
            }
        }

        Ok(SegmentList {
            instrument: self.instrument.clone(),
            granularity: self.granularity,
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pivots::{tests::zigzag_fixture, PivotDetector};
    use crate::config::PivotConfig;
    use chrono::TimeZone;

    fn assert_pips(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {} pips, got {}",
            expected,
            actual
        );
    }

    fn eur() -> Instrument {
        Instrument::new("EUR_USD").unwrap()
    }

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(h as i64)
    }

    fn seg(start_idx: usize, end_idx: usize, start_price: f64, end_price: f64) -> Segment {
        Segment::from_endpoints(
            start_idx,
            end_idx,
            hour(start_idx as u32),
            hour(end_idx as u32),
            start_price,
            end_price,
            &eur(),
        )
        .unwrap()
    }

    fn list(segments: Vec<Segment>) -> SegmentList {
        SegmentList::from_segments(eur(), Granularity::H1, segments).unwrap()
    }

    fn zigzag_segments() -> (CandleList, SegmentList) {
        let clist = zigzag_fixture();
        let pivots = PivotDetector::new(&clist, PivotConfig::new(0.02, -0.02).unwrap())
            .detect()
            .unwrap();
        let slist = SegmentList::from_pivots(&clist, &pivots).unwrap();
        (clist, slist)
    }

    #[test]
    fn test_from_pivots_builds_contiguous_alternating_segments() {
        let (_, slist) = zigzag_segments();
        assert_eq!(slist.len(), 2);

        let s = slist.segments();
        assert_eq!((s[0].start_idx, s[0].end_idx), (0, 3));
        assert_eq!((s[1].start_idx, s[1].end_idx), (3, 6));
        assert_eq!(s[0].direction, Direction::Up);
        assert_eq!(s[1].direction, Direction::Down);
        assert_pips(s[0].diff_pips, 700.0);
        assert_pips(s[1].diff_pips, -500.0);
        assert_eq!(s[0].candle_count(), 4);
        assert_eq!(s[1].candle_count(), 4);

        // Boundary candle is shared
        assert_eq!(s[0].end_idx, s[1].start_idx);
        assert_eq!(s[0].end_price, s[1].start_price);
    }

    #[test]
    fn test_same_candle_pivot_pair_yields_one_candle_segment() {
        // A spike candle commits its low and high as consecutive pivots
        // at the same index; segmentation must survive that.
        let clist = crate::analysis::pivots::tests::spike_fixture();
        let pivots = PivotDetector::new(&clist, PivotConfig::new(0.02, -0.02).unwrap())
            .detect()
            .unwrap();
        let slist = SegmentList::from_pivots(&clist, &pivots).unwrap();

        assert_eq!(slist.len(), 1);
        let s = &slist.segments()[0];
        assert_eq!((s.start_idx, s.end_idx), (1, 1));
        assert_eq!(s.candle_count(), 1);
        assert_eq!(s.direction, Direction::Up);
        assert_pips(s.diff_pips, 800.0);
        assert_eq!(s.start_time, s.end_time);
    }

    #[test]
    fn test_from_pivots_needs_two_pivots() {
        let clist = zigzag_fixture();
        // A tiny threshold pair would still alternate; instead feed a
        // detector config so strict that only the seed Low survives.
        let pivots = PivotDetector::new(&clist, PivotConfig::new(0.5, -0.5).unwrap())
            .detect()
            .unwrap();
        assert!(pivots.len() < 2);
        let result = SegmentList::from_pivots(&clist, &pivots);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_append_recomputes_from_outer_endpoints() {
        let (_, slist) = zigzag_segments();
        let s = slist.segments();
        let joined = s[0].append(&s[1], &eur()).unwrap();

        assert_eq!((joined.start_idx, joined.end_idx), (0, 6));
        assert_eq!(joined.candle_count(), 7);
        // 1.0000 -> 1.0200 net of the round trip through 1.0700
        assert_pips(joined.diff_pips, 200.0);
        assert_eq!(joined.direction, Direction::Up);
        assert_eq!(s[1].prepend(&s[0], &eur()).unwrap(), joined);
    }

    #[test]
    fn test_split_at_original_boundary_reproduces_diffs() {
        let (_, slist) = zigzag_segments();
        let s = slist.segments();
        let joined = s[0].append(&s[1], &eur()).unwrap();

        // Splitting the joined span back at the shared pivot gives back
        // the original pip moves
        let left = seg(joined.start_idx, s[0].end_idx, joined.start_price, s[0].end_price);
        let right = seg(s[1].start_idx, joined.end_idx, s[1].start_price, joined.end_price);
        assert_pips(left.diff_pips, s[0].diff_pips);
        assert_pips(right.diff_pips, s[1].diff_pips);
    }

    #[test]
    fn test_append_rejects_non_adjacent_segments() {
        let a = seg(0, 3, 1.0000, 1.0300);
        let b = seg(5, 9, 1.0300, 1.0100);
        let result = a.append(&b, &eur());
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_fetch_by_boundary_timestamp() {
        let (clist, slist) = zigzag_segments();
        let boundary = clist.candles()[3].time;
        assert_eq!(slist.fetch_by_start(boundary).unwrap().end_idx, 6);
        assert_eq!(slist.fetch_by_end(boundary).unwrap().start_idx, 0);

        // Mid-segment timestamps are misses, not fuzzy matches
        let mid = clist.candles()[4].time;
        assert!(matches!(slist.fetch_by_start(mid), Err(Error::NotFound(_))));
        assert!(matches!(slist.fetch_by_end(mid), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_merge_is_noop_when_all_segments_significant() {
        let (_, slist) = zigzag_segments();
        let config = MergeConfig {
            min_n_candles: 3,
            min_diff_pips: 100.0,
        };
        let merged = slist.merge_segments(&config).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.segments(), slist.segments());
    }

    #[test]
    fn test_merge_is_noop_at_default_thresholds() {
        // Every segment clears 10 candles and 200 pips
        let a = seg(0, 15, 1.0000, 1.0300);
        let b = seg(15, 30, 1.0300, 1.0050);
        let c = seg(30, 50, 1.0050, 1.0400);
        let slist = list(vec![a, b, c]);

        let config = MergeConfig {
            min_n_candles: 10,
            min_diff_pips: 200.0,
        };
        let merged = slist.merge_segments(&config).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.segments(), slist.segments());
    }

    #[test]
    fn test_merge_absorbs_short_segments_into_one() {
        let (_, slist) = zigzag_segments();
        // Both raw segments cover only 4 candles each
        let config = MergeConfig {
            min_n_candles: 5,
            min_diff_pips: 100.0,
        };
        let merged = slist.merge_segments(&config).unwrap();

        assert_eq!(merged.len(), 1);
        let s = &merged.segments()[0];
        assert_eq!((s.start_idx, s.end_idx), (0, 6));
        assert_eq!(s.direction, Direction::Up);
        assert_pips(s.diff_pips, 200.0);
        // Source list is unchanged
        assert_eq!(slist.len(), 2);
    }

    #[test]
    fn test_merge_prefers_same_direction_neighbour() {
        // B is an Up violator between an Up and a Down neighbour.
        // Merging with C would give the bigger move, but A shares B's
        // direction and wins.
        let a = seg(0, 10, 1.0000, 1.0200);
        let b = seg(10, 12, 1.0200, 1.0210);
        let c = seg(12, 25, 1.0210, 0.9700);
        let config = MergeConfig {
            min_n_candles: 5,
            min_diff_pips: 100.0,
        };
        let merged = list(vec![a, b, c]).merge_segments(&config).unwrap();

        assert_eq!(merged.len(), 2);
        let s = merged.segments();
        assert_eq!((s[0].start_idx, s[0].end_idx), (0, 12));
        assert_eq!(s[0].direction, Direction::Up);
        assert_pips(s[0].diff_pips, 210.0);
        assert_eq!((s[1].start_idx, s[1].end_idx), (12, 25));
    }

    #[test]
    fn test_merge_prefers_larger_combined_move() {
        // Down violator between two Ups: neither neighbour matches the
        // violator's direction, so the bigger combined move decides.
        let a = seg(0, 10, 1.0000, 1.0500);
        let b = seg(10, 12, 1.0500, 1.0480);
        let c = seg(12, 22, 1.0480, 1.1100);
        let config = MergeConfig {
            min_n_candles: 5,
            min_diff_pips: 100.0,
        };
        let merged = list(vec![a, b, c]).merge_segments(&config).unwrap();

        assert_eq!(merged.len(), 2);
        let s = merged.segments();
        // B + C (600 pips) beats A + B (480 pips)
        assert_eq!((s[0].start_idx, s[0].end_idx), (0, 10));
        assert_eq!((s[1].start_idx, s[1].end_idx), (10, 22));
        assert_pips(s[1].diff_pips, 600.0);
    }

    #[test]
    fn test_merge_exact_tie_takes_previous_neighbour() {
        // Both candidate merges land on exactly 490 pips; previous wins.
        let a = seg(0, 10, 1.0000, 1.0500);
        let b = seg(10, 12, 1.0500, 1.0490);
        let c = seg(12, 22, 1.0490, 1.0990);
        let config = MergeConfig {
            min_n_candles: 5,
            min_diff_pips: 100.0,
        };
        let merged = list(vec![a, b, c]).merge_segments(&config).unwrap();

        assert_eq!(merged.len(), 2);
        let s = merged.segments();
        assert_eq!((s[0].start_idx, s[0].end_idx), (0, 12));
        assert_pips(s[0].diff_pips, 490.0);
        assert_eq!((s[1].start_idx, s[1].end_idx), (12, 22));
    }

    #[test]
    fn test_merge_never_drops_below_one_segment() {
        // Single segment that violates both thresholds stays put.
        let only = seg(0, 2, 1.0000, 1.0005);
        let config = MergeConfig {
            min_n_candles: 10,
            min_diff_pips: 500.0,
        };
        let merged = list(vec![only.clone()]).merge_segments(&config).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.segments()[0], only);
    }
}
