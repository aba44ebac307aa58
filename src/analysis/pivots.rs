//! ZigZag-style pivot detection.
//!
//! Walks the candle list tracking a running extreme (highest high while
//! the trend is up, lowest low while it is down). When price retraces
//! from that extreme by more than the opposite threshold, the extreme is
//! committed as a pivot and the search direction flips. Small wiggles
//! below the thresholds never become pivots, which is the whole point:
//! only "significant" turning points survive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::candle_list::CandleList;
use crate::config::PivotConfig;
use crate::errors::{Error, Result};
use crate::utils::maths_utils;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    High,
    Low,
}

/// A single candle marked as a local extremum.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    /// Index into the owning CandleList
    pub index: usize,
    pub kind: PivotKind,
    pub time: DateTime<Utc>,
    /// Bid high for a High pivot, bid low for a Low pivot
    pub price: f64,
}

/// Ordered pivots, strictly alternating High/Low by construction.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PivotList {
    pivots: Vec<Pivot>,
}

impl PivotList {
    fn new(pivots: Vec<Pivot>) -> Self {
        debug_assert!(Self::alternates(&pivots), "pivot kinds must alternate");
        PivotList { pivots }
    }

    pub fn pivots(&self) -> &[Pivot] {
        &self.pivots
    }

    pub fn len(&self) -> usize {
        self.pivots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }

    pub fn is_alternating(&self) -> bool {
        Self::alternates(&self.pivots)
    }

    fn alternates(pivots: &[Pivot]) -> bool {
        pivots.windows(2).all(|w| w[0].kind != w[1].kind)
    }
}

/// Threshold-based reversal scanner over one CandleList.
pub struct PivotDetector<'a> {
    clist: &'a CandleList,
    config: PivotConfig,
}

impl<'a> PivotDetector<'a> {
    pub fn new(clist: &'a CandleList, config: PivotConfig) -> Self {
        PivotDetector { clist, config }
    }

    /// Scan the candle list and return the alternating pivot sequence.
    ///
    /// Tie-break rule: when one candle's range is wide enough to extend
    /// the running extreme AND breach the opposite threshold, the
    /// current seeking direction is processed first — the extreme is
    /// updated, then the retracement is measured against the updated
    /// extreme. Before the first pivot exists, an upward breach wins.
    /// No trailing partial pivot is committed at the end of the scan.
    pub fn detect(&self) -> Result<PivotList> {
        // Fields are public (the const default table needs them), so
        // revalidate here rather than trust the caller built them via new().
        let config = PivotConfig::new(self.config.th_up, self.config.th_down)?;

        let candles = self.clist.candles();
        if candles.len() < 2 {
            return Err(Error::data(format!(
                "Pivot detection needs at least 2 candles, got {}",
                candles.len()
            )));
        }

        let highs = self.clist.highs();
        let lows = self.clist.lows();

        let mut pivots: Vec<Pivot> = Vec::new();
        // What kind of pivot the scan is currently trying to form.
        // None until the first threshold breach settles the direction.
        let mut seeking: Option<PivotKind> = None;
        let mut max_i = 0usize;
        let mut min_i = 0usize;

        for i in 1..candles.len() {
            match seeking {
                None => {
                    if highs[i] >= highs[max_i] {
                        max_i = i;
                    }
                    if lows[i] <= lows[min_i] {
                        min_i = i;
                    }
                    let up_move = (highs[i] - lows[min_i]) / lows[min_i];
                    let down_move = (lows[i] - highs[max_i]) / highs[max_i];

                    if up_move > config.th_up {
                        pivots.push(Self::make_pivot(candles, &highs, &lows, min_i, PivotKind::Low));
                        seeking = Some(PivotKind::High);
                        max_i = Self::reset_extreme(&highs, min_i, i, true);
                    } else if down_move < config.th_down {
                        pivots.push(Self::make_pivot(candles, &highs, &lows, max_i, PivotKind::High));
                        seeking = Some(PivotKind::Low);
                        min_i = Self::reset_extreme(&lows, max_i, i, false);
                    }
                }
                Some(PivotKind::High) => {
                    // Trend up: extend the running high first, then test
                    // for a retracement beyond th_down.
                    if highs[i] > highs[max_i] {
                        max_i = i;
                    }
                    let down_move = (lows[i] - highs[max_i]) / highs[max_i];
                    if down_move < config.th_down {
                        pivots.push(Self::make_pivot(candles, &highs, &lows, max_i, PivotKind::High));
                        seeking = Some(PivotKind::Low);
                        min_i = Self::reset_extreme(&lows, max_i, i, false);
                    }
                }
                Some(PivotKind::Low) => {
                    if lows[i] < lows[min_i] {
                        min_i = i;
                    }
                    let up_move = (highs[i] - lows[min_i]) / lows[min_i];
                    if up_move > config.th_up {
                        pivots.push(Self::make_pivot(candles, &highs, &lows, min_i, PivotKind::Low));
                        seeking = Some(PivotKind::High);
                        max_i = Self::reset_extreme(&highs, min_i, i, true);
                    }
                }
            }
        }

        Ok(PivotList::new(pivots))
    }

    fn make_pivot(
        candles: &[crate::domain::Candle],
        highs: &[f64],
        lows: &[f64],
        index: usize,
        kind: PivotKind,
    ) -> Pivot {
        let price = match kind {
            PivotKind::High => highs[index],
            PivotKind::Low => lows[index],
        };
        Pivot {
            index,
            kind,
            time: candles[index].time,
            price,
        }
    }

    /// After committing a pivot at `committed`, restart extreme tracking
    /// from the retracement side: the best value strictly after the
    /// pivot, up to and including the current candle `i`.
    fn reset_extreme(values: &[f64], committed: usize, i: usize, want_max: bool) -> usize {
        let from = committed + 1;
        if from > i {
            // The committing candle is also the latest one; nothing after it yet
            return i;
        }
        let offset = if want_max {
            maths_utils::argmax_index(&values[from..=i])
        } else {
            maths_utils::argmin_index(&values[from..=i])
        };
        from + offset
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Candle, Granularity, Instrument};
    use chrono::TimeZone;

    fn make_candle(hour: u32, high: f64, low: f64) -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open_bid: low + 0.0005,
            high_bid: high,
            low_bid: low,
            close_bid: high - 0.0005,
            open_ask: low + 0.0007,
            high_ask: high + 0.0002,
            low_ask: low + 0.0002,
            close_ask: high - 0.0003,
            volume: 10,
            complete: true,
        }
    }

    fn make_list(ranges: &[(f64, f64)]) -> CandleList {
        let candles = ranges
            .iter()
            .enumerate()
            .map(|(i, (high, low))| make_candle(i as u32, *high, *low))
            .collect();
        CandleList::new(
            Instrument::new("EUR_USD").unwrap(),
            Granularity::H1,
            candles,
        )
        .expect("fixture candle list should construct")
    }

    /// 20-candle zigzag: rally into candle 3, 2%+ sell-off into candle 6,
    /// 2%+ rally into candle 8, then a gentle drift up with no further
    /// reversal. Expected pivots: Low@0, High@3, Low@6.
    pub(crate) fn zigzag_fixture() -> CandleList {
        let mut ranges: Vec<(f64, f64)> = vec![
            (1.0050, 1.0000), // 0: global low
            (1.0150, 1.0100),
            (1.0400, 1.0300), // 2: +4% from 1.0000 commits Low@0
            (1.0700, 1.0600), // 3: running high
            (1.0650, 1.0500),
            (1.0500, 1.0350), // 5: -3.3% from 1.0700 commits High@3
            (1.0300, 1.0200), // 6: new running low
            (1.0350, 1.0250),
            (1.0420, 1.0300), // 8: +2.16% from 1.0200 commits Low@6
        ];
        // Drift up without ever retracing 2% from the running high
        for k in 0..11 {
            let high = 1.0430 + 0.001 * k as f64;
            ranges.push((high, high - 0.0050));
        }
        make_list(&ranges)
    }

    fn default_config() -> PivotConfig {
        PivotConfig::new(0.02, -0.02).unwrap()
    }

    #[test]
    fn test_too_few_candles_is_data_error() {
        let clist = make_list(&[(1.01, 1.00)]);
        let result = PivotDetector::new(&clist, default_config()).detect();
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_invalid_thresholds_are_config_errors() {
        let clist = zigzag_fixture();
        for (th_up, th_down) in [(0.0, -0.02), (-0.02, -0.02), (0.02, 0.0), (0.02, 0.02)] {
            let bad = PivotConfig { th_up, th_down };
            let result = PivotDetector::new(&clist, bad).detect();
            assert!(
                matches!(result, Err(Error::Config(_))),
                "thresholds ({}, {}) must be rejected",
                th_up,
                th_down
            );
        }
    }

    #[test]
    fn test_zigzag_fixture_pivots() {
        let clist = zigzag_fixture();
        let pivots = PivotDetector::new(&clist, default_config())
            .detect()
            .unwrap();

        assert_eq!(pivots.len(), 3, "exactly three committed pivots");
        let p = pivots.pivots();
        assert_eq!((p[0].index, p[0].kind), (0, PivotKind::Low));
        assert_eq!((p[1].index, p[1].kind), (3, PivotKind::High));
        assert_eq!((p[2].index, p[2].kind), (6, PivotKind::Low));
        assert_eq!(p[0].price, 1.0000);
        assert_eq!(p[1].price, 1.0700);
        assert_eq!(p[2].price, 1.0200);
    }

    #[test]
    fn test_pivots_strictly_alternate() {
        let clist = zigzag_fixture();
        let pivots = PivotDetector::new(&clist, default_config())
            .detect()
            .unwrap();
        assert!(pivots.is_alternating());
    }

    #[test]
    fn test_no_trailing_partial_pivot() {
        // Steady rally: the running high keeps extending but never
        // retraces, so nothing after the initial Low is committed.
        let ranges: Vec<(f64, f64)> = (0..10)
            .map(|k| {
                let low = 1.0000 + 0.01 * k as f64;
                (low + 0.0050, low)
            })
            .collect();
        let clist = make_list(&ranges);
        let pivots = PivotDetector::new(&clist, default_config())
            .detect()
            .unwrap();

        assert_eq!(pivots.len(), 1, "only the committed starting Low");
        assert_eq!(pivots.pivots()[0].kind, PivotKind::Low);
        assert_eq!(pivots.pivots()[0].index, 0);
    }

    /// One candle whose intra-candle range breaches th_up, followed by a
    /// sell-off breaching th_down. The spike's low and high both become
    /// pivots, landing on the same index.
    pub(crate) fn spike_fixture() -> CandleList {
        make_list(&[
            (1.0050, 1.0000),
            (1.0800, 1.0000), // +8% low-to-high within one candle
            (1.0400, 1.0000), // -7.4% off the spike high
        ])
    }

    #[test]
    fn test_spike_candle_commits_both_pivots_at_one_index() {
        let pivots = PivotDetector::new(&spike_fixture(), default_config())
            .detect()
            .unwrap();

        assert_eq!(pivots.len(), 2);
        let p = pivots.pivots();
        assert_eq!((p[0].index, p[0].kind), (1, PivotKind::Low));
        assert_eq!((p[1].index, p[1].kind), (1, PivotKind::High));
        assert_eq!(p[0].price, 1.0000);
        assert_eq!(p[1].price, 1.0800);
        assert!(pivots.is_alternating());
    }

    #[test]
    fn test_flat_market_yields_no_pivots() {
        let ranges: Vec<(f64, f64)> = (0..10).map(|_| (1.0060, 1.0000)).collect();
        let clist = make_list(&ranges);
        let pivots = PivotDetector::new(&clist, default_config())
            .detect()
            .unwrap();
        assert!(pivots.is_empty(), "sub-threshold wiggles commit nothing");
    }
}
