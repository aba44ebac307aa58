use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::sequences::{BinarySeq, MergeOp};
use crate::domain::{Candle, Colour, Formation, Granularity, Instrument};
use crate::errors::{Error, Result};

/// Which per-candle value a binary sequence tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqAttr {
    High,
    Low,
    Open,
    Close,
    Colour,
}

impl SeqAttr {
    pub const ALL: [SeqAttr; 5] = [
        SeqAttr::High,
        SeqAttr::Low,
        SeqAttr::Open,
        SeqAttr::Close,
        SeqAttr::Colour,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SeqAttr::High => "high",
            SeqAttr::Low => "low",
            SeqAttr::Open => "open",
            SeqAttr::Close => "close",
            SeqAttr::Colour => "colour",
        }
    }
}

/// Ordered candles for one (instrument, granularity), non-empty and
/// strictly increasing in time. All analysis starts from here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CandleList {
    instrument: Instrument,
    granularity: Granularity,
    candles: Vec<Candle>,
}

impl CandleList {
    pub fn new(
        instrument: Instrument,
        granularity: Granularity,
        candles: Vec<Candle>,
    ) -> Result<Self> {
        let clist = CandleList {
            instrument,
            granularity,
            candles,
        };
        clist.validate()?;
        Ok(clist)
    }

    /// Re-run the construction invariants: non-empty, every candle
    /// well-ordered, strictly increasing times. Deserialization (the
    /// disk cache) bypasses `new`, so anything loading a list from
    /// untrusted bytes must call this before analysis.
    pub fn validate(&self) -> Result<()> {
        if self.candles.is_empty() {
            return Err(Error::data(format!(
                "CandleList for {} {} must not be empty",
                self.instrument, self.granularity
            )));
        }
        for candle in &self.candles {
            candle.validate()?;
        }
        for pair in self.candles.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(Error::data(format!(
                    "Candles out of order: {} then {}",
                    pair[0].time, pair[1].time
                )));
            }
        }
        Ok(())
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        // Construction guarantees non-empty; kept for the clippy idiom
        self.candles.is_empty()
    }

    pub fn first_time(&self) -> DateTime<Utc> {
        self.candles[0].time
    }

    pub fn last_time(&self) -> DateTime<Utc> {
        self.candles[self.candles.len() - 1].time
    }

    /// One char per candle: '1' if the tracked value rose versus the
    /// previous candle, '0' if it fell or stayed flat. The first candle
    /// has no predecessor and is seeded '1' by convention. The colour
    /// attribute is its own up/down call, so there '1' simply means the
    /// candle closed green.
    pub fn binary_seq(&self, attr: SeqAttr) -> BinarySeq {
        let bits = self.candles.iter().enumerate().map(|(i, candle)| {
            if let SeqAttr::Colour = attr {
                if i == 0 {
                    return true;
                }
                return candle.colour() == Colour::Green;
            }
            if i == 0 {
                return true;
            }
            let value = Self::attr_value(candle, attr);
            let prev = Self::attr_value(&self.candles[i - 1], attr);
            value > prev
        });
        BinarySeq::from_bits(bits)
    }

    fn attr_value(candle: &Candle, attr: SeqAttr) -> f64 {
        match attr {
            SeqAttr::High => candle.high_bid,
            SeqAttr::Low => candle.low_bid,
            SeqAttr::Open => candle.open_bid,
            SeqAttr::Close => candle.close_bid,
            // Colour is handled before this is called
            SeqAttr::Colour => candle.close_bid,
        }
    }

    /// AND/OR several attribute sequences into one composite call.
    pub fn merged_binary_seq(&self, attrs: &[SeqAttr], op: MergeOp) -> Result<BinarySeq> {
        if attrs.is_empty() {
            return Err(Error::data("merged_binary_seq needs at least one attribute"));
        }
        let seqs: Vec<BinarySeq> = attrs.iter().map(|attr| self.binary_seq(*attr)).collect();
        let refs: Vec<&BinarySeq> = seqs.iter().collect();
        BinarySeq::combine(&refs, op)
    }

    /// Shape classification for every candle. Candles are independent so
    /// this fans out across threads; zero-height candles come back
    /// `Undefined` rather than failing the whole batch.
    pub fn formations(&self) -> Vec<Formation> {
        self.candles.par_iter().map(|c| c.formation()).collect()
    }

    /// Bid highs for the whole list, in candle order.
    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high_bid).collect()
    }

    /// Bid lows for the whole list, in candle order.
    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low_bid).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_candle(hour: u32, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            time: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            open_bid: open,
            high_bid: high,
            low_bid: low,
            close_bid: close,
            open_ask: open + 0.0002,
            high_ask: high + 0.0002,
            low_ask: low + 0.0002,
            close_ask: close + 0.0002,
            volume: 10,
            complete: true,
        }
    }

    fn make_list(candles: Vec<Candle>) -> CandleList {
        CandleList::new(
            Instrument::new("EUR_USD").unwrap(),
            Granularity::H1,
            candles,
        )
        .expect("test candle list should construct")
    }

    #[test]
    fn test_empty_list_rejected() {
        let result = CandleList::new(
            Instrument::new("EUR_USD").unwrap(),
            Granularity::H1,
            Vec::new(),
        );
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_out_of_order_candles_rejected() {
        let result = CandleList::new(
            Instrument::new("EUR_USD").unwrap(),
            Granularity::H1,
            vec![
                make_candle(5, 1.0, 1.1, 0.9, 1.05),
                make_candle(4, 1.05, 1.1, 0.9, 1.0),
            ],
        );
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_binary_seq_close() {
        // Closes: 1.05 (seed), 1.10 up, 1.00 down, 1.00 flat
        let clist = make_list(vec![
            make_candle(0, 1.00, 1.10, 0.95, 1.05),
            make_candle(1, 1.05, 1.15, 1.00, 1.10),
            make_candle(2, 1.10, 1.12, 0.98, 1.00),
            make_candle(3, 1.00, 1.05, 0.97, 1.00),
        ]);
        let seq = clist.binary_seq(SeqAttr::Close);
        assert_eq!(seq.as_str(), "1100", "flat counts as '0'");
        assert_eq!(seq.len(), clist.len(), "one char per candle");
    }

    #[test]
    fn test_binary_seq_colour() {
        // green, green, red, flat(undefined)
        let clist = make_list(vec![
            make_candle(0, 1.00, 1.10, 0.95, 1.05),
            make_candle(1, 1.05, 1.15, 1.00, 1.10),
            make_candle(2, 1.10, 1.12, 0.98, 1.00),
            make_candle(3, 1.00, 1.05, 0.97, 1.00),
        ]);
        let seq = clist.binary_seq(SeqAttr::Colour);
        // Seeded '1', then green → 1, red → 0, undefined → 0
        assert_eq!(seq.as_str(), "1100");
    }

    #[test]
    fn test_every_attr_seq_is_full_length_binary() {
        let clist = make_list(vec![
            make_candle(0, 1.00, 1.10, 0.95, 1.05),
            make_candle(1, 1.05, 1.15, 1.00, 1.10),
            make_candle(2, 1.10, 1.12, 0.98, 1.00),
        ]);
        for attr in SeqAttr::ALL {
            let seq = clist.binary_seq(attr);
            assert_eq!(seq.len(), clist.len(), "{} length", attr.name());
            assert!(
                seq.as_str().chars().all(|c| c == '0' || c == '1'),
                "{} must be pure binary",
                attr.name()
            );
            assert!(
                seq.as_str().starts_with('1'),
                "{} first char is seeded '1'",
                attr.name()
            );
        }
    }

    #[test]
    fn test_merged_binary_seq() {
        let clist = make_list(vec![
            make_candle(0, 1.00, 1.10, 0.95, 1.05),
            make_candle(1, 1.05, 1.15, 1.00, 1.10),
            make_candle(2, 1.10, 1.12, 0.98, 1.00),
        ]);
        let close = clist.binary_seq(SeqAttr::Close);
        let high = clist.binary_seq(SeqAttr::High);
        let both = clist
            .merged_binary_seq(&[SeqAttr::Close, SeqAttr::High], MergeOp::And)
            .unwrap();
        for (i, c) in both.as_str().chars().enumerate() {
            let expected = close.as_str().as_bytes()[i] == b'1'
                && high.as_str().as_bytes()[i] == b'1';
            assert_eq!(c == '1', expected, "composite AND at position {}", i);
        }
    }
}
