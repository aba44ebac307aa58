use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Candle body colour, judged on Bid prices.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Green,
    Red,
    Undefined,
}

/// Single-candle shape classification.
///
/// The order of these variants matters: `CandleFeatures::formation` walks
/// the rules top to bottom and the first match wins.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formation {
    Hammer,
    HangingMan,
    InvertedHammer,
    ShootingStar,
    Doji,
    DragonflyDoji,
    GravestoneDoji,
    GreenMarubozu,
    RedMarubozu,
    Undefined,
}

/// One OHLC price bar with separate Bid and Ask tracks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Candle {
    pub time: DateTime<Utc>,

    pub open_bid: f64,
    pub high_bid: f64,
    pub low_bid: f64,
    pub close_bid: f64,

    pub open_ask: f64,
    pub high_ask: f64,
    pub low_ask: f64,
    pub close_ask: f64,

    pub volume: u32,
    pub complete: bool,
}

/// Derived per-candle shape attributes, computed once from Bid prices and
/// returned by value. Nothing is ever written back onto the candle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CandleFeatures {
    pub colour: Colour,
    pub upper_wick: f64,
    pub lower_wick: f64,
    pub perc_body: f64,
    pub perc_uwick: f64,
    pub perc_lwick: f64,
}

impl Candle {
    /// Check the OHLC ordering invariant on both price tracks:
    /// high >= max(open, close) >= min(open, close) >= low.
    pub fn validate(&self) -> Result<()> {
        let tracks = [
            ("bid", self.open_bid, self.high_bid, self.low_bid, self.close_bid),
            ("ask", self.open_ask, self.high_ask, self.low_ask, self.close_ask),
        ];
        for (track, open, high, low, close) in tracks {
            if high < open.max(close) || low > open.min(close) {
                return Err(Error::data(format!(
                    "Candle at {} violates OHLC ordering on {} track \
                     (o={} h={} l={} c={})",
                    self.time, track, open, high, low, close
                )));
            }
        }
        Ok(())
    }

    pub fn colour(&self) -> Colour {
        if self.close_bid > self.open_bid {
            Colour::Green
        } else if self.close_bid < self.open_bid {
            Colour::Red
        } else {
            Colour::Undefined
        }
    }

    /// Full candle height on the Bid track.
    pub fn height(&self) -> f64 {
        self.high_bid - self.low_bid
    }

    /// Compute colour, wick sizes and body/wick percentages from Bid prices.
    ///
    /// A zero-height candle has no meaningful percentages (the divisor is
    /// the candle height), so it is a DataError here. `formation()` maps
    /// that case to `Formation::Undefined` for callers that only want the
    /// classification.
    pub fn features(&self) -> Result<CandleFeatures> {
        let height = self.height();
        if height <= 0.0 {
            return Err(Error::data(format!(
                "Candle at {} has zero height, cannot compute shape percentages",
                self.time
            )));
        }

        let body_top = self.open_bid.max(self.close_bid);
        let body_bottom = self.open_bid.min(self.close_bid);
        let upper_wick = self.high_bid - body_top;
        let lower_wick = body_bottom - self.low_bid;
        let body = body_top - body_bottom;

        Ok(CandleFeatures {
            colour: self.colour(),
            upper_wick,
            lower_wick,
            perc_body: 100.0 * body / height,
            perc_uwick: 100.0 * upper_wick / height,
            perc_lwick: 100.0 * lower_wick / height,
        })
    }

    /// Classify the candle shape. Zero-height candles are `Undefined`.
    pub fn formation(&self) -> Formation {
        match self.features() {
            Ok(features) => features.formation(),
            Err(_) => Formation::Undefined,
        }
    }
}

impl CandleFeatures {
    /// Ordered rule list; first matching rule wins.
    ///
    /// Thresholds are percentages of the candle height. Hammer-family
    /// shapes need a dominant wick (>= 50%) with a small body; the
    /// green/red split separates hammer from hanging man (and inverted
    /// hammer from shooting star). Dojis need a tiny body; the dragonfly
    /// and gravestone variants need one dominant wick (>= 70%) and are
    /// only reachable when the plain doji rule (both wicks >= 20%) did
    /// not already fire. Marubozus are nearly all body.
    pub fn formation(&self) -> Formation {
        let hammer_shape =
            self.perc_lwick >= 50.0 && self.perc_body <= 40.0 && self.perc_uwick <= 15.0;
        let inverted_shape =
            self.perc_uwick >= 50.0 && self.perc_body <= 40.0 && self.perc_lwick <= 15.0;

        if self.colour == Colour::Green && hammer_shape {
            Formation::Hammer
        } else if self.colour == Colour::Red && hammer_shape {
            Formation::HangingMan
        } else if self.colour == Colour::Green && inverted_shape {
            Formation::InvertedHammer
        } else if self.colour == Colour::Red && inverted_shape {
            Formation::ShootingStar
        } else if self.perc_body <= 10.0 && self.perc_uwick >= 20.0 && self.perc_lwick >= 20.0 {
            Formation::Doji
        } else if self.perc_body <= 10.0 && self.perc_lwick >= 70.0 {
            Formation::DragonflyDoji
        } else if self.perc_body <= 10.0 && self.perc_uwick >= 70.0 {
            Formation::GravestoneDoji
        } else if self.colour == Colour::Green && self.perc_body >= 90.0 {
            Formation::GreenMarubozu
        } else if self.colour == Colour::Red && self.perc_body >= 90.0 {
            Formation::RedMarubozu
        } else {
            Formation::Undefined
        }
    }
}
