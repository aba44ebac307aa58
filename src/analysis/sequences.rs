//! Binary up/down sequences and their summary statistics.
//!
//! A `BinarySeq` is one character per candle: '1' if the tracked value
//! went up versus the previous candle, '0' if it went down or stayed flat.
//! The statistics here (zero counts, longest zero run, entropy) are what
//! the scoring scripts consume downstream.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// How to combine several per-candle signals into one composite sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOp {
    /// '1' only where every input holds '1'
    And,
    /// '1' where any input holds '1'
    Or,
}

/// Validated '0'/'1' string, one char per candle.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BinarySeq(String);

impl BinarySeq {
    /// Build from per-candle up/down flags (true = up = '1').
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        BinarySeq(
            bits.into_iter()
                .map(|up| if up { '1' } else { '0' })
                .collect(),
        )
    }

    /// Parse an existing string, rejecting anything that is not 0/1.
    pub fn parse(text: &str) -> Result<Self> {
        if let Some(bad) = text.chars().find(|c| *c != '0' && *c != '1') {
            return Err(Error::data(format!(
                "Binary sequence contains invalid character '{}'",
                bad
            )));
        }
        Ok(BinarySeq(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count of '0' characters, optionally divided by the sequence length.
    pub fn number_of_zeros(&self, normalize: bool) -> f64 {
        let zeros = self.0.chars().filter(|c| *c == '0').count() as f64;
        if normalize && !self.0.is_empty() {
            zeros / self.0.len() as f64
        } else {
            zeros
        }
    }

    /// Count of index positions where BOTH sequences hold '0'.
    /// Lengths must match; each position is one candle.
    pub fn number_of_double_zeros(&self, other: &BinarySeq, normalize: bool) -> Result<f64> {
        if self.len() != other.len() {
            return Err(Error::data(format!(
                "Sequence length mismatch: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        let doubles = self
            .0
            .chars()
            .zip(other.0.chars())
            .filter(|(a, b)| *a == '0' && *b == '0')
            .count() as f64;
        if normalize && !self.0.is_empty() {
            Ok(doubles / self.0.len() as f64)
        } else {
            Ok(doubles)
        }
    }

    /// Length of the longest run of consecutive '0' characters.
    pub fn longest_stretch(&self) -> usize {
        let mut longest = 0;
        let mut current = 0;
        for c in self.0.chars() {
            if c == '0' {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }

    /// Shannon entropy (base 2) of the symbol distribution.
    ///
    /// For a binary alphabet this is already in [0, 1]: dividing by
    /// log2(2) would be a no-op, so there is no normalize knob.
    pub fn entropy(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        let n = self.0.len() as f64;
        let zeros = self.0.chars().filter(|c| *c == '0').count() as f64;
        [zeros / n, (n - zeros) / n]
            .iter()
            .filter(|p| **p > 0.0)
            .map(|p| -p * p.log2())
            .sum()
    }

    /// Combine several same-length sequences position-by-position.
    pub fn combine(seqs: &[&BinarySeq], op: MergeOp) -> Result<BinarySeq> {
        let first = seqs
            .first()
            .ok_or_else(|| Error::data("Cannot combine zero sequences"))?;
        for seq in &seqs[1..] {
            if seq.len() != first.len() {
                return Err(Error::data(format!(
                    "Sequence length mismatch in combine: {} vs {}",
                    seq.len(),
                    first.len()
                )));
            }
        }

        let combined = (0..first.len())
            .map(|i| {
                let bits = seqs.iter().map(|s| s.0.as_bytes()[i] == b'1');
                match op {
                    MergeOp::And => bits.fold(true, |acc, b| acc && b),
                    MergeOp::Or => bits.fold(false, |acc, b| acc || b),
                }
            })
            .collect::<Vec<bool>>();
        Ok(BinarySeq::from_bits(combined))
    }
}

impl std::fmt::Display for BinarySeq {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
