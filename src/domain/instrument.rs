use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// A currency pair in broker notation, e.g. "EUR_USD" or "USD_JPY".
///
/// Parsing is strict: exactly two three-letter uppercase ISO codes joined
/// by an underscore. Anything else is a ConfigError, caught before any
/// API call or pip arithmetic happens.
#[derive(Serialize, Deserialize, Debug, Clone, Hash, Eq, PartialEq)]
pub struct Instrument {
    name: String,
}

impl Instrument {
    pub fn new(name: &str) -> Result<Self> {
        let (base, quote) = match name.split_once('_') {
            Some(parts) => parts,
            None => {
                return Err(Error::config(format!(
                    "Instrument '{}' is not in AAA_BBB form",
                    name
                )));
            }
        };
        for code in [base, quote] {
            if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                return Err(Error::config(format!(
                    "Instrument '{}' has invalid currency code '{}'",
                    name, code
                )));
            }
        }
        Ok(Instrument {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &str {
        &self.name[..3]
    }

    pub fn quote(&self) -> &str {
        &self.name[4..]
    }

    /// JPY crosses quote prices with 2 decimals, everything else with 4.
    pub fn is_jpy_pair(&self) -> bool {
        self.base() == "JPY" || self.quote() == "JPY"
    }

    /// Number of decimal places carried by one price for this pair.
    pub fn pip_decimals(&self) -> u32 {
        if self.is_jpy_pair() { 2 } else { 4 }
    }

    /// Price units per pip: 100 for JPY pairs (1 pip = 0.01), else 10000.
    pub fn pip_divisor(&self) -> f64 {
        if self.is_jpy_pair() { 100.0 } else { 10_000.0 }
    }

    /// Convert a raw price difference into pips.
    ///
    /// The difference is first rounded to the pair's price precision so
    /// float noise below pip resolution never leaks into the result.
    /// `calculate_pips("USD_JPY", 0.50) == 50.0`,
    /// `calculate_pips("EUR_USD", 0.0050) == 50.0`.
    pub fn calculate_pips(&self, price_diff: f64) -> f64 {
        let scale = 10f64.powi(self.pip_decimals() as i32);
        let rounded = (price_diff * scale).round() / scale;
        rounded * self.pip_divisor()
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
