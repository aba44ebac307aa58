use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::utils::TimeUtils;

/// Candle granularity in broker notation (daily down to one minute).
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Hash, Eq, PartialEq, Display, EnumString,
)]
pub enum Granularity {
    D,
    H12,
    H8,
    H6,
    H4,
    H1,
    M30,
    M15,
    M5,
    M1,
}

impl Granularity {
    pub fn interval_ms(&self) -> i64 {
        match self {
            Granularity::D => TimeUtils::MS_IN_D,
            Granularity::H12 => TimeUtils::MS_IN_12_H,
            Granularity::H8 => TimeUtils::MS_IN_8_H,
            Granularity::H6 => TimeUtils::MS_IN_6_H,
            Granularity::H4 => TimeUtils::MS_IN_4_H,
            Granularity::H1 => TimeUtils::MS_IN_H,
            Granularity::M30 => TimeUtils::MS_IN_30_MIN,
            Granularity::M15 => TimeUtils::MS_IN_15_MIN,
            Granularity::M5 => TimeUtils::MS_IN_5_MIN,
            Granularity::M1 => TimeUtils::MS_IN_MIN,
        }
    }
}
