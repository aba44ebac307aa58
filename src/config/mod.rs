//! Configuration module for the swing-scout application.

pub mod analysis;
pub mod broker;

// Re-export commonly used items
pub use analysis::{ANALYSIS, AnalysisConfig, MergeConfig, PivotConfig};
pub use broker::{BROKER, BrokerApiConfig};
