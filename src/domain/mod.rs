// Domain types and value objects
pub mod candle;
pub mod granularity;
pub mod instrument;

// Re-export commonly used types
pub use candle::{Candle, CandleFeatures, Colour, Formation};
pub use granularity::Granularity;
pub use instrument::Instrument;
