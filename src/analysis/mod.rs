pub mod candle_list;
pub mod pivots;
pub mod report;
pub mod segments;
pub mod sequences;

pub use candle_list::{CandleList, SeqAttr};
pub use pivots::{Pivot, PivotDetector, PivotKind, PivotList};
pub use report::AnalysisReport;
pub use segments::{Direction, Segment, SegmentList};
pub use sequences::{BinarySeq, MergeOp};
