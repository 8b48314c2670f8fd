pub mod aggregator;
pub mod analyzer;
pub mod burst;

pub use aggregator::{aggregate, AddressTimeline};
pub use analyzer::{AnalysisError, LogAnalyzer};
pub use burst::{BurstDetector, DetectionError};
