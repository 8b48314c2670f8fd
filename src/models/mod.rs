mod event;

pub use event::{AnalysisReport, AuthEvent, BurstAlert, FailureKind, StoredAlert};
