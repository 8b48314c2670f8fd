pub mod alerting;
pub mod config;
pub mod detection;
pub mod input;
pub mod models;
pub mod output;
pub mod persistence;
pub mod pipeline;

// Re-export commonly used types
pub use models::{AnalysisReport, AuthEvent, BurstAlert, FailureKind, StoredAlert};
pub use detection::{AddressTimeline, AnalysisError, BurstDetector, LogAnalyzer};
pub use input::{EventExtractor, DirectoryWatcher};
pub use persistence::{AlertQuery, AlertStore, SqliteAlertStore};
pub use alerting::{AlertDispatcher, AlertEmitter, AlertQueue, LogNotifier, Notifier};
pub use pipeline::process_upload;
