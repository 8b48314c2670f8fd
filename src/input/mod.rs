pub mod extractor;
pub mod watcher;

pub use extractor::{parse_timestamp, EventExtractor, ExtractError};
pub use watcher::DirectoryWatcher;

// Async version
pub use watcher::AsyncDirectoryWatcher;
