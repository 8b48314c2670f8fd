use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// Watch a directory for newly added log files
///
/// Files already present when the watcher is initialized are ignored; each
/// file added afterwards is reported exactly once.
pub struct DirectoryWatcher {
    dir: PathBuf,
    seen: HashSet<PathBuf>,
}

impl DirectoryWatcher {
    /// Create a new directory watcher
    pub fn new(dir: PathBuf) -> Self {
        DirectoryWatcher {
            dir,
            seen: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record the files that already exist so they are not reported
    pub fn initialize(&mut self) -> io::Result<()> {
        let existing = list_files(&self.dir)?;
        log::debug!("Ignoring {} pre-existing file(s) in {:?}", existing.len(), self.dir);
        self.seen.extend(existing);
        Ok(())
    }

    /// Return files that appeared since the last poll, sorted by path
    pub fn poll_new_files(&mut self) -> io::Result<Vec<PathBuf>> {
        let current = list_files(&self.dir)?;
        Ok(self.take_unseen(current))
    }

    fn take_unseen(&mut self, current: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut fresh: Vec<PathBuf> = current
            .into_iter()
            .filter(|path| self.seen.insert(path.clone()))
            .collect();
        fresh.sort();
        fresh
    }

    /// Check if the watched directory still exists
    pub fn is_valid(&self) -> bool {
        self.dir.is_dir()
    }
}

fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    Ok(files)
}

// ============================================
// Async Directory Watcher
// ============================================

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Async version of DirectoryWatcher for use with tokio
pub struct AsyncDirectoryWatcher {
    inner: DirectoryWatcher,
    poll_interval: Duration,
}

impl AsyncDirectoryWatcher {
    /// Create a new async directory watcher
    pub fn new(dir: PathBuf, poll_interval: Duration) -> Self {
        AsyncDirectoryWatcher {
            inner: DirectoryWatcher::new(dir),
            poll_interval,
        }
    }

    /// Run the watcher, sending each new file path through the channel
    ///
    /// This method runs until the channel is closed. A missing folder or a
    /// listing error is logged and retried on the next poll.
    pub async fn run(
        &mut self,
        tx: mpsc::Sender<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.initialize().await?;

        log::info!("Watching folder for new log files: {:?}", self.inner.dir());

        loop {
            if tx.is_closed() {
                log::info!("Channel closed, stopping directory watcher");
                return Ok(());
            }

            if !self.inner.is_valid() {
                log::warn!("Watched folder {:?} is missing, waiting for it", self.inner.dir());
                sleep(self.poll_interval).await;
                continue;
            }

            match self.list().await {
                Ok(current) => {
                    for path in self.inner.take_unseen(current) {
                        log::info!("New file detected: {:?}", path);
                        if tx.send(path).await.is_err() {
                            log::info!("Channel closed, stopping directory watcher");
                            return Ok(());
                        }
                    }
                }
                Err(e) => log::error!("Error listing {:?}: {}", self.inner.dir(), e),
            }

            sleep(self.poll_interval).await;
        }
    }

    async fn initialize(&mut self) -> io::Result<()> {
        let existing = self.list().await?;
        self.inner.seen.extend(existing);
        Ok(())
    }

    async fn list(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(self.inner.dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}
