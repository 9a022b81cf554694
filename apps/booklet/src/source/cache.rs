use std::path::PathBuf;

use crate::logging::LogSink;

/// On-disk cache of raw text-service responses, one JSON file per reference.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Filesystem-safe file name for a reference: `/` and `.` become `_`.
    pub fn key_for(reference: &str) -> String {
        format!("{}.json", reference.replace(['/', '.'], "_"))
    }

    pub fn path_for(&self, reference: &str) -> PathBuf {
        self.dir.join(Self::key_for(reference))
    }

    /// Cached body for `reference`. Unreadable entries are logged and treated as misses.
    pub async fn load(&self, reference: &str, log: &dyn LogSink) -> Option<String> {
        let path = self.path_for(reference);
        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Some(body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log.warn(&format!("Error reading cache for {reference}: {e}"));
                None
            }
        }
    }

    /// Stores `body`. Failures are logged; caching never fails a fetch.
    pub async fn store(&self, reference: &str, body: &str, log: &dyn LogSink) {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            log.warn(&format!("Error creating cache dir {}: {e}", self.dir.display()));
            return;
        }
        let path = self.path_for(reference);
        match tokio::fs::write(&path, body).await {
            Ok(()) => log.info(&format!("Cached {reference} to {}", path.display())),
            Err(e) => log.warn(&format!("Error caching {reference}: {e}")),
        }
    }

    /// Drops a cached entry, e.g. after it failed to parse.
    pub async fn evict(&self, reference: &str) {
        let _ = tokio::fs::remove_file(self.path_for(reference)).await;
    }
}
