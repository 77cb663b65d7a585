//! Watcher configuration, mirroring `file_watcher/config.go`'s `Config`/
//! `NewConfig`/`Complete`.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default concurrent watcher bound, matching `MaxConnections` in the
/// original `NewConfig()`.
pub const DEFAULT_MAX_WATCHERS: usize = 1000;

/// Default producer timeout, matching `OutputTimeout` in the original
/// `NewConfig()`.
pub const DEFAULT_OUTPUT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("watch target does not exist or is unreadable: {0}")]
    Io(#[from] std::io::Error),
    #[error("watch target is not a regular file: {0}")]
    NotARegularFile(PathBuf),
}

/// Bounds on a watcher pool: how many files may be watched concurrently and
/// how long a producer may block before its update is dropped.
#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    pub max_watchers: usize,
    pub output_timeout: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            max_watchers: DEFAULT_MAX_WATCHERS,
            output_timeout: DEFAULT_OUTPUT_TIMEOUT,
        }
    }
}

impl WatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates that `path` names a regular file and resolves it to an
    /// absolute path, mirroring `Complete`.
    pub fn complete(&self, path: &Path) -> Result<CompletedWatcherConfig, ConfigError> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(ConfigError::NotARegularFile(path.to_path_buf()));
        }
        Ok(CompletedWatcherConfig {
            file_path: std::fs::canonicalize(path)?,
            config: *self,
        })
    }
}

/// A [`WatcherConfig`] paired with the validated, canonicalized path it
/// applies to — the only form a watcher can actually be spawned from.
#[derive(Debug, Clone)]
pub struct CompletedWatcherConfig {
    pub file_path: PathBuf,
    pub config: WatcherConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn completes_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"http {}").unwrap();
        let completed = WatcherConfig::new().complete(file.path()).unwrap();
        assert!(completed.file_path.is_absolute());
    }

    #[test]
    fn rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = WatcherConfig::new().complete(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotARegularFile(_)));
    }

    #[test]
    fn rejects_missing_path() {
        let err = WatcherConfig::new()
            .complete(Path::new("/no/such/file/here.conf"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
