//! Bounded-concurrency file watcher (§4.10), grounded on
//! `original_source/internal/pkg/file_watcher/config.go`. A [`WatcherPool`]
//! bounds how many files may be watched at once; each active watcher reads
//! the watched file on every change notification and pushes the new bytes
//! to a bounded channel, dropping (and logging) a push that can't complete
//! before `output_timeout` elapses.
//!
//! This crate knows nothing about configuration trees, nodes, or queries —
//! its only contract with whatever holds the receiving end of the channel
//! is "here are the file's current bytes".

mod channel;
mod config;
mod pool;

pub use channel::{BoundedReceiver, BoundedSender, bounded};
pub use config::{CompletedWatcherConfig, ConfigError, DEFAULT_MAX_WATCHERS, WatcherConfig};
pub use pool::{PoolError, WatcherPool, WatcherSlot};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),
}

/// A running watcher: the receiving end of its output channel, plus the
/// platform watch handle and pool slot it holds for as long as it's alive.
/// Dropping this stops the watch and releases the pool slot.
pub struct ActiveWatcher {
    pub receiver: BoundedReceiver,
    _fs_watcher: RecommendedWatcher,
    _slot: WatcherSlot,
}

/// Validates and reserves a slot for `path`, then starts watching it.
/// Every detected modification reads the file's current bytes and pushes
/// them to the returned receiver, subject to `output_timeout`.
pub fn watch(pool: &WatcherPool, path: &std::path::Path, config: WatcherConfig) -> Result<ActiveWatcher, WatchError> {
    let completed = config.complete(path)?;
    let slot = pool.try_acquire()?;
    let (tx, rx) = bounded(1);

    let watch_path = completed.file_path.clone();
    let timeout = completed.config.output_timeout;
    let mut fs_watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        handle_event(res, &watch_path, &tx, timeout);
    })?;
    fs_watcher.watch(&completed.file_path, RecursiveMode::NonRecursive)?;

    Ok(ActiveWatcher {
        receiver: rx,
        _fs_watcher: fs_watcher,
        _slot: slot,
    })
}

fn handle_event(
    res: notify::Result<Event>,
    path: &std::path::Path,
    sender: &BoundedSender,
    timeout: Duration,
) {
    let event = match res {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "watch event error");
            return;
        }
    };
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return;
    }
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "watcher failed to read changed file");
            return;
        }
    };
    if sender.send_timeout(bytes, timeout).is_err() {
        tracing::warn!(path = %path.display(), "watcher output dropped: consumer not keeping up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_rejects_missing_file() {
        let pool = WatcherPool::new(4);
        let err = watch(
            &pool,
            std::path::Path::new("/no/such/file.conf"),
            WatcherConfig::new(),
        )
        .unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[test]
    fn watch_respects_pool_bound() {
        let pool = WatcherPool::new(0);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"http {}").unwrap();
        let err = watch(&pool, file.path(), WatcherConfig::new()).unwrap_err();
        assert!(matches!(err, WatchError::Pool(_)));
    }
}
