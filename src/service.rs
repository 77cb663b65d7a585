//! Per-instance hosting loop, grounded on `original_source/main.go`'s
//! `run`/`Bak`/`bak`: for each configured instance, load its configuration
//! tree into a [`Bundle`], start a file watcher pointed at its main file,
//! and start a periodic backup task that dumps the tree to a timestamped
//! directory every [`BACKUP_INTERVAL`].

use crate::config::NgConfig;
use crate::http::{self, AuthConfig};
use ngconf_engine::facade::Bundle;
use ngconf_watch::{WatcherConfig, WatcherPool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

/// Mirrors `Bak`'s five-minute ticker.
pub const BACKUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How often the reload/backup loops wake up to check their stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct HostedInstance {
    pub name: String,
    pub bundle: Arc<Bundle>,
    stop: Arc<AtomicBool>,
    watcher_handle: Option<JoinHandle<()>>,
    backup_handle: Option<JoinHandle<()>>,
    http_handle: Option<JoinHandle<()>>,
}

impl HostedInstance {
    /// Loads `config.conf_path`, starts watching it for changes, starts its
    /// periodic backup task writing under `backup_root/<name>/`, and
    /// exposes the HTTP front end (§4.12) on `config.port`.
    pub fn start(
        config: &NgConfig,
        watcher_pool: &WatcherPool,
        backup_root: &Path,
        auth: Option<Arc<AuthConfig>>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let bundle = Arc::new(Bundle::load(&config.conf_path)?);
        let active_watcher = ngconf_watch::watch(watcher_pool, &config.conf_path, WatcherConfig::new())?;

        let stop = Arc::new(AtomicBool::new(false));

        let watcher_handle = spawn_reload_task(
            config.name.clone(),
            Arc::clone(&bundle),
            active_watcher,
            Arc::clone(&stop),
        );
        let backup_handle = spawn_backup_task(
            config.name.clone(),
            Arc::clone(&bundle),
            backup_root.join(&config.name),
            Arc::clone(&stop),
        );
        let http_handle = spawn_http_task(Arc::clone(&bundle), config.port, auth, Arc::clone(&stop));

        Ok(Self {
            name: config.name.clone(),
            bundle,
            stop,
            watcher_handle: Some(watcher_handle),
            backup_handle: Some(backup_handle),
            http_handle: Some(http_handle),
        })
    }
}

impl Drop for HostedInstance {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.watcher_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.backup_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.http_handle.take() {
            let _ = handle.join();
        }
    }
}

fn spawn_http_task(
    bundle: Arc<Bundle>,
    port: u16,
    auth: Option<Arc<AuthConfig>>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let addr = format!("0.0.0.0:{port}");
    std::thread::spawn(move || http::serve(bundle, &addr, auth, stop))
}

fn spawn_reload_task(
    name: String,
    bundle: Arc<Bundle>,
    active_watcher: ngconf_watch::ActiveWatcher,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        // Owning the watcher here, rather than in `HostedInstance`, keeps
        // its platform watch and pool slot alive for exactly this thread's
        // lifetime.
        let watcher = active_watcher;
        while !stop.load(Ordering::SeqCst) {
            let Ok(bytes) = watcher.receiver.recv_timeout(POLL_INTERVAL) else {
                continue;
            };
            match bundle.update_from_config_bytes(&bytes) {
                Ok(()) => {
                    tracing::info!(instance = %name, "reloaded configuration after file change")
                }
                Err(err) if err.tag() == "same-fingerprint" => {
                    tracing::debug!(instance = %name, "file changed but rendered content is unchanged")
                }
                Err(err) => {
                    tracing::warn!(instance = %name, error = %err, "failed to reload configuration")
                }
            }
        }
    })
}

fn spawn_backup_task(
    name: String,
    bundle: Arc<Bundle>,
    backup_dir: PathBuf,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut elapsed = Duration::ZERO;
        while !stop.load(Ordering::SeqCst) {
            std::thread::sleep(POLL_INTERVAL);
            elapsed += POLL_INTERVAL;
            if elapsed < BACKUP_INTERVAL {
                continue;
            }
            elapsed = Duration::ZERO;

            let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
            match run_backup(&bundle, &backup_dir, &timestamp) {
                Ok(path) => tracing::info!(instance = %name, path = %path.display(), "backup written"),
                Err(err) => tracing::warn!(instance = %name, error = %err, "backup failed"),
            }
        }
    })
}

/// Dumps `bundle`'s tree to `backup_dir/<timestamp>/`, one file per
/// reachable `Config`, mirroring `bak`'s `nginx.conf.<timestamp>.tgz`
/// archive — written here as a plain directory tree rather than a `.tgz`,
/// since the core engine never touches disk itself and this crate carries
/// no archive-format dependency.
pub fn run_backup(bundle: &Bundle, backup_dir: &Path, timestamp: &str) -> std::io::Result<PathBuf> {
    let target = backup_dir.join(timestamp);
    std::fs::create_dir_all(&target)?;
    for (relative_path, bytes) in bundle.dump() {
        let dest = target.join(&relative_path);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, bytes)?;
    }
    Ok(target)
}
