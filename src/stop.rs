//! Cooperative cancellation
//!
//! A [`StopToken`] is read by the batch runner between files. An operator can flip
//! it from another thread, or by creating the stop file watched by a
//! [`StopFileWatcher`].

use log::{debug, info, warn};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default stop-file name, relative to the working directory
pub const DEFAULT_STOP_FILE: &str = ".xml-audit.stop";

/// Acknowledgement of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StopAck {
    Stopping,
}

/// Shared stop flag
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the current run to stop before its next file
    pub fn request_stop(&self) -> StopAck {
        self.flag.store(true, Ordering::SeqCst);
        StopAck::Stopping
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear a previous request
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Create the stop file watched by a running audit
pub fn request_stop_file(path: &Path) -> std::io::Result<StopAck> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"stop\n")?;
    Ok(StopAck::Stopping)
}

/// Flips a [`StopToken`] when a stop file appears
pub struct StopFileWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    path: PathBuf,
}

impl StopFileWatcher {
    /// Start watching `path`.
    ///
    /// A stop file left over from an earlier run is removed first.
    pub fn spawn(path: &Path, token: StopToken) -> Result<Self, notify::Error> {
        if path.exists() {
            debug!("Removing stale stop file {}", path.display());
            std::fs::remove_file(path).map_err(notify::Error::io)?;
        }

        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|n| n.to_os_string());

        let (tx, rx) = mpsc::channel::<Result<Vec<DebouncedEvent>, notify::Error>>();
        let mut debouncer = new_debouncer(Duration::from_millis(200), tx)?;
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)?;

        let stop_path = path.to_path_buf();
        thread::spawn(move || {
            // Ends when the debouncer, and with it the sender, is dropped
            for result in rx {
                match result {
                    Ok(events) => {
                        let hit = events
                            .iter()
                            .any(|e| e.path.file_name().map(|n| n.to_os_string()) == file_name);
                        if hit && stop_path.exists() {
                            info!("Stop file {} detected", stop_path.display());
                            token.request_stop();
                        }
                    }
                    Err(e) => warn!("Stop file watcher error: {}", e),
                }
            }
        });

        Ok(Self {
            _debouncer: debouncer,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StopFileWatcher {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
