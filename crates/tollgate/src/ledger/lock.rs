//! Bounded-wait exclusive lock on a run's ledger.
//!
//! Uses the `fs2` crate for cross-platform advisory file locking. The lock is
//! polled with `try_lock_exclusive` until a deadline so a stuck holder can
//! never block a tool call indefinitely.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another invocation held the lock for the whole wait
    #[error("timed out after {waited:?} waiting for ledger lock {}", path.display())]
    Timeout {
        /// Lock file path
        path: PathBuf,
        /// Time spent waiting
        waited: Duration,
    },

    /// The lock file could not be created
    #[error("failed to create lock file {}: {source}", path.display())]
    Create {
        /// Lock file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The lock call itself failed
    #[error("failed to acquire lock: {0}")]
    Acquire(#[source] io::Error),
}

/// A guard holding the exclusive lock on one run's ledger.
///
/// The lock is released when the guard is dropped, on every exit path.
#[derive(Debug)]
pub struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl LedgerLock {
    /// Acquire the lock at `path`, waiting at most `timeout`.
    ///
    /// The parent directory is created if needed.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LockError::Create {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Create {
                path: path.to_path_buf(),
                source,
            })?;

        let started = Instant::now();
        loop {
            // Fully qualified: std's File::try_lock_exclusive has a different error type
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "acquired ledger lock");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(LockError::Timeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    thread::sleep(POLL_INTERVAL.min(timeout - waited));
                }
                Err(e) => return Err(LockError::Acquire(e)),
            }
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        // The flock would also go away when `file` closes.
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to unlock ledger");
        }
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
