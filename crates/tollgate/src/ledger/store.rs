//! Ledger records and the per-run record store.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::lock::LedgerLock;
use crate::error::GuardError;

/// Files charged to one run's read budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Run this record belongs to
    pub run_id: String,
    /// Distinct files already charged
    #[serde(default)]
    pub counted_files: BTreeSet<PathBuf>,
    /// Cumulative bytes charged
    #[serde(default)]
    pub total_bytes: u64,
}

impl LedgerRecord {
    /// Create an empty record for `run_id`.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            ..Default::default()
        }
    }

    /// Returns true if `path` has already been charged.
    pub fn contains(&self, path: &Path) -> bool {
        self.counted_files.contains(path)
    }

    /// Number of distinct files charged.
    pub fn file_count(&self) -> u64 {
        self.counted_files.len() as u64
    }

    /// Charge `path` at `size` bytes.
    ///
    /// Returns false (and changes nothing) if the path was already charged.
    pub fn charge(&mut self, path: PathBuf, size: u64) -> bool {
        if !self.counted_files.insert(path) {
            return false;
        }
        self.total_bytes = self.total_bytes.saturating_add(size);
        true
    }
}

/// File name stem for a run's record and lock.
///
/// Run ids made only of `[A-Za-z0-9._-]` are used as-is. Anything else is
/// replaced by a hash so distinct run ids never share a file.
pub fn run_key(run_id: &str) -> String {
    let safe = !run_id.is_empty()
        && run_id != "."
        && run_id != ".."
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if safe {
        return run_id.to_string();
    }
    let digest = Sha256::digest(run_id.as_bytes());
    format!("run-{}", &hex::encode(digest)[..16])
}

/// Store of ledger records, one JSON file per run under a state directory.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    state_dir: PathBuf,
    lock_timeout: Duration,
}

impl LedgerStore {
    /// Create a store rooted at `state_dir`.
    pub fn new(state_dir: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            state_dir: state_dir.into(),
            lock_timeout,
        }
    }

    /// Root directory of the store.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of the record file for `run_id`.
    pub fn record_path(&self, run_id: &str) -> PathBuf {
        self.state_dir.join(format!("{}.json", run_key(run_id)))
    }

    /// Path of the lock file for `run_id`.
    pub fn lock_path(&self, run_id: &str) -> PathBuf {
        self.state_dir.join(format!("{}.lock", run_key(run_id)))
    }

    /// Lock the run's ledger and load its record.
    ///
    /// The lock is held until the returned transaction is dropped. A missing
    /// record loads as empty; so does a corrupt one, after a warning.
    pub fn begin(&self, run_id: &str) -> Result<LedgerTxn, GuardError> {
        let lock = LedgerLock::acquire(&self.lock_path(run_id), self.lock_timeout)?;
        let path = self.record_path(run_id);
        let record = match read_record(&path, run_id) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    run_id,
                    error = %e,
                    "unreadable read budget ledger, starting from empty"
                );
                LedgerRecord::new(run_id)
            }
        };
        Ok(LedgerTxn {
            _lock: lock,
            path,
            record,
        })
    }

    /// Load a snapshot of the run's record.
    ///
    /// This takes the run's lock like [`LedgerStore::begin`], so it creates
    /// the state directory and the `.lock` file if they do not exist yet. The
    /// record file itself is never written.
    pub fn load(&self, run_id: &str) -> Result<LedgerRecord, GuardError> {
        Ok(self.begin(run_id)?.record)
    }
}

fn read_record(path: &Path, run_id: &str) -> Result<LedgerRecord, GuardError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LedgerRecord::new(run_id)),
        Err(e) => return Err(e.into()),
    };
    let record: LedgerRecord =
        serde_json::from_slice(&bytes).map_err(|source| GuardError::CorruptLedger {
            path: path.to_path_buf(),
            source,
        })?;
    if record.run_id != run_id {
        tracing::warn!(
            run_id,
            found = %record.run_id,
            "ledger record belongs to another run, ignoring it"
        );
        return Ok(LedgerRecord::new(run_id));
    }
    Ok(record)
}

/// A locked read-modify-write cycle on one run's ledger.
#[derive(Debug)]
pub struct LedgerTxn {
    _lock: LedgerLock,
    path: PathBuf,
    record: LedgerRecord,
}

impl LedgerTxn {
    /// The record as loaded (plus any uncommitted charges).
    pub fn record(&self) -> &LedgerRecord {
        &self.record
    }

    /// Charge `path` at `size` bytes in memory. See [`LedgerRecord::charge`].
    pub fn charge(&mut self, path: PathBuf, size: u64) -> bool {
        self.record.charge(path, size)
    }

    /// Persist the record and release the lock.
    ///
    /// The record is written to a sibling temp file and renamed into place.
    pub fn commit(self) -> Result<LedgerRecord, GuardError> {
        let payload = serde_json::to_vec_pretty(&self.record).map_err(GuardError::Serialize)?;
        let tmp = self.path.with_extension(format!("json.tmp.{}", std::process::id()));
        fs::write(&tmp, payload)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::debug!(
            path = %self.path.display(),
            files = self.record.file_count(),
            total_bytes = self.record.total_bytes,
            "committed read budget ledger"
        );
        Ok(self.record)
    }
}
