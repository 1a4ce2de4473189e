//! Persistent, run-scoped read budget ledger.
//!
//! Each run id owns one JSON record under the state directory. Invocations
//! sharing a run id serialize their read-modify-write cycle through an
//! exclusive lock file next to the record:
//!
//! ```text
//! <state_dir>/<run key>.json   counted files and total bytes
//! <state_dir>/<run key>.lock   advisory lock (flock)
//! ```
//!
//! The ledger only ever grows within a run. Nothing removes records; a run's
//! record goes stale once its run id stops being used.

mod lock;
mod store;

pub use lock::{LedgerLock, LockError};
pub use store::{LedgerRecord, LedgerStore, LedgerTxn, run_key};
