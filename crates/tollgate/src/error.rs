//! Evaluation faults.
//!
//! A fault means a guard could not be evaluated. It is never a denial: guards
//! log the fault and allow the action.

use std::path::PathBuf;

use thiserror::Error;

use crate::ledger::LockError;

/// Errors that can occur while evaluating a guard
#[derive(Debug, Error)]
pub enum GuardError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The run's ledger lock could not be acquired
    #[error("ledger lock error: {0}")]
    Lock(#[from] LockError),
    /// A ledger record exists but could not be decoded
    #[error("corrupt ledger record {}: {source}", path.display())]
    CorruptLedger {
        /// Path of the record file
        path: PathBuf,
        /// Decoding error
        #[source]
        source: serde_json::Error,
    },
    /// A ledger record could not be encoded
    #[error("failed to serialize ledger record: {0}")]
    Serialize(#[source] serde_json::Error),
}
