//! Run-scoped read budget.
//!
//! The check and the charge happen in one locked transaction on the run's
//! ledger, so parallel reads of different files in the same run cannot both
//! pass against a stale count.

use std::fs;
use std::path::Path;

use super::handler::{Guard, PolicyDecision};
use crate::config::Settings;
use crate::error::GuardError;
use crate::ledger::LedgerStore;
use crate::request::ToolAction;

/// Denies the first read of a new file that would push the run past
/// `READ_BUDGET_MAX_FILES` or `READ_BUDGET_MAX_TOTAL_BYTES`.
///
/// Only distinct files are charged: re-reading a counted file is free, and
/// allowlisted files are never charged. A denied read is not charged either.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadBudgetGuard;

impl ReadBudgetGuard {
    fn charge(&self, path: &Path, settings: &Settings) -> Result<PolicyDecision, GuardError> {
        let store = LedgerStore::new(&settings.state_dir, settings.lock_timeout);
        let mut txn = store.begin(&settings.run_id)?;

        if txn.record().contains(path) {
            return Ok(PolicyDecision::Allow);
        }

        // Missing and non-regular targets are charged at 0 bytes
        let size = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => 0,
        };
        let candidate_files = txn.record().file_count() + 1;
        let candidate_bytes = txn.record().total_bytes.saturating_add(size);

        if !settings.limits.budget_allows(candidate_files, candidate_bytes) {
            tracing::debug!(
                run_id = %settings.run_id,
                path = %path.display(),
                candidate_files,
                candidate_bytes,
                "read budget exceeded"
            );
            return Ok(PolicyDecision::Deny(format!(
                "BLOCKED: Read budget exceeded for run '{}': reading {} would make {candidate_files} \
                 files / {candidate_bytes} bytes (limits: {} files / {} bytes). \
                 Work from files already read or add this one to MUST_READ_ALLOWLIST.",
                settings.run_id,
                path.display(),
                display_limit(settings.limits.max_files),
                display_limit(settings.limits.max_total_bytes),
            )));
        }

        txn.charge(path.to_path_buf(), size);
        if let Err(e) = txn.commit() {
            // The read is within budget; only the bookkeeping failed.
            tracing::warn!(run_id = %settings.run_id, error = %e, "failed to persist read budget");
        }
        Ok(PolicyDecision::Allow)
    }
}

impl Guard for ReadBudgetGuard {
    fn name(&self) -> &'static str {
        "read-budget"
    }

    fn check(&self, action: &ToolAction, settings: &Settings) -> PolicyDecision {
        let Some(path) = action.read_target() else {
            return PolicyDecision::Allow;
        };
        if !settings.limits.has_budget() {
            return PolicyDecision::Allow;
        }
        // Allowlisted reads skip the ledger entirely, lock included.
        if settings.is_allowlisted(path) {
            return PolicyDecision::Allow;
        }

        match self.charge(path, settings) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    run_id = %settings.run_id,
                    path = %path.display(),
                    error = %e,
                    "read budget not evaluated, allowing"
                );
                PolicyDecision::Allow
            }
        }
    }
}

fn display_limit(limit: Option<u64>) -> String {
    limit.map_or_else(|| "unlimited".to_string(), |l| l.to_string())
}
