//! Run configuration collected from the environment.
//!
//! [`Settings`] is built once per invocation and passed by reference to every
//! guard. Guards never read the environment themselves.
//!
//! Missing keys disable the dimension they configure. Malformed numeric values
//! are logged and treated as missing, so a typo in the run configuration
//! weakens a guard instead of blocking every tool call.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::limits::ReadLimits;
use crate::paths::absolutize;

/// Names of the recognized environment variables.
pub mod keys {
    /// Per-file size cap for reads, in bytes
    pub const MAX_READ_BYTES: &str = "MAX_READ_BYTES";
    /// Paths exempt from the size cap and the read budget.
    ///
    /// Entries are separated by `:`, `,` or newlines, so an allowlisted path
    /// cannot itself contain one of those characters.
    pub const MUST_READ_ALLOWLIST: &str = "MUST_READ_ALLOWLIST";
    /// Maximum distinct files per run
    pub const READ_BUDGET_MAX_FILES: &str = "READ_BUDGET_MAX_FILES";
    /// Maximum cumulative bytes per run
    pub const READ_BUDGET_MAX_TOTAL_BYTES: &str = "READ_BUDGET_MAX_TOTAL_BYTES";
    /// Directory holding ledger records
    pub const READ_BUDGET_STATE_DIR: &str = "READ_BUDGET_STATE_DIR";
    /// Bounded wait for the ledger lock, in milliseconds
    pub const READ_BUDGET_LOCK_TIMEOUT_MS: &str = "READ_BUDGET_LOCK_TIMEOUT_MS";
    /// Identifier partitioning ledger state between runs
    pub const RUN_ID: &str = "RUN_ID";
    /// Current phase of the TDD workflow
    pub const TDD_PHASE: &str = "TDD_PHASE";
    /// Current phase of the research workflow
    pub const EXP_PHASE: &str = "EXP_PHASE";
    /// Current phase of the math workflow
    pub const MATH_PHASE: &str = "MATH_PHASE";

    pub(crate) const ALL: [&str; 10] = [
        MAX_READ_BYTES,
        MUST_READ_ALLOWLIST,
        READ_BUDGET_MAX_FILES,
        READ_BUDGET_MAX_TOTAL_BYTES,
        READ_BUDGET_STATE_DIR,
        READ_BUDGET_LOCK_TIMEOUT_MS,
        RUN_ID,
        TDD_PHASE,
        EXP_PHASE,
        MATH_PHASE,
    ];
}

/// Run id used when `RUN_ID` is unset.
pub const DEFAULT_RUN_ID: &str = "default";

/// Lock wait used when `READ_BUDGET_LOCK_TIMEOUT_MS` is unset.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

/// A workflow phase name, compared case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Phase(String);

impl Phase {
    /// Parse a phase value. Blank values mean "no phase".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_ascii_lowercase()))
        }
    }

    /// Returns true if this phase is `name` (case-insensitive).
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }

    /// The normalized (lowercase) phase name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable settings snapshot for one guard invocation.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Size and budget caps
    pub limits: ReadLimits,
    /// Absolute, normalized paths exempt from size and budget guards
    pub allowlist: BTreeSet<PathBuf>,
    /// Ledger partition key
    pub run_id: String,
    /// Root directory for ledger records
    pub state_dir: PathBuf,
    /// Bounded wait for the ledger lock
    pub lock_timeout: Duration,
    /// TDD workflow phase
    pub tdd_phase: Option<Phase>,
    /// Research workflow phase
    pub exp_phase: Option<Phase>,
    /// Math workflow phase
    pub math_phase: Option<Phase>,
    /// Base for resolving relative paths
    pub working_dir: PathBuf,
}

impl Settings {
    /// Build settings from the process environment and current directory.
    pub fn from_env() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cannot read current directory, resolving paths from /");
            PathBuf::from("/")
        });
        // vars_os: non-UTF-8 values are skipped rather than panicking
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_vars(vars, working_dir)
    }

    /// Build settings from explicit key/value pairs.
    ///
    /// Unrecognized keys are ignored. Relative paths resolve against
    /// `working_dir`.
    pub fn from_vars<I, K, V>(vars: I, working_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let working_dir = absolutize(&working_dir.into(), Path::new("/"));
        let vars: HashMap<&'static str, String> = vars
            .into_iter()
            .filter_map(|(k, v)| {
                let key = keys::ALL.iter().find(|known| **known == k.as_ref())?;
                Some((*key, v.into()))
            })
            .collect();
        let get = |key: &'static str| vars.get(key).map(String::as_str);

        let limits = ReadLimits {
            max_read_bytes: get(keys::MAX_READ_BYTES)
                .and_then(|v| parse_u64(keys::MAX_READ_BYTES, v)),
            max_files: get(keys::READ_BUDGET_MAX_FILES)
                .and_then(|v| parse_u64(keys::READ_BUDGET_MAX_FILES, v)),
            max_total_bytes: get(keys::READ_BUDGET_MAX_TOTAL_BYTES)
                .and_then(|v| parse_u64(keys::READ_BUDGET_MAX_TOTAL_BYTES, v)),
        };

        let allowlist = get(keys::MUST_READ_ALLOWLIST)
            .map(|raw| parse_allowlist(raw, &working_dir))
            .unwrap_or_default();

        let run_id = get(keys::RUN_ID)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_RUN_ID)
            .to_string();

        let state_dir = get(keys::READ_BUDGET_STATE_DIR)
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(|dir| absolutize(Path::new(dir), &working_dir))
            .unwrap_or_else(default_state_dir);

        let lock_timeout = get(keys::READ_BUDGET_LOCK_TIMEOUT_MS)
            .and_then(|v| parse_u64(keys::READ_BUDGET_LOCK_TIMEOUT_MS, v))
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT);

        Self {
            limits,
            allowlist,
            run_id,
            state_dir,
            lock_timeout,
            tdd_phase: get(keys::TDD_PHASE).and_then(Phase::parse),
            exp_phase: get(keys::EXP_PHASE).and_then(Phase::parse),
            math_phase: get(keys::MATH_PHASE).and_then(Phase::parse),
            working_dir,
        }
    }

    /// Returns true if `path` is exempt from the size and budget guards.
    pub fn is_allowlisted(&self, path: &Path) -> bool {
        self.allowlist.contains(path)
    }
}

fn default_state_dir() -> PathBuf {
    std::env::temp_dir().join("tollgate-read-budget")
}

fn parse_u64(key: &str, raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = raw, error = %e, "ignoring malformed numeric setting");
            None
        }
    }
}

fn parse_allowlist(raw: &str, working_dir: &Path) -> BTreeSet<PathBuf> {
    raw.split([':', ',', '\n', '\r'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| absolutize(Path::new(entry), working_dir))
        .collect()
}
