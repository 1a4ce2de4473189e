//! Tollgate: pre-tool-use policy engine
//!
//! Tollgate runs synchronously before an agent performs a tool action and
//! decides whether the action may proceed. It bounds how much an agent may
//! read in one run (per-file size cap and a persistent, run-scoped read
//! budget) and blocks writes that would break a declared workflow phase.
//!
//! The typical flow is:
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tollgate::{Evaluator, Settings, ToolAction};
//!
//! let settings = Settings::from_env();
//! let action = ToolAction::parse(
//!     "Read",
//!     &json!({ "file_path": "/repo/big.log" }),
//!     &settings.working_dir,
//! );
//! let verdict = Evaluator::standard().evaluate(&action, &settings);
//! if let Some(reason) = verdict.denial_reason() {
//!     eprintln!("{reason}");
//! }
//! ```

mod config;
mod error;
mod evaluator;
mod limits;
mod paths;
mod request;

pub mod ledger;
pub mod policy;

pub use config::{DEFAULT_LOCK_TIMEOUT, DEFAULT_RUN_ID, Phase, Settings, keys};
pub use error::GuardError;
pub use evaluator::{Evaluator, Verdict};
pub use limits::ReadLimits;
pub use paths::absolutize;
pub use request::{ActionKind, ToolAction};
