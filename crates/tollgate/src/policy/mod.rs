//! Guards deciding whether a tool action may proceed.
//!
//! Each guard is an independent predicate over a [`ToolAction`] and the run's
//! [`Settings`]. Guards answer with a [`PolicyDecision`]; they never return
//! errors. A guard that cannot be evaluated (missing file, unavailable lock,
//! unreadable ledger) allows the action and logs why.
//!
//! Evaluation faults fail open. Detected violations fail closed.
//!
//! | Guard                  | Applies to    | Configured by                       |
//! |------------------------|---------------|-------------------------------------|
//! | [`LargeFileGuard`]     | Read          | `MAX_READ_BYTES`                    |
//! | [`ReadBudgetGuard`]    | Read          | `READ_BUDGET_MAX_*`                 |
//! | [`TestEditGuard`]      | Edit, Write   | `TDD_PHASE=green`                   |
//! | [`ResearchWriteGuard`] | Write         | `EXP_PHASE=synthesize`              |
//! | [`MathWriteGuard`]     | Write         | `MATH_PHASE=survey`                 |
//!
//! [`ToolAction`]: crate::ToolAction
//! [`Settings`]: crate::Settings

mod budget;
mod handler;
mod large_file;
mod phase;

pub use budget::ReadBudgetGuard;
pub use handler::{Guard, PolicyDecision};
pub use large_file::LargeFileGuard;
pub use phase::{
    MathWriteGuard, ResearchWriteGuard, SYNTHESIS_DOCUMENT, TestEditGuard, is_test_file,
};
