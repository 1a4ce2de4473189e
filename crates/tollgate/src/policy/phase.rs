//! Workflow phase guards.
//!
//! Each guard watches one phase variable and, when it holds the blocking
//! value, restricts which writes are permitted. The guards are stateless and
//! independent; any combination of phases may be set at once.

use std::path::{Component, Path};
use std::sync::LazyLock;

use glob::{MatchOptions, Pattern};

use super::handler::{Guard, PolicyDecision};
use crate::config::{Phase, Settings};
use crate::request::{ActionKind, ToolAction};

/// The only file that may be written while `EXP_PHASE=synthesize`.
pub const SYNTHESIS_DOCUMENT: &str = "SYNTHESIS.md";

/// Directory names whose contents count as tests.
const TEST_DIRS: [&str; 4] = ["tests", "test", "__tests__", "spec"];

/// File name patterns that count as tests.
const TEST_FILE_PATTERNS: [&str; 8] = [
    "test_*",
    "*_test.*",
    "*.test.*",
    "*_spec.*",
    "*.spec.*",
    "*Test.*",
    "*Tests.*",
    "conftest.py",
];

static TEST_FILE_GLOBS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
    TEST_FILE_PATTERNS
        .iter()
        .filter_map(|p| Pattern::new(p).ok())
        .collect()
});

const FILE_NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

fn phase_is(phase: Option<&Phase>, name: &str) -> bool {
    phase.is_some_and(|p| p.is(name))
}

/// Returns true if `path` follows a test file naming convention.
///
/// Only the part of `path` below `working_dir` is inspected for test
/// directories, so a checkout that itself lives under `/tmp/test/` does not
/// turn every file into a test.
pub fn is_test_file(path: &Path, working_dir: &Path) -> bool {
    let relative = path.strip_prefix(working_dir).unwrap_or(path);

    let in_test_dir = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .any(|c| matches!(c, Component::Normal(dir) if TEST_DIRS.iter().any(|t| dir == *t)));
    if in_test_dir {
        return true;
    }

    relative
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            TEST_FILE_GLOBS
                .iter()
                .any(|glob| glob.matches_with(name, FILE_NAME_MATCH))
        })
}

/// Blocks edits and writes to test files while `TDD_PHASE=green`.
///
/// In the green phase the implementation is made to pass the tests that
/// already exist; the tests themselves are frozen.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestEditGuard;

impl Guard for TestEditGuard {
    fn name(&self) -> &'static str {
        "tdd-green"
    }

    fn check(&self, action: &ToolAction, settings: &Settings) -> PolicyDecision {
        if !phase_is(settings.tdd_phase.as_ref(), "green") || !action.kind.is_write() {
            return PolicyDecision::Allow;
        }
        let Some(path) = action.target.as_deref() else {
            return PolicyDecision::Allow;
        };

        if is_test_file(path, &settings.working_dir) {
            PolicyDecision::Deny(format!(
                "BLOCKED: Cannot edit test files during GREEN phase ({}). \
                 Change the implementation until the existing tests pass.",
                path.display()
            ))
        } else {
            PolicyDecision::Allow
        }
    }
}

/// Restricts writes to [`SYNTHESIS_DOCUMENT`] while `EXP_PHASE=synthesize`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResearchWriteGuard;

impl Guard for ResearchWriteGuard {
    fn name(&self) -> &'static str {
        "exp-synthesize"
    }

    fn check(&self, action: &ToolAction, settings: &Settings) -> PolicyDecision {
        let synthesizing = phase_is(settings.exp_phase.as_ref(), "synthesize");
        if !synthesizing || action.kind != ActionKind::Write {
            return PolicyDecision::Allow;
        }
        let Some(path) = action.target.as_deref() else {
            return PolicyDecision::Allow;
        };

        if path.file_name().is_some_and(|name| name == SYNTHESIS_DOCUMENT) {
            PolicyDecision::Allow
        } else {
            PolicyDecision::Deny(format!(
                "BLOCKED: EXP_PHASE=synthesize: you may only write to {SYNTHESIS_DOCUMENT} \
                 (attempted {}).",
                path.display()
            ))
        }
    }
}

/// Blocks every write while `MATH_PHASE=survey`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MathWriteGuard;

impl Guard for MathWriteGuard {
    fn name(&self) -> &'static str {
        "math-survey"
    }

    fn check(&self, action: &ToolAction, settings: &Settings) -> PolicyDecision {
        if phase_is(settings.math_phase.as_ref(), "survey") && action.kind == ActionKind::Write {
            PolicyDecision::Deny(
                "BLOCKED: SURVEY phase is read-only (MATH_PHASE=survey). \
                 Record findings after moving to the next phase."
                    .to_string(),
            )
        } else {
            PolicyDecision::Allow
        }
    }
}
