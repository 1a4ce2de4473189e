//! Ordered guard evaluation.

use std::fmt;

use crate::config::Settings;
use crate::policy::{
    Guard, LargeFileGuard, MathWriteGuard, PolicyDecision, ReadBudgetGuard, ResearchWriteGuard,
    TestEditGuard,
};
use crate::request::{ActionKind, ToolAction};

/// Outcome of evaluating every guard against one action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    decision: PolicyDecision,
    denied_by: Option<&'static str>,
}

impl Verdict {
    fn allow() -> Self {
        Self {
            decision: PolicyDecision::Allow,
            denied_by: None,
        }
    }

    /// Returns true if the action may proceed.
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }

    /// The reason to report, if denied.
    pub fn denial_reason(&self) -> Option<&str> {
        self.decision.denial_reason()
    }

    /// Name of the guard that denied the action.
    pub fn denied_by(&self) -> Option<&'static str> {
        self.denied_by
    }

    /// The underlying decision.
    pub fn decision(&self) -> &PolicyDecision {
        &self.decision
    }
}

/// Runs guards in a fixed order; the first denial wins.
///
/// Guards after a denial are not run, so a denied read is never charged to
/// the read budget by a later guard and vice versa.
pub struct Evaluator {
    guards: Vec<Box<dyn Guard>>,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.guards.iter().map(|g| g.name()).collect();
        f.debug_struct("Evaluator").field("guards", &names).finish()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::standard()
    }
}

impl Evaluator {
    /// Create an evaluator with no guards (allows everything).
    pub fn empty() -> Self {
        Self { guards: Vec::new() }
    }

    /// The standard guard chain: large-file, read-budget, then the phase
    /// guards (test-edit, research-write, math-write).
    pub fn standard() -> Self {
        Self::empty()
            .with_guard(LargeFileGuard)
            .with_guard(ReadBudgetGuard)
            .with_guard(TestEditGuard)
            .with_guard(ResearchWriteGuard)
            .with_guard(MathWriteGuard)
    }

    /// Append a guard to the chain.
    pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    /// Names of the guards, in evaluation order.
    pub fn guard_names(&self) -> Vec<&'static str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    /// Evaluate `action` under `settings`.
    pub fn evaluate(&self, action: &ToolAction, settings: &Settings) -> Verdict {
        if action.kind == ActionKind::Other {
            tracing::debug!(tool = %action.tool_name, "tool not guarded");
            return Verdict::allow();
        }

        for guard in &self.guards {
            if let PolicyDecision::Deny(reason) = guard.check(action, settings) {
                tracing::debug!(
                    guard = guard.name(),
                    tool = %action.tool_name,
                    target = ?action.target,
                    reason = %reason,
                    "guard denied tool call"
                );
                return Verdict {
                    decision: PolicyDecision::Deny(reason),
                    denied_by: Some(guard.name()),
                };
            }
        }

        tracing::debug!(tool = %action.tool_name, target = ?action.target, "tool call allowed");
        Verdict::allow()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ledger::LedgerStore;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Counting {
        name: &'static str,
        calls: Arc<AtomicUsize>,
        decision: PolicyDecision,
    }

    impl Guard for Counting {
        fn name(&self) -> &'static str {
            self.name
        }

        fn check(&self, _action: &ToolAction, _settings: &Settings) -> PolicyDecision {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.decision.clone()
        }
    }

    fn settings(dir: &Path, vars: &[(&str, &str)]) -> Settings {
        let state = dir.join("state").to_string_lossy().into_owned();
        let mut all: Vec<(&str, &str)> = vec![("READ_BUDGET_STATE_DIR", state.as_str())];
        all.extend_from_slice(vars);
        Settings::from_vars(all, dir)
    }

    fn read(path: &Path) -> ToolAction {
        ToolAction::new("Read", ActionKind::Read, Some(path.to_path_buf()))
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            Evaluator::standard().guard_names(),
            vec![
                "large-file",
                "read-budget",
                "tdd-green",
                "exp-synthesize",
                "math-survey"
            ]
        );
    }

    #[test]
    fn test_first_denial_short_circuits() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let evaluator = Evaluator::empty()
            .with_guard(Counting {
                name: "first",
                calls: Arc::clone(&first),
                decision: PolicyDecision::Deny("BLOCKED: first".to_string()),
            })
            .with_guard(Counting {
                name: "second",
                calls: Arc::clone(&second),
                decision: PolicyDecision::Deny("BLOCKED: second".to_string()),
            });

        let dir = TempDir::new().unwrap();
        let verdict = evaluator.evaluate(&read(&dir.path().join("a")), &settings(dir.path(), &[]));

        assert_eq!(verdict.denial_reason(), Some("BLOCKED: first"));
        assert_eq!(verdict.denied_by(), Some("first"));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_other_tools_are_never_blocked() {
        let dir = TempDir::new().unwrap();
        let s = settings(
            dir.path(),
            &[
                ("MAX_READ_BYTES", "0"),
                ("READ_BUDGET_MAX_FILES", "0"),
                ("TDD_PHASE", "green"),
                ("EXP_PHASE", "synthesize"),
                ("MATH_PHASE", "survey"),
            ],
        );
        let action = ToolAction::parse(
            "Bash",
            &serde_json::json!({ "command": "rm -rf tests", "file_path": "tests/x_test.py" }),
            dir.path(),
        );

        assert!(Evaluator::standard().evaluate(&action, &s).is_allowed());
    }

    #[test]
    fn test_large_file_denial_is_not_charged_to_budget() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.log");
        fs::write(&big, vec![b'x'; 1024]).unwrap();
        let s = settings(
            dir.path(),
            &[("MAX_READ_BYTES", "100"), ("READ_BUDGET_MAX_FILES", "5")],
        );

        let verdict = Evaluator::standard().evaluate(&read(&big), &s);
        assert_eq!(verdict.denied_by(), Some("large-file"));

        let ledger = LedgerStore::new(&s.state_dir, s.lock_timeout)
            .load(&s.run_id)
            .unwrap();
        assert_eq!(ledger.file_count(), 0);
    }

    #[test]
    fn test_empty_configuration_allows_everything() {
        let dir = TempDir::new().unwrap();
        let s = settings(dir.path(), &[]);

        for tool in ["Read", "Edit", "MultiEdit", "Write"] {
            let action = ToolAction::parse(
                tool,
                &serde_json::json!({ "file_path": "tests/foo_test.py" }),
                dir.path(),
            );
            let verdict = Evaluator::standard().evaluate(&action, &s);
            assert!(verdict.is_allowed(), "{tool}");
            assert_eq!(verdict.denied_by(), None);
        }
    }

    #[test]
    fn test_phase_denials_are_reported() {
        let dir = TempDir::new().unwrap();
        let s = settings(dir.path(), &[("TDD_PHASE", "green"), ("MATH_PHASE", "survey")]);
        let write = ToolAction::parse(
            "Write",
            &serde_json::json!({ "file_path": "tests/foo_test.py" }),
            dir.path(),
        );

        let verdict = Evaluator::standard().evaluate(&write, &s);
        assert_eq!(verdict.denied_by(), Some("tdd-green"));
        assert!(
            verdict
                .denial_reason()
                .unwrap()
                .contains("Cannot edit test files during GREEN phase")
        );

        let lean = ToolAction::parse(
            "Write",
            &serde_json::json!({ "file_path": "Foo.lean" }),
            dir.path(),
        );
        assert_eq!(
            Evaluator::standard().evaluate(&lean, &s).denied_by(),
            Some("math-survey")
        );
    }
}
