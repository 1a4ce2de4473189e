//! Per-file size cap for reads.

use std::fs;

use super::handler::{Guard, PolicyDecision};
use crate::config::Settings;
use crate::request::ToolAction;

/// Denies reads of files larger than `MAX_READ_BYTES`.
///
/// Allowlisted paths are never blocked. A target that cannot be sized (missing,
/// unreadable, not a regular file) is allowed; the read itself will fail or
/// succeed on its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargeFileGuard;

impl Guard for LargeFileGuard {
    fn name(&self) -> &'static str {
        "large-file"
    }

    fn check(&self, action: &ToolAction, settings: &Settings) -> PolicyDecision {
        let (Some(path), Some(limit)) = (action.read_target(), settings.limits.max_read_bytes)
        else {
            return PolicyDecision::Allow;
        };
        if settings.is_allowlisted(path) {
            return PolicyDecision::Allow;
        }

        let size = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return PolicyDecision::Allow,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot size read target");
                return PolicyDecision::Allow;
            }
        };

        if settings.limits.is_large_file(size) {
            PolicyDecision::Deny(format!(
                "BLOCKED: Read of large file {} ({size} bytes > MAX_READ_BYTES={limit}). \
                 Read a slice with offset/limit, search it instead, or add it to MUST_READ_ALLOWLIST.",
                path.display()
            ))
        } else {
            PolicyDecision::Allow
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::request::ActionKind;
    use std::path::Path;
    use tempfile::TempDir;

    fn settings(dir: &Path, vars: &[(&str, &str)]) -> Settings {
        Settings::from_vars(vars.iter().copied(), dir)
    }

    fn read(path: &Path) -> ToolAction {
        ToolAction::new("Read", ActionKind::Read, Some(path.to_path_buf()))
    }

    #[test]
    fn test_large_file_is_blocked() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.log");
        fs::write(&big, vec![b'x'; 1024]).unwrap();

        let decision = LargeFileGuard.check(
            &read(&big),
            &settings(dir.path(), &[("MAX_READ_BYTES", "100")]),
        );

        let reason = decision.denial_reason().unwrap();
        assert!(reason.starts_with("BLOCKED: Read of large file"));
        assert!(reason.contains("big.log"));
        assert!(reason.contains("1024 bytes"));
        assert!(reason.contains("MAX_READ_BYTES=100"));
    }

    #[test]
    fn test_file_at_limit_is_allowed() {
        let dir = TempDir::new().unwrap();
        let exact = dir.path().join("exact.txt");
        fs::write(&exact, vec![b'x'; 100]).unwrap();

        let decision = LargeFileGuard.check(
            &read(&exact),
            &settings(dir.path(), &[("MAX_READ_BYTES", "100")]),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_allowlisted_large_file_is_allowed() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.log");
        fs::write(&big, vec![b'x'; 1024]).unwrap();
        let allowlist = big.to_string_lossy().into_owned();

        let decision = LargeFileGuard.check(
            &read(&big),
            &settings(
                dir.path(),
                &[("MAX_READ_BYTES", "100"), ("MUST_READ_ALLOWLIST", allowlist.as_str())],
            ),
        );
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_missing_file_and_directories_are_allowed() {
        let dir = TempDir::new().unwrap();
        let s = settings(dir.path(), &[("MAX_READ_BYTES", "0")]);

        assert!(
            LargeFileGuard
                .check(&read(&dir.path().join("missing.txt")), &s)
                .is_allowed()
        );
        assert!(LargeFileGuard.check(&read(dir.path()), &s).is_allowed());
    }

    #[test]
    fn test_guard_disabled_without_limit_or_for_writes() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.log");
        fs::write(&big, vec![b'x'; 1024]).unwrap();

        assert!(
            LargeFileGuard
                .check(&read(&big), &settings(dir.path(), &[]))
                .is_allowed()
        );

        let write = ToolAction::new("Write", ActionKind::Write, Some(big.clone()));
        assert!(
            LargeFileGuard
                .check(&write, &settings(dir.path(), &[("MAX_READ_BYTES", "1")]))
                .is_allowed()
        );
    }
}
