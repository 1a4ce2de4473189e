//! Read limits enforced by the large-file and read-budget guards

use serde::{Deserialize, Serialize};

/// Numeric read caps for a run.
///
/// Every cap is optional; an unset cap disables the corresponding check.
/// Caps are inclusive: a value equal to the cap is still within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadLimits {
    /// Maximum size in bytes of a single file that may be read
    pub max_read_bytes: Option<u64>,
    /// Maximum number of distinct files charged to the run's budget
    pub max_files: Option<u64>,
    /// Maximum cumulative bytes charged to the run's budget
    pub max_total_bytes: Option<u64>,
}

impl ReadLimits {
    /// Returns true if either budget cap is configured.
    pub fn has_budget(&self) -> bool {
        self.max_files.is_some() || self.max_total_bytes.is_some()
    }

    /// Returns true if a file of `size` bytes is above the per-file cap.
    pub fn is_large_file(&self, size: u64) -> bool {
        self.max_read_bytes.is_some_and(|max| size > max)
    }

    /// Returns true if a ledger holding `files` files and `total_bytes`
    /// bytes stays within both budget caps.
    pub fn budget_allows(&self, files: u64, total_bytes: u64) -> bool {
        let files_ok = self.max_files.is_none_or(|max| files <= max);
        let bytes_ok = self.max_total_bytes.is_none_or(|max| total_bytes <= max);
        files_ok && bytes_ok
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_disable_everything() {
        let limits = ReadLimits::default();

        assert!(!limits.has_budget());
        assert!(!limits.is_large_file(u64::MAX));
        assert!(limits.budget_allows(u64::MAX, u64::MAX));
    }

    #[test]
    fn test_large_file_cap_is_inclusive() {
        let limits = ReadLimits {
            max_read_bytes: Some(100),
            ..Default::default()
        };

        assert!(!limits.is_large_file(100));
        assert!(limits.is_large_file(101));
    }

    #[test]
    fn test_budget_caps_are_inclusive() {
        let limits = ReadLimits {
            max_files: Some(2),
            max_total_bytes: Some(100),
            ..Default::default()
        };

        assert!(limits.has_budget());
        assert!(limits.budget_allows(2, 100));
        assert!(!limits.budget_allows(3, 100));
        assert!(!limits.budget_allows(2, 101));
    }

    #[test]
    fn test_single_cap_enables_budget() {
        let files_only = ReadLimits {
            max_files: Some(1),
            ..Default::default()
        };
        assert!(files_only.has_budget());
        assert!(files_only.budget_allows(1, u64::MAX));

        let bytes_only = ReadLimits {
            max_total_bytes: Some(10),
            ..Default::default()
        };
        assert!(bytes_only.has_budget());
        assert!(bytes_only.budget_allows(1000, 10));
    }

    #[test]
    fn test_limits_serialization_format() {
        let limits = ReadLimits {
            max_read_bytes: Some(1000),
            max_files: Some(1),
            max_total_bytes: None,
        };

        let json = serde_json::to_string(&limits).unwrap();
        assert!(json.contains("\"max_files\":1"));
        assert!(json.contains("\"max_total_bytes\":null"));
    }
}
