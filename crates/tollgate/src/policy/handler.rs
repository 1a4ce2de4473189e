//! Guard trait and decision type.

use crate::config::Settings;
use crate::request::ToolAction;

/// The result of a guard check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The action is allowed.
    Allow,
    /// The action is denied with a reason.
    Deny(String),
}

impl PolicyDecision {
    /// Returns true if the action is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }

    /// Returns the denial reason if denied, None if allowed.
    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            PolicyDecision::Allow => None,
            PolicyDecision::Deny(reason) => Some(reason),
        }
    }
}

/// A single guard rule.
///
/// Implementations must be cheap: a guard runs on every tool call and the
/// agent waits for the answer.
pub trait Guard: Send + Sync {
    /// Short, stable name used in logs.
    fn name(&self) -> &'static str;

    /// Check whether `action` is allowed under `settings`.
    fn check(&self, action: &ToolAction, settings: &Settings) -> PolicyDecision;
}

impl<G: Guard + ?Sized> Guard for Box<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn check(&self, action: &ToolAction, settings: &Settings) -> PolicyDecision {
        (**self).check(action, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_accessors() {
        assert!(PolicyDecision::Allow.is_allowed());
        assert_eq!(PolicyDecision::Allow.denial_reason(), None);

        let deny = PolicyDecision::Deny("BLOCKED: nope".to_string());
        assert!(!deny.is_allowed());
        assert_eq!(deny.denial_reason(), Some("BLOCKED: nope"));
    }
}
