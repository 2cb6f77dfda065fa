//! Session ownership gate.
//!
//! A session belongs to exactly one owner. Every caller-facing operation is
//! checked here before it touches session state; once an owner is recorded it
//! never changes for the life of the session.

use serde::{Deserialize, Serialize};

/// WebSocket close code a transport should use for a denied connection
/// (policy violation).
pub const POLICY_VIOLATION_CLOSE_CODE: u16 = 1008;

/// Message sent to a denied caller.
pub const DENIED_MESSAGE: &str = "This chat is not yours.";

/// How a session acquires its owner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerPolicy {
    /// The owner must be established out of band; unowned sessions deny
    /// every caller.
    Strict,
    /// The first caller to reach an unowned session becomes its owner.
    #[default]
    ClaimOnFirstUse,
}

/// Result of an authorization check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// The caller is the owner.
    Allow,
    /// The session is unowned; the caller should be recorded as owner.
    Claim,
    /// The caller is not the owner.
    Deny,
}

/// Checks callers against the session owner.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionGate {
    policy: OwnerPolicy,
}

impl SessionGate {
    /// Create a gate with the given policy.
    #[must_use]
    pub fn new(policy: OwnerPolicy) -> Self {
        Self { policy }
    }

    /// Decide whether `caller` may operate on a session owned by `owner`.
    ///
    /// Empty caller identities are always denied; they would otherwise be
    /// recordable as an owner that can never authenticate again.
    #[must_use]
    pub fn authorize(&self, owner: Option<&str>, caller: &str) -> GateDecision {
        if caller.is_empty() {
            return GateDecision::Deny;
        }
        match owner {
            Some(o) if o == caller => GateDecision::Allow,
            Some(_) => GateDecision::Deny,
            None => match self.policy {
                OwnerPolicy::ClaimOnFirstUse => GateDecision::Claim,
                OwnerPolicy::Strict => GateDecision::Deny,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_allowed() {
        let gate = SessionGate::default();
        assert_eq!(gate.authorize(Some("alice"), "alice"), GateDecision::Allow);
    }

    #[test]
    fn non_owner_is_denied() {
        let gate = SessionGate::default();
        assert_eq!(gate.authorize(Some("alice"), "mallory"), GateDecision::Deny);
    }

    #[test]
    fn unowned_session_claims_first_caller() {
        let gate = SessionGate::new(OwnerPolicy::ClaimOnFirstUse);
        assert_eq!(gate.authorize(None, "alice"), GateDecision::Claim);
    }

    #[test]
    fn strict_policy_denies_unowned_access() {
        let gate = SessionGate::new(OwnerPolicy::Strict);
        assert_eq!(gate.authorize(None, "alice"), GateDecision::Deny);
    }

    #[test]
    fn empty_caller_is_denied_under_both_policies() {
        assert_eq!(
            SessionGate::new(OwnerPolicy::ClaimOnFirstUse).authorize(None, ""),
            GateDecision::Deny
        );
        assert_eq!(
            SessionGate::new(OwnerPolicy::Strict).authorize(Some("alice"), ""),
            GateDecision::Deny
        );
    }

    #[test]
    fn close_code_is_policy_violation() {
        assert_eq!(POLICY_VIOLATION_CLOSE_CODE, 1008);
        assert_eq!(DENIED_MESSAGE, "This chat is not yours.");
    }
}
