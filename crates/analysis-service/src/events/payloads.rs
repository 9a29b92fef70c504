//! # Call and Receipt Payloads
//!
//! Serializable shapes exchanged with whoever drives the module: inbound
//! [`RuntimeCall`]s, and the receipts or rejections produced for them.
//! Digests travel as hex strings.

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use shared_types::{Balance, Hash, Identity, TokenId};

use crate::domain::{AccountRecord, InclusionPath, RejectionKind, TransitionError};

// ============================================================
// INBOUND
// ============================================================

/// A single call into the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RuntimeCall {
    Analysis {
        account: AccountRecord,
        path: InclusionPath,
        counter: u64,
        token_id: TokenId,
    },
    AddBalance {
        caller: Identity,
        token_id: TokenId,
        address: Identity,
        amount: Balance,
    },
}

impl RuntimeCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::Analysis { .. } => "analysis",
            Self::AddBalance { .. } => "add_balance",
        }
    }
}

// ============================================================
// OUTBOUND
// ============================================================

/// Receipt of a committed gated transition.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisCommitted {
    pub identity: Identity,
    pub leaf_index: u64,
    #[serde_as(as = "Hex")]
    pub previous_root: Hash,
    #[serde_as(as = "Hex")]
    pub new_root: Hash,
    /// Record as stored after the call.
    pub account: AccountRecord,
    /// Amount moved to `recipient`.
    pub amount: Balance,
    pub recipient: Identity,
    pub token_id: TokenId,
}

/// Receipt of a successful mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMinted {
    pub caller: Identity,
    pub token_id: TokenId,
    pub address: Identity,
    pub amount: Balance,
    pub new_balance: Balance,
}

/// Rejection as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionPayload {
    pub kind: RejectionKind,
    pub message: String,
}

impl From<TransitionError> for RejectionPayload {
    fn from(err: TransitionError) -> Self {
        Self::from(&err)
    }
}

impl From<&TransitionError> for RejectionPayload {
    fn from(err: &TransitionError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of executing one [`RuntimeCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    Committed(AnalysisCommitted),
    Minted(BalanceMinted),
    Rejected(RejectionPayload),
}

impl CallOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PathNode, SiblingPosition};

    #[test]
    fn test_rejection_payload_from_error() {
        let payload = RejectionPayload::from(TransitionError::InsufficientBalance {
            required: 101,
            available: 100,
        });
        assert_eq!(payload.kind, RejectionKind::InsufficientBalance);
        assert!(payload.message.contains("101"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "insufficient_balance");
    }

    #[test]
    fn test_runtime_call_json_shape() {
        let call = RuntimeCall::AddBalance {
            caller: Identity([1; 32]),
            token_id: TokenId(0),
            address: Identity([2; 32]),
            amount: 150,
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["method"], "add_balance");
        assert_eq!(json["amount"], 150);
        assert_eq!(json["token_id"], 0);

        let back: RuntimeCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);
        assert_eq!(back.method(), "add_balance");
    }

    #[test]
    fn test_path_digests_are_hex() {
        let path = InclusionPath::new(vec![PathNode {
            sibling: [0xAB; 32],
            position: SiblingPosition::Left,
        }]);
        let call = RuntimeCall::Analysis {
            account: AccountRecord {
                identity: Identity([3; 32]),
                url: 0,
            },
            path,
            counter: 1,
            token_id: TokenId::NATIVE,
        };
        let json = serde_json::to_value(&call).unwrap();
        let sibling = json["path"][0]["sibling"].as_str().unwrap();
        assert_eq!(sibling, "ab".repeat(32));

        let back: RuntimeCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);

        let mut short = serde_json::to_value(&call).unwrap();
        short["path"][0]["sibling"] = "abab".into();
        assert!(serde_json::from_value::<RuntimeCall>(short).is_err());
    }

    #[test]
    fn test_rejected_outcome_is_tagged() {
        let outcome = CallOutcome::Rejected(TransitionError::ProofVerificationFailed.into());
        assert!(outcome.is_rejected());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["kind"], "proof_verification_failed");
    }
}
