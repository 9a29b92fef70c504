use serde::{Deserialize, Serialize};
use shared_types::{Balance, Hash, Identity, TokenId};
use thiserror::Error;

/// Rejection reasons for registry, ledger and transition operations.
///
/// Every variant is detected before the first mutating step of a call, so a
/// returned error always means "no state changed".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Proof verification failed: path does not reproduce the current root")]
    ProofVerificationFailed,

    #[error("Malformed path: {reason}")]
    MalformedPath { reason: String },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Balance, available: Balance },

    #[error("Balance overflow crediting {identity} with {amount} of {token_id}")]
    Overflow {
        token_id: TokenId,
        identity: Identity,
        amount: Balance,
    },

    #[error("Supply cap exceeded for {token_id}: cap {cap}, circulating {circulating}, requested {requested}")]
    SupplyExceeded {
        token_id: TokenId,
        cap: Balance,
        circulating: Balance,
        requested: Balance,
    },

    #[error("Unauthorized minter: {caller}")]
    UnauthorizedMinter { caller: Identity },

    #[error("Leaf index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: u64, capacity: u64 },

    #[error("State root mismatch: expected {expected:?}, got {actual:?}")]
    StateRootMismatch { expected: Hash, actual: Hash },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Inconsistent ledger: {reason}")]
    InconsistentLedger { reason: String },
}

impl TransitionError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::ProofVerificationFailed => RejectionKind::ProofVerificationFailed,
            Self::MalformedPath { .. } => RejectionKind::MalformedPath,
            Self::InsufficientBalance { .. } => RejectionKind::InsufficientBalance,
            Self::Overflow { .. } => RejectionKind::Overflow,
            Self::SupplyExceeded { .. } => RejectionKind::SupplyExceeded,
            Self::UnauthorizedMinter { .. } => RejectionKind::UnauthorizedMinter,
            Self::IndexOutOfRange { .. } => RejectionKind::IndexOutOfRange,
            Self::StateRootMismatch { .. } => RejectionKind::StateRootMismatch,
            Self::Serialization(_) => RejectionKind::Serialization,
            Self::Storage(_) => RejectionKind::Storage,
            Self::InconsistentLedger { .. } => RejectionKind::InconsistentLedger,
        }
    }
}

/// Error kind enumeration for payload serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    ProofVerificationFailed,
    MalformedPath,
    InsufficientBalance,
    Overflow,
    SupplyExceeded,
    UnauthorizedMinter,
    IndexOutOfRange,
    StateRootMismatch,
    Serialization,
    Storage,
    InconsistentLedger,
}

/// Invalid bootstrap configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Tree depth {depth} outside supported range {min}..={max}")]
    DepthOutOfRange { depth: usize, min: usize, max: usize },

    #[error("Allow-list has {accounts} identities but registry holds only {capacity}")]
    CapacityExceeded { accounts: usize, capacity: u64 },

    #[error("Duplicate allow-listed identity: {0}")]
    DuplicateIdentity(Identity),

    #[error("Threshold must be non-zero")]
    ZeroThreshold,

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
