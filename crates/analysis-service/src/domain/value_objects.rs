//! # Value Objects
//!
//! Constants and small immutable values for the analysis service.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shared_types::{Balance, Hash, Identity};

/// Hash of an unused registry slot.
pub const EMPTY_LEAF: Hash = [0u8; 32];

/// Domain separator prefixed to account leaf pre-images.
pub const ACCOUNT_DOMAIN: u8 = 0x00;

/// Domain separator prefixed to interior node pre-images.
pub const NODE_DOMAIN: u8 = 0x01;

/// Smallest supported registry depth.
pub const MIN_TREE_DEPTH: usize = 1;

/// Largest supported registry depth. Leaf indices must fit in a `u64` and
/// paths stay short enough to verify cheaply.
pub const MAX_TREE_DEPTH: usize = 32;

/// Default registry depth: 128 slots.
pub const DEFAULT_TREE_DEPTH: usize = 7;

/// Default gate: balance must exceed this, and exactly this much is charged.
pub const DEFAULT_THRESHOLD: Balance = 100;

/// Default per-token supply cap.
pub const DEFAULT_TOTAL_SUPPLY: Balance = 10_000;

/// Parameters of the gated transition, fixed at construction.
///
/// `threshold` plays two roles: the balance must be strictly greater than
/// it, and it is the amount moved to `recipient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionParams {
    /// Balance precondition and transfer amount.
    pub threshold: Balance,
    /// Protocol-controlled recipient of the transfer.
    pub recipient: Identity,
}

/// Who may call `add_balance`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MintAuthority {
    /// Any caller may mint.
    Unrestricted,
    /// Only the listed identities may mint.
    Restricted { minters: BTreeSet<Identity> },
}

impl MintAuthority {
    /// Whether `caller` is allowed to mint.
    pub fn permits(&self, caller: &Identity) -> bool {
        match self {
            MintAuthority::Unrestricted => true,
            MintAuthority::Restricted { minters } => minters.contains(caller),
        }
    }
}
