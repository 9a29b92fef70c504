//! # analysis-service
//!
//! Gated state-transition module over an authenticated account registry.
//!
//! A holder of an allow-listed account proves the current content of its
//! leaf against the registry root, pays a fixed amount to a protocol
//! recipient, and in the same step rewrites its leaf with a new counter
//! value. Registry, ledger and account map move together or not at all.
//!
//! ## Layout
//!
//! ```text
//! RuntimeCall ──→ [AnalysisService] ──┬──→ MerkleRegistry  (verify, commit)
//!                                     ├──→ BalanceLedger   (gate, transfer, mint)
//!                                     └──→ ModuleState     (tree_root, accounts)
//!                        │
//!                        └──→ StateStore (snapshots)
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | Root equals the tree function over the current leaves | [`MerkleRegistry::commit`] |
//! | A failed call changes nothing | check-then-apply in [`AnalysisService`] |
//! | Commit slot equals the slot proven | [`InclusionPath::leaf_index`] |
//! | Gate is strictly greater than the threshold | [`BalanceLedger::require_at_least`] |
//! | Circulating supply never exceeds the cap | [`BalanceLedger::mint`] |

pub mod adapters;
pub mod config;
pub mod domain;
pub mod events;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use config::ModuleConfig;
pub use domain::*;
pub use events::*;
pub use ports::*;
pub use service::{AnalysisService, ModuleSnapshot, ModuleState, ServiceStats};
