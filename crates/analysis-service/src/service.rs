//! # Analysis Service
//!
//! The gated transition module: owns the Merkle registry, the balance
//! ledger and the module state fields, and applies one call at a time.
//!
//! ## Call discipline
//!
//! Every mutating call runs in two phases:
//!
//! 1. **Check**: proof verification, balance gate, transfer plan and the
//!    post-call root are all computed against the untouched pre-state.
//! 2. **Apply**: the registry commit, then the infallible ledger and state
//!    writes.
//!
//! A rejection in phase 1 leaves registry, ledger and accounts exactly as
//! they were.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{Balance, Hash, Identity, TokenId};
use tracing::{debug, info, instrument, warn};

use crate::config::ModuleConfig;
use crate::domain::{
    AccountRecord, BalanceLedger, ConfigError, InclusionPath, MerkleRegistry, StateMap,
    StateValue, TransitionError, TransitionParams,
};
use crate::events::{AnalysisCommitted, BalanceMinted, CallOutcome, RuntimeCall};
use crate::ports::{AnalysisServiceApi, StateStore, SNAPSHOT_KEY};

/// Persistent fields of the module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Last committed registry root.
    pub tree_root: StateValue<Hash>,
    /// Latest record per allow-listed identity.
    pub accounts: StateMap<Identity, AccountRecord>,
}

/// Call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Successful `analysis` calls.
    pub transitions_committed: u64,
    /// Successful `add_balance` calls.
    pub mints: u64,
    /// Calls of either kind that were rejected.
    pub calls_rejected: u64,
}

/// Serialized module state.
///
/// Bound to the configuration it was taken under through `tree_depth` and
/// the allow-list slots of its accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSnapshot {
    pub tree_depth: usize,
    pub leaves: Vec<(u64, Hash)>,
    pub state: ModuleState,
    pub ledger: BalanceLedger,
}

impl ModuleSnapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransitionError> {
        bincode::serialize(self).map_err(|e| TransitionError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransitionError> {
        bincode::deserialize(bytes).map_err(|e| TransitionError::Serialization(e.to_string()))
    }
}

pub struct AnalysisService {
    config: ModuleConfig,
    params: TransitionParams,
    registry: MerkleRegistry,
    ledger: BalanceLedger,
    state: ModuleState,
    /// Registry slot of each allow-listed identity.
    slots: BTreeMap<Identity, u64>,
    stats: ServiceStats,
}

impl AnalysisService {
    /// Build the module from a bootstrap configuration.
    ///
    /// Allow-list entry `i` becomes the record `(identity, 0)` at slot `i`.
    /// The ledger starts empty.
    pub fn bootstrap(config: ModuleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut accounts = StateMap::new();
        let mut slots = BTreeMap::new();
        let mut leaves = Vec::with_capacity(config.allow_list.len());
        for (slot, identity) in config.allow_list.iter().enumerate() {
            let record = AccountRecord::new(*identity);
            leaves.push(record.hash());
            accounts.set(*identity, record);
            slots.insert(*identity, slot as u64);
        }

        let registry = MerkleRegistry::from_leaves(config.tree_depth, &leaves)?;
        let mut tree_root = StateValue::new();
        tree_root.set(registry.root());

        info!(
            accounts = slots.len(),
            depth = config.tree_depth,
            threshold = config.threshold,
            root = %hex::encode(registry.root()),
            "Analysis module bootstrapped"
        );

        Ok(Self {
            params: config.transition_params(),
            ledger: BalanceLedger::new(config.total_supply),
            state: ModuleState {
                tree_root,
                accounts,
            },
            config,
            registry,
            slots,
            stats: ServiceStats::default(),
        })
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn registry(&self) -> &MerkleRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &BalanceLedger {
        &self.ledger
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    /// Registry slot assigned to `identity` at bootstrap.
    pub fn slot_of(&self, identity: &Identity) -> Option<u64> {
        self.slots.get(identity).copied()
    }

    /// Gated transition. See [`AnalysisServiceApi::analysis`].
    #[instrument(skip(self, account, path), fields(identity = %account.identity))]
    pub fn analysis(
        &mut self,
        account: AccountRecord,
        path: &InclusionPath,
        counter: u64,
        token_id: TokenId,
    ) -> Result<AnalysisCommitted, TransitionError> {
        match self.apply_analysis(account, path, counter, token_id) {
            Ok(receipt) => {
                self.stats.transitions_committed += 1;
                info!(
                    leaf_index = receipt.leaf_index,
                    amount = receipt.amount,
                    new_root = %hex::encode(receipt.new_root),
                    "Analysis committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                self.stats.calls_rejected += 1;
                warn!(kind = ?err.kind(), error = %err, "Analysis rejected");
                Err(err)
            }
        }
    }

    fn apply_analysis(
        &mut self,
        account: AccountRecord,
        path: &InclusionPath,
        counter: u64,
        token_id: TokenId,
    ) -> Result<AnalysisCommitted, TransitionError> {
        let previous_root = self.current_root();
        let TransitionParams {
            threshold,
            recipient,
        } = self.params;

        let leaf_index = self
            .registry
            .check_path(path, &account.hash(), &previous_root)?;
        self.ledger
            .require_at_least(token_id, &account.identity, threshold)?;
        let plan = self
            .ledger
            .plan_transfer(token_id, &account.identity, &recipient, threshold)?;

        let updated = account.with_updated_url(counter);
        let updated_leaf = updated.hash();
        let new_root = self.registry.implied_root(path, &updated_leaf)?;
        debug!(
            leaf_index,
            previous_root = %hex::encode(previous_root),
            new_root = %hex::encode(new_root),
            "Checks passed"
        );

        let committed = self.registry.commit(leaf_index, updated_leaf)?;
        debug_assert_eq!(committed, new_root);
        let amount = plan.amount();
        self.ledger.apply_transfer(plan);
        self.state.tree_root.set(new_root);
        self.state.accounts.set(account.identity, updated);

        Ok(AnalysisCommitted {
            identity: account.identity,
            leaf_index,
            previous_root,
            new_root,
            account: updated,
            amount,
            recipient,
            token_id,
        })
    }

    /// Mint on behalf of `caller`, subject to the configured mint authority.
    #[instrument(skip(self))]
    pub fn add_balance(
        &mut self,
        caller: Identity,
        token_id: TokenId,
        address: Identity,
        amount: Balance,
    ) -> Result<BalanceMinted, TransitionError> {
        let result = if self.config.mint_authority.permits(&caller) {
            self.ledger.mint(token_id, &address, amount)
        } else {
            Err(TransitionError::UnauthorizedMinter { caller })
        };

        match result {
            Ok(new_balance) => {
                self.stats.mints += 1;
                info!(amount, new_balance, "Balance minted");
                Ok(BalanceMinted {
                    caller,
                    token_id,
                    address,
                    amount,
                    new_balance,
                })
            }
            Err(err) => {
                self.stats.calls_rejected += 1;
                warn!(kind = ?err.kind(), error = %err, "Mint rejected");
                Err(err)
            }
        }
    }

    /// Root every proof is checked against.
    pub fn current_root(&self) -> Hash {
        self.state.tree_root.get_or(self.registry.root())
    }

    pub fn account(&self, identity: &Identity) -> Option<AccountRecord> {
        self.state.accounts.get(identity)
    }

    pub fn balance_of(&self, token_id: TokenId, identity: &Identity) -> Balance {
        self.ledger.balance_of(token_id, identity)
    }

    /// Path for `identity`'s slot against the current root.
    pub fn inclusion_path(&self, identity: &Identity) -> Option<InclusionPath> {
        let slot = self.slot_of(identity)?;
        self.registry.path(slot).ok()
    }

    /// Apply calls strictly in order through [`AnalysisServiceApi::execute`].
    /// A rejection does not stop the batch.
    pub fn execute_batch(&mut self, calls: impl IntoIterator<Item = RuntimeCall>) -> Vec<CallOutcome> {
        calls.into_iter().map(|call| self.execute(call)).collect()
    }

    pub fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot {
            tree_depth: self.registry.depth(),
            leaves: self.registry.leaves(),
            state: self.state.clone(),
            ledger: self.ledger.clone(),
        }
    }

    /// Replace the module state with `snapshot`.
    ///
    /// The ledger must match the configured supply cap. The registry is
    /// rebuilt from the snapshot leaves and again from the snapshot
    /// accounts; both must reproduce the committed root. On error the
    /// service is unchanged.
    pub fn restore(&mut self, snapshot: ModuleSnapshot) -> Result<(), TransitionError> {
        if snapshot.tree_depth != self.registry.depth() {
            return Err(TransitionError::Serialization(format!(
                "snapshot depth {} does not match configured depth {}",
                snapshot.tree_depth,
                self.registry.depth()
            )));
        }
        if snapshot.state.accounts.len() != self.slots.len() {
            return Err(TransitionError::Serialization(format!(
                "snapshot holds {} accounts, allow-list has {}",
                snapshot.state.accounts.len(),
                self.slots.len()
            )));
        }

        snapshot.ledger.verify_supply(self.config.total_supply)?;

        let depth = self.registry.depth();
        let registry = MerkleRegistry::from_sparse_leaves(depth, snapshot.leaves.iter().copied())
            .map_err(|e| TransitionError::Serialization(e.to_string()))?;
        let expected = snapshot.state.tree_root.get_or(registry.root());
        if registry.root() != expected {
            return Err(TransitionError::StateRootMismatch {
                expected,
                actual: registry.root(),
            });
        }

        let mut account_leaves = Vec::with_capacity(self.slots.len());
        for (identity, slot) in &self.slots {
            let record = snapshot.state.accounts.get(identity).ok_or_else(|| {
                TransitionError::Serialization(format!("snapshot is missing account {identity}"))
            })?;
            account_leaves.push((*slot, record.hash()));
        }
        let from_accounts = MerkleRegistry::from_sparse_leaves(depth, account_leaves)
            .map_err(|e| TransitionError::Serialization(e.to_string()))?;
        if from_accounts.root() != expected {
            return Err(TransitionError::StateRootMismatch {
                expected,
                actual: from_accounts.root(),
            });
        }

        self.registry = registry;
        self.state = snapshot.state;
        self.state.tree_root.set(expected);
        self.ledger = snapshot.ledger;
        info!(root = %hex::encode(expected), "Module state restored");
        Ok(())
    }

    /// Write the current snapshot under [`SNAPSHOT_KEY`].
    pub fn persist(&self, store: &dyn StateStore) -> Result<(), TransitionError> {
        let bytes = self.snapshot().to_bytes()?;
        debug!(bytes = bytes.len(), "Persisting module snapshot");
        store.put(SNAPSHOT_KEY, bytes)
    }

    /// Restore from the snapshot under [`SNAPSHOT_KEY`].
    ///
    /// Returns `Ok(false)` when the store holds no snapshot.
    pub fn load(&mut self, store: &dyn StateStore) -> Result<bool, TransitionError> {
        match store.get(&SNAPSHOT_KEY)? {
            Some(bytes) => {
                self.restore(ModuleSnapshot::from_bytes(&bytes)?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl AnalysisServiceApi for AnalysisService {
    fn analysis(
        &mut self,
        account: AccountRecord,
        path: &InclusionPath,
        counter: u64,
        token_id: TokenId,
    ) -> Result<AnalysisCommitted, TransitionError> {
        AnalysisService::analysis(self, account, path, counter, token_id)
    }

    fn add_balance(
        &mut self,
        caller: Identity,
        token_id: TokenId,
        address: Identity,
        amount: Balance,
    ) -> Result<BalanceMinted, TransitionError> {
        AnalysisService::add_balance(self, caller, token_id, address, amount)
    }

    fn current_root(&self) -> Hash {
        AnalysisService::current_root(self)
    }

    fn account(&self, identity: &Identity) -> Option<AccountRecord> {
        AnalysisService::account(self, identity)
    }

    fn balance_of(&self, token_id: TokenId, identity: &Identity) -> Balance {
        AnalysisService::balance_of(self, token_id, identity)
    }

    fn inclusion_path(&self, identity: &Identity) -> Option<InclusionPath> {
        AnalysisService::inclusion_path(self, identity)
    }
}
