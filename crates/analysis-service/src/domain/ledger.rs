//! # Balance Ledger
//!
//! Token-keyed balances per identity with checked arithmetic.
//!
//! ## Invariants
//!
//! - Balances are non-negative (`u64`) and never wrap.
//! - For every token, the sum of balances equals its circulating supply,
//!   which never exceeds `total_supply`. Only [`BalanceLedger::mint`]
//!   increases circulating supply; transfers move value without creating
//!   any.
//! - Every mutation is planned first and applied only when all checks pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{Balance, Identity, TokenId};

use super::TransitionError;

/// Ledger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalancesKey {
    pub token_id: TokenId,
    pub identity: Identity,
}

impl BalancesKey {
    pub fn new(token_id: TokenId, identity: Identity) -> Self {
        Self { token_id, identity }
    }
}

/// A validated transfer, ready to apply without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a plan does nothing until applied"]
pub struct TransferPlan {
    token_id: TokenId,
    from: Identity,
    to: Identity,
    amount: Balance,
    from_after: Balance,
    to_after: Balance,
}

impl TransferPlan {
    pub fn amount(&self) -> Balance {
        self.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLedger {
    balances: BTreeMap<BalancesKey, Balance>,
    circulating: BTreeMap<TokenId, Balance>,
    total_supply: Balance,
}

impl BalanceLedger {
    /// Empty ledger with a per-token supply cap.
    pub fn new(total_supply: Balance) -> Self {
        Self {
            balances: BTreeMap::new(),
            circulating: BTreeMap::new(),
            total_supply,
        }
    }

    pub fn total_supply(&self) -> Balance {
        self.total_supply
    }

    /// Sum of all balances of `token_id`.
    pub fn circulating(&self, token_id: TokenId) -> Balance {
        self.circulating.get(&token_id).copied().unwrap_or(0)
    }

    pub fn balance_of(&self, token_id: TokenId, identity: &Identity) -> Balance {
        self.balances
            .get(&BalancesKey::new(token_id, *identity))
            .copied()
            .unwrap_or(0)
    }

    /// Require a balance strictly greater than `threshold`.
    pub fn require_at_least(
        &self,
        token_id: TokenId,
        identity: &Identity,
        threshold: Balance,
    ) -> Result<Balance, TransitionError> {
        let available = self.balance_of(token_id, identity);
        if available <= threshold {
            return Err(TransitionError::InsufficientBalance {
                required: threshold.saturating_add(1),
                available,
            });
        }
        Ok(available)
    }

    /// Validate a transfer without touching state.
    pub fn plan_transfer(
        &self,
        token_id: TokenId,
        from: &Identity,
        to: &Identity,
        amount: Balance,
    ) -> Result<TransferPlan, TransitionError> {
        let from_balance = self.balance_of(token_id, from);
        if from_balance < amount {
            return Err(TransitionError::InsufficientBalance {
                required: amount,
                available: from_balance,
            });
        }

        let from_after = from_balance - amount;
        let to_after = if from == to {
            from_balance
        } else {
            self.balance_of(token_id, to)
                .checked_add(amount)
                .ok_or(TransitionError::Overflow {
                    token_id,
                    identity: *to,
                    amount,
                })?
        };

        Ok(TransferPlan {
            token_id,
            from: *from,
            to: *to,
            amount,
            from_after,
            to_after,
        })
    }

    /// Apply a plan produced by [`plan_transfer`](Self::plan_transfer) on
    /// this ledger with no intervening mutation.
    pub fn apply_transfer(&mut self, plan: TransferPlan) {
        if plan.from == plan.to {
            return;
        }
        self.balances
            .insert(BalancesKey::new(plan.token_id, plan.from), plan.from_after);
        self.balances
            .insert(BalancesKey::new(plan.token_id, plan.to), plan.to_after);
    }

    /// Debit `from` and credit `to` atomically.
    pub fn transfer(
        &mut self,
        token_id: TokenId,
        from: &Identity,
        to: &Identity,
        amount: Balance,
    ) -> Result<(), TransitionError> {
        let plan = self.plan_transfer(token_id, from, to, amount)?;
        self.apply_transfer(plan);
        Ok(())
    }

    /// Credit `to` with newly created supply.
    ///
    /// Authorization is the caller's concern; the ledger only enforces the
    /// supply cap and representable range.
    pub fn mint(
        &mut self,
        token_id: TokenId,
        to: &Identity,
        amount: Balance,
    ) -> Result<Balance, TransitionError> {
        let circulating = self.circulating(token_id);
        let new_circulating = circulating
            .checked_add(amount)
            .filter(|total| *total <= self.total_supply)
            .ok_or(TransitionError::SupplyExceeded {
                token_id,
                cap: self.total_supply,
                circulating,
                requested: amount,
            })?;

        // Bounded by the cap above, but stay checked.
        let new_balance = self
            .balance_of(token_id, to)
            .checked_add(amount)
            .ok_or(TransitionError::Overflow {
                token_id,
                identity: *to,
                amount,
            })?;

        self.balances
            .insert(BalancesKey::new(token_id, *to), new_balance);
        self.circulating.insert(token_id, new_circulating);
        Ok(new_balance)
    }

    /// Check the ledger against a supply cap: the cap matches, per-token
    /// balances sum to the tracked circulating supply, and none exceeds it.
    pub fn verify_supply(&self, cap: Balance) -> Result<(), TransitionError> {
        let inconsistent = |reason: String| TransitionError::InconsistentLedger { reason };

        if self.total_supply != cap {
            return Err(inconsistent(format!(
                "supply cap {} does not match configured {}",
                self.total_supply, cap
            )));
        }

        let mut sums: BTreeMap<TokenId, Balance> = BTreeMap::new();
        for (key, balance) in &self.balances {
            let sum = sums.entry(key.token_id).or_insert(0);
            *sum = sum
                .checked_add(*balance)
                .ok_or_else(|| inconsistent(format!("balances of {} overflow", key.token_id)))?;
        }

        let tokens = sums.keys().chain(self.circulating.keys());
        for token_id in tokens {
            let sum = sums.get(token_id).copied().unwrap_or(0);
            let circulating = self.circulating(*token_id);
            if sum != circulating {
                return Err(inconsistent(format!(
                    "{token_id} balances sum to {sum}, circulating is {circulating}"
                )));
            }
            if circulating > cap {
                return Err(inconsistent(format!(
                    "{token_id} circulating {circulating} exceeds cap {cap}"
                )));
            }
        }
        Ok(())
    }

    /// Iterate `(key, balance)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&BalancesKey, &Balance)> {
        self.balances.iter()
    }
}
