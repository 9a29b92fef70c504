use shared_types::{Balance, Hash, Identity, TokenId};

use crate::domain::{AccountRecord, InclusionPath, TransitionError};
use crate::events::{AnalysisCommitted, BalanceMinted, CallOutcome, RuntimeCall};

/// Call surface of the gated transition module.
///
/// Mutating calls are atomic: on `Err` no state has changed.
pub trait AnalysisServiceApi {
    /// Gated transition for the holder of `account`.
    ///
    /// ## Returns
    ///
    /// - `Ok(AnalysisCommitted)`: balance moved, url set to `counter`, root
    ///   advanced
    /// - `Err(ProofVerificationFailed)`: `account`/`path` do not reproduce
    ///   the current root
    /// - `Err(MalformedPath)`: wrong path length
    /// - `Err(InsufficientBalance)`: balance not above the threshold
    fn analysis(
        &mut self,
        account: AccountRecord,
        path: &InclusionPath,
        counter: u64,
        token_id: TokenId,
    ) -> Result<AnalysisCommitted, TransitionError>;

    /// Mint `amount` of `token_id` to `address` on behalf of `caller`.
    fn add_balance(
        &mut self,
        caller: Identity,
        token_id: TokenId,
        address: Identity,
        amount: Balance,
    ) -> Result<BalanceMinted, TransitionError>;

    fn current_root(&self) -> Hash;

    fn account(&self, identity: &Identity) -> Option<AccountRecord>;

    fn balance_of(&self, token_id: TokenId, identity: &Identity) -> Balance;

    /// Inclusion path for an allow-listed identity against the current root.
    fn inclusion_path(&self, identity: &Identity) -> Option<InclusionPath>;

    /// Dispatch one call, folding the result into a [`CallOutcome`].
    fn execute(&mut self, call: RuntimeCall) -> CallOutcome {
        match call {
            RuntimeCall::Analysis {
                account,
                path,
                counter,
                token_id,
            } => match self.analysis(account, &path, counter, token_id) {
                Ok(receipt) => CallOutcome::Committed(receipt),
                Err(err) => CallOutcome::Rejected(err.into()),
            },
            RuntimeCall::AddBalance {
                caller,
                token_id,
                address,
                amount,
            } => match self.add_balance(caller, token_id, address, amount) {
                Ok(receipt) => CallOutcome::Minted(receipt),
                Err(err) => CallOutcome::Rejected(err.into()),
            },
        }
    }
}
