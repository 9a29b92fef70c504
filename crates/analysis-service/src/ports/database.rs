use shared_types::Hash;

use crate::domain::TransitionError;

/// Key under which the latest module snapshot is stored.
pub const SNAPSHOT_KEY: Hash = [0xFF; 32];

/// Opaque byte storage for module snapshots.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &Hash) -> Result<Option<Vec<u8>>, TransitionError>;
    fn put(&self, key: Hash, data: Vec<u8>) -> Result<(), TransitionError>;
}
