use std::collections::HashMap;
use std::sync::RwLock;

use shared_types::Hash;

use crate::domain::TransitionError;
use crate::ports::StateStore;

/// In-memory [`StateStore`], for tests and single-process hosts.
pub struct InMemoryStateStore {
    entries: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn get(&self, key: &Hash) -> Result<Option<Vec<u8>>, TransitionError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| TransitionError::Storage("lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: Hash, data: Vec<u8>) -> Result<(), TransitionError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| TransitionError::Storage("lock poisoned".into()))?;
        entries.insert(key, data);
        Ok(())
    }
}
