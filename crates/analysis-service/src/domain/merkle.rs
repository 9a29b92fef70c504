//! # Merkle Registry
//!
//! Fixed-depth authenticated tree over account leaves.
//!
//! ALGORITHM: binary hash tree where each interior node is
//! `SHA3-256(NODE_DOMAIN || left || right)`. Slots that were never written
//! hold [`EMPTY_LEAF`]; whole empty subtrees collapse to precomputed
//! empty roots, so only written paths are stored.
//!
//! ## Invariants
//!
//! - `root` always equals the tree function applied to the current leaves
//!   ([`MerkleRegistry::recompute_root`] rebuilds it from scratch).
//! - Every commit strictly supersedes the previous root; there is no fork.
//! - The leaf index of a proof is read from the path's orientation bits,
//!   never supplied separately.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as};
use sha3::{Digest, Sha3_256};
use shared_types::Hash;

use super::{ConfigError, TransitionError, EMPTY_LEAF, MAX_TREE_DEPTH, MIN_TREE_DEPTH, NODE_DOMAIN};

/// Which side of the current node the sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPosition {
    Left,
    Right,
}

/// One level of an inclusion path.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNode {
    /// Sibling digest at this level.
    #[serde_as(as = "Hex")]
    pub sibling: Hash,
    /// Side of the sibling.
    pub position: SiblingPosition,
}

/// Ordered sibling digests from leaf to root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InclusionPath {
    nodes: Vec<PathNode>,
}

impl InclusionPath {
    pub fn new(nodes: Vec<PathNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [PathNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Slot index implied by the orientation bits.
    ///
    /// Bit `i` is set when the sibling at level `i` is on the left, i.e. the
    /// path climbs as a right child.
    pub fn leaf_index(&self) -> Result<u64, TransitionError> {
        if self.nodes.len() > MAX_TREE_DEPTH {
            return Err(TransitionError::malformed(format!(
                "path length {} exceeds maximum depth {}",
                self.nodes.len(),
                MAX_TREE_DEPTH
            )));
        }

        let index = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.position == SiblingPosition::Left)
            .fold(0u64, |acc, (level, _)| acc | (1u64 << level));
        Ok(index)
    }

    /// Root obtained by hashing `leaf` up through this path.
    ///
    /// Pure recomputation; length is not checked here.
    pub fn compute_root(&self, leaf: &Hash) -> Hash {
        self.nodes.iter().fold(*leaf, |current, node| match node.position {
            SiblingPosition::Left => hash_pair(&node.sibling, &current),
            SiblingPosition::Right => hash_pair(&current, &node.sibling),
        })
    }
}

/// Interior node hash: `H(NODE_DOMAIN || left || right)`.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha3_256::new();
    hasher.update([NODE_DOMAIN]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// `empty_roots[level]` is the root of an all-empty subtree of that height.
fn compute_empty_roots(depth: usize) -> Vec<Hash> {
    let mut roots = Vec::with_capacity(depth + 1);
    roots.push(EMPTY_LEAF);
    for level in 0..depth {
        let below = roots[level];
        roots.push(hash_pair(&below, &below));
    }
    roots
}

/// Sparse fixed-depth Merkle tree of account leaf hashes.
#[derive(Debug, Clone)]
pub struct MerkleRegistry {
    depth: usize,
    /// Non-empty nodes keyed by `(level, index)`; level 0 holds leaves.
    nodes: HashMap<(usize, u64), Hash>,
    empty_roots: Vec<Hash>,
    root: Hash,
}

impl MerkleRegistry {
    /// Empty registry of the given depth.
    pub fn new(depth: usize) -> Result<Self, ConfigError> {
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&depth) {
            return Err(ConfigError::DepthOutOfRange {
                depth,
                min: MIN_TREE_DEPTH,
                max: MAX_TREE_DEPTH,
            });
        }

        let empty_roots = compute_empty_roots(depth);
        Ok(Self {
            depth,
            nodes: HashMap::new(),
            root: empty_roots[depth],
            empty_roots,
        })
    }

    /// Registry with `leaves[i]` written at slot `i`.
    pub fn from_leaves(depth: usize, leaves: &[Hash]) -> Result<Self, ConfigError> {
        Self::from_sparse_leaves(depth, leaves.iter().copied().enumerate().map(|(i, h)| (i as u64, h)))
    }

    /// Registry with each `(index, leaf)` written.
    pub fn from_sparse_leaves(
        depth: usize,
        leaves: impl IntoIterator<Item = (u64, Hash)>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new(depth)?;
        for (index, leaf) in leaves {
            if index >= registry.capacity() {
                return Err(ConfigError::CapacityExceeded {
                    accounts: index as usize + 1,
                    capacity: registry.capacity(),
                });
            }
            registry.write_leaf(index, leaf);
        }
        Ok(registry)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of slots, `2^depth`.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Current committed root. No side effects.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// Leaf hash at `index` ([`EMPTY_LEAF`] if never written).
    pub fn leaf(&self, index: u64) -> Result<Hash, TransitionError> {
        self.check_index(index)?;
        Ok(self.node(0, index))
    }

    /// Written (non-empty) leaves in slot order.
    pub fn leaves(&self) -> Vec<(u64, Hash)> {
        let leaves: BTreeMap<u64, Hash> = self
            .nodes
            .iter()
            .filter(|((level, _), _)| *level == 0)
            .map(|((_, index), hash)| (*index, *hash))
            .collect();
        leaves.into_iter().collect()
    }

    /// Reject indices outside `[0, capacity)`.
    pub fn check_index(&self, index: u64) -> Result<(), TransitionError> {
        if index >= self.capacity() {
            return Err(TransitionError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Root implied by applying `path` to `leaf`.
    ///
    /// Fails with `MalformedPath` unless the path has exactly `depth` levels.
    pub fn implied_root(&self, path: &InclusionPath, leaf: &Hash) -> Result<Hash, TransitionError> {
        if path.len() != self.depth {
            return Err(TransitionError::malformed(format!(
                "expected {} levels, got {}",
                self.depth,
                path.len()
            )));
        }
        Ok(path.compute_root(leaf))
    }

    /// Verify `path` takes `leaf` to `claimed_root`, returning the slot index.
    pub fn check_path(
        &self,
        path: &InclusionPath,
        leaf: &Hash,
        claimed_root: &Hash,
    ) -> Result<u64, TransitionError> {
        let implied = self.implied_root(path, leaf)?;
        if implied != *claimed_root {
            return Err(TransitionError::ProofVerificationFailed);
        }
        let index = path.leaf_index()?;
        self.check_index(index)?;
        Ok(index)
    }

    /// Boolean form of [`check_path`](Self::check_path). Fails closed:
    /// malformed input yields `false`.
    pub fn verify_path(&self, path: &InclusionPath, leaf: &Hash, claimed_root: &Hash) -> bool {
        self.check_path(path, leaf, claimed_root).is_ok()
    }

    /// Inclusion path for the slot at `index` against the current root.
    pub fn path(&self, index: u64) -> Result<InclusionPath, TransitionError> {
        self.check_index(index)?;

        let mut nodes = Vec::with_capacity(self.depth);
        let mut current = index;
        for level in 0..self.depth {
            let (sibling_index, position) = if current & 1 == 0 {
                (current + 1, SiblingPosition::Right)
            } else {
                (current - 1, SiblingPosition::Left)
            };
            nodes.push(PathNode {
                sibling: self.node(level, sibling_index),
                position,
            });
            current >>= 1;
        }
        Ok(InclusionPath::new(nodes))
    }

    /// Replace the leaf at `index`, recompute and store the root.
    ///
    /// Callers must have verified a path for the same index against the
    /// pre-commit root.
    pub fn commit(&mut self, index: u64, leaf: Hash) -> Result<Hash, TransitionError> {
        self.check_index(index)?;
        self.write_leaf(index, leaf);
        Ok(self.root)
    }

    /// Rebuild the root from the leaves alone, ignoring cached interior
    /// nodes.
    pub fn recompute_root(&self) -> Hash {
        let mut level_nodes: BTreeMap<u64, Hash> = self.leaves().into_iter().collect();

        for level in 0..self.depth {
            let empty = self.empty_roots[level];
            let mut parents = BTreeMap::new();
            for &index in level_nodes.keys() {
                let parent = index >> 1;
                if parents.contains_key(&parent) {
                    continue;
                }
                let left = level_nodes.get(&(parent << 1)).copied().unwrap_or(empty);
                let right = level_nodes.get(&((parent << 1) | 1)).copied().unwrap_or(empty);
                parents.insert(parent, hash_pair(&left, &right));
            }
            level_nodes = parents;
        }

        level_nodes
            .get(&0)
            .copied()
            .unwrap_or(self.empty_roots[self.depth])
    }

    fn node(&self, level: usize, index: u64) -> Hash {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.empty_roots[level])
    }

    fn set_node(&mut self, level: usize, index: u64, hash: Hash) {
        if hash == self.empty_roots[level] {
            self.nodes.remove(&(level, index));
        } else {
            self.nodes.insert((level, index), hash);
        }
    }

    /// Write a leaf and rehash its path up to the root. `index` must be in
    /// range.
    fn write_leaf(&mut self, index: u64, leaf: Hash) {
        self.set_node(0, index, leaf);

        let mut current = index;
        let mut hash = leaf;
        for level in 0..self.depth {
            let sibling = self.node(level, current ^ 1);
            hash = if current & 1 == 0 {
                hash_pair(&hash, &sibling)
            } else {
                hash_pair(&sibling, &hash)
            };
            current >>= 1;
            self.set_node(level + 1, current, hash);
        }
        self.root = hash;
    }
}
