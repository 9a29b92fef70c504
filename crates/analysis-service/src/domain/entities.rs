//! # Account Record
//!
//! The leaf value stored in the Merkle registry.
//!
//! ## Hashing
//!
//! `hash = SHA3-256(ACCOUNT_DOMAIN || identity || url_be)`
//!
//! The one-byte domain prefix keeps account leaves from colliding with
//! interior node pre-images. The url is encoded big-endian so the pre-image
//! is canonical.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use shared_types::{Hash, Identity};

use super::ACCOUNT_DOMAIN;

/// One registry entry.
///
/// `url` carries the last counter value submitted through a successful
/// transition. It starts at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Immutable owner identity.
    pub identity: Identity,
    /// Mutable scalar metadata.
    pub url: u64,
}

impl AccountRecord {
    /// Fresh record with an empty url, as created at bootstrap.
    pub fn new(identity: Identity) -> Self {
        Self { identity, url: 0 }
    }

    /// Deterministic leaf digest of `(identity, url)`.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha3_256::new();
        hasher.update([ACCOUNT_DOMAIN]);
        hasher.update(self.identity.as_bytes());
        hasher.update(self.url.to_be_bytes());
        hasher.finalize().into()
    }

    /// Copy of this record with `url` replaced.
    #[must_use]
    pub fn with_updated_url(&self, url: u64) -> Self {
        Self {
            identity: self.identity,
            url,
        }
    }
}
