//! # Core Value Types
//!
//! ## Type Decisions
//!
//! - `Balance: u64` - matches the 64-bit unsigned balances of the host
//!   ledger. Credits are checked, so overflow surfaces as an error instead
//!   of wrapping.
//! - `Identity` - 32 opaque bytes. Text form is lowercase hex, optionally
//!   prefixed with `0x`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParseIdentityError;

/// A 32-byte digest (SHA3-256 output).
pub type Hash = [u8; 32];

/// Token balance in base units.
pub type Balance = u64;

/// Length of an [`Identity`] in bytes.
pub const IDENTITY_LEN: usize = 32;

/// Opaque public-key-like account identifier.
///
/// Immutable once created. Serialized as a hex string so configuration
/// files stay human-editable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(pub [u8; IDENTITY_LEN]);

impl Identity {
    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes, as fed to the account hash.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Lowercase hex form without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Identity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(trimmed).map_err(|e| ParseIdentityError::InvalidHex(e.to_string()))?;
        let actual = bytes.len();
        let array: [u8; IDENTITY_LEN] =
            bytes
                .try_into()
                .map_err(|_| ParseIdentityError::InvalidLength {
                    expected: IDENTITY_LEN,
                    actual,
                })?;
        Ok(Self(array))
    }
}

impl TryFrom<String> for Identity {
    type Error = ParseIdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.to_hex()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "Identity({}..)", &self.to_hex()[..8])
    }
}

/// Token identifier keying the balance ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub u64);

impl TokenId {
    /// The native token.
    pub const NATIVE: TokenId = TokenId(0);
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}
