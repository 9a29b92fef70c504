//! # Module Configuration
//!
//! Immutable bootstrap snapshot, consumed once by
//! [`AnalysisService::bootstrap`](crate::AnalysisService::bootstrap).
//!
//! ## JSON shape
//!
//! ```json
//! {
//!   "tree_depth": 7,
//!   "allow_list": ["<64 hex chars>", "..."],
//!   "total_supply": 10000,
//!   "recipient": "<64 hex chars>",
//!   "threshold": 100,
//!   "mint_authority": { "mode": "unrestricted" }
//! }
//! ```
//!
//! `tree_depth`, `total_supply` and `threshold` fall back to their
//! defaults. `mint_authority` has no default: whoever deploys the module
//! states who may mint.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared_types::{Balance, Identity};

use crate::domain::{
    ConfigError, MintAuthority, TransitionParams, DEFAULT_THRESHOLD, DEFAULT_TOTAL_SUPPLY,
    DEFAULT_TREE_DEPTH, MAX_TREE_DEPTH, MIN_TREE_DEPTH,
};

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

fn default_total_supply() -> Balance {
    DEFAULT_TOTAL_SUPPLY
}

fn default_threshold() -> Balance {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Registry depth; capacity is `2^tree_depth`.
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
    /// Allow-listed identities. Position in the list is the registry slot.
    pub allow_list: Vec<Identity>,
    /// Per-token supply cap.
    #[serde(default = "default_total_supply")]
    pub total_supply: Balance,
    /// Protocol-controlled recipient of gated transfers.
    pub recipient: Identity,
    /// Balance gate and transfer amount.
    #[serde(default = "default_threshold")]
    pub threshold: Balance,
    /// Who may mint.
    pub mint_authority: MintAuthority,
}

impl ModuleConfig {
    /// Configuration with default depth, supply and threshold.
    pub fn new(allow_list: Vec<Identity>, recipient: Identity, mint_authority: MintAuthority) -> Self {
        Self {
            tree_depth: DEFAULT_TREE_DEPTH,
            allow_list,
            total_supply: DEFAULT_TOTAL_SUPPLY,
            recipient,
            threshold: DEFAULT_THRESHOLD,
            mint_authority,
        }
    }

    pub fn with_tree_depth(mut self, depth: usize) -> Self {
        self.tree_depth = depth;
        self
    }

    pub fn with_threshold(mut self, threshold: Balance) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_total_supply(mut self, total_supply: Balance) -> Self {
        self.total_supply = total_supply;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the configuration can seed a consistent module.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TREE_DEPTH..=MAX_TREE_DEPTH).contains(&self.tree_depth) {
            return Err(ConfigError::DepthOutOfRange {
                depth: self.tree_depth,
                min: MIN_TREE_DEPTH,
                max: MAX_TREE_DEPTH,
            });
        }

        let capacity = 1u64 << self.tree_depth;
        if self.allow_list.len() as u64 > capacity {
            return Err(ConfigError::CapacityExceeded {
                accounts: self.allow_list.len(),
                capacity,
            });
        }

        let mut seen = HashSet::with_capacity(self.allow_list.len());
        for identity in &self.allow_list {
            if !seen.insert(identity) {
                return Err(ConfigError::DuplicateIdentity(*identity));
            }
        }

        if self.threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }

        Ok(())
    }

    pub fn transition_params(&self) -> TransitionParams {
        TransitionParams {
            threshold: self.threshold,
            recipient: self.recipient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> Identity {
        Identity([b; 32])
    }

    fn sample() -> ModuleConfig {
        ModuleConfig::new(vec![id(1), id(2), id(3)], id(0xEE), MintAuthority::Unrestricted)
    }

    #[test]
    fn test_defaults() {
        let config = sample();
        assert_eq!(config.tree_depth, DEFAULT_TREE_DEPTH);
        assert_eq!(config.threshold, 100);
        assert_eq!(config.total_supply, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let config = ModuleConfig::new(vec![id(1), id(1)], id(0xEE), MintAuthority::Unrestricted);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateIdentity(dup)) if dup == id(1)
        ));
    }

    #[test]
    fn test_capacity_exceeded() {
        let config = ModuleConfig::new(
            (0..5).map(id).collect(),
            id(0xEE),
            MintAuthority::Unrestricted,
        )
        .with_tree_depth(2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapacityExceeded {
                accounts: 5,
                capacity: 4
            })
        ));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = sample().with_threshold(0);
        assert!(matches!(config.validate(), Err(ConfigError::ZeroThreshold)));
    }

    #[test]
    fn test_depth_out_of_range() {
        assert!(matches!(
            sample().with_tree_depth(0).validate(),
            Err(ConfigError::DepthOutOfRange { .. })
        ));
        assert!(matches!(
            sample().with_tree_depth(33).validate(),
            Err(ConfigError::DepthOutOfRange { .. })
        ));
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let json = format!(
            r#"{{
                "allow_list": ["{}"],
                "recipient": "{}",
                "mint_authority": {{ "mode": "unrestricted" }}
            }}"#,
            id(1).to_hex(),
            id(0xEE).to_hex()
        );
        let config = ModuleConfig::from_json_str(&json).unwrap();
        assert_eq!(config.allow_list, vec![id(1)]);
        assert_eq!(config.tree_depth, DEFAULT_TREE_DEPTH);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_from_json_requires_mint_authority() {
        let json = format!(
            r#"{{ "allow_list": [], "recipient": "{}" }}"#,
            id(0xEE).to_hex()
        );
        assert!(matches!(
            ModuleConfig::from_json_str(&json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("module.json");
        std::fs::write(&path, serde_json::to_string(&sample()).unwrap()).unwrap();

        let loaded = ModuleConfig::from_file(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_from_missing_file() {
        assert!(matches!(
            ModuleConfig::from_file("/nonexistent/module.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
