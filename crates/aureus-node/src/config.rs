use std::path::{Path, PathBuf};

use anyhow::Result;
use aureus_consensus::QuorumSlice;
use aureus_core::{Address, KeyPair, SecretKey};
use serde::{Deserialize, Serialize};

/// Node configuration, stored as a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node data directory
    pub data_dir: PathBuf,

    /// Node secret key (hex)
    pub node_secret: String,

    /// The quorum slice this node trusts
    pub quorum_slice: QuorumSliceConfig,

    /// Transaction queue capacity
    #[serde(default = "default_queue_limit")]
    pub queue_limit: u32,

    /// Base ballot escalation timeout; grows with the ballot counter
    #[serde(default = "default_ballot_timeout_ms")]
    pub ballot_timeout_ms: u32,

    /// Initial account balances
    #[serde(default)]
    pub genesis: Vec<BalanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumSliceConfig {
    /// Member addresses (public key hex)
    pub members: Vec<String>,
    pub threshold: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub address: String,
    pub balance: u64,
}

fn default_queue_limit() -> u32 {
    1000
}

fn default_ballot_timeout_ms() -> u32 {
    1000
}

impl NodeConfig {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The node's keypair
    pub fn keypair(&self) -> Result<KeyPair> {
        Ok(KeyPair::from_secret(SecretKey::from_hex(&self.node_secret)?))
    }

    /// The configured quorum slice. A malformed slice is fatal at startup.
    pub fn to_quorum_slice(&self) -> Result<QuorumSlice> {
        let members: Vec<Address> = self
            .quorum_slice
            .members
            .iter()
            .map(|m| Address::from(m.as_str()))
            .collect();
        Ok(QuorumSlice::new(members, self.quorum_slice.threshold)?)
    }

    /// Genesis balances keyed by address
    pub fn genesis_accounts(&self) -> Vec<(Address, u64)> {
        self.genesis
            .iter()
            .map(|entry| (Address::from(entry.address.as_str()), entry.balance))
            .collect()
    }
}

/// Generate a single-node sample configuration with fresh keys
pub fn generate_sample_config() -> NodeConfig {
    let node = KeyPair::generate();
    let user = KeyPair::generate();

    NodeConfig {
        data_dir: PathBuf::from("./aureus-data"),
        node_secret: node.secret.to_hex(),
        quorum_slice: QuorumSliceConfig {
            members: vec![node.address().to_string()],
            threshold: 1,
        },
        queue_limit: default_queue_limit(),
        ballot_timeout_ms: default_ballot_timeout_ms(),
        genesis: vec![BalanceEntry {
            address: user.address().to_string(),
            balance: 1_000_000_000,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_valid() {
        let config = generate_sample_config();
        assert!(config.keypair().is_ok());
        assert!(config.to_quorum_slice().is_ok());
        assert_eq!(config.queue_limit, 1000);
        assert_eq!(config.ballot_timeout_ms, 1000);
    }

    #[test]
    fn test_malformed_slice_fatal() {
        let mut config = generate_sample_config();
        config.quorum_slice.threshold = 9;
        assert!(config.to_quorum_slice().is_err());
    }

    #[test]
    fn test_defaults_fill_in() {
        let json = serde_json::json!({
            "data_dir": "./d",
            "node_secret": "00",
            "quorum_slice": { "members": ["a"], "threshold": 1 }
        });
        let config: NodeConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.queue_limit, 1000);
        assert_eq!(config.ballot_timeout_ms, 1000);
        assert!(config.genesis.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = generate_sample_config();
        config.save(&path).unwrap();

        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded.node_secret, config.node_secret);
        assert_eq!(loaded.quorum_slice.members, config.quorum_slice.members);
    }
}
