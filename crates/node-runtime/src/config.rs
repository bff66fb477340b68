//! # Node Configuration
//!
//! TOML configuration for one validator process.
//!
//! ```toml
//! [node]
//! listen_addr = "0.0.0.0:7000"
//! data_dir = "./data"
//! signing_seed = "<64 hex chars>"
//! log_level = "info"
//! storage = "rocksdb"
//!
//! [consensus]
//! mode = "pbft"
//! tick_interval_ms = 5000
//!
//! [genesis]
//! timestamp = 1700000000000
//! chain_tag = "validator-chain"
//!
//! [[validators]]
//! public_key = "<64 hex chars>"
//! host = "10.0.0.1"
//! port = 7000
//! ```
//!
//! `VC_LISTEN_ADDR`, `VC_DATA_DIR` and `VC_LOG_LEVEL` override the
//! matching `[node]` keys.

use serde::Deserialize;
use shared_crypto::ValidatorKeyPair;
use shared_types::{PublicKey, ValidatorId};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use vc_08_consensus::{AgreementMode, ConsensusConfig, ValidatorInfo};

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV: &str = "VC_CONFIG";
pub const LISTEN_ADDR_ENV: &str = "VC_LISTEN_ADDR";
pub const DATA_DIR_ENV: &str = "VC_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "VC_LOG_LEVEL";

/// Configuration errors. All of them stop the node at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No configuration file: pass a path or set VC_CONFIG")]
    MissingPath,

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Validator set is empty")]
    NoValidators,

    #[error("Validator {0} listed more than once")]
    DuplicateValidator(String),
}

/// Chain store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Volatile; the chain is re-synced from peers after a restart.
    #[default]
    Memory,
    /// Durable; needs the `rocksdb` feature.
    Rocksdb,
}

/// Complete node configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub node: NodeSection,
    #[serde(default)]
    pub consensus: ConsensusSection,
    #[serde(default)]
    pub genesis: GenesisSection,
    #[serde(default)]
    pub validators: Vec<ValidatorEntry>,
}

/// Process-level settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSection {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Hex-encoded 32-byte Ed25519 seed.
    pub signing_seed: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub storage: StorageBackend,
}

fn default_listen_addr() -> String {
    "0.0.0.0:7000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Agreement knobs. Durations are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsensusSection {
    pub mode: String,
    pub tick_interval_ms: u64,
    pub rpc_timeout_ms: u64,
    pub view_change_after_ticks: u32,
    pub sync_batch_size: u32,
    pub sync_max_bytes: u64,
    pub sync_max_retries: u32,
    pub max_txs_per_block: usize,
    pub future_height_window: u64,
    pub inbox_capacity: usize,
    pub inbox_per_signer: usize,
}

impl Default for ConsensusSection {
    fn default() -> Self {
        let defaults = ConsensusConfig::default();
        Self {
            mode: defaults.mode.to_string(),
            tick_interval_ms: defaults.tick_interval.as_millis() as u64,
            rpc_timeout_ms: defaults.rpc_timeout.as_millis() as u64,
            view_change_after_ticks: defaults.view_change_after_ticks,
            sync_batch_size: defaults.sync_batch_size,
            sync_max_bytes: defaults.sync_max_bytes,
            sync_max_retries: defaults.sync_max_retries,
            max_txs_per_block: defaults.max_txs_per_block,
            future_height_window: defaults.future_height_window,
            inbox_capacity: defaults.inbox_capacity,
            inbox_per_signer: defaults.inbox_per_signer,
        }
    }
}

/// Inputs of the deterministic genesis block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenesisSection {
    /// Unix timestamp (ms) recorded in the genesis block.
    pub timestamp: u64,
    /// Distinguishes chains that share a validator set.
    pub chain_tag: String,
}

impl Default for GenesisSection {
    fn default() -> Self {
        Self {
            timestamp: 0,
            chain_tag: "validator-chain".to_string(),
        }
    }
}

/// One `[[validators]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorEntry {
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    pub host: String,
    pub port: u16,
}

impl NodeConfig {
    /// Read, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: NodeConfig = toml::from_str(&text)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate without touching the environment.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace `[node]` values with those found by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(LISTEN_ADDR_ENV) {
            self.node.listen_addr = addr;
        }
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            self.node.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.node.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        self.signing_keypair()?;
        self.consensus_config()?;
        self.validator_infos()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.node
            .listen_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidField {
                field: "node.listen_addr",
                reason: e.to_string(),
            })
    }

    pub fn signing_keypair(&self) -> Result<ValidatorKeyPair, ConfigError> {
        let seed = decode_key("node.signing_seed", &self.node.signing_seed)?;
        Ok(ValidatorKeyPair::from_seed(seed))
    }

    pub fn consensus_config(&self) -> Result<ConsensusConfig, ConfigError> {
        let section = &self.consensus;
        let mode = section
            .mode
            .parse::<AgreementMode>()
            .map_err(|e| ConfigError::InvalidField {
                field: "consensus.mode",
                reason: e.to_string(),
            })?;
        if section.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidField {
                field: "consensus.tick_interval_ms",
                reason: "must be positive".to_string(),
            });
        }
        if section.sync_batch_size == 0 {
            return Err(ConfigError::InvalidField {
                field: "consensus.sync_batch_size",
                reason: "must be positive".to_string(),
            });
        }
        if section.inbox_per_signer == 0 {
            return Err(ConfigError::InvalidField {
                field: "consensus.inbox_per_signer",
                reason: "must be positive".to_string(),
            });
        }
        Ok(ConsensusConfig {
            mode,
            tick_interval: Duration::from_millis(section.tick_interval_ms),
            rpc_timeout: Duration::from_millis(section.rpc_timeout_ms),
            view_change_after_ticks: section.view_change_after_ticks.max(1),
            sync_batch_size: section.sync_batch_size,
            sync_max_bytes: section.sync_max_bytes,
            sync_max_retries: section.sync_max_retries,
            max_txs_per_block: section.max_txs_per_block,
            future_height_window: section.future_height_window,
            inbox_capacity: section.inbox_capacity,
            inbox_per_signer: section.inbox_per_signer,
        })
    }

    /// Registry members in configuration order.
    pub fn validator_infos(&self) -> Result<Vec<ValidatorInfo>, ConfigError> {
        if self.validators.is_empty() {
            return Err(ConfigError::NoValidators);
        }
        let mut seen: HashSet<ValidatorId> = HashSet::new();
        self.validators
            .iter()
            .map(|entry| {
                let id: PublicKey = decode_key("validators.public_key", &entry.public_key)?;
                if !seen.insert(id) {
                    return Err(ConfigError::DuplicateValidator(entry.public_key.clone()));
                }
                Ok(ValidatorInfo::new(id, entry.host.clone(), entry.port))
            })
            .collect()
    }
}

fn decode_key(field: &'static str, text: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(text.trim()).map_err(|e| ConfigError::InvalidField {
        field,
        reason: e.to_string(),
    })?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| ConfigError::InvalidField {
        field,
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}

/// Config path from the first CLI argument, else `VC_CONFIG`.
pub fn config_path(
    mut args: impl Iterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    args.next()
        .or_else(|| env(CONFIG_ENV))
        .map(PathBuf::from)
        .ok_or(ConfigError::MissingPath)
}
