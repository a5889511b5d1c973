//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `default_*` functions and `Default` implementations
//! 2. **Config file**: TOML file named by the `VOTECALC_CONFIG` env var
//! 3. **Environment variables**: `VOTECALC__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ChainConfig`]: RPC endpoint, governor contract and block range
//! - [`EasConfig`]: EAS GraphQL endpoints and schema ids
//! - [`LogsConfig`]: Window size, bisection depth and topic grouping
//! - [`TallyConfig`]: Proposal types, citizen counts and tally weights
//! - [`DataConfig`]: Where fetched data is stored
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! environment = "op-sepolia"
//!
//! [chain]
//! chain_id = 11155420
//! rpc_url = "https://sepolia.optimism.io"
//! governor_address = "0x6e17cdef2f7c1598ae1bf1a5ae73ee6e4f1c6b3c"
//! start_block = 9000000
//!
//! [eas]
//! votes_url = "https://optimism-sepolia.easscan.org/graphql"
//! proposals_url = "https://optimism-sepolia.easscan.org/graphql"
//! vote_schema_id = "0x..."
//! citizen_schema_id = "0x..."
//! create_proposal_schema_id = "0x..."
//!
//! [tally.proposal_types.0]
//! name = "Standard"
//! quorum_bps = 3000
//! approval_threshold_bps = 5100
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};

use crate::{
    logs::{resolve_block_span, DEFAULT_MAX_SPLIT_DEPTH, MAX_TOPICS_PER_QUERY},
    proposal::{CitizenCounts, ProposalTypeConfig, ProposalTypes, TallyWeights},
};

/// Chain the governor contract lives on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id. Picks the default log window size. Defaults to `10`.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// JSON-RPC endpoint used for logs and governor reads.
    #[serde(default)]
    pub rpc_url: String,

    /// Governor contract address.
    #[serde(default)]
    pub governor_address: String,

    /// First block to read logs from. Defaults to `0`.
    #[serde(default)]
    pub start_block: u64,

    /// Last block to read logs from. The chain head when unset.
    #[serde(default)]
    pub end_block: Option<u64>,
}

fn default_chain_id() -> u64 {
    10
}

/// EAS indexer endpoints and the schemas read from them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EasConfig {
    /// GraphQL endpoint holding vote and citizen attestations.
    #[serde(default)]
    pub votes_url: String,

    /// GraphQL endpoint holding `CreateProposal` attestations.
    #[serde(default)]
    pub proposals_url: String,

    #[serde(default)]
    pub vote_schema_id: String,

    #[serde(default)]
    pub citizen_schema_id: String,

    #[serde(default)]
    pub create_proposal_schema_id: String,
}

/// Log retrieval tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Blocks per window. Derived from the chain id when unset.
    #[serde(default)]
    pub block_span: Option<u64>,

    /// Maximum bisection depth before a rejected range is fatal. Defaults to `64`.
    #[serde(default = "default_max_split_depth")]
    pub max_split_depth: u32,

    /// Event selectors per query, at most `4`. Defaults to `4`.
    #[serde(default = "default_topic_chunk_size")]
    pub topic_chunk_size: usize,
}

fn default_max_split_depth() -> u32 {
    DEFAULT_MAX_SPLIT_DEPTH
}

fn default_topic_chunk_size() -> usize {
    MAX_TOPICS_PER_QUERY
}

/// Tally inputs that are not read from chain or EAS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Proposal types keyed by their numeric id.
    #[serde(default)]
    pub proposal_types: BTreeMap<String, ProposalTypeConfig>,

    #[serde(default)]
    pub citizens: CitizenCounts,

    #[serde(default)]
    pub weights: TallyWeights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory; each environment gets its own subdirectory. Defaults to `data`.
    #[serde(default = "default_data_dir")]
    pub dir: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset. Defaults to `info`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` or `pretty`. Defaults to `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the deployment; selects the data subdirectory. Defaults to `development`.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub eas: EasConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub tally: TallyConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            rpc_url: String::new(),
            governor_address: String::new(),
            start_block: 0,
            end_block: None,
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            block_span: None,
            max_split_depth: default_max_split_depth(),
            topic_chunk_size: default_topic_chunk_size(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { dir: default_data_dir() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            chain: ChainConfig::default(),
            eas: EasConfig::default(),
            logs: LogsConfig::default(),
            tally: TallyConfig::default(),
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Use `__` as a separator for nested fields (e.g. `VOTECALC__CHAIN__RPC_URL=...`).
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("environment", default_environment())?
            .set_default("logs.max_split_depth", i64::from(default_max_split_depth()))?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("VOTECALC").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from `config/config.toml`, or the file named by `VOTECALC_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("VOTECALC_CONFIG").unwrap_or_else(|_| "config/config.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Window size for log pagination: the configured span, else the chain default.
    #[must_use]
    pub fn block_span(&self) -> u64 {
        resolve_block_span(Some(self.chain.chain_id), self.logs.block_span)
    }

    /// Proposal types keyed by numeric id.
    ///
    /// # Errors
    ///
    /// Returns an error string naming the first key that is not a `u32`.
    pub fn proposal_types(&self) -> Result<ProposalTypes, String> {
        self.tally
            .proposal_types
            .iter()
            .map(|(key, config)| {
                key.parse::<u32>()
                    .map(|id| (id, config.clone()))
                    .map_err(|_| format!("Proposal type key must be a number: {key}"))
            })
            .collect()
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// Endpoint URLs are only checked when set, so offline commands such as `calculate`
    /// work from a config without them.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [
            ("chain.rpc_url", &self.chain.rpc_url),
            ("eas.votes_url", &self.eas.votes_url),
            ("eas.proposals_url", &self.eas.proposals_url),
        ] {
            if !url.is_empty() && !url.starts_with("http") {
                return Err(format!("Invalid URL for {name}: {url}"));
            }
        }

        if let Some(end) = self.chain.end_block {
            if end < self.chain.start_block {
                return Err(format!(
                    "End block {end} is before start block {}",
                    self.chain.start_block
                ));
            }
        }

        if self.logs.block_span == Some(0) {
            return Err("Block span must be greater than 0".to_string());
        }

        if self.logs.max_split_depth == 0 {
            return Err("Max split depth must be greater than 0".to_string());
        }

        if !(1..=MAX_TOPICS_PER_QUERY).contains(&self.logs.topic_chunk_size) {
            return Err(format!("Topic chunk size must be between 1 and {MAX_TOPICS_PER_QUERY}"));
        }

        let weights = &self.tally.weights;
        for (name, shares, expected) in
            [("hybrid", &weights.hybrid, 4), ("offchain", &weights.offchain, 3)]
        {
            if shares.len() != expected {
                return Err(format!("The {name} tally weights need {expected} entries"));
            }
            let sum: f64 = shares.iter().sum();
            if (sum - 1.0).abs() > 1e-9 {
                return Err(format!("The {name} tally weights must sum to 1, got {sum}"));
            }
        }

        for (id, proposal_type) in self.proposal_types()? {
            if proposal_type.quorum_bps > 10_000 || proposal_type.approval_threshold_bps > 10_000 {
                return Err(format!("Proposal type {id} has a threshold above 10000 bps"));
            }
            if proposal_type.tiers.iter().any(|bps| *bps > 10_000) {
                return Err(format!("Proposal type {id} has a veto tier above 10000 bps"));
            }
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}
