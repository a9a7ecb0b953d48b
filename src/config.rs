//! Configuration types for the escrow wallet
//!
//! Manages global configuration including network settings, the chain client
//! endpoint, the escrow contract, and wallet policy (dust, gas, fee ceiling).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::address::Address;

/// Global wallet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
    /// Optional custom keystores directory
    pub keystores_dir: Option<String>,
}

/// Chain connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub network: NetworkType,
    /// EIP-155 chain id, mixed into every transaction signature
    pub chain_id: u64,
    pub rpc_url: String,
    /// Escrow contract; escrow funding and release are unavailable without it
    pub escrow_contract: Option<Address>,
    /// Upper bound for every chain client call
    pub request_timeout_secs: u64,
}

/// Wallet policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Ticker of the single asset this wallet holds
    pub currency_code: String,
    /// Amounts strictly below this (in wei) are dust
    pub dust_threshold: u64,
    pub transfer_gas_limit: u64,
    pub escrow_gas_limit: u64,
    /// Highest gas price (in wei) the wallet will sign with
    pub max_fee_rate: u64,
}

/// Network type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Sepolia,
    Ropsten,
    Dev,
}

impl NetworkType {
    pub fn chain_id(&self) -> u64 {
        match self {
            NetworkType::Mainnet => 1,
            NetworkType::Ropsten => 3,
            NetworkType::Sepolia => 11_155_111,
            NetworkType::Dev => 1337,
        }
    }
}

impl std::str::FromStr for NetworkType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(NetworkType::Mainnet),
            "sepolia" => Ok(NetworkType::Sepolia),
            "ropsten" => Ok(NetworkType::Ropsten),
            "dev" => Ok(NetworkType::Dev),
            other => Err(ConfigError::InvalidNetwork(other.to_string())),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkType::Mainnet => write!(f, "mainnet"),
            NetworkType::Sepolia => write!(f, "sepolia"),
            NetworkType::Ropsten => write!(f, "ropsten"),
            NetworkType::Dev => write!(f, "dev"),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            currency_code: "ETH".to_string(),
            dust_threshold: 10_000,
            transfer_gas_limit: 21_000,
            escrow_gas_limit: 4_000_000,
            max_fee_rate: 500_000_000_000,
        }
    }
}

impl GlobalConfig {
    /// Default configuration for a network
    pub fn for_network(network: NetworkType) -> Self {
        Self {
            chain: ChainConfig {
                network,
                chain_id: network.chain_id(),
                rpc_url: default_rpc_url(network),
                escrow_contract: None,
                request_timeout_secs: 30,
            },
            wallet: WalletConfig::default(),
            keystores_dir: None,
        }
    }

    /// Create default configuration for a local development chain
    pub fn default_dev() -> Self {
        Self::for_network(NetworkType::Dev)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.chain.request_timeout_secs)
    }

    /// Reject configurations the wallet cannot operate with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.wallet.transfer_gas_limit == 0 || self.wallet.escrow_gas_limit == 0 {
            return Err(ConfigError::Invalid("gas limits must be positive".to_string()));
        }
        if self.wallet.currency_code.trim().is_empty() {
            return Err(ConfigError::Invalid("currency_code must not be empty".to_string()));
        }
        if let Some(contract) = &self.chain.escrow_contract {
            if contract.is_zero() {
                return Err(ConfigError::Invalid(
                    "escrow_contract must not be the zero address".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::default_dev()
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    #[error("Config directory not found")]
    DirectoryNotFound,
}

/// Configuration overrides from CLI arguments or environment variables
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub network: Option<NetworkType>,
    pub rpc_url: Option<String>,
    pub escrow_contract: Option<Address>,
    pub request_timeout_secs: Option<u64>,
    pub keystores_dir: Option<String>,
}

impl ConfigOverrides {
    /// Create empty overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Create overrides from environment variables
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self {
            network: std::env::var("ESCROW_NETWORK")
                .ok()
                .and_then(|s| parse_or_warn("ESCROW_NETWORK", &s)),
            rpc_url: std::env::var("ESCROW_RPC_URL").ok(),
            escrow_contract: std::env::var("ESCROW_CONTRACT")
                .ok()
                .and_then(|s| parse_or_warn("ESCROW_CONTRACT", &s)),
            request_timeout_secs: std::env::var("ESCROW_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| parse_or_warn("ESCROW_REQUEST_TIMEOUT_SECS", &s)),
            keystores_dir: std::env::var("ESCROW_KEYSTORES_DIR").ok(),
        }
    }

    /// Merge with another set of overrides (other takes precedence)
    pub fn merge(mut self, other: Self) -> Self {
        if other.network.is_some() {
            self.network = other.network;
        }
        if other.rpc_url.is_some() {
            self.rpc_url = other.rpc_url;
        }
        if other.escrow_contract.is_some() {
            self.escrow_contract = other.escrow_contract;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.keystores_dir.is_some() {
            self.keystores_dir = other.keystores_dir;
        }
        self
    }
}

fn parse_or_warn<T: std::str::FromStr>(var: &str, value: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Ignoring {}={}: {}", var, value, e);
            None
        }
    }
}

/// Get the default configuration directory path
///
/// Returns: `~/.escrow-wallet/`
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".escrow-wallet"))
        .ok_or(ConfigError::DirectoryNotFound)
}

/// Get the default configuration file path
///
/// Returns: `~/.escrow-wallet/config.json`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_config_dir()?.join("config.json"))
}

/// Default JSON-RPC endpoint for a network
pub fn default_rpc_url(network: NetworkType) -> String {
    match network {
        NetworkType::Mainnet => "https://ethereum-rpc.publicnode.com".to_string(),
        NetworkType::Sepolia => "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
        NetworkType::Ropsten => "http://localhost:8545".to_string(),
        NetworkType::Dev => "http://localhost:8545".to_string(),
    }
}

/// Load configuration from file with overrides
///
/// # Priority (highest to lowest):
/// 1. CLI overrides (passed as argument)
/// 2. Environment variables
/// 3. Config file
/// 4. Network defaults
///
/// # Example
///
/// ```ignore
/// use escrow_wallet::config::{load_config, ConfigOverrides, NetworkType};
///
/// let mut cli_overrides = ConfigOverrides::new();
/// cli_overrides.network = Some(NetworkType::Sepolia);
///
/// let config = load_config(None, cli_overrides)?;
/// ```
pub fn load_config(
    config_path: Option<&Path>,
    cli_overrides: ConfigOverrides,
) -> Result<GlobalConfig, ConfigError> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    let env_overrides = ConfigOverrides::from_env();
    let overrides = env_overrides.merge(cli_overrides);

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        serde_json::from_str(&contents)?
    } else {
        GlobalConfig::for_network(overrides.network.unwrap_or(NetworkType::Dev))
    };

    apply_overrides(&mut config, overrides);
    config.validate()?;

    Ok(config)
}

/// Save configuration to file
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &GlobalConfig, config_path: Option<&Path>) -> Result<(), ConfigError> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;

    Ok(())
}

/// Apply configuration overrides (internal helper)
fn apply_overrides(config: &mut GlobalConfig, overrides: ConfigOverrides) {
    // Switching network resets chain id and, unless given, the endpoint
    if let Some(network) = overrides.network {
        if config.chain.network != network {
            config.chain.network = network;
            config.chain.chain_id = network.chain_id();
            if overrides.rpc_url.is_none() {
                config.chain.rpc_url = default_rpc_url(network);
            }
        }
    }

    if let Some(url) = overrides.rpc_url {
        config.chain.rpc_url = url;
    }
    if let Some(contract) = overrides.escrow_contract {
        config.chain.escrow_contract = Some(contract);
    }
    if let Some(secs) = overrides.request_timeout_secs {
        config.chain.request_timeout_secs = secs;
    }
    if let Some(dir) = overrides.keystores_dir {
        config.keystores_dir = Some(dir);
    }
}
