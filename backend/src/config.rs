use shield_core::constants::DEFAULT_DEPOSIT_ETH;
use shield_core::deposit::{DepositError, parse_eth_to_wei};
use std::path::PathBuf;
use thiserror::Error;

/// Only network the service can run against without an external relayer and RPC node.
pub const LOCAL_NETWORK: &str = "local";

/// Seed for the development wallet when none is configured. Public, never use for real funds.
pub const DEFAULT_DEV_WALLET_SEED: &str = "fhe-shield local development wallet";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DEPOSIT_ETH is not a valid amount: {0}")]
    Deposit(#[from] DepositError),

    #[error("network '{0}' is not supported (only 'local')")]
    UnsupportedNetwork(String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub api_key: String,
    pub data_dir: PathBuf,
    pub network: String,
    pub dev_wallet_seed: String,
    /// Deposit used when a submission does not carry one.
    pub deposit_eth: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let config = Self {
            addr: get("BACKEND_ADDR", "127.0.0.1:8080"),
            api_key: get("API_KEY", "dev-secret-key"),
            data_dir: PathBuf::from(get("DATA_DIR", "data")),
            network: get("NETWORK", LOCAL_NETWORK),
            dev_wallet_seed: get("DEV_WALLET_SEED", DEFAULT_DEV_WALLET_SEED),
            deposit_eth: get("DEPOSIT_ETH", DEFAULT_DEPOSIT_ETH),
        };

        if config.network != LOCAL_NETWORK {
            return Err(ConfigError::UnsupportedNetwork(config.network));
        }
        parse_eth_to_wei(&config.deposit_eth)?;

        Ok(config)
    }
}
