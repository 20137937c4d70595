use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Native currency of a network, as wallets display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Static description of the network the application wants the wallet on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
    pub native_currency: NativeCurrency,
}

/// `wallet_addEthereumChain` parameter object (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl NetworkDescriptor {
    pub fn shardeum_testnet() -> Self {
        Self {
            chain_id: 8081,
            chain_name: "Shardeum Testnet".to_string(),
            rpc_urls: vec!["https://api-testnet.shardeum.org".to_string()],
            block_explorer_urls: vec!["https://explorer-sphinx.shardeum.org/".to_string()],
            native_currency: NativeCurrency {
                name: "SHM".to_string(),
                symbol: "SHM".to_string(),
                decimals: 18,
            },
        }
    }

    /// Chain id as wallets expect it in RPC params: `0x`-prefixed lowercase hex.
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn add_chain_params(&self) -> AddChainParams {
        AddChainParams {
            chain_id: self.chain_id_hex(),
            chain_name: self.chain_name.clone(),
            native_currency: self.native_currency.clone(),
            rpc_urls: self.rpc_urls.clone(),
            block_explorer_urls: self.block_explorer_urls.clone(),
        }
    }

    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }

    /// Explorer page for an account, if the network has an explorer.
    pub fn explorer_account_url(&self, account: &Address) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/account/{:?}", base.trim_end_matches('/'), account))
    }
}

impl Default for NetworkDescriptor {
    fn default() -> Self {
        Self::shardeum_testnet()
    }
}

/// Provider notification channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "EventConfig::default_capacity")]
    pub capacity: usize,
}

impl EventConfig {
    fn default_capacity() -> usize { 64 }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { capacity: Self::default_capacity() }
    }
}

/// Polling settings for providers without push notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "WatcherConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WatcherConfig {
    fn default_poll_interval_ms() -> u64 { 4_000 }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { poll_interval_ms: Self::default_poll_interval_ms() }
    }
}

/// Trade ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Placeholder trading contract; calls against it are simulated.
    #[serde(default = "LedgerConfig::default_contract_address")]
    pub contract_address: Address,

    #[serde(default = "LedgerConfig::default_confirmation_delay_ms")]
    pub confirmation_delay_ms: u64,

    #[serde(default = "LedgerConfig::default_reward_delay_ms")]
    pub reward_delay_ms: u64,
}

impl LedgerConfig {
    fn default_contract_address() -> Address {
        Address::from_slice(&[
            0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56, 0x78, 0x90, 0x12, 0x34, 0x56, 0x78,
            0x90, 0x12, 0x34, 0x56, 0x78, 0x90,
        ])
    }
    fn default_confirmation_delay_ms() -> u64 { 2_000 }
    fn default_reward_delay_ms() -> u64 { 1_500 }

    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }

    pub fn reward_delay(&self) -> Duration {
        Duration::from_millis(self.reward_delay_ms)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract_address: Self::default_contract_address(),
            confirmation_delay_ms: Self::default_confirmation_delay_ms(),
            reward_delay_ms: Self::default_reward_delay_ms(),
        }
    }
}

/// Top-level session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Target network
    #[serde(default)]
    pub network: NetworkDescriptor,

    #[serde(default)]
    pub events: EventConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl SessionConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse session config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Loads from an explicit path, else `CONFIG_PATH`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var("CONFIG_PATH") {
            Ok(path) if !path.trim().is_empty() => Self::load(path.trim()),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize session config")
    }
}
