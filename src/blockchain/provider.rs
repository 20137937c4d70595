use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::core::config::NetworkDescriptor;

/// EIP-1193: the user rejected the request.
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-1193: the provider does not know the requested chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Errors reported by a wallet provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// JSON-RPC error object returned by the wallet.
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        Self::Rpc { code, message: message.into() }
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code() == Some(USER_REJECTED_REQUEST)
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code() == Some(UNRECOGNIZED_CHAIN)
    }
}

/// Notifications pushed by the wallet outside of any request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

/// The contract the session manager needs from an injected wallet.
///
/// Implementations must be cheap to share behind an `Arc`; every method may
/// suspend indefinitely while the wallet waits on the user.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_requestAccounts`: prompts the user for access.
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// `eth_accounts`: accounts already granted, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// `eth_getBalance` at the latest block, in wei.
    async fn get_balance(&self, account: Address) -> Result<U256, ProviderError>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// `wallet_addEthereumChain` (EIP-3085)
    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError>;

    /// Subscribes to `accountsChanged` / `chainChanged` notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
