//! Wallet session value and its derived connection state.

use ethers::types::{Address, U256};
use ethers::utils::format_ether;
use serde::{Deserialize, Serialize};

use crate::core::config::NetworkDescriptor;

/// Connection state derived from a [`WalletSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot of the wallet connection as the UI sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub is_connected: bool,
    pub is_connecting: bool,
    pub balance_wei: Option<U256>,
}

impl WalletSession {
    /// The disconnected session: every field null/false.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn connected(account: Address, chain_id: u64, balance_wei: U256) -> Self {
        Self {
            account: Some(account),
            chain_id: Some(chain_id),
            is_connected: true,
            is_connecting: false,
            balance_wei: Some(balance_wei),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.is_connecting {
            SessionState::Connecting
        } else if self.is_connected {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    pub fn is_on_chain(&self, chain_id: u64) -> bool {
        self.chain_id == Some(chain_id)
    }

    /// `0x1234...abcd`
    pub fn short_account(&self) -> Option<String> {
        self.account.map(|account| short_address(&account))
    }

    /// Balance in ether units, e.g. `"1.500000000000000000"`.
    pub fn formatted_balance(&self) -> Option<String> {
        self.balance_wei.map(format_ether)
    }

    /// Target network name when on it, `Chain <id>` otherwise.
    pub fn network_label(&self, target: &NetworkDescriptor) -> Option<String> {
        self.chain_id.map(|id| {
            if id == target.chain_id {
                target.chain_name.clone()
            } else {
                format!("Chain {}", id)
            }
        })
    }
}

pub fn short_address(address: &Address) -> String {
    let full = format!("{:?}", address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn account() -> Address {
        Address::from_str("0x742d35Cc6634C0532925a3b844Bc454e4438f44e").unwrap()
    }

    #[test]
    fn empty_session_is_disconnected() {
        let session = WalletSession::empty();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.account.is_none());
        assert!(session.chain_id.is_none());
        assert!(session.balance_wei.is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn connecting_wins_over_connected() {
        let mut session = WalletSession::connected(account(), 1, U256::zero());
        assert_eq!(session.state(), SessionState::Connected);
        session.is_connecting = true;
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn short_account_keeps_prefix_and_suffix() {
        let session = WalletSession::connected(account(), 8081, U256::zero());
        assert_eq!(session.short_account().as_deref(), Some("0x742d...f44e"));
    }

    #[test]
    fn formats_balance_in_ether() {
        let session = WalletSession::connected(
            account(),
            8081,
            U256::from(1_500_000_000_000_000_000u64),
        );
        let formatted = session.formatted_balance().unwrap();
        assert!(formatted.starts_with("1.5"), "unexpected balance: {}", formatted);
    }

    #[test]
    fn network_label_names_target_only() {
        let target = NetworkDescriptor::default();
        let on_target = WalletSession::connected(account(), 8081, U256::zero());
        let elsewhere = WalletSession::connected(account(), 1, U256::zero());
        assert_eq!(on_target.network_label(&target).as_deref(), Some("Shardeum Testnet"));
        assert_eq!(elsewhere.network_label(&target).as_deref(), Some("Chain 1"));
        assert_eq!(WalletSession::empty().network_label(&target), None);
    }
}
