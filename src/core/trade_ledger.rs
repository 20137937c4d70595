//! Trade ledger
//!
//! Records trade events for the connected account against the placeholder
//! trading contract. The contract call itself is simulated: the ledger waits
//! for the configured confirmation latency and keeps the records in memory.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ethers::types::Address;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::core::{
    config::{LedgerConfig, NetworkDescriptor},
    errors::SessionError,
    notify::{Notice, Notifier},
    session::WalletSession,
    session_manager::SessionManager,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "Buy"),
            TradeSide::Sell => write!(f, "Sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub account: Address,
    pub symbol: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub side: TradeSide,
    pub timestamp: DateTime<Utc>,
}

pub struct TradeLedger {
    session: watch::Receiver<WalletSession>,
    network: NetworkDescriptor,
    config: LedgerConfig,
    notifier: Arc<dyn Notifier>,
    /// Newest first
    trades: RwLock<Vec<TradeRecord>>,
    in_flight: AtomicUsize,
}

impl TradeLedger {
    pub fn new(manager: &SessionManager, config: LedgerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            session: manager.subscribe(),
            network: manager.network().clone(),
            config,
            notifier,
            trades: RwLock::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    pub fn is_transacting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Records a trade for the connected account.
    pub async fn record_trade(
        &self,
        symbol: &str,
        amount: Decimal,
        price: Decimal,
        side: TradeSide,
    ) -> Result<TradeRecord, SessionError> {
        let account = self.require_account("Please connect your wallet to record trades on-chain.")?;

        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(SessionError::InvalidInput("symbol must not be empty".to_string()));
        }
        if amount <= Decimal::ZERO {
            return Err(SessionError::InvalidInput(format!("amount must be positive, got {}", amount)));
        }
        if price.is_sign_negative() {
            return Err(SessionError::InvalidInput(format!("price must not be negative, got {}", price)));
        }

        let _busy = InFlight::enter(&self.in_flight);
        tokio::time::sleep(self.config.confirmation_delay()).await;

        let record = TradeRecord {
            account,
            symbol: symbol.to_string(),
            amount,
            price,
            side,
            timestamp: Utc::now(),
        };
        self.trades.write().insert(0, record.clone());

        info!(
            contract = ?self.config.contract_address,
            symbol = %record.symbol,
            side = %side,
            amount = %amount,
            price = %price,
            "Trade recorded"
        );
        self.notifier.notify(Notice::info(
            "Trade Recorded On-Chain",
            format!(
                "{} order for {} {} recorded on {}.",
                side, amount, record.symbol, self.network.chain_name
            ),
        ));
        Ok(record)
    }

    /// Trades recorded for the connected account, newest first. Empty when
    /// no wallet is connected.
    pub fn user_trades(&self) -> Vec<TradeRecord> {
        let account = {
            let session = self.session.borrow();
            if !session.is_connected {
                return Vec::new();
            }
            session.account
        };
        match account {
            Some(account) => {
                self.trades.read().iter().filter(|t| t.account == account).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Credits a native-token reward to the connected account.
    pub async fn reward_tokens(&self, amount: Decimal) -> Result<(), SessionError> {
        let account = self.require_account("Please connect your wallet to claim rewards.")?;
        if amount <= Decimal::ZERO {
            return Err(SessionError::InvalidInput(format!("reward must be positive, got {}", amount)));
        }

        let _busy = InFlight::enter(&self.in_flight);
        tokio::time::sleep(self.config.reward_delay()).await;

        let symbol = &self.network.native_currency.symbol;
        info!(account = ?account, amount = %amount, symbol = %symbol, "Reward credited");
        self.notifier.notify(Notice::info(
            format!("{} Tokens Rewarded!", symbol),
            format!("{} {} tokens have been credited to your wallet.", amount, symbol),
        ));
        Ok(())
    }

    fn require_account(&self, hint: &str) -> Result<Address, SessionError> {
        let account = {
            let session = self.session.borrow();
            session.account.filter(|_| session.is_connected)
        };
        account.ok_or_else(|| {
            self.notifier.notify(Notice::destructive("Wallet Not Connected", hint));
            SessionError::NotConnected
        })
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
