//! Polling watcher: turns a provider without push notifications into an
//! event source by diffing `eth_accounts` / `eth_chainId` on an interval.

use std::sync::Arc;
use std::time::Duration;

use ethers::types::Address;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::provider::{ProviderError, ProviderEvent, WalletProvider};

/// Last values seen by the watcher. `None` until first observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSnapshot {
    pub accounts: Option<Vec<Address>>,
    pub chain_id: Option<u64>,
}

pub struct ProviderWatcher {
    interval: Duration,
}

impl ProviderWatcher {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Queries the provider once and returns the changes since `snapshot`.
    ///
    /// The first observation of each value only seeds the snapshot.
    pub async fn poll(
        provider: &dyn WalletProvider,
        snapshot: &mut WatchSnapshot,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        let accounts = provider.accounts().await?;
        let chain_id = provider.chain_id().await?;
        let mut events = Vec::new();

        if let Some(previous) = snapshot.accounts.as_ref() {
            if *previous != accounts {
                events.push(ProviderEvent::AccountsChanged(accounts.clone()));
            }
        }
        if let Some(previous) = snapshot.chain_id {
            if previous != chain_id {
                events.push(ProviderEvent::ChainChanged(chain_id));
            }
        }

        snapshot.accounts = Some(accounts);
        snapshot.chain_id = Some(chain_id);
        Ok(events)
    }

    /// Polls until `token` is cancelled, publishing changes on `events`.
    pub fn spawn(
        self,
        provider: Arc<dyn WalletProvider>,
        events: broadcast::Sender<ProviderEvent>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut snapshot = WatchSnapshot::default();

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match Self::poll(provider.as_ref(), &mut snapshot).await {
                    Ok(changes) => {
                        for event in changes {
                            debug!(?event, "Provider state changed");
                            // no subscribers is not an error for a watcher
                            let _ = events.send(event);
                        }
                    }
                    Err(e) => warn!(error = %e, "Provider poll failed"),
                }
            }
            debug!("Provider watcher stopped");
        })
    }
}
