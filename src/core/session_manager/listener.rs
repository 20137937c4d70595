//! Provider notification subscription

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionManager;
use crate::blockchain::provider::ProviderEvent;
use crate::core::errors::SessionError;

/// Keeps the provider subscription alive. Dropping it unsubscribes.
pub struct ListenerHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Unsubscribes and waits for the listener task to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Provider event listener ended abnormally");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl SessionManager {
    /// Subscribes to the provider's account and chain notifications.
    ///
    /// Events are applied in arrival order until the returned handle is
    /// dropped or shut down. Must be called from within a tokio runtime.
    pub fn listen(self: &Arc<Self>) -> Result<ListenerHandle, SessionError> {
        let provider = self.provider.as_ref().ok_or(SessionError::ProviderUnavailable)?;
        let mut events = provider.subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let manager = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => manager.handle_event(event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Provider event listener lagged; resyncing from the wallet");
                            manager.resync().await;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("Provider event listener stopped");
        });

        info!("Listening for wallet account and chain changes");
        Ok(ListenerHandle { token, task: Some(task) })
    }

    /// Applies one provider notification to the session.
    pub async fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => {
                let current = self.session.borrow().account;
                match accounts.first() {
                    None => {
                        info!("Wallet revoked all accounts");
                        self.disconnect();
                    }
                    Some(first) if Some(*first) == current => {
                        debug!("accountsChanged carries the current account; ignoring");
                    }
                    Some(_) => {
                        info!("Wallet switched accounts; reconnecting");
                        self.reconnect_pending.store(true, Ordering::Release);
                        match self.connect().await {
                            Ok(_) => {}
                            Err(SessionError::ConnectInFlight) => {
                                debug!("Account change queued behind the in-flight connect");
                            }
                            Err(err) => debug!(error = %err, "Reconnect after account change failed"),
                        }
                    }
                }
            }
            ProviderEvent::ChainChanged(chain_id) => {
                let applied = self.session.send_if_modified(|session| {
                    if session.is_connected && session.chain_id != Some(chain_id) {
                        session.chain_id = Some(chain_id);
                        true
                    } else {
                        false
                    }
                });
                debug!(chain_id, applied, "chainChanged");
            }
        }
    }

    /// Re-reads accounts and chain after notifications were dropped.
    async fn resync(&self) {
        let Some(provider) = self.provider.clone() else {
            return;
        };
        if !self.session.borrow().is_connected {
            debug!("Resync skipped: no connected session");
            return;
        }
        match provider.accounts().await {
            Ok(accounts) => self.handle_event(ProviderEvent::AccountsChanged(accounts)).await,
            Err(e) => {
                warn!(error = %e, "Resync failed: eth_accounts");
                return;
            }
        }
        match provider.chain_id().await {
            Ok(chain_id) => self.handle_event(ProviderEvent::ChainChanged(chain_id)).await,
            Err(e) => warn!(error = %e, "Resync failed: eth_chainId"),
        }
    }
}
