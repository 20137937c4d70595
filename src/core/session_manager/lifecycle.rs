//! Session lifecycle: connect, restore, disconnect

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ConnectReport, SessionManager};
use crate::blockchain::provider::WalletProvider;
use crate::core::{
    errors::SessionError,
    notify::Notice,
    session::{short_address, WalletSession},
};

impl SessionManager {
    /// Requests account access and populates the session.
    ///
    /// On success the wallet is then asked to move to the target network; that
    /// outcome is carried in [`ConnectReport::reconciliation`] and never fails
    /// the connection. An account change that arrives while the wallet is
    /// answering makes the attempt run again before returning.
    ///
    /// # Errors
    /// * `ProviderUnavailable` - no wallet injected
    /// * `ConnectInFlight` - another `connect()` is awaiting the wallet
    /// * `UserRejected` / `NoAccountsGranted` - the user refused or granted nothing
    /// * `ConnectAborted` - `disconnect()` ran before the wallet answered
    /// * `Provider` - the wallet failed to answer a chain or balance query
    pub async fn connect(&self) -> Result<ConnectReport, SessionError> {
        let mut report = self.connect_once().await?;
        while self.reconnect_pending.load(Ordering::Acquire) {
            debug!("Accounts changed during connect; reading the wallet again");
            match self.connect_once().await {
                Ok(next) => report = next,
                // whoever holds the guard now picks up the change
                Err(SessionError::ConnectInFlight) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    async fn connect_once(&self) -> Result<ConnectReport, SessionError> {
        let provider = match self.provider.as_ref() {
            Some(provider) => Arc::clone(provider),
            None => {
                warn!("connect called without an injected wallet provider");
                self.notifier.notify(Notice::destructive(
                    "Wallet Required",
                    "Please install a browser wallet to use this feature.",
                ));
                return Err(SessionError::ProviderUnavailable);
            }
        };

        let guard = self.try_begin_connect().ok_or_else(|| {
            debug!("connect ignored: another attempt is in flight");
            SessionError::ConnectInFlight
        })?;
        // this attempt reads the wallet fresh, so earlier requests are covered
        self.reconnect_pending.store(false, Ordering::Release);
        let generation = self.generation.load(Ordering::Acquire);

        self.session.send_modify(|session| session.is_connecting = true);

        let session = match self.establish(provider.as_ref()).await {
            Ok(session) => session,
            Err(err) => {
                self.session.send_replace(WalletSession::empty());
                drop(guard);
                warn!(error = %err, "Failed to connect wallet");
                self.notifier.notify(Notice::destructive("Connection Failed", err.to_string()));
                return Err(err);
            }
        };

        let account = session.account.map(|a| short_address(&a)).unwrap_or_default();
        let chain_id = session.chain_id;
        let committed = self.session.send_if_modified(|current| {
            if self.generation.load(Ordering::Acquire) == generation && current.is_connecting {
                *current = session;
                true
            } else {
                false
            }
        });
        if !committed {
            self.session.send_if_modified(|current| {
                let was_connecting = current.is_connecting;
                current.is_connecting = false;
                was_connecting
            });
            drop(guard);
            info!(account = %account, "Wallet answered after disconnect; result discarded");
            return Err(SessionError::ConnectAborted);
        }
        drop(guard);

        info!(account = %account, chain_id = ?chain_id, "Wallet connected");
        self.notifier.notify(Notice::info("Wallet Connected", format!("Connected to {}", account)));

        let reconciliation = self.reconcile_with(provider.as_ref(), chain_id).await;
        if let Err(err) = &reconciliation {
            warn!(error = %err, "Network reconciliation failed; session stays connected");
        }

        Ok(ConnectReport { session: self.session(), reconciliation })
    }

    async fn establish(&self, provider: &dyn WalletProvider) -> Result<WalletSession, SessionError> {
        let accounts =
            provider.request_accounts().await.map_err(SessionError::from_account_request)?;
        let account = *accounts.first().ok_or(SessionError::NoAccountsGranted)?;
        debug!(granted = accounts.len(), "Accounts granted");

        let chain_id = provider.chain_id().await?;
        let balance = provider.get_balance(account).await?;
        Ok(WalletSession::connected(account, chain_id, balance))
    }

    /// Reconnects silently when the wallet already holds a grant for this app.
    ///
    /// Uses `eth_accounts`, which never prompts. Returns `Ok(None)` when there
    /// is no provider or no existing grant.
    pub async fn restore(&self) -> Result<Option<ConnectReport>, SessionError> {
        let Some(provider) = self.provider.as_ref() else {
            debug!("restore skipped: no wallet provider");
            return Ok(None);
        };

        let accounts = provider.accounts().await?;
        if accounts.is_empty() {
            debug!("restore skipped: wallet holds no grant");
            return Ok(None);
        }

        self.connect().await.map(Some)
    }

    /// Resets the session to empty.
    ///
    /// Local only: the wallet keeps its grant and is not contacted.
    /// Any `connect()` still awaiting the wallet is abandoned.
    pub fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.reconnect_pending.store(false, Ordering::Release);
        self.session.send_replace(WalletSession::empty());
        info!("Wallet disconnected");
        self.notifier.notify(Notice::info(
            "Wallet Disconnected",
            "Your wallet has been disconnected.",
        ));
    }
}
