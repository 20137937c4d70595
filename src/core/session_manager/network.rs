//! Reconciliation of the wallet's active chain with the target network

use tracing::{debug, info, warn};

use super::{Reconciliation, SessionManager};
use crate::blockchain::provider::WalletProvider;
use crate::core::{errors::SessionError, notify::Notice};

impl SessionManager {
    /// Moves the wallet onto the target network if it is elsewhere.
    ///
    /// Uses the session's chain id when known and only asks the provider
    /// otherwise, so an already-aligned session costs no provider calls.
    /// Failures leave the session unchanged.
    pub async fn reconcile_network(&self) -> Result<Reconciliation, SessionError> {
        let provider = self.provider.clone().ok_or(SessionError::ProviderUnavailable)?;
        let known_chain = self.session.borrow().chain_id;
        self.reconcile_with(provider.as_ref(), known_chain).await
    }

    pub(super) async fn reconcile_with(
        &self,
        provider: &dyn WalletProvider,
        known_chain: Option<u64>,
    ) -> Result<Reconciliation, SessionError> {
        let target = self.network.chain_id;
        let current = match known_chain {
            Some(chain_id) => chain_id,
            None => provider.chain_id().await?,
        };

        if current == target {
            debug!(chain_id = target, "Wallet already on target network");
            return Ok(Reconciliation::AlreadyOnTarget);
        }

        info!(from = current, to = target, "Requesting network switch");
        let outcome = match provider.switch_chain(target).await {
            Ok(()) => Reconciliation::Switched,
            Err(err) if err.is_unrecognized_chain() => {
                info!(chain_id = target, "Wallet does not know the target chain, requesting add");
                if let Err(add_err) = provider.add_chain(&self.network).await {
                    warn!(error = %add_err, "wallet_addEthereumChain failed");
                    self.notifier.notify(Notice::destructive(
                        "Network Error",
                        format!("Failed to add {} to the wallet", self.network.chain_name),
                    ));
                    return Err(SessionError::NetworkSwitchFailed(add_err.to_string()));
                }
                Reconciliation::Added
            }
            Err(err) => {
                warn!(error = %err, "wallet_switchEthereumChain failed");
                self.notifier.notify(Notice::destructive(
                    "Network Switch Failed",
                    format!("Failed to switch to {}", self.network.chain_name),
                ));
                return Err(SessionError::NetworkSwitchFailed(err.to_string()));
            }
        };

        self.session.send_if_modified(|session| {
            if session.is_connected && session.chain_id != Some(target) {
                session.chain_id = Some(target);
                true
            } else {
                false
            }
        });

        Ok(outcome)
    }
}
