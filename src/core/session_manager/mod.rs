//! Wallet Session Manager
//!
//! Mediates between one injected wallet provider and the application's
//! reactive session state.
//!
//! ## Module Structure
//! - `lifecycle` - connect, restore, disconnect
//! - `network`   - reconciliation of the wallet's chain with the target network
//! - `listener`  - provider notification subscription

pub mod lifecycle;
pub mod listener;
pub mod network;

pub use listener::ListenerHandle;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::blockchain::provider::WalletProvider;
use crate::core::{
    config::NetworkDescriptor,
    errors::SessionError,
    notify::{Notifier, TracingNotifier},
    session::{SessionState, WalletSession},
};

/// How the wallet ended up on the target network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reconciliation {
    /// Already on the target; no request was made.
    AlreadyOnTarget,
    /// `wallet_switchEthereumChain` succeeded.
    Switched,
    /// The chain was unknown and `wallet_addEthereumChain` succeeded.
    Added,
}

/// Result of a successful `connect()`.
///
/// Reconciliation is advisory: its failure is reported here but the session
/// stays connected.
#[derive(Debug, Clone)]
pub struct ConnectReport {
    pub session: WalletSession,
    pub reconciliation: Result<Reconciliation, SessionError>,
}

/// Owns the [`WalletSession`] and every transition on it.
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    network: NetworkDescriptor,
    notifier: Arc<dyn Notifier>,
    session: watch::Sender<WalletSession>,
    connect_in_flight: AtomicBool,
    /// Bumped by every `disconnect()`; a connect only commits within the
    /// generation it started in.
    generation: AtomicU64,
    /// An account change arrived while a connect was already in flight.
    reconnect_pending: AtomicBool,
}

impl SessionManager {
    /// Creates a manager with an empty session.
    ///
    /// `provider` is `None` when no wallet is injected; `connect()` then
    /// fails with `ProviderUnavailable`.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        network: NetworkDescriptor,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_session(provider, network, notifier, WalletSession::empty())
    }

    /// Creates a manager around an existing session value.
    pub fn with_session(
        provider: Option<Arc<dyn WalletProvider>>,
        network: NetworkDescriptor,
        notifier: Arc<dyn Notifier>,
        session: WalletSession,
    ) -> Self {
        let (session, _) = watch::channel(session);
        Self {
            provider,
            network,
            notifier,
            session,
            connect_in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            reconnect_pending: AtomicBool::new(false),
        }
    }

    /// Manager that logs notices through tracing.
    pub fn with_tracing(
        provider: Option<Arc<dyn WalletProvider>>,
        network: NetworkDescriptor,
    ) -> Self {
        Self::new(provider, network, Arc::new(TracingNotifier))
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.session.borrow().state()
    }

    /// Read-only, change-notified view of the session.
    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.session.subscribe()
    }

    pub fn network(&self) -> &NetworkDescriptor {
        &self.network
    }

    pub fn is_provider_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn is_connect_in_flight(&self) -> bool {
        self.connect_in_flight.load(Ordering::Acquire)
    }

    fn try_begin_connect(&self) -> Option<ConnectGuard<'_>> {
        self.connect_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ConnectGuard { flag: &self.connect_in_flight })
    }
}

/// Clears the in-flight flag when the connect attempt ends, however it ends.
struct ConnectGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::with_tracing(None, NetworkDescriptor::default())
    }

    #[test]
    fn starts_disconnected() {
        let manager = manager();
        assert_eq!(manager.state(), SessionState::Disconnected);
        assert!(manager.session().is_empty());
        assert!(!manager.is_provider_available());
    }

    #[test]
    fn connect_guard_is_exclusive_and_released_on_drop() {
        let manager = manager();
        let guard = manager.try_begin_connect().expect("first guard");
        assert!(manager.is_connect_in_flight());
        assert!(manager.try_begin_connect().is_none());
        drop(guard);
        assert!(!manager.is_connect_in_flight());
        assert!(manager.try_begin_connect().is_some());
    }

    #[test]
    fn with_session_injects_initial_state() {
        let initial = WalletSession { chain_id: Some(1), is_connecting: true, ..Default::default() };
        let manager = SessionManager::with_session(
            None,
            NetworkDescriptor::default(),
            Arc::new(TracingNotifier),
            initial.clone(),
        );
        assert_eq!(manager.session(), initial);
        assert_eq!(manager.state(), SessionState::Connecting);
    }
}
