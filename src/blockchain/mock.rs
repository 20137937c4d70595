//! Scripted in-memory wallet provider.
//!
//! Behaves like a browser wallet closely enough to drive the session manager
//! in tests and in the CLI demo: it tracks granted accounts, the active chain
//! and the set of chains it knows, answers unknown-chain switches with 4902,
//! and emits `chainChanged` when the active chain moves.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};

use super::provider::{ProviderError, ProviderEvent, WalletProvider, UNRECOGNIZED_CHAIN};
use crate::core::config::NetworkDescriptor;

/// One request as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    RequestAccounts,
    Accounts,
    ChainId,
    GetBalance(Address),
    SwitchChain(u64),
    AddChain(NetworkDescriptor),
}

#[derive(Debug)]
struct MockState {
    accounts: Vec<Address>,
    granted: bool,
    chain_id: u64,
    known_chains: HashSet<u64>,
    balances: HashMap<Address, U256>,
    request_accounts_error: Option<ProviderError>,
    switch_error: Option<ProviderError>,
    add_error: Option<ProviderError>,
}

pub struct MockWalletProvider {
    state: Mutex<MockState>,
    calls: Mutex<Vec<ProviderCall>>,
    account_gates: Mutex<VecDeque<Arc<Notify>>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl Default for MockWalletProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWalletProvider {
    /// A wallet on chain 1 with no accounts and no grant.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(MockState {
                accounts: Vec::new(),
                granted: false,
                chain_id: 1,
                known_chains: HashSet::from([1]),
                balances: HashMap::new(),
                request_accounts_error: None,
                switch_error: None,
                add_error: None,
            }),
            calls: Mutex::new(Vec::new()),
            account_gates: Mutex::new(VecDeque::new()),
            events,
        }
    }

    pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
        self.state.get_mut().accounts = accounts;
        self
    }

    /// Marks the accounts as already granted, so `eth_accounts` returns them.
    pub fn with_granted(mut self, granted: bool) -> Self {
        self.state.get_mut().granted = granted;
        self
    }

    /// Sets the active chain; the chain becomes known.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        let state = self.state.get_mut();
        state.chain_id = chain_id;
        state.known_chains.insert(chain_id);
        self
    }

    pub fn with_known_chain(mut self, chain_id: u64) -> Self {
        self.state.get_mut().known_chains.insert(chain_id);
        self
    }

    pub fn with_balance(mut self, account: Address, wei: U256) -> Self {
        self.state.get_mut().balances.insert(account, wei);
        self
    }

    pub fn failing_request_accounts(mut self, err: ProviderError) -> Self {
        self.state.get_mut().request_accounts_error = Some(err);
        self
    }

    pub fn failing_switch(mut self, err: ProviderError) -> Self {
        self.state.get_mut().switch_error = Some(err);
        self
    }

    pub fn failing_add(mut self, err: ProviderError) -> Self {
        self.state.get_mut().add_error = Some(err);
        self
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().accounts = accounts;
    }

    pub fn set_granted(&self, granted: bool) {
        self.state.lock().granted = granted;
    }

    /// Moves the active chain without emitting an event.
    pub fn set_chain_id(&self, chain_id: u64) {
        let mut state = self.state.lock();
        state.chain_id = chain_id;
        state.known_chains.insert(chain_id);
    }

    pub fn active_chain_id(&self) -> u64 {
        self.state.lock().chain_id
    }

    pub fn knows_chain(&self, chain_id: u64) -> bool {
        self.state.lock().known_chains.contains(&chain_id)
    }

    /// Makes the next unheld `eth_requestAccounts` wait until the returned
    /// gate is notified, like a wallet prompt the user has not answered yet.
    /// Repeated calls hold successive requests, one gate each.
    pub fn hold_account_requests(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.account_gates.lock().push_back(Arc::clone(&gate));
        gate
    }

    /// Pushes a notification to subscribers.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    pub fn event_sender(&self) -> broadcast::Sender<ProviderEvent> {
        self.events.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().push(call);
    }

    fn move_to_chain(&self, chain_id: u64) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.chain_id != chain_id;
            state.chain_id = chain_id;
            changed
        };
        if changed {
            let _ = self.events.send(ProviderEvent::ChainChanged(chain_id));
        }
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.record(ProviderCall::RequestAccounts);
        let gate = self.account_gates.lock().pop_front();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        if let Some(err) = state.request_accounts_error.clone() {
            return Err(err);
        }
        if !state.accounts.is_empty() {
            state.granted = true;
        }
        Ok(state.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.record(ProviderCall::Accounts);
        let state = self.state.lock();
        Ok(if state.granted { state.accounts.clone() } else { Vec::new() })
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.record(ProviderCall::ChainId);
        Ok(self.state.lock().chain_id)
    }

    async fn get_balance(&self, account: Address) -> Result<U256, ProviderError> {
        self.record(ProviderCall::GetBalance(account));
        Ok(self.state.lock().balances.get(&account).copied().unwrap_or_default())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.record(ProviderCall::SwitchChain(chain_id));
        {
            let state = self.state.lock();
            if let Some(err) = state.switch_error.clone() {
                return Err(err);
            }
            if !state.known_chains.contains(&chain_id) {
                return Err(ProviderError::rpc(
                    UNRECOGNIZED_CHAIN,
                    format!("Unrecognized chain ID \"{:#x}\".", chain_id),
                ));
            }
        }
        self.move_to_chain(chain_id);
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        self.record(ProviderCall::AddChain(network.clone()));
        {
            let mut state = self.state.lock();
            if let Some(err) = state.add_error.clone() {
                return Err(err);
            }
            state.known_chains.insert(network.chain_id);
        }
        // wallets switch to a chain right after adding it
        self.move_to_chain(network.chain_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
