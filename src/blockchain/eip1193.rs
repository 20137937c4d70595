use std::fmt::Debug;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use ethers::{
    providers::{
        Http, JsonRpcClient, Provider, ProviderError as EthersProviderError, RpcError,
    },
    types::{Address, U256, U64},
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::provider::{ProviderError, ProviderEvent, WalletProvider};
use crate::core::config::NetworkDescriptor;

/// EIP-1193 wallet reached over JSON-RPC through an ethers `Provider`.
///
/// JSON-RPC has no push channel, so notifications are fed in by the host via
/// [`Eip1193Provider::emit`] or by a [`super::watcher::ProviderWatcher`].
#[derive(Clone)]
pub struct Eip1193Provider<P: JsonRpcClient = Http> {
    provider: Provider<P>,
    events: broadcast::Sender<ProviderEvent>,
}

impl Eip1193Provider<Http> {
    pub fn connect_http(rpc_url: &str, event_capacity: usize) -> Result<Self> {
        let rpc_url_clean = rpc_url.trim();
        let parsed_url = reqwest::Url::parse(rpc_url_clean).map_err(|e| {
            anyhow::anyhow!(
                "Invalid wallet RPC URL '{}': {}. Please check the config file or WALLET_RPC_URL.",
                rpc_url_clean,
                e
            )
        })?;

        info!("Using wallet endpoint: {}", parsed_url);
        // Requests may wait on a user prompt, so only the TCP connect is bounded.
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
        if let Ok(proxy) = std::env::var("HTTPS_PROXY").or_else(|_| std::env::var("HTTP_PROXY")) {
            if let Ok(p) = reqwest::Proxy::all(proxy) {
                builder = builder.proxy(p);
            }
        }
        let client =
            builder.build().map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        let provider = Provider::new(Http::new_with_client(parsed_url, client));
        Ok(Self::new(provider, event_capacity))
    }
}

impl<P> Eip1193Provider<P>
where
    P: JsonRpcClient,
{
    pub fn new(provider: Provider<P>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { provider, events }
    }

    /// Publishes a notification to subscribers; returns how many received it.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Sender half of the notification channel, for watchers and bridges.
    pub fn event_sender(&self) -> broadcast::Sender<ProviderEvent> {
        self.events.clone()
    }

    async fn call<T, R>(&self, method: &str, params: T) -> Result<R, ProviderError>
    where
        T: Debug + Serialize + Send + Sync,
        R: Serialize + DeserializeOwned + Debug + Send,
    {
        debug!(method, "wallet request");
        self.provider.request(method, params).await.map_err(map_provider_error)
    }
}

fn map_provider_error(err: EthersProviderError) -> ProviderError {
    if let Some(rpc) = err.as_error_response() {
        return ProviderError::Rpc { code: rpc.code, message: rpc.message.clone() };
    }
    if err.as_serde_error().is_some() {
        return ProviderError::InvalidResponse(err.to_string());
    }
    ProviderError::Transport(err.to_string())
}

#[async_trait]
impl<P> WalletProvider for Eip1193Provider<P>
where
    P: JsonRpcClient + 'static,
{
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.call("eth_requestAccounts", ()).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.call("eth_accounts", ()).await
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let chain_id: U64 = self.call("eth_chainId", ()).await?;
        Ok(chain_id.as_u64())
    }

    async fn get_balance(&self, account: Address) -> Result<U256, ProviderError> {
        self.call("eth_getBalance", (account, "latest")).await
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .call("wallet_switchEthereumChain", [json!({ "chainId": format!("{:#x}", chain_id) })])
            .await?;
        Ok(())
    }

    async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), ProviderError> {
        let _: serde_json::Value =
            self.call("wallet_addEthereumChain", [network.add_chain_params()]).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{JsonRpcError, MockProvider, MockResponse};

    fn make_mock_provider() -> (Eip1193Provider<MockProvider>, MockProvider) {
        let mock = MockProvider::new();
        (Eip1193Provider::new(Provider::new(mock.clone()), 8), mock)
    }

    #[test]
    fn connect_http_rejects_invalid_url() {
        assert!(Eip1193Provider::connect_http("not a url", 8).is_err());
    }

    #[test]
    fn connect_http_accepts_local_node() {
        assert!(Eip1193Provider::connect_http("http://127.0.0.1:8545", 8).is_ok());
    }

    #[tokio::test]
    async fn chain_id_parses_hex_quantity() {
        let (provider, mock) = make_mock_provider();
        mock.push_response(MockResponse::Value(json!("0x1f91")));
        assert_eq!(provider.chain_id().await.unwrap(), 8081);
    }

    #[tokio::test]
    async fn rpc_error_object_keeps_code() {
        let (provider, mock) = make_mock_provider();
        mock.push_response(MockResponse::Error(JsonRpcError {
            code: 4902,
            message: "Unrecognized chain ID \"0x1f91\".".to_string(),
            data: None,
        }));
        let err = provider.switch_chain(8081).await.unwrap_err();
        assert!(err.is_unrecognized_chain(), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn malformed_result_is_not_an_rpc_error() {
        let (provider, mock) = make_mock_provider();
        mock.push_response(MockResponse::Value(json!({ "not": "a list" })));
        let err = provider.request_accounts().await.unwrap_err();
        assert!(err.code().is_none(), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn empty_mock_is_transport_error() {
        let (provider, _mock) = make_mock_provider();
        let err = provider.accounts().await.unwrap_err();
        // MockProvider reports an empty queue as a non-RPC error
        assert!(matches!(err, ProviderError::Transport(_)), "unexpected error: {:?}", err);
    }

    #[test]
    fn emit_without_subscribers_reports_zero() {
        let (provider, _mock) = make_mock_provider();
        assert_eq!(provider.emit(ProviderEvent::ChainChanged(1)), 0);
        let mut rx = provider.subscribe();
        assert_eq!(provider.emit(ProviderEvent::ChainChanged(8081)), 1);
        assert_eq!(rx.try_recv().unwrap(), ProviderEvent::ChainChanged(8081));
    }
}
