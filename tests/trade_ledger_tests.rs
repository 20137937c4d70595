//! tests/trade_ledger_tests.rs

use std::sync::Arc;

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use tokio::sync::mpsc::UnboundedReceiver;

use wallet_session::blockchain::{MockWalletProvider, ProviderEvent, WalletProvider};
use wallet_session::core::{
    config::{LedgerConfig, NetworkDescriptor},
    notify::{ChannelNotifier, Notice, Severity},
    SessionError, SessionManager, TradeLedger, TradeSide,
};

fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

fn instant() -> LedgerConfig {
    LedgerConfig { confirmation_delay_ms: 0, reward_delay_ms: 0, ..LedgerConfig::default() }
}

struct Harness {
    wallet: Arc<MockWalletProvider>,
    manager: Arc<SessionManager>,
    ledger: TradeLedger,
    notices: UnboundedReceiver<Notice>,
}

async fn connected_harness() -> Harness {
    let wallet = Arc::new(
        MockWalletProvider::new()
            .with_accounts(vec![alice()])
            .with_balance(alice(), U256::exp10(18))
            .with_balance(bob(), U256::exp10(18))
            .with_chain_id(8081),
    );
    let manager = Arc::new(SessionManager::with_tracing(
        Some(Arc::clone(&wallet) as Arc<dyn WalletProvider>),
        NetworkDescriptor::default(),
    ));
    manager.connect().await.unwrap();

    let (notifier, notices) = ChannelNotifier::new();
    let ledger = TradeLedger::new(&manager, instant(), Arc::new(notifier));
    Harness { wallet, manager, ledger, notices }
}

#[tokio::test]
async fn test_record_trade_for_connected_account() {
    let mut h = connected_harness().await;

    let record = h
        .ledger
        .record_trade("BTC", Decimal::new(5, 1), Decimal::new(43_250, 0), TradeSide::Buy)
        .await
        .unwrap();

    assert_eq!(record.account, alice());
    assert_eq!(record.symbol, "BTC");
    assert!(!h.ledger.is_transacting());
    assert_eq!(h.ledger.user_trades(), vec![record]);

    let notice = h.notices.try_recv().unwrap();
    assert_eq!(notice.title, "Trade Recorded On-Chain");
    assert_eq!(notice.description, "Buy order for 0.5 BTC recorded on Shardeum Testnet.");
}

#[tokio::test]
async fn test_trades_listed_newest_first() {
    let h = connected_harness().await;

    for symbol in ["BTC", "ETH", "SHM"] {
        h.ledger.record_trade(symbol, Decimal::ONE, Decimal::ONE, TradeSide::Sell).await.unwrap();
    }

    let symbols: Vec<_> = h.ledger.user_trades().into_iter().map(|t| t.symbol).collect();
    assert_eq!(symbols, vec!["SHM", "ETH", "BTC"]);
}

#[tokio::test]
async fn test_trades_are_scoped_to_current_account() {
    let h = connected_harness().await;
    h.ledger.record_trade("BTC", Decimal::ONE, Decimal::ONE, TradeSide::Buy).await.unwrap();

    h.wallet.set_accounts(vec![bob()]);
    h.manager.handle_event(ProviderEvent::AccountsChanged(vec![bob()])).await;
    assert_eq!(h.manager.session().account, Some(bob()));
    assert!(h.ledger.user_trades().is_empty());

    h.ledger.record_trade("ETH", Decimal::TWO, Decimal::ONE, TradeSide::Sell).await.unwrap();
    let trades = h.ledger.user_trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].symbol, "ETH");
    assert_eq!(trades[0].account, bob());
}

#[tokio::test]
async fn test_disconnect_hides_trades() {
    let h = connected_harness().await;
    h.ledger.record_trade("BTC", Decimal::ONE, Decimal::ONE, TradeSide::Buy).await.unwrap();

    h.manager.disconnect();

    assert!(h.ledger.user_trades().is_empty());
    let err = h
        .ledger
        .record_trade("BTC", Decimal::ONE, Decimal::ONE, TradeSide::Buy)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::NotConnected);
}

#[tokio::test]
async fn test_not_connected_notice() {
    let manager = SessionManager::with_tracing(None, NetworkDescriptor::default());
    let (notifier, mut notices) = ChannelNotifier::new();
    let ledger = TradeLedger::new(&manager, instant(), Arc::new(notifier));

    assert_eq!(ledger.reward_tokens(Decimal::TEN).await, Err(SessionError::NotConnected));

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.title, "Wallet Not Connected");
    assert_eq!(notice.severity, Severity::Destructive);
}

#[tokio::test]
async fn test_invalid_trade_input_is_rejected() {
    let h = connected_harness().await;

    let cases = [
        ("  ", Decimal::ONE, Decimal::ONE),
        ("BTC", Decimal::ZERO, Decimal::ONE),
        ("BTC", Decimal::NEGATIVE_ONE, Decimal::ONE),
        ("BTC", Decimal::ONE, Decimal::NEGATIVE_ONE),
    ];
    for (symbol, amount, price) in cases {
        let err = h.ledger.record_trade(symbol, amount, price, TradeSide::Buy).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(_)), "{symbol} {amount} {price}: {err:?}");
    }
    assert!(h.ledger.user_trades().is_empty());
}

#[tokio::test]
async fn test_reward_notice_uses_native_symbol() {
    let mut h = connected_harness().await;

    h.ledger.reward_tokens(Decimal::new(100, 0)).await.unwrap();

    let notice = h.notices.try_recv().unwrap();
    assert_eq!(notice.title, "SHM Tokens Rewarded!");
    assert_eq!(notice.description, "100 SHM tokens have been credited to your wallet.");
}

#[tokio::test(start_paused = true)]
async fn test_is_transacting_during_confirmation() {
    let wallet = Arc::new(MockWalletProvider::new().with_accounts(vec![alice()]).with_chain_id(8081));
    let manager = SessionManager::with_tracing(
        Some(Arc::clone(&wallet) as Arc<dyn WalletProvider>),
        NetworkDescriptor::default(),
    );
    manager.connect().await.unwrap();
    let (notifier, _notices) = ChannelNotifier::new();
    let ledger = Arc::new(TradeLedger::new(&manager, LedgerConfig::default(), Arc::new(notifier)));

    let pending = {
        let ledger = Arc::clone(&ledger);
        tokio::spawn(async move {
            ledger.record_trade("BTC", Decimal::ONE, Decimal::ONE, TradeSide::Buy).await
        })
    };
    tokio::task::yield_now().await;
    assert!(ledger.is_transacting());

    pending.await.unwrap().unwrap();
    assert!(!ledger.is_transacting());
    assert_eq!(ledger.user_trades().len(), 1);
}
