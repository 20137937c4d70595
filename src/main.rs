// src/main.rs
//! Wallet session CLI entry point
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wallet_session::blockchain::{
    Eip1193Provider, MockWalletProvider, ProviderError, ProviderEvent, ProviderWatcher,
    WalletProvider,
};
use wallet_session::cli::{resolve_rpc_url, Cli, Commands};
use wallet_session::core::{
    config::SessionConfig,
    notify::{ChannelNotifier, Notice, Severity},
    ConnectReport, SessionManager, TradeLedger, TradeSide, WalletSession,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    info!("Starting wallet-session v{}", env!("CARGO_PKG_VERSION"));

    let config = SessionConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
        Commands::Connect { rpc_url } => {
            let provider = http_provider(rpc_url.as_deref(), &config)?;
            let manager = SessionManager::with_tracing(Some(provider), config.network.clone());
            let report = manager.connect().await?;
            print_report(&manager, &report)?;
        }
        Commands::Watch { rpc_url } => {
            watch(rpc_url.as_deref(), &config).await?;
        }
        Commands::Demo { known_target, reject } => {
            demo(&config, known_target, reject).await?;
        }
    }

    Ok(())
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn http_provider(flag: Option<&str>, config: &SessionConfig) -> Result<Arc<dyn WalletProvider>> {
    let rpc_url = resolve_rpc_url(flag, config).context("No wallet RPC URL configured")?;
    Ok(Arc::new(Eip1193Provider::connect_http(&rpc_url, config.events.capacity)?))
}

async fn watch(flag: Option<&str>, config: &SessionConfig) -> Result<()> {
    let rpc_url = resolve_rpc_url(flag, config).context("No wallet RPC URL configured")?;
    let provider = Arc::new(Eip1193Provider::connect_http(&rpc_url, config.events.capacity)?);
    let events = provider.event_sender();
    let provider: Arc<dyn WalletProvider> = provider;

    let manager =
        Arc::new(SessionManager::with_tracing(Some(Arc::clone(&provider)), config.network.clone()));
    let listener = manager.listen()?;

    let token = CancellationToken::new();
    let watcher = ProviderWatcher::new(config.watcher.poll_interval()).spawn(
        provider,
        events,
        token.clone(),
    );

    let report = match manager.restore().await? {
        Some(report) => report,
        None => manager.connect().await?,
    };
    print_report(&manager, &report)?;

    let mut session = manager.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = session.borrow_and_update().clone();
                print_session(&manager, &snapshot)?;
            }
        }
    }

    token.cancel();
    let _ = watcher.await;
    listener.shutdown().await;
    Ok(())
}

async fn demo(config: &SessionConfig, known_target: bool, reject: bool) -> Result<()> {
    let first = Address::repeat_byte(0x42);
    let second = Address::repeat_byte(0x7a);
    let ten_shm = U256::exp10(19);

    let mut wallet = MockWalletProvider::new()
        .with_accounts(vec![first])
        .with_balance(first, ten_shm)
        .with_balance(second, ten_shm / 2);
    if known_target {
        wallet = wallet.with_known_chain(config.network.chain_id);
    }
    if reject {
        wallet = wallet.failing_request_accounts(ProviderError::rpc(4001, "User rejected the request."));
    }
    let wallet = Arc::new(wallet);

    let (notifier, mut notices) = ChannelNotifier::new();
    let manager = Arc::new(SessionManager::new(
        Some(Arc::clone(&wallet) as Arc<dyn WalletProvider>),
        config.network.clone(),
        Arc::new(notifier.clone()),
    ));
    let listener = manager.listen()?;

    match manager.connect().await {
        Ok(report) => print_report(&manager, &report)?,
        Err(e) => println!("connect failed: {}", e),
    }

    if manager.session().is_connected {
        let ledger = TradeLedger::new(&manager, config.ledger.clone(), Arc::new(notifier));
        let record =
            ledger.record_trade("BTC", Decimal::ONE, Decimal::new(43_250, 0), TradeSide::Buy).await?;
        println!("recorded: {}", serde_json::to_string(&record)?);

        wallet.set_accounts(vec![second]);
        wallet.emit(ProviderEvent::AccountsChanged(vec![second]));
        settle(&manager, |s| s.account == Some(second)).await;
        print_session(&manager, &manager.session())?;

        wallet.emit(ProviderEvent::AccountsChanged(Vec::new()));
        settle(&manager, |s| !s.is_connected).await;
        print_session(&manager, &manager.session())?;
    }

    listener.shutdown().await;
    while let Ok(notice) = notices.try_recv() {
        print_notice(&notice);
    }
    Ok(())
}

/// Waits until the listener has applied an emitted event.
async fn settle(manager: &SessionManager, done: impl Fn(&WalletSession) -> bool) {
    let mut session = manager.subscribe();
    let _ = session.wait_for(|s| done(s)).await;
}

fn print_report(manager: &SessionManager, report: &ConnectReport) -> Result<()> {
    print_session(manager, &report.session)?;
    match &report.reconciliation {
        Ok(outcome) => println!("network: {:?}", outcome),
        Err(e) => println!("network: {}", e),
    }
    Ok(())
}

fn print_session(manager: &SessionManager, session: &WalletSession) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(session)?);
    if let (Some(account), Some(label)) =
        (session.short_account(), session.network_label(manager.network()))
    {
        let balance = session.formatted_balance().unwrap_or_else(|| "?".to_string());
        println!(
            "{} on {} | balance {} {}",
            account,
            label,
            balance,
            manager.network().native_currency.symbol
        );
    }
    Ok(())
}

fn print_notice(notice: &Notice) {
    let marker = match notice.severity {
        Severity::Info => "i",
        Severity::Destructive => "!",
    };
    println!("[{}] {}: {}", marker, notice.title, notice.description);
}
