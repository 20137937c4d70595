//! tests/config_tests.rs

use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use wallet_session::core::config::SessionConfig;

const CUSTOM_NETWORK: &str = r#"
[network]
chain_id = 31337
chain_name = "Local Anvil"
rpc_urls = ["http://127.0.0.1:8545"]
block_explorer_urls = []

[network.native_currency]
name = "Ether"
symbol = "ETH"
decimals = 18

[ledger]
confirmation_delay_ms = 0
reward_delay_ms = 0
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_custom_network() {
    let file = write_config(CUSTOM_NETWORK);
    let cfg = SessionConfig::load(file.path()).unwrap();

    assert_eq!(cfg.network.chain_id, 31337);
    assert_eq!(cfg.network.chain_id_hex(), "0x7a69");
    assert_eq!(cfg.network.native_currency.symbol, "ETH");
    assert_eq!(cfg.network.explorer_account_url(&Default::default()), None);
    assert_eq!(cfg.ledger.confirmation_delay_ms, 0);
    // untouched sections keep defaults
    assert_eq!(cfg.watcher.poll_interval_ms, 4000);
    assert_eq!(cfg.events.capacity, 64);
}

#[test]
fn test_load_missing_file_is_error() {
    let err = SessionConfig::load("/nonexistent/wallet-session.toml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_malformed_toml_is_error() {
    let file = write_config("[network\nchain_id = ");
    assert!(SessionConfig::load(file.path()).is_err());
}

#[test]
fn test_serialized_config_loads_back() {
    let defaults = SessionConfig::default();
    let file = write_config(&defaults.to_toml_string().unwrap());

    let loaded = SessionConfig::load(file.path()).unwrap();
    assert_eq!(loaded.network, defaults.network);
    assert_eq!(loaded.ledger.contract_address, defaults.ledger.contract_address);
}

#[test]
#[serial]
fn test_resolve_prefers_explicit_path() {
    let explicit = write_config(CUSTOM_NETWORK);
    let from_env = write_config("[watcher]\npoll_interval_ms = 10\n");
    std::env::set_var("CONFIG_PATH", from_env.path());

    let cfg = SessionConfig::resolve(Some(explicit.path())).unwrap();
    std::env::remove_var("CONFIG_PATH");

    assert_eq!(cfg.network.chain_id, 31337);
    assert_eq!(cfg.watcher.poll_interval_ms, 4000);
}

#[test]
#[serial]
fn test_resolve_uses_config_path_env() {
    let from_env = write_config("[watcher]\npoll_interval_ms = 10\n");
    std::env::set_var("CONFIG_PATH", from_env.path());

    let cfg = SessionConfig::resolve(None).unwrap();
    std::env::remove_var("CONFIG_PATH");

    assert_eq!(cfg.watcher.poll_interval_ms, 10);
    assert_eq!(cfg.network.chain_id, 8081);
}

#[test]
#[serial]
fn test_resolve_defaults_without_env() {
    std::env::remove_var("CONFIG_PATH");
    let cfg = SessionConfig::resolve(None).unwrap();
    assert_eq!(cfg.network.chain_name, "Shardeum Testnet");
}
