use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::SessionConfig;

/// Wallet session CLI (library-facing definitions)
#[derive(Debug, Parser)]
#[command(name = "wallet-session", about = "Wallet session manager for the Shardeum trading demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// TOML config file; falls back to CONFIG_PATH, then built-in defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect once and print the resulting session
    Connect {
        /// Wallet JSON-RPC endpoint
        #[arg(long)]
        rpc_url: Option<String>,
    },
    /// Connect, then follow account and chain changes until Ctrl-C
    Watch {
        #[arg(long)]
        rpc_url: Option<String>,
    },
    /// Run the full flow against the in-memory wallet
    Demo {
        /// Wallet already knows the target chain (switch instead of add)
        #[arg(long)]
        known_target: bool,
        /// Wallet rejects the account request
        #[arg(long)]
        reject: bool,
    },
    /// Print the effective configuration
    Config,
}

/// `--rpc-url`, else `WALLET_RPC_URL`, else the target network's first RPC URL.
pub fn resolve_rpc_url(flag: Option<&str>, config: &SessionConfig) -> Option<String> {
    flag.map(str::to_string)
        .or_else(|| std::env::var("WALLET_RPC_URL").ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| config.network.rpc_url().map(str::to_string))
}
