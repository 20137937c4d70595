// src/lib.rs

pub mod blockchain;
pub mod cli;
pub mod core;

pub use crate::blockchain::{ProviderError, ProviderEvent, WalletProvider};
pub use crate::core::{SessionError, SessionManager, SessionState, WalletSession};
