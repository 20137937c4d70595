pub mod config;
pub mod errors;
pub mod notify;
pub mod session;
pub mod session_manager;
pub mod trade_ledger;

pub use errors::SessionError;
pub use session::{SessionState, WalletSession};
pub use session_manager::{ConnectReport, Reconciliation, SessionManager};
pub use trade_ledger::{TradeLedger, TradeRecord, TradeSide};
