pub mod eip1193;
pub mod mock;
pub mod provider;
pub mod watcher;

pub use eip1193::Eip1193Provider;
pub use mock::{MockWalletProvider, ProviderCall};
pub use provider::{ProviderError, ProviderEvent, WalletProvider};
pub use watcher::ProviderWatcher;
