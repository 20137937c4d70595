use thiserror::Error;

use crate::blockchain::provider::{ProviderError, USER_REJECTED_REQUEST};

/// Errors surfaced by session and ledger operations.
///
/// None of these are fatal: every failure can be retried by calling
/// `connect()` again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No wallet provider is injected.
    #[error("No wallet provider available")]
    ProviderUnavailable,

    /// The wallet answered the account request with an empty list.
    #[error("No accounts granted by the wallet")]
    NoAccountsGranted,

    /// The user declined the account request.
    #[error("User rejected the request: {0}")]
    UserRejected(String),

    /// A `connect()` is already awaiting the wallet.
    #[error("A connection attempt is already in progress")]
    ConnectInFlight,

    /// Switching to, or adding, the target network failed.
    #[error("Failed to switch network: {0}")]
    NetworkSwitchFailed(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The session was disconnected while the wallet was answering.
    #[error("Connection attempt superseded by a disconnect")]
    ConnectAborted,
}

impl SessionError {
    /// Maps a failed account request onto the connect error taxonomy.
    pub fn from_account_request(err: ProviderError) -> Self {
        match err {
            ProviderError::Rpc { code: USER_REJECTED_REQUEST, message } => {
                Self::UserRejected(message)
            }
            other => Self::Provider(other),
        }
    }

    /// Whether retrying right away can succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::ConnectInFlight
                | SessionError::Provider(ProviderError::Transport(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_provider_unavailable() {
        assert_eq!(SessionError::ProviderUnavailable.to_string(), "No wallet provider available");
    }

    #[test]
    fn test_account_request_rejection_maps_to_user_rejected() {
        let err = SessionError::from_account_request(ProviderError::rpc(4001, "User denied"));
        assert_eq!(err, SessionError::UserRejected("User denied".to_string()));
    }

    #[test]
    fn test_other_account_request_errors_stay_provider_errors() {
        let err = SessionError::from_account_request(ProviderError::rpc(-32603, "boom"));
        assert!(matches!(err, SessionError::Provider(ProviderError::Rpc { code: -32603, .. })));
    }

    #[test]
    fn test_is_retryable() {
        assert!(SessionError::ConnectInFlight.is_retryable());
        assert!(!SessionError::NoAccountsGranted.is_retryable());
    }
}
