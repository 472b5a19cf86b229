//! Error types for a3s-wallet-guard

use crate::types::ProviderError;
use thiserror::Error;

/// Errors that can occur while gating provider calls
#[derive(Debug, Error)]
pub enum GuardError {
    /// The confirmation authority returned a negative verdict
    #[error("{message}")]
    UserRejected {
        /// Human-readable rejection message shown to the page
        message: String,
    },

    /// Sending on the underlying message pipe failed
    #[error("Channel error: {0}")]
    Channel(String),

    /// The correlation channel closed before a verdict arrived
    #[error("Confirmation channel closed before request '{0}' was answered")]
    ChannelClosed(String),

    /// No verdict arrived within the configured confirmation timeout
    #[error("Confirmation timed out: {0}")]
    Timeout(String),

    /// The active chain id could not be determined
    #[error("Network error: {0}")]
    Network(String),

    /// The host provider is not in the expected shape
    #[error("Attachment failed: {0}")]
    Attachment(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GuardError {
    /// Whether this error is a user rejection
    pub fn is_user_rejected(&self) -> bool {
        matches!(self, GuardError::UserRejected { .. })
    }
}

impl From<GuardError> for ProviderError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::UserRejected { message } => ProviderError::user_rejected(message),
            other => ProviderError::internal(other.to_string()),
        }
    }
}

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;
