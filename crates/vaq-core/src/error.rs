//! # Payment Error Types
//!
//! Typed error handling for the VAQ payment bridge.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing credentials, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request body failed validation. The message names the first failing field.
    #[error("{0}")]
    Validation(String),

    /// The gateway answered and rejected the operation (bad card, declined customer, ...)
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with the gateway
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Reading or writing the appointment document failed
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Shorthand for a gateway rejection
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        PaymentError::ProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns true if the gateway itself reported the failure.
    ///
    /// These are business outcomes (a declined card) rather than system faults.
    pub fn is_gateway_rejection(&self) -> bool {
        matches!(self, PaymentError::ProviderError { .. })
    }

    /// Message safe to hand back to the mobile client
    pub fn client_message(&self) -> String {
        match self {
            PaymentError::Validation(message) => message.clone(),
            PaymentError::ProviderError { message, .. } => message.clone(),
            _ => "Internal server error. Please try again later.".to_string(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::Validation(_) => 400,
            PaymentError::ProviderError { .. } => 402,
            PaymentError::NetworkError(_) => 503,
            PaymentError::Store(_) => 500,
            PaymentError::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for PaymentError {
    fn from(err: serde_json::Error) -> Self {
        PaymentError::Serialization(err.to_string())
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
