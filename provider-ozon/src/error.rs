//! Error types for Ozon provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Ozon provider errors
#[derive(Error, Debug)]
pub enum OzonError {
    /// API request returned a non-success status
    #[error("Ozon API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse Ozon response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Ozon operations
pub type Result<T> = std::result::Result<T, OzonError>;

impl From<OzonError> for BridgeError {
    fn from(error: OzonError) -> Self {
        match error {
            OzonError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            OzonError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Ozon response parse error: {}", msg))
            }
            OzonError::BridgeError(e) => e,
        }
    }
}
