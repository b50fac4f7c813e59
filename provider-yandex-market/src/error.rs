//! Error types for Yandex Market provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Yandex Market provider errors
#[derive(Error, Debug)]
pub enum YandexMarketError {
    /// API request returned a non-success status, or an `ERROR` envelope
    #[error("Yandex Market API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse Yandex Market response: {0}")]
    ParseError(String),

    /// Stock update without the warehouse fields this API requires
    #[error("Stock update for offer {offer_id} has no warehouse")]
    MissingWarehouse { offer_id: String },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Yandex Market operations
pub type Result<T> = std::result::Result<T, YandexMarketError>;

impl From<YandexMarketError> for BridgeError {
    fn from(error: YandexMarketError) -> Self {
        match error {
            YandexMarketError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            YandexMarketError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Yandex Market response parse error: {}", msg))
            }
            missing @ YandexMarketError::MissingWarehouse { .. } => {
                BridgeError::OperationFailed(missing.to_string())
            }
            YandexMarketError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_warehouse_display() {
        let error = YandexMarketError::MissingWarehouse {
            offer_id: "77".to_string(),
        };
        assert_eq!(error.to_string(), "Stock update for offer 77 has no warehouse");

        let bridge_error: BridgeError = error.into();
        assert!(matches!(bridge_error, BridgeError::OperationFailed(_)));
        assert!(!bridge_error.is_transient());
    }

    #[test]
    fn test_api_error_conversion() {
        let error = YandexMarketError::ApiError {
            status_code: 420,
            message: "Hit rate limit".to_string(),
        };
        let bridge_error: BridgeError = error.into();

        assert!(matches!(bridge_error, BridgeError::Http { status: 420, .. }));
    }
}
