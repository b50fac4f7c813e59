use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether a caller could reasonably expect a retry to succeed.
    ///
    /// Timeouts, connection failures, throttling (429) and server errors
    /// (5xx) are transient; everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Timeout(_) | BridgeError::Connection(_) => true,
            BridgeError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BridgeError::Timeout("read".to_string()).is_transient());
        assert!(BridgeError::Connection("refused".to_string()).is_transient());
        assert!(BridgeError::Http {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(BridgeError::Http {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(!BridgeError::Http {
            status: 400,
            message: "bad request".to_string()
        }
        .is_transient());
        assert!(!BridgeError::OperationFailed("parse".to_string()).is_transient());
    }

    #[test]
    fn test_http_error_display() {
        let error = BridgeError::Http {
            status: 404,
            message: "Campaign not found".to_string(),
        };
        assert_eq!(error.to_string(), "HTTP 404: Campaign not found");
    }
}
