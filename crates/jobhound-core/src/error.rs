use thiserror::Error;

/// Application-wide error types for Jobhound.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request could not be built or sent.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The shared deadline fired while waiting or sending.
    #[error("Operation cancelled")]
    Cancelled,

    /// The configured proxy URL could not be parsed.
    #[error("Invalid proxy URL: {0}")]
    InvalidProxy(String),

    /// A source returned content that could not be parsed.
    #[error("{source_name}: parse error: {message}")]
    ParseError {
        source_name: String,
        message: String,
    },

    /// A source answered with a status the adapter does not handle.
    #[error("{source_name}: unexpected status {status}")]
    UnexpectedStatus { source_name: String, status: u16 },

    /// Cache backend failed (connect, read or write).
    #[error("Cache error: {0}")]
    CacheError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Result delivery to a writer failed.
    #[error("Delivery error: {0}")]
    DeliveryError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true for failures below the HTTP status layer.
    ///
    /// These are never retried by the transport guard.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_)
                | AppError::NetworkError(_)
                | AppError::Timeout(_)
                | AppError::InvalidProxy(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }

    /// Shorthand used by adapters when a body cannot be decoded.
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ParseError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}
