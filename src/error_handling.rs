//! Standardized error handling for the resource group report
//! Provides the error taxonomy shared by the client, fetcher, and report sink

use tracing::{error, warn};

/// Error types for a report run
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Upstream returned {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
    },

    #[error("Decode error: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Malformed record: {message}")]
    MalformedRecord {
        message: String,
        field: Option<String>,
    },

    #[error("Output error: {message}")]
    Output {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ReportError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a network error with source
    pub fn network_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn rate_limit<S: Into<String>>(message: S, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    pub fn upstream<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Create a decode error with source
    pub fn decode_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a malformed record error naming the offending field
    pub fn malformed_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::MalformedRecord {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create an output error with source
    pub fn output_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Output {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with source
    pub fn internal_with_source<S: Into<String>>(message: S, source: anyhow::Error) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Stable code used in log lines and the exit message
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIG_ERROR",
            Self::Authentication { .. } => "AUTH_ERROR",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::RateLimit { .. } => "RATE_LIMIT",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::MalformedRecord { .. } => "MALFORMED_RECORD",
            Self::Output { .. } => "OUTPUT_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether this error aborts the run; only malformed records are skipped
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedRecord { .. })
    }

    /// Log the error at a level matching its kind
    pub fn log(&self) {
        match self {
            Self::MalformedRecord { .. } => warn!("[{}] {}", self.error_code(), self),
            Self::RateLimit {
                retry_after: Some(secs),
                ..
            } => error!("[{}] {} (retry after {}s)", self.error_code(), self, secs),
            _ => error!("[{}] {}", self.error_code(), self),
        }
    }
}

/// Result type alias for report operations
pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Trait for adding context to foreign errors
pub trait ErrorContext<T> {
    fn with_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String;

    fn with_network_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String;

    fn with_decode_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String;

    fn with_output_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn with_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ReportError::internal_with_source(f(), e.into()))
    }

    fn with_network_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ReportError::network_with_source(f(), e.into()))
    }

    fn with_decode_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ReportError::decode_with_source(f(), e.into()))
    }

    fn with_output_context<F>(self, f: F) -> ReportResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ReportError::output_with_source(f(), e.into()))
    }
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error_handling::ReportError::configuration($msg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_error_codes() {
        let err = ReportError::configuration("missing api key");
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.is_fatal());

        let err = ReportError::rate_limit("slow down", Some(30));
        assert_eq!(err.error_code(), "RATE_LIMIT");

        let err = ReportError::upstream(500, "boom");
        assert_eq!(err.to_string(), "Upstream returned 500: boom");
    }

    #[test]
    fn test_malformed_record_is_not_fatal() {
        let err = ReportError::malformed_field("srcEvent is not an object", "srcEvent");
        assert!(!err.is_fatal());
        assert_eq!(err.error_code(), "MALFORMED_RECORD");
    }

    #[test]
    fn test_error_context_wraps_source() {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err = parsed
            .with_decode_context(|| "Failed to decode page".to_string())
            .unwrap_err();

        assert_eq!(err.error_code(), "DECODE_ERROR");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_config_error_macro() {
        let err = config_error!("days must be greater than 0");
        assert!(matches!(err, ReportError::Configuration { .. }));
    }
}
