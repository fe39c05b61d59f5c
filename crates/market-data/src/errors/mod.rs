//! Error types for the market data crate.
//!
//! This module provides:
//! - [`ProviderError`]: A failure scoped to a single adapter call
//! - [`ConfigurationError`]: A fatal misconfiguration detected at construction

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while a single provider serves a single request.
///
/// Every variant carries the provider that produced it. The `Display` output
/// omits the provider; [`ProviderError::to_report`] renders the
/// `"<provider>: <message>"` form used in aggregate results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Request failed: {message}")]
    Network {
        provider: String,
        message: String,
    },

    /// The upstream answered with a non-2xx status.
    #[error("HTTP {status} - {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Malformed response: {message}")]
    Parse {
        provider: String,
        message: String,
    },

    /// The response decoded, but a field the record needs was absent.
    #[error("Missing required field: {field}")]
    MissingField {
        provider: String,
        field: String,
    },

    /// The provider does not know the requested symbol.
    #[error("Symbol not found: {symbol}")]
    SymbolNotFound {
        provider: String,
        symbol: String,
    },

    /// The provider does not implement the requested operation.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        provider: String,
        operation: String,
    },

    /// The call did not settle within the fan-out ceiling.
    #[error("Timed out after {after:?}")]
    Timeout {
        provider: String,
        after: Duration,
    },

    /// Every retry attempt failed; `last` is the final underlying cause.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        provider: String,
        attempts: u32,
        last: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Name of the provider that produced this error.
    pub fn provider(&self) -> &str {
        match self {
            Self::Network { provider, .. }
            | Self::Http { provider, .. }
            | Self::Parse { provider, .. }
            | Self::MissingField { provider, .. }
            | Self::SymbolNotFound { provider, .. }
            | Self::NotSupported { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::RetriesExhausted { provider, .. } => provider,
        }
    }

    /// HTTP status of the failing response, if the failure came from one.
    ///
    /// Looks through [`RetriesExhausted`](Self::RetriesExhausted) so the status
    /// of the last attempt stays observable after retries.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.http_status(),
            _ => None,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Transport failures, `429` and `5xx` are transient. Any other failure
    /// would repeat on the next attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::RetriesExhausted { last, .. } => last.is_retryable(),
            Self::Parse { .. }
            | Self::MissingField { .. }
            | Self::SymbolNotFound { .. }
            | Self::NotSupported { .. }
            | Self::Timeout { .. } => false,
        }
    }

    /// Renders the error the way aggregate results report it.
    pub fn to_report(&self) -> String {
        format!("{}: {}", self.provider(), self)
    }
}

/// Structural misconfiguration. Always fatal, always raised at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No providers registered")]
    NoProviders,

    #[error("Cache TTL must be greater than zero")]
    ZeroTtl,

    #[error("Cache max size must be greater than zero")]
    ZeroMaxSize,

    #[error("Retry policy must allow at least one attempt")]
    ZeroAttempts,

    #[error("Provider registered twice: {0}")]
    DuplicateProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_omits_provider() {
        let error = ProviderError::Http {
            provider: "COINGECKO".to_string(),
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(format!("{}", error), "HTTP 503 - Service Unavailable");
        assert_eq!(error.to_report(), "COINGECKO: HTTP 503 - Service Unavailable");
    }

    #[test]
    fn test_http_status_survives_retry_wrapping() {
        let error = ProviderError::RetriesExhausted {
            provider: "COOKIE_FUN".to_string(),
            attempts: 3,
            last: Box::new(ProviderError::Http {
                provider: "COOKIE_FUN".to_string(),
                status: 429,
                message: "Too Many Requests".to_string(),
            }),
        };
        assert_eq!(error.http_status(), Some(429));
        assert_eq!(error.provider(), "COOKIE_FUN");
        assert_eq!(
            error.to_string(),
            "Gave up after 3 attempts: HTTP 429 - Too Many Requests"
        );
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        let error = ProviderError::MissingField {
            provider: "COINGECKO".to_string(),
            field: "current_price".to_string(),
        };
        assert_eq!(error.http_status(), None);
        assert_eq!(format!("{}", error), "Missing required field: current_price");
    }

    #[test]
    fn test_only_transient_errors_are_retryable() {
        let http = |status| ProviderError::Http {
            provider: "COINGECKO".to_string(),
            status,
            message: String::new(),
        };
        assert!(http(429).is_retryable());
        assert!(http(502).is_retryable());
        assert!(!http(401).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(ProviderError::Network {
            provider: "COINGECKO".to_string(),
            message: "connection reset".to_string(),
        }
        .is_retryable());

        assert!(!ProviderError::SymbolNotFound {
            provider: "COINGECKO".to_string(),
            symbol: "NOPE".to_string(),
        }
        .is_retryable());
        assert!(!ProviderError::Parse {
            provider: "COINGECKO".to_string(),
            message: "expected value".to_string(),
        }
        .is_retryable());
        assert!(!ProviderError::Timeout {
            provider: "COINGECKO".to_string(),
            after: Duration::from_secs(30),
        }
        .is_retryable());
    }

    #[test]
    fn test_configuration_error_display() {
        assert_eq!(
            ConfigurationError::NoProviders.to_string(),
            "No providers registered"
        );
        assert_eq!(
            ConfigurationError::DuplicateProvider("COINGECKO".to_string()).to_string(),
            "Provider registered twice: COINGECKO"
        );
    }
}
