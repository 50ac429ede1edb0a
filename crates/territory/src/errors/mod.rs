//! Error taxonomy for territory resolution.
//!
//! This module provides:
//! - [`TerritoryError`]: every failure the engine can produce, each mapped to a
//!   stable taxonomy code via [`TerritoryError::code`]
//! - [`RetryClass`]: how the strategy chain reacts to a failed strategy
//!
//! Format and region errors are terminal and reach the caller. Strategy-level
//! errors (`EXTERNAL_SERVICE_*`, circuit/rate-limit state) are always recovered
//! inside the chain by falling through to the next strategy.

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Example postal codes offered when an input is outside the supported region.
pub const SUGGESTED_POSTAL_CODES: [&str; 4] = ["75201", "77002", "78701", "76102"];

/// Errors that can occur while resolving a territory operator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerritoryError {
    /// Postal code does not have exactly five characters.
    #[error("Postal code must be exactly 5 digits, got {length} characters")]
    InvalidLength { length: usize },

    /// Postal code has the right length but contains non-digits.
    #[error("Postal code must contain only digits: {input}")]
    InvalidCharacters { input: String },

    /// Well-formed national postal code outside every supported range.
    #[error("Postal code {postal_code} is outside the supported service region")]
    NotSupportedRegion {
        postal_code: String,
        suggestions: Vec<String>,
    },

    /// Five digits, but outside the national numeric envelope.
    #[error("{postal_code} is not a valid postal code")]
    NotNationalFormat { postal_code: String },

    /// Every strategy declined. Indicates a configuration defect because the
    /// postal-code fallback should cover every in-region code.
    #[error("No resolution strategy produced a result for {postal_code}")]
    AllStrategiesFailed { postal_code: String },

    /// The conflict resolver was handed nothing it could use.
    #[error("No sources available to resolve the territory operator")]
    NoSourcesAvailable,

    /// A network-bound strategy exceeded its timeout or the caller's deadline.
    #[error("Timeout waiting for {source_name}")]
    ExternalServiceTimeout { source_name: String },

    /// A network-bound strategy failed.
    #[error("External service error: {source_name} - {message}")]
    ExternalServiceError {
        source_name: String,
        message: String,
    },

    /// The external source is rate limited locally or remotely.
    #[error("Rate limited: {source_name}")]
    RateLimited { source_name: String },

    /// The circuit breaker is open for this source.
    #[error("Circuit open: {source_name}")]
    CircuitOpen { source_name: String },

    /// Static configuration is missing or inconsistent.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl TerritoryError {
    /// Stable taxonomy code returned to callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidLength { .. } => "INVALID_LENGTH",
            Self::InvalidCharacters { .. } => "INVALID_CHARACTERS",
            Self::NotSupportedRegion { .. } => "NOT_SUPPORTED_REGION",
            Self::NotNationalFormat { .. } => "NOT_NATIONAL_FORMAT",
            Self::AllStrategiesFailed { .. } => "ALL_STRATEGIES_FAILED",
            Self::NoSourcesAvailable => "NO_SOURCES_AVAILABLE",
            Self::ExternalServiceTimeout { .. } => "EXTERNAL_SERVICE_TIMEOUT",
            Self::ExternalServiceError { .. }
            | Self::RateLimited { .. }
            | Self::CircuitOpen { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// Human-readable hints for the caller. Never exposes internal messages.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidLength { .. } | Self::InvalidCharacters { .. } => vec![
                "Enter a 5-digit ZIP code, for example 75201".to_string(),
                "ZIP+4 codes may be written as 75201-1234".to_string(),
            ],
            Self::NotSupportedRegion { suggestions, .. } => suggestions.clone(),
            Self::NotNationalFormat { .. } => vec![
                "Check the ZIP code for typos".to_string(),
                format!("Try a Texas ZIP code such as {}", SUGGESTED_POSTAL_CODES[0]),
            ],
            Self::AllStrategiesFailed { .. } | Self::NoSourcesAvailable => vec![
                "Check the street address and try again".to_string(),
                "Contact support if the problem persists".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    /// True for errors produced by the format/region validator.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidLength { .. }
                | Self::InvalidCharacters { .. }
                | Self::NotSupportedRegion { .. }
                | Self::NotNationalFormat { .. }
        )
    }

    /// Returns the retry classification used by the strategy chain.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidLength { .. }
            | Self::InvalidCharacters { .. }
            | Self::NotSupportedRegion { .. }
            | Self::NotNationalFormat { .. }
            | Self::AllStrategiesFailed { .. }
            | Self::NoSourcesAvailable
            | Self::Configuration(_) => RetryClass::Never,

            Self::ExternalServiceTimeout { .. } | Self::RateLimited { .. } => {
                RetryClass::FailoverWithPenalty
            }

            Self::ExternalServiceError { .. } => RetryClass::NextStrategy,

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_never_retry() {
        let error = TerritoryError::InvalidLength { length: 4 };
        assert_eq!(error.retry_class(), RetryClass::Never);
        assert!(error.is_input_error());

        let error = TerritoryError::NotNationalFormat {
            postal_code: "00000".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
    }

    #[test]
    fn test_timeout_fails_over_with_penalty() {
        let error = TerritoryError::ExternalServiceTimeout {
            source_name: "REGISTRY".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
        assert_eq!(error.code(), "EXTERNAL_SERVICE_TIMEOUT");
    }

    #[test]
    fn test_service_error_tries_next_strategy() {
        let error = TerritoryError::ExternalServiceError {
            source_name: "REGISTRY".to_string(),
            message: "HTTP 500".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::NextStrategy);
        assert!(!error.is_input_error());
    }

    #[test]
    fn test_circuit_and_rate_limit_report_service_error_code() {
        let open = TerritoryError::CircuitOpen {
            source_name: "REGISTRY".to_string(),
        };
        let limited = TerritoryError::RateLimited {
            source_name: "REGISTRY".to_string(),
        };
        assert_eq!(open.code(), "EXTERNAL_SERVICE_ERROR");
        assert_eq!(limited.code(), "EXTERNAL_SERVICE_ERROR");
        assert_eq!(open.retry_class(), RetryClass::CircuitOpen);
    }

    #[test]
    fn test_region_error_carries_suggestions() {
        let error = TerritoryError::NotSupportedRegion {
            postal_code: "10001".to_string(),
            suggestions: vec!["75201".to_string()],
        };
        assert_eq!(error.code(), "NOT_SUPPORTED_REGION");
        assert_eq!(error.suggestions(), vec!["75201".to_string()]);
    }

    #[test]
    fn test_error_display() {
        let error = TerritoryError::InvalidLength { length: 4 };
        assert_eq!(
            format!("{}", error),
            "Postal code must be exactly 5 digits, got 4 characters"
        );

        let error = TerritoryError::ExternalServiceError {
            source_name: "REGISTRY".to_string(),
            message: "HTTP 503".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "External service error: REGISTRY - HTTP 503"
        );
    }
}
