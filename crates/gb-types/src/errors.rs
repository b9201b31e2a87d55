use thiserror::Error;

/// Main error type for the GlowBack system
#[derive(Error, Debug)]
pub enum GbError {
    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Strategy-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Strategy parameter error: {parameter}, message: {message}")]
    ParameterError { parameter: String, message: String },
}

/// Result type alias for GlowBack operations
pub type GbResult<T> = Result<T, GbError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::GbError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GbError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = StrategyError::ParameterError {
            parameter: "RSI-period".to_string(),
            message: "unknown parameter".to_string(),
        };

        assert!(error.to_string().contains("RSI-period"));
        assert!(error.to_string().contains("unknown parameter"));
    }

    #[test]
    fn test_error_conversion() {
        let strategy_error = StrategyError::ParameterError {
            parameter: "stopLoss".to_string(),
            message: "value NaN is not finite".to_string(),
        };
        let gb_error: GbError = strategy_error.into();

        match gb_error {
            GbError::Strategy(_) => (),
            _ => panic!("Expected Strategy error"),
        }
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        assert_eq!(validation_err.to_string(), "Validation error: Invalid value: 42");

        let config_err = config_error!("Missing required field: {}", "riskManagement");
        assert!(matches!(config_err, GbError::Config(_)));
    }
}
