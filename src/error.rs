//! Errors raised by the calculation engine.
//!
//! Every variant is a precondition violation detected synchronously; nothing here is transient,
//! so callers should report rather than retry.
use thiserror::Error;

/// An error raised while resolving configuration, sizing a system or projecting its finances
#[derive(Debug, Error, PartialEq)]
pub enum CalculationError {
    /// A consumption, irradiation, power or cost input is outside its valid range
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A configuration value is outside its valid range
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// No tariff could be found for the utility and there is no default tariff to fall back on
    #[error("{}", unknown_utility_msg(.utility.as_deref()))]
    UnknownUtility {
        /// The utility that was requested, if any
        utility: Option<String>,
    },
}

fn unknown_utility_msg(utility: Option<&str>) -> String {
    match utility {
        Some(name) => format!("No tariff found for utility '{name}' and no default tariff is set"),
        None => "No utility or tariff given and no default tariff is set".to_string(),
    }
}

/// Result type for engine operations
pub type CalculationResult<T> = Result<T, CalculationError>;
