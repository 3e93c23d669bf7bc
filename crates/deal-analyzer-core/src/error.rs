use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DealAnalyzerError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{function} did not converge after {iterations} iterations (last delta {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Arithmetic overflow in {context}")]
    Overflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DealAnalyzerError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        DealAnalyzerError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn overflow(context: &str) -> Self {
        DealAnalyzerError::Overflow {
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for DealAnalyzerError {
    fn from(e: serde_json::Error) -> Self {
        DealAnalyzerError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_message_names_field() {
        let e = DealAnalyzerError::invalid("sell_cap_rate", "Sale cap rate must be positive");
        assert_eq!(
            e.to_string(),
            "Invalid input: sell_cap_rate: Sale cap rate must be positive"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let e: DealAnalyzerError = err.into();
        assert!(matches!(e, DealAnalyzerError::SerializationError(_)));
    }
}
