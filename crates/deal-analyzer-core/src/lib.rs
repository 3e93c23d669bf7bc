pub mod error;
pub mod time_value;
pub mod types;

pub mod deal;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use error::DealAnalyzerError;
pub use types::*;

/// Standard result type for all deal-analyzer operations
pub type DealAnalyzerResult<T> = Result<T, DealAnalyzerError>;
