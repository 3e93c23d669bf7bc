use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Dollar amounts. Always Decimal, never f64.
pub type Money = Decimal;

/// Fractions: 0.0425 is 4.25%.
pub type Rate = Decimal;

/// Durations in years (may be fractional, e.g. a 27.5 year depreciable life)
pub type Years = Decimal;

/// Envelope returned by every top-level analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    /// The inputs, echoed back as JSON
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Microseconds since `start`.
pub fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

/// Wrap a result with its inputs, warnings and timing.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
