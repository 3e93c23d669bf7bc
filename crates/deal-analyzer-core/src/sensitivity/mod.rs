//! One-variable-at-a-time sensitivity runs over the deal model.

pub mod runner;
pub mod summary;
pub mod variables;

pub use runner::{
    draw_value, run_experiment, run_sensitivity, run_sensitivity_analysis, run_trial, BaseCase,
    SensitivityInput, SensitivityOutput, TrialResult, DEFAULT_NOISE_PCT, DEFAULT_NUM_TRIALS,
};
pub use summary::{describe, summarize, DistributionStats, VariableSummary};
pub use variables::DealVariable;
