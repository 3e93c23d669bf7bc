use clap::Args;
use serde_json::Value;

use deal_analyzer_core::sensitivity::{
    run_sensitivity, DealVariable, SensitivityInput, DEFAULT_NOISE_PCT, DEFAULT_NUM_TRIALS,
};

use crate::commands::deal::reference_deal;
use crate::input;

/// Arguments for a one-variable-at-a-time sensitivity run
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON or YAML sensitivity input (base deal, variables, trials)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated variables to perturb, e.g. sell_cap_rate,interest_rate
    #[arg(long, value_delimiter = ',')]
    pub variables: Vec<String>,

    /// Trials per variable
    #[arg(long)]
    pub trials: Option<u32>,

    /// Half-width of the triangular draw as a fraction of the base value
    #[arg(long)]
    pub noise: Option<f64>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of units
    #[arg(long)]
    pub units: Option<u32>,

    /// Use the reference scenario with a pre-seeded rent roll
    #[arg(long)]
    pub stated_rent_roll: bool,

    /// Drop per-trial rows and keep only the summaries
    #[arg(long)]
    pub summary_only: bool,
}

fn parse_variables(names: &[String]) -> Result<Vec<DealVariable>, Box<dyn std::error::Error>> {
    names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.parse::<DealVariable>().map_err(Into::into))
        .collect()
}

/// Apply command-line flags over a loaded input, or over the reference deal.
fn build_input(
    args: &SensitivityArgs,
    loaded: Option<SensitivityInput>,
) -> Result<SensitivityInput, Box<dyn std::error::Error>> {
    let mut sens = match loaded {
        Some(sens) => sens,
        None => SensitivityInput {
            base: reference_deal(args.units, args.stated_rent_roll),
            variables: Vec::new(),
            num_trials: DEFAULT_NUM_TRIALS,
            noise_pct: DEFAULT_NOISE_PCT,
            seed: None,
        },
    };

    let variables = parse_variables(&args.variables)?;
    if !variables.is_empty() {
        sens.variables = variables;
    }
    if let Some(trials) = args.trials {
        sens.num_trials = trials;
    }
    if let Some(noise) = args.noise {
        sens.noise_pct = noise;
    }
    if args.seed.is_some() {
        sens.seed = args.seed;
    }
    if let Some(units) = args.units {
        sens.base.property.number_of_units = units;
    }

    if sens.variables.is_empty() {
        let known: Vec<&str> = DealVariable::ALL.iter().map(|v| v.as_str()).collect();
        return Err(format!(
            "--variables is required, choose from: {}",
            known.join(", ")
        )
        .into());
    }
    Ok(sens)
}

pub fn run_sensitivity_command(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loaded = input::load::<SensitivityInput>(args.input.as_deref())?;
    let sens = build_input(&args, loaded)?;
    tracing::info!(
        variables = sens.variables.len(),
        trials = sens.num_trials,
        noise = sens.noise_pct,
        "running sensitivity analysis"
    );

    let mut result = run_sensitivity(&sens)?;
    if args.summary_only {
        result.result.rows.clear();
    }
    Ok(serde_json::to_value(result)?)
}

/// Names accepted by `--variables`.
pub fn list_variables() -> Value {
    Value::Array(
        DealVariable::ALL
            .iter()
            .map(|v| Value::String(v.as_str().to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(variables: &[&str]) -> SensitivityArgs {
        SensitivityArgs {
            input: None,
            variables: variables.iter().map(|s| s.to_string()).collect(),
            trials: Some(10),
            noise: None,
            seed: Some(3),
            units: None,
            stated_rent_roll: false,
            summary_only: false,
        }
    }

    #[test]
    fn test_parse_variables() {
        let parsed = parse_variables(&["sell_cap_rate".into(), " interest_rate".into()]).unwrap();
        assert_eq!(parsed, vec![DealVariable::SellCapRate, DealVariable::InterestRate]);
        assert!(parse_variables(&["number_of_units".into()]).is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let sens = build_input(&args(&["sell_cap_rate"]), None).unwrap();
        assert_eq!(sens.num_trials, 10);
        assert_eq!(sens.noise_pct, DEFAULT_NOISE_PCT);
        assert_eq!(sens.seed, Some(3));
    }

    #[test]
    fn test_flags_override_loaded_input() {
        let loaded = SensitivityInput {
            base: reference_deal(None, false),
            variables: vec![DealVariable::AnnualGrowth],
            num_trials: 500,
            noise_pct: 0.10,
            seed: Some(99),
        };
        let sens = build_input(&args(&[]), Some(loaded)).unwrap();
        assert_eq!(sens.variables, vec![DealVariable::AnnualGrowth]);
        assert_eq!(sens.num_trials, 10);
        assert_eq!(sens.noise_pct, 0.10);
        assert_eq!(sens.seed, Some(3));
    }

    #[test]
    fn test_variables_required() {
        let err = build_input(&args(&[]), None).unwrap_err();
        assert!(err.to_string().contains("sell_cap_rate"));
    }
}
