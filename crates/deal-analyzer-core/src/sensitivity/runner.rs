use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::Triangular;
use std::time::Instant;
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::summary::{summarize, VariableSummary};
use super::variables::{not_in_rent_roll, DealVariable};
use crate::deal::{DealAssumptions, DealModel};
use crate::error::DealAnalyzerError;
use crate::types::{elapsed_us, with_metadata, ComputationOutput, Money, Rate};
use crate::DealAnalyzerResult;

pub const DEFAULT_NUM_TRIALS: u32 = 10_000;
pub const DEFAULT_NOISE_PCT: f64 = 0.05;

fn default_num_trials() -> u32 {
    DEFAULT_NUM_TRIALS
}

fn default_noise_pct() -> f64 {
    DEFAULT_NOISE_PCT
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of one perturbed deal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub variable: DealVariable,
    /// Drawn value substituted for the variable
    pub value: Decimal,
    pub deal_irr: Rate,
    pub investor_irr: Rate,
    pub investor_contribution: Money,
    pub investor_cash_out: Money,
    pub sponsor_irr: Rate,
    pub sponsor_contribution: Money,
    pub sponsor_cash_out: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub base: DealAssumptions,
    pub variables: Vec<DealVariable>,
    #[serde(default = "default_num_trials")]
    pub num_trials: u32,
    /// Half-width of the triangular draw as a fraction of the base value
    #[serde(default = "default_noise_pct")]
    pub noise_pct: f64,
    /// Omit for a non-reproducible run
    pub seed: Option<u64>,
}

/// IRRs of the unperturbed deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseCase {
    pub deal_irr: Rate,
    pub investor_irr: Rate,
    pub sponsor_irr: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub base_case: BaseCase,
    pub summaries: Vec<VariableSummary>,
    pub rows: Vec<TrialResult>,
}

// ---------------------------------------------------------------------------
// Draws
// ---------------------------------------------------------------------------

fn validate_noise(noise_pct: f64) -> DealAnalyzerResult<()> {
    if !noise_pct.is_finite() || !(0.0..1.0).contains(&noise_pct) {
        return Err(DealAnalyzerError::invalid(
            "noise_pct",
            format!("Noise must be in [0, 1), got {noise_pct}"),
        ));
    }
    Ok(())
}

/// Draw from Triangular(v - |v|n, v, v + |v|n). A zero spread returns `base`.
pub fn draw_value<R: Rng + ?Sized>(
    base: Decimal,
    noise_pct: f64,
    rng: &mut R,
) -> DealAnalyzerResult<Decimal> {
    let v = base.to_f64().ok_or_else(|| {
        DealAnalyzerError::invalid("value", format!("{base} is not representable as f64"))
    })?;
    let spread = v.abs() * noise_pct;
    if spread == 0.0 {
        return Ok(base);
    }

    let dist = Triangular::new(v - spread, v + spread, v).map_err(|e| {
        DealAnalyzerError::invalid("noise_pct", format!("Invalid Triangular parameters: {e}"))
    })?;
    let x = rand::distributions::Distribution::sample(&dist, rng);

    Decimal::from_f64(x)
        .ok_or_else(|| DealAnalyzerError::invalid("value", format!("Draw {x} out of range")))
}

// ---------------------------------------------------------------------------
// Trials
// ---------------------------------------------------------------------------

/// Perturb one variable, rebuild the deal and record its returns.
pub fn run_trial<R: Rng + ?Sized>(
    variable: DealVariable,
    base: &DealAssumptions,
    noise_pct: f64,
    rng: &mut R,
) -> DealAnalyzerResult<TrialResult> {
    let base_value = variable.get(base).ok_or_else(|| not_in_rent_roll(variable))?;
    let value = draw_value(base_value, noise_pct, rng)?;

    let mut assumptions = base.clone();
    variable.apply(&mut assumptions, value)?;
    let model = DealModel::build(assumptions)?;

    let investor = model.investor();
    let sponsor = model.sponsor();
    Ok(TrialResult {
        variable,
        value,
        deal_irr: model.deal_irr(),
        investor_irr: investor.irr,
        investor_contribution: investor.contribution,
        investor_cash_out: investor.total_cash_out,
        sponsor_irr: sponsor.irr,
        sponsor_contribution: sponsor.contribution,
        sponsor_cash_out: sponsor.total_cash_out,
    })
}

fn master_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn run_seeded(
    variable: DealVariable,
    base: &DealAssumptions,
    noise_pct: f64,
    seeds: Vec<u64>,
) -> DealAnalyzerResult<Vec<TrialResult>> {
    let trial = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        run_trial(variable, base, noise_pct, &mut rng)
    };

    #[cfg(feature = "parallel")]
    {
        seeds.into_par_iter().map(trial).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        seeds.into_iter().map(trial).collect()
    }
}

/// `num_trials` independent trials of one variable.
///
/// Each trial gets its own generator seeded from a master generator, so a
/// fixed `seed` reproduces the rows exactly whether or not trials run in
/// parallel.
pub fn run_experiment(
    variable: DealVariable,
    base: &DealAssumptions,
    num_trials: u32,
    noise_pct: f64,
    seed: Option<u64>,
) -> DealAnalyzerResult<Vec<TrialResult>> {
    validate_noise(noise_pct)?;
    let start = Instant::now();

    let mut master = master_rng(seed);
    let seeds: Vec<u64> = (0..num_trials).map(|_| master.gen()).collect();
    let rows = run_seeded(variable, base, noise_pct, seeds)?;

    info!(
        variable = %variable,
        trials = num_trials,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "sensitivity experiment finished"
    );
    Ok(rows)
}

/// Run an experiment per variable and concatenate the rows in variable order.
pub fn run_sensitivity_analysis(
    variables: &[DealVariable],
    base: &DealAssumptions,
    num_trials: u32,
    noise_pct: f64,
    seed: Option<u64>,
) -> DealAnalyzerResult<Vec<TrialResult>> {
    if variables.is_empty() {
        return Err(DealAnalyzerError::InsufficientData(
            "At least one variable is required".into(),
        ));
    }

    let mut master = master_rng(seed);
    let mut rows = Vec::with_capacity(variables.len() * num_trials as usize);
    for variable in variables {
        let experiment_seed: u64 = master.gen();
        rows.extend(run_experiment(
            *variable,
            base,
            num_trials,
            noise_pct,
            Some(experiment_seed),
        )?);
    }
    Ok(rows)
}

/// Sensitivity run wrapped in the standard output envelope.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> DealAnalyzerResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    if input.num_trials == 0 {
        return Err(DealAnalyzerError::invalid(
            "num_trials",
            "Number of trials must be at least 1",
        ));
    }

    let base_model = DealModel::build(input.base.clone())?;
    let base_case = BaseCase {
        deal_irr: base_model.deal_irr(),
        investor_irr: base_model.investor().irr,
        sponsor_irr: base_model.sponsor().irr,
    };

    let rows = run_sensitivity_analysis(
        &input.variables,
        &input.base,
        input.num_trials,
        input.noise_pct,
        input.seed,
    )?;
    let summaries = summarize(&rows);

    let mut warnings = Vec::new();
    if input.num_trials < 1_000 {
        warnings.push(format!(
            "Only {} trials per variable, percentiles may be unstable",
            input.num_trials
        ));
    }

    let elapsed = elapsed_us(start);
    Ok(with_metadata(
        "One-at-a-Time Triangular Sensitivity Analysis",
        input,
        warnings,
        elapsed,
        SensitivityOutput {
            base_case,
            summaries,
            rows,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::scenario::student_housing;
    use rust_decimal_macros::dec;

    const SEED: u64 = 42;

    #[test]
    fn test_draw_within_bounds() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let base = dec!(0.0425);
        for _ in 0..2_000 {
            let x = draw_value(base, 0.05, &mut rng).unwrap();
            assert!(x >= dec!(0.040375) - dec!(0.000000001));
            assert!(x <= dec!(0.044625) + dec!(0.000000001));
        }
    }

    #[test]
    fn test_zero_spread_returns_base() {
        let mut rng = StdRng::seed_from_u64(SEED);
        assert_eq!(draw_value(Decimal::ZERO, 0.05, &mut rng).unwrap(), Decimal::ZERO);
        assert_eq!(draw_value(dec!(0.10), 0.0, &mut rng).unwrap(), dec!(0.10));
    }

    #[test]
    fn test_trial_records_drawn_value() {
        let base = student_housing(27);
        let mut rng = StdRng::seed_from_u64(SEED);
        let row = run_trial(DealVariable::SellCapRate, &base, 0.05, &mut rng).unwrap();

        assert_eq!(row.variable, DealVariable::SellCapRate);
        assert!(row.value > dec!(0.095) && row.value < dec!(0.105));
        assert_eq!(
            row.investor_contribution + row.sponsor_contribution,
            dec!(337387.5)
        );
    }

    #[test]
    fn test_seeded_runs_reproduce() {
        let base = student_housing(27);
        let a = run_experiment(DealVariable::InterestRate, &base, 50, 0.05, Some(SEED)).unwrap();
        let b = run_experiment(DealVariable::InterestRate, &base, 50, 0.05, Some(SEED)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let base = student_housing(27);
        let mut master = master_rng(Some(SEED));
        let seeds: Vec<u64> = (0..40).map(|_| master.gen()).collect();

        let sequential: Vec<TrialResult> = seeds
            .iter()
            .map(|s| {
                let mut rng = StdRng::seed_from_u64(*s);
                run_trial(DealVariable::AnnualGrowth, &base, 0.05, &mut rng).unwrap()
            })
            .collect();
        let pooled = run_experiment(DealVariable::AnnualGrowth, &base, 40, 0.05, Some(SEED)).unwrap();
        assert_eq!(sequential, pooled);
    }

    #[test]
    fn test_rows_concatenated_in_variable_order() {
        let base = student_housing(27);
        let vars = [DealVariable::SellCapRate, DealVariable::DebtShare];
        let rows = run_sensitivity_analysis(&vars, &base, 20, 0.05, Some(SEED)).unwrap();

        assert_eq!(rows.len(), 40);
        assert!(rows[..20].iter().all(|r| r.variable == DealVariable::SellCapRate));
        assert!(rows[20..].iter().all(|r| r.variable == DealVariable::DebtShare));
    }

    #[test]
    fn test_empty_variable_list() {
        let base = student_housing(27);
        match run_sensitivity_analysis(&[], &base, 10, 0.05, Some(SEED)) {
            Err(DealAnalyzerError::InsufficientData(_)) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn test_noise_out_of_range() {
        let base = student_housing(27);
        assert!(run_experiment(DealVariable::SellCapRate, &base, 10, 1.5, Some(SEED)).is_err());
        assert!(run_experiment(DealVariable::SellCapRate, &base, 10, -0.1, Some(SEED)).is_err());
    }

    #[test]
    fn test_run_sensitivity_envelope() {
        let input = SensitivityInput {
            base: student_housing(27),
            variables: vec![DealVariable::SellCapRate],
            num_trials: 200,
            noise_pct: 0.05,
            seed: Some(SEED),
        };
        let out = run_sensitivity(&input).unwrap();

        assert_eq!(out.result.rows.len(), 200);
        assert_eq!(out.result.summaries.len(), 1);
        assert!(out.warnings.iter().any(|w| w.contains("200 trials")));
        assert!((out.result.base_case.deal_irr - dec!(0.247)).abs() < dec!(0.001));
    }
}
