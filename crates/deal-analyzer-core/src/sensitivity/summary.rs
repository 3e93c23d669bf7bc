use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::runner::TrialResult;
use super::variables::DealVariable;

/// Distribution of one output across a variable's trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSummary {
    pub variable: DealVariable,
    pub trials: usize,
    pub value: DistributionStats,
    pub deal_irr: DistributionStats,
    pub investor_irr: DistributionStats,
    pub sponsor_irr: DistributionStats,
}

/// Linear interpolation on a sorted slice.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Population statistics. Returns `None` for an empty sample.
pub fn describe(values: &[Decimal]) -> Option<DistributionStats> {
    let mut xs: Vec<f64> = values.iter().filter_map(|v| v.to_f64()).collect();
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    Some(DistributionStats {
        mean,
        std_dev: variance.sqrt(),
        min: xs[0],
        max: xs[xs.len() - 1],
        p5: percentile_sorted(&xs, 5.0),
        p25: percentile_sorted(&xs, 25.0),
        p50: percentile_sorted(&xs, 50.0),
        p75: percentile_sorted(&xs, 75.0),
        p95: percentile_sorted(&xs, 95.0),
    })
}

/// One summary per variable, in order of first appearance.
pub fn summarize(rows: &[TrialResult]) -> Vec<VariableSummary> {
    let mut order: Vec<DealVariable> = Vec::new();
    for row in rows {
        if !order.contains(&row.variable) {
            order.push(row.variable);
        }
    }

    order
        .into_iter()
        .filter_map(|variable| {
            let group: Vec<&TrialResult> = rows.iter().filter(|r| r.variable == variable).collect();
            let column = |f: fn(&TrialResult) -> Decimal| -> Vec<Decimal> {
                group.iter().map(|r| f(r)).collect()
            };
            Some(VariableSummary {
                variable,
                trials: group.len(),
                value: describe(&column(|r| r.value))?,
                deal_irr: describe(&column(|r| r.deal_irr))?,
                investor_irr: describe(&column(|r| r.investor_irr))?,
                sponsor_irr: describe(&column(|r| r.sponsor_irr))?,
            })
        })
        .collect()
}
