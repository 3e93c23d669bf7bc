use clap::Args;
use serde_json::Value;

use deal_analyzer_core::deal::scenario::{student_housing, student_housing_stated_rent_roll};
use deal_analyzer_core::deal::{analyze_deal, analyze_property, DealAssumptions, PropertyAssumptions};

use crate::input;

/// Unit count of the reference scenario when `--units` is not given.
pub const DEFAULT_UNITS: u32 = 27;

/// Arguments for a full deal pro-forma
#[derive(Args)]
pub struct DealArgs {
    /// Path to a JSON or YAML deal file (defaults to the reference scenario)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of units
    #[arg(long)]
    pub units: Option<u32>,

    /// Use the reference scenario with a pre-seeded rent roll
    #[arg(long)]
    pub stated_rent_roll: bool,
}

/// Arguments for a property-only pro-forma
#[derive(Args)]
pub struct PropertyArgs {
    /// Path to a JSON or YAML property file (defaults to the reference scenario)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of units
    #[arg(long)]
    pub units: Option<u32>,
}

/// The reference scenario, sized to `units`.
pub fn reference_deal(units: Option<u32>, stated_rent_roll: bool) -> DealAssumptions {
    let units = units.unwrap_or(DEFAULT_UNITS);
    if stated_rent_roll {
        student_housing_stated_rent_roll(units)
    } else {
        student_housing(units)
    }
}

/// Deal from `--input`/stdin, else the reference scenario. `--units` wins.
pub fn resolve_deal(
    path: Option<&str>,
    units: Option<u32>,
    stated_rent_roll: bool,
) -> Result<DealAssumptions, Box<dyn std::error::Error>> {
    let mut deal = match input::load::<DealAssumptions>(path)? {
        Some(deal) => deal,
        None => {
            tracing::info!("no input given, using the reference scenario");
            reference_deal(units, stated_rent_roll)
        }
    };
    if let Some(units) = units {
        deal.property.number_of_units = units;
    }
    Ok(deal)
}

pub fn run_deal(args: DealArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = resolve_deal(args.input.as_deref(), args.units, args.stated_rent_roll)?;
    let result = analyze_deal(&deal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_property(args: PropertyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut property = match input::load::<PropertyAssumptions>(args.input.as_deref())? {
        Some(property) => property,
        None => reference_deal(args.units, false).property,
    };
    if let Some(units) = args.units {
        property.number_of_units = units;
    }
    let result = analyze_property(&property)?;
    Ok(serde_json::to_value(result)?)
}
