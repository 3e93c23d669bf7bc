use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::assumptions::{validate_deal, validate_property, DealAssumptions, PropertyAssumptions};
use super::financing::{derive_financing, DerivedFinancing};
use super::operations::{first_year_statement, FirstYearOperatingStatement};
use super::sale::{project_operations, remaining_gain, sale_price, OperatingProjection};
use super::waterfall::{build_waterfall, ClassDistribution, Waterfall};
use crate::types::{elapsed_us, with_metadata, ComputationOutput, Money, Rate};
use crate::DealAnalyzerResult;

const MIN_DSCR: Decimal = dec!(1.20);
const MAX_LTV: Decimal = dec!(0.80);

// ---------------------------------------------------------------------------
// DealModel
// ---------------------------------------------------------------------------

/// A fully evaluated deal. Every derived figure is computed on construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealModel {
    pub assumptions: DealAssumptions,
    pub financing: DerivedFinancing,
    pub first_year: FirstYearOperatingStatement,
    pub waterfall: Waterfall,
}

impl DealModel {
    /// Run the full pro-forma for one set of assumptions.
    pub fn build(mut assumptions: DealAssumptions) -> DealAnalyzerResult<Self> {
        assumptions.waterfall.clamp_investor_contribution();
        validate_deal(&assumptions)?;

        let financing = derive_financing(&assumptions.property)?;
        let first_year = first_year_statement(&assumptions.property, &financing)?;
        let waterfall = build_waterfall(&assumptions, &financing, &first_year)?;

        debug!(
            equity = %financing.equity_investment,
            noi = %first_year.net_operating_income,
            deal_irr = %waterfall.deal_irr,
            investor_irr = %waterfall.investor.irr,
            sponsor_irr = %waterfall.sponsor.irr,
            "deal model built"
        );

        Ok(DealModel {
            assumptions,
            financing,
            first_year,
            waterfall,
        })
    }

    pub fn deal_irr(&self) -> Rate {
        self.waterfall.deal_irr
    }

    pub fn investor(&self) -> &ClassDistribution {
        &self.waterfall.investor
    }

    pub fn sponsor(&self) -> &ClassDistribution {
        &self.waterfall.sponsor
    }
}

/// Build a deal model wrapped in the standard output envelope, flagging
/// metrics a reviewer should look at.
pub fn analyze_deal(input: &DealAssumptions) -> DealAnalyzerResult<ComputationOutput<DealModel>> {
    let start = Instant::now();
    let model = DealModel::build(input.clone())?;

    let mut warnings = leverage_warnings(&model.financing, &model.first_year);

    let sale = &model.waterfall.sale;
    if sale.depreciation_taken > model.financing.depreciable_base {
        warnings.push(format!(
            "Depreciation taken {} exceeds the depreciable base {}",
            sale.depreciation_taken.round_dp(2),
            model.financing.depreciable_base.round_dp(2)
        ));
    }
    if remaining_gain(sale.gain_on_sale, sale.depreciation_taken) < Decimal::ZERO {
        warnings.push(format!(
            "Gain on sale is below depreciation taken: capital gains tax of {} is a credit",
            sale.capital_gains_tax.round_dp(2)
        ));
    }
    for class in [model.investor(), model.sponsor()] {
        if class.preferred_shortfall > Decimal::ZERO {
            warnings.push(format!(
                "{:?} preferred return short by {} over the hold",
                class.class,
                class.preferred_shortfall.round_dp(2)
            ));
        }
    }

    let elapsed = elapsed_us(start);
    Ok(with_metadata(
        "Real Estate Deal Pro-Forma (Two-Class Preferred Return Waterfall)",
        input,
        warnings,
        elapsed,
        model,
    ))
}

fn leverage_warnings(
    financing: &DerivedFinancing,
    first_year: &FirstYearOperatingStatement,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if first_year.dscr < MIN_DSCR {
        warnings.push(format!(
            "DSCR {:.2}x is below the {MIN_DSCR}x lender minimum",
            first_year.dscr
        ));
    }
    if financing.loan_to_cost > MAX_LTV {
        warnings.push(format!(
            "LTV {:.1}% exceeds 80%, refinancing risk",
            financing.loan_to_cost * dec!(100)
        ));
    }
    warnings
}

// ---------------------------------------------------------------------------
// Property-only analysis
// ---------------------------------------------------------------------------

/// Financing, operations and exit value without depreciation or waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyAnalysis {
    pub financing: DerivedFinancing,
    pub first_year: FirstYearOperatingStatement,
    pub projection: OperatingProjection,
    pub sale_price: Money,
    pub dscr: Decimal,
    /// First-year cash flow after financing over equity
    pub cash_on_cash: Rate,
}

pub fn analyze_property(
    input: &PropertyAssumptions,
) -> DealAnalyzerResult<ComputationOutput<PropertyAnalysis>> {
    let start = Instant::now();
    validate_property(input)?;

    let financing = derive_financing(input)?;
    let first_year = first_year_statement(input, &financing)?;
    let projection =
        project_operations(&first_year, input.annual_growth, input.holding_period_years)?;
    let price = sale_price(&projection, input.sell_cap_rate)?;

    let cash_on_cash = if financing.equity_investment.is_zero() {
        Decimal::ZERO
    } else {
        first_year.cash_flow_after_financing / financing.equity_investment
    };

    let warnings = leverage_warnings(&financing, &first_year);
    debug!(noi = %first_year.net_operating_income, sale_price = %price, "property analysed");

    let output = PropertyAnalysis {
        dscr: first_year.dscr,
        financing,
        first_year,
        projection,
        sale_price: price,
        cash_on_cash,
    };

    let elapsed = elapsed_us(start);
    Ok(with_metadata(
        "Real Estate Property Pro-Forma (Financing, Operations, Exit Value)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::scenario::student_housing;
    use crate::error::DealAnalyzerError;

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, what: &str) {
        assert!(
            (actual - expected).abs() < tol,
            "{what}: expected ~{expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_irrs() {
        let model = DealModel::build(student_housing(27)).unwrap();
        assert_close(model.deal_irr(), dec!(0.2470), dec!(0.0005), "deal IRR");
        assert_close(model.investor().irr, dec!(0.1776), dec!(0.0005), "investor IRR");
        assert_close(model.sponsor().irr, dec!(0.7323), dec!(0.0005), "sponsor IRR");
    }

    #[test]
    fn test_reference_class_contributions() {
        let model = DealModel::build(student_housing(27)).unwrap();
        assert_eq!(model.investor().contribution, dec!(303648.75));
        assert_eq!(model.sponsor().contribution, dec!(33738.75));
    }

    #[test]
    fn test_analyze_deal_envelope() {
        let out = analyze_deal(&student_housing(27)).unwrap();
        assert!(out.methodology.contains("Waterfall"));
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        // Reference deal is comfortably covered, moderately levered
        assert!(out.warnings.is_empty(), "unexpected warnings: {:?}", out.warnings);
    }

    #[test]
    fn test_thin_coverage_warns() {
        let mut deal = student_housing(27);
        deal.property.debt_share = dec!(0.95);
        deal.property.interest_rate = dec!(0.09);
        let out = analyze_deal(&deal).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("DSCR")));
        assert!(out.warnings.iter().any(|w| w.contains("LTV")));
    }

    #[test]
    fn test_long_hold_warns_on_depreciation() {
        let mut deal = student_housing(27);
        deal.property.holding_period_years = 30;
        let out = analyze_deal(&deal).unwrap();
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("exceeds the depreciable base")));
    }

    #[test]
    fn test_invalid_terms_abort_construction() {
        let mut deal = student_housing(27);
        deal.waterfall.sponsor.contribution_share = dec!(0.2);
        match DealModel::build(deal) {
            Err(DealAnalyzerError::InvalidInput { field, .. }) => {
                assert_eq!(field, "waterfall.contribution_share")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_analyze_property() {
        let deal = student_housing(27);
        let out = analyze_property(&deal.property).unwrap();
        let r = &out.result;
        assert_close(r.sale_price, dec!(1415842), dec!(1), "sale price");
        assert_close(
            r.cash_on_cash,
            dec!(59996.48) / dec!(337387.5),
            dec!(0.000001),
            "cash on cash",
        );
        assert_eq!(r.projection.net_operating_income.len(), 5);
    }
}
