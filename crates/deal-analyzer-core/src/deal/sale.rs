use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::assumptions::PropertyAssumptions;
use super::financing::{to_months, DerivedFinancing};
use super::operations::FirstYearOperatingStatement;
use crate::error::DealAnalyzerError;
use crate::time_value::cumulative_principal;
use crate::types::{Money, Years};
use crate::DealAnalyzerResult;

/// Tax rate on gain attributable to depreciation taken.
pub const DEPRECIATION_RECAPTURE_RATE: Decimal = dec!(0.25);
/// Tax rate on the remaining gain.
pub const CAPITAL_GAINS_RATE: Decimal = dec!(0.20);

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Per-year NOI and cash flow after financing over the hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingProjection {
    pub net_operating_income: Vec<Money>,
    pub cash_flow_after_financing: Vec<Money>,
}

/// Grow first-year NOI at a compound rate, then subtract the constant debt
/// service from each year.
pub fn project_operations(
    first_year: &FirstYearOperatingStatement,
    annual_growth: Decimal,
    holding_period_years: u32,
) -> DealAnalyzerResult<OperatingProjection> {
    let growth = Decimal::ONE + annual_growth;
    let mut net_operating_income = Vec::with_capacity(holding_period_years as usize);
    let mut noi = first_year.net_operating_income;
    for year in 1..=holding_period_years {
        net_operating_income.push(noi);
        if year < holding_period_years {
            noi = noi
                .checked_mul(growth)
                .ok_or_else(|| DealAnalyzerError::overflow("NOI projection"))?;
        }
    }

    let cash_flow_after_financing = net_operating_income
        .iter()
        .map(|noi| *noi - first_year.annual_debt_service)
        .collect();

    Ok(OperatingProjection {
        net_operating_income,
        cash_flow_after_financing,
    })
}

/// Final-year NOI capitalised at the sale cap rate.
pub fn sale_price(
    projection: &OperatingProjection,
    sell_cap_rate: Decimal,
) -> DealAnalyzerResult<Money> {
    let final_noi = projection
        .net_operating_income
        .last()
        .copied()
        .unwrap_or(Decimal::ZERO);
    final_noi
        .checked_div(sell_cap_rate)
        .ok_or_else(|| DealAnalyzerError::overflow("sale price"))
}

// ---------------------------------------------------------------------------
// Sale, tax and loan payoff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSummary {
    pub sale_price: Money,
    pub depreciation_taken: Money,
    pub net_book_value: Money,
    pub gain_on_sale: Money,
    pub depreciation_recapture_tax: Money,
    /// Negative when the gain is smaller than depreciation taken
    pub capital_gains_tax: Money,
    pub total_tax: Money,
    pub cumulative_principal_paid: Money,
    pub mortgage_balance: Money,
    pub net_cash_from_sale: Money,
}

/// Gain left after recapture. Not floored: a gain below depreciation taken
/// produces a negative capital gains term.
pub fn remaining_gain(gain_on_sale: Money, depreciation_taken: Money) -> Money {
    gain_on_sale - depreciation_taken
}

/// Recapture and capital gains tax on a sale.
pub fn sale_tax(gain_on_sale: Money, depreciation_taken: Money) -> (Money, Money) {
    let recapture = DEPRECIATION_RECAPTURE_RATE * depreciation_taken;
    let capital_gains = CAPITAL_GAINS_RATE * remaining_gain(gain_on_sale, depreciation_taken);
    (recapture, capital_gains)
}

/// Price the exit, tax it and pay off the loan.
pub fn settle_sale(
    property: &PropertyAssumptions,
    depreciable_life: Years,
    financing: &DerivedFinancing,
    projection: &OperatingProjection,
) -> DealAnalyzerResult<SaleSummary> {
    let years_held = Decimal::from(property.holding_period_years);
    let price = sale_price(projection, property.sell_cap_rate)?;

    let depreciation_taken = financing.depreciable_base / depreciable_life * years_held;
    let annual_reserves = property.capital_reserves_per_unit * Decimal::from(property.number_of_units);
    let net_book_value = property.purchase_price + annual_reserves * years_held
        + financing.development_cost
        - depreciation_taken;
    let gain_on_sale = price - net_book_value;

    let (depreciation_recapture_tax, capital_gains_tax) = sale_tax(gain_on_sale, depreciation_taken);
    let total_tax = depreciation_recapture_tax + capital_gains_tax;

    let cumulative_principal_paid = cumulative_principal(
        property.interest_rate / dec!(12),
        to_months(property.holding_period_years, "holding_period_years")?,
        to_months(property.amortization_years, "amortization_years")?,
        financing.mortgage_amount,
    )?;
    let mortgage_balance = financing.mortgage_amount - cumulative_principal_paid;

    Ok(SaleSummary {
        sale_price: price,
        depreciation_taken,
        net_book_value,
        gain_on_sale,
        depreciation_recapture_tax,
        capital_gains_tax,
        total_tax,
        cumulative_principal_paid,
        mortgage_balance,
        net_cash_from_sale: price - mortgage_balance - total_tax,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::financing::derive_financing;
    use crate::deal::operations::first_year_statement;
    use crate::deal::scenario::student_housing;

    fn reference() -> (PropertyAssumptions, DerivedFinancing, OperatingProjection) {
        let deal = student_housing(27);
        let financing = derive_financing(&deal.property).unwrap();
        let first = first_year_statement(&deal.property, &financing).unwrap();
        let projection = project_operations(
            &first,
            deal.property.annual_growth,
            deal.property.holding_period_years,
        )
        .unwrap();
        (deal.property, financing, projection)
    }

    #[test]
    fn test_noi_compounds() {
        let (_, _, projection) = reference();
        let expected = [
            dec!(125795.72),
            dec!(129569.59),
            dec!(133456.68),
            dec!(137460.38),
            dec!(141584.19),
        ];
        assert_eq!(projection.net_operating_income.len(), 5);
        for (actual, expected) in projection.net_operating_income.iter().zip(expected) {
            assert!((*actual - expected).abs() < dec!(0.01), "NOI {actual} vs {expected}");
        }
    }

    #[test]
    fn test_debt_service_is_constant() {
        let (_, _, projection) = reference();
        let diffs: Vec<Money> = projection
            .net_operating_income
            .iter()
            .zip(&projection.cash_flow_after_financing)
            .map(|(noi, cf)| *noi - *cf)
            .collect();
        assert!(diffs
            .windows(2)
            .all(|w| (w[0] - w[1]).abs() < dec!(0.0000001)));
    }

    #[test]
    fn test_reference_sale() {
        let (property, financing, projection) = reference();
        let sale = settle_sale(&property, dec!(27.5), &financing, &projection).unwrap();

        assert!((sale.sale_price - dec!(1415842)).abs() < dec!(1));
        assert!((sale.cumulative_principal_paid - dec!(126670.79)).abs() < dec!(0.01));
        assert!((sale.mortgage_balance - dec!(885491.71)).abs() < dec!(0.01));
        assert!((sale.total_tax - dec!(52024.69)).abs() < dec!(0.01));
        assert!((sale.net_cash_from_sale - dec!(478325.51)).abs() < dec!(0.01));
    }

    #[test]
    fn test_higher_cap_rate_lowers_price() {
        let (_, _, projection) = reference();
        let wider = sale_price(&projection, dec!(0.11)).unwrap();
        let base = sale_price(&projection, dec!(0.10)).unwrap();
        assert!(wider < base);
    }

    #[test]
    fn test_remaining_gain_not_floored() {
        // A gain smaller than depreciation taken yields a tax credit term
        let (recapture, capital_gains) = sale_tax(dec!(100000), dec!(150000));
        assert_eq!(recapture, dec!(37500));
        assert_eq!(capital_gains, dec!(-10000));
    }

    #[test]
    fn test_runaway_growth_is_an_error() {
        let deal = student_housing(27);
        let financing = derive_financing(&deal.property).unwrap();
        let first = first_year_statement(&deal.property, &financing).unwrap();
        match project_operations(&first, deal.property.annual_growth, 3_000) {
            Err(DealAnalyzerError::Overflow { context }) => assert_eq!(context, "NOI projection"),
            other => panic!("Expected Overflow, got {other:?}"),
        }
    }
}
