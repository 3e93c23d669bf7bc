use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::assumptions::PropertyAssumptions;
use crate::error::DealAnalyzerError;
use crate::time_value::pmt;
use crate::types::{Money, Rate};
use crate::DealAnalyzerResult;

const MONTHS_PER_YEAR: u32 = 12;

/// Capital stack and loan terms derived from the purchase assumptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedFinancing {
    /// Purchase price less land value
    pub depreciable_base: Money,
    pub development_cost: Money,
    pub total_cost: Money,
    /// Debt share actually applied (capped at 100%)
    pub debt_share: Rate,
    pub mortgage_amount: Money,
    pub equity_investment: Money,
    /// Level monthly payment, as a positive amount
    pub monthly_payment: Money,
    /// Annualised payment per dollar of principal, fixed for the loan's life
    pub constant_payment_rate: Rate,
    pub annual_debt_service: Money,
    /// Mortgage over total cost
    pub loan_to_cost: Rate,
}

/// Whole years as monthly periods.
pub(crate) fn to_months(years: u32, field: &str) -> DealAnalyzerResult<u32> {
    years
        .checked_mul(MONTHS_PER_YEAR)
        .ok_or_else(|| DealAnalyzerError::invalid(field, format!("{years} years is too long")))
}

/// Size the loan and the equity check.
pub fn derive_financing(input: &PropertyAssumptions) -> DealAnalyzerResult<DerivedFinancing> {
    let depreciable_base = input.purchase_price - input.land_value;
    let development_cost = input.improvement_cost_per_sf * input.rentable_sf;
    let total_cost = input.purchase_price + development_cost + input.closing_costs;

    let debt_share = input.debt_share.min(Decimal::ONE);
    let mortgage_amount = total_cost * debt_share;
    let equity_investment = total_cost - mortgage_amount;

    if mortgage_amount <= Decimal::ZERO {
        return Err(DealAnalyzerError::invalid(
            "debt_share",
            "Mortgage amount must be positive",
        ));
    }

    let monthly_rate = input.interest_rate / Decimal::from(MONTHS_PER_YEAR);
    let months = to_months(input.amortization_years, "amortization_years")?;
    let monthly_payment = -pmt(monthly_rate, months, mortgage_amount, Decimal::ZERO)?;

    let annual_payment = monthly_payment * Decimal::from(MONTHS_PER_YEAR);
    let constant_payment_rate = annual_payment / mortgage_amount;
    let annual_debt_service = mortgage_amount * constant_payment_rate;

    Ok(DerivedFinancing {
        depreciable_base,
        development_cost,
        total_cost,
        debt_share,
        mortgage_amount,
        equity_investment,
        monthly_payment,
        constant_payment_rate,
        annual_debt_service,
        loan_to_cost: mortgage_amount / total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::scenario::student_housing;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reference_financing() {
        let deal = student_housing(27);
        let f = derive_financing(&deal.property).unwrap();

        assert_eq!(f.depreciable_base, dec!(845000));
        assert_eq!(f.development_cost, dec!(404550));
        assert_eq!(f.total_cost, dec!(1349550));
        assert_eq!(f.mortgage_amount, dec!(1012162.5));
        assert_eq!(f.equity_investment, dec!(337387.5));
        assert!(
            (f.constant_payment_rate - dec!(0.065009)).abs() < dec!(0.000001),
            "payment rate was {}",
            f.constant_payment_rate
        );
    }

    #[test]
    fn test_debt_share_capped_at_one() {
        let mut deal = student_housing(27);
        deal.property.debt_share = dec!(1.3);
        let f = derive_financing(&deal.property).unwrap();
        assert_eq!(f.debt_share, Decimal::ONE);
        assert_eq!(f.equity_investment, Decimal::ZERO);
    }

    #[test]
    fn test_zero_debt_rejected() {
        let mut deal = student_housing(27);
        deal.property.debt_share = Decimal::ZERO;
        match derive_financing(&deal.property) {
            Err(DealAnalyzerError::InvalidInput { field, .. }) => assert_eq!(field, "debt_share"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_higher_debt_share_means_less_equity() {
        let mut deal = student_housing(27);
        let low = derive_financing(&deal.property).unwrap();
        deal.property.debt_share = dec!(0.80);
        let high = derive_financing(&deal.property).unwrap();

        assert!(high.mortgage_amount > low.mortgage_amount);
        assert!(high.equity_investment < low.equity_investment);
    }

    #[test]
    fn test_zero_interest_payment_rate() {
        let mut deal = student_housing(27);
        deal.property.interest_rate = Decimal::ZERO;
        let f = derive_financing(&deal.property).unwrap();
        // Straight-line repayment over 25 years
        assert!((f.constant_payment_rate - dec!(0.04)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_amortization_months_overflow_rejected() {
        let mut deal = student_housing(27);
        deal.property.amortization_years = u32::MAX;
        match derive_financing(&deal.property) {
            Err(DealAnalyzerError::InvalidInput { field, .. }) => {
                assert_eq!(field, "amortization_years")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
