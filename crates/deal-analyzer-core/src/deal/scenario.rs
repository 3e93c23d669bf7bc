//! Named scenario builders.
//!
//! Each builder returns a canonical [`DealAssumptions`] record. The unit
//! count is supplied by the caller (it normally comes from external
//! configuration).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::assumptions::{
    DealAssumptions, PropertyAssumptions, RentRoll, SeasonalRentRoll, WaterfallTerms,
};

/// Operating expenses budgeted per square foot of building area.
const OPEX_PER_BUILDING_SF: Decimal = dec!(10);

/// Reference student-housing acquisition: buy, renovate, hold five years.
pub fn student_housing(number_of_units: u32) -> DealAssumptions {
    let building_sf = dec!(8800);
    let units = Decimal::from(number_of_units.max(1));

    DealAssumptions {
        property: PropertyAssumptions {
            purchase_price: dec!(895000),
            land_value: dec!(50000),
            building_sf,
            rentable_sf: dec!(6525),
            improvement_cost_per_sf: dec!(62),
            closing_costs: dec!(50000),
            debt_share: dec!(0.75),
            interest_rate: dec!(0.0425),
            loan_term_years: 5,
            amortization_years: 25,
            number_of_units,
            rent_roll: RentRoll::Seasonal(SeasonalRentRoll {
                monthly_school_rent: dec!(650),
                daily_summer_rent: dec!(100),
                school_year_months: dec!(9),
                summer_months: dec!(3),
                school_year_occupancy_rate: dec!(0.95),
                summer_occupancy_rate: dec!(0.50),
            }),
            operating_expenses_per_unit: building_sf * OPEX_PER_BUILDING_SF / units,
            capital_reserves_per_unit: dec!(357.14),
            annual_growth: dec!(0.03),
            real_estate_tax_rate: dec!(0.12),
            income_tax_rate: dec!(0.396),
            sell_cap_rate: dec!(0.10),
            holding_period_years: 5,
        },
        depreciable_life: dec!(27.5),
        waterfall: WaterfallTerms::investor_sponsor(dec!(0.9), dec!(0.08), dec!(0.5)),
    }
}

/// Same deal with the rent roll seeded up front: a 66.6% summer occupancy
/// folded into a stated gross rent roll and blended vacancy rate.
pub fn student_housing_stated_rent_roll(number_of_units: u32) -> DealAssumptions {
    let mut deal = student_housing(number_of_units);
    let units = Decimal::from(number_of_units);

    let school_months = dec!(9);
    let summer_months = dec!(12) - school_months;
    let school_year_rent = units * dec!(650) * school_months;
    let summer_rent = units * dec!(100) * dec!(30) * summer_months;
    let vacancy = school_year_rent * (Decimal::ONE - dec!(0.95))
        + summer_rent * (Decimal::ONE - dec!(0.666));
    let gross_rent_roll = school_year_rent + summer_rent;
    let vacancy_rate = if gross_rent_roll.is_zero() {
        Decimal::ZERO
    } else {
        vacancy / gross_rent_roll
    };

    deal.property.rent_roll = RentRoll::Stated {
        gross_rent_roll,
        vacancy_rate,
    };
    deal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::assumptions::validate_deal;

    #[test]
    fn test_reference_scenario_is_valid() {
        assert!(validate_deal(&student_housing(27)).is_ok());
        assert!(validate_deal(&student_housing_stated_rent_roll(27)).is_ok());
    }

    #[test]
    fn test_opex_spread_over_units() {
        let deal = student_housing(27);
        let total = deal.property.operating_expenses_per_unit * dec!(27);
        assert!((total - dec!(88000)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_stated_rent_roll_values() {
        let deal = student_housing_stated_rent_roll(27);
        match deal.property.rent_roll {
            RentRoll::Stated {
                gross_rent_roll,
                vacancy_rate,
            } => {
                assert_eq!(gross_rent_roll, dec!(400950));
                assert!((vacancy_rate - dec!(0.22212)).abs() < dec!(0.00001));
            }
            other => panic!("Expected stated rent roll, got {other:?}"),
        }
    }
}
