use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::assumptions::{PropertyAssumptions, RentRoll};
use super::financing::DerivedFinancing;
use crate::error::DealAnalyzerError;
use crate::types::{Money, Rate};
use crate::DealAnalyzerResult;

/// Stabilised first operating year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstYearOperatingStatement {
    pub school_year_rent_roll: Money,
    pub summer_rent_roll: Money,
    pub school_year_vacancy_cost: Money,
    pub summer_vacancy_cost: Money,
    pub gross_rent_roll: Money,
    pub vacancy_cost: Money,
    /// Total vacancy cost over gross rent roll
    pub vacancy_rate: Rate,
    pub net_rents: Money,
    pub real_estate_taxes: Money,
    pub operating_expenses: Money,
    pub capital_reserves: Money,
    pub net_operating_income: Money,
    pub annual_debt_service: Money,
    pub cash_flow_after_financing: Money,
    /// NOI over annual debt service
    pub dscr: Decimal,
}

struct Rents {
    school_year: Money,
    summer: Money,
    school_year_vacancy: Money,
    summer_vacancy: Money,
    gross: Money,
    vacancy: Money,
}

fn rent_roll(input: &PropertyAssumptions) -> Rents {
    let units = Decimal::from(input.number_of_units);
    match &input.rent_roll {
        RentRoll::Seasonal(s) => {
            let school_year = units * s.monthly_school_rent * s.school_year_months;
            let summer = units * s.monthly_summer_rent() * s.summer_months;
            let school_year_vacancy = school_year * (Decimal::ONE - s.school_year_occupancy_rate);
            let summer_vacancy = summer * (Decimal::ONE - s.summer_occupancy_rate);
            Rents {
                school_year,
                summer,
                school_year_vacancy,
                summer_vacancy,
                gross: school_year + summer,
                vacancy: school_year_vacancy + summer_vacancy,
            }
        }
        RentRoll::Stated {
            gross_rent_roll,
            vacancy_rate,
        } => Rents {
            school_year: Decimal::ZERO,
            summer: Decimal::ZERO,
            school_year_vacancy: Decimal::ZERO,
            summer_vacancy: Decimal::ZERO,
            gross: *gross_rent_roll,
            vacancy: *gross_rent_roll * *vacancy_rate,
        },
    }
}

/// Build the first-year statement from the rent roll and the loan terms.
pub fn first_year_statement(
    input: &PropertyAssumptions,
    financing: &DerivedFinancing,
) -> DealAnalyzerResult<FirstYearOperatingStatement> {
    let rents = rent_roll(input);
    if rents.gross <= Decimal::ZERO {
        return Err(DealAnalyzerError::invalid(
            "rent_roll",
            "Gross rent roll must be positive",
        ));
    }

    let units = Decimal::from(input.number_of_units);
    let vacancy_rate = rents.vacancy / rents.gross;
    let net_rents = rents.gross - rents.vacancy;
    let real_estate_taxes = rents.gross * input.real_estate_tax_rate;
    let operating_expenses = input.operating_expenses_per_unit * units;
    let capital_reserves = input.capital_reserves_per_unit * units;
    let net_operating_income = net_rents - real_estate_taxes - operating_expenses - capital_reserves;

    let annual_debt_service = financing.annual_debt_service;
    let dscr = if annual_debt_service.is_zero() {
        Decimal::ZERO
    } else {
        net_operating_income / annual_debt_service
    };

    Ok(FirstYearOperatingStatement {
        school_year_rent_roll: rents.school_year,
        summer_rent_roll: rents.summer,
        school_year_vacancy_cost: rents.school_year_vacancy,
        summer_vacancy_cost: rents.summer_vacancy,
        gross_rent_roll: rents.gross,
        vacancy_cost: rents.vacancy,
        vacancy_rate,
        net_rents,
        real_estate_taxes,
        operating_expenses,
        capital_reserves,
        net_operating_income,
        annual_debt_service,
        cash_flow_after_financing: net_operating_income - annual_debt_service,
        dscr,
    })
}
