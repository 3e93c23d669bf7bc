use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::deal::{DealAssumptions, RentRoll, SeasonalRentRoll};
use crate::error::DealAnalyzerError;
use crate::DealAnalyzerResult;

/// Integer-valued assumptions. They cannot be drawn from a continuous
/// distribution and are rejected by name.
const FIXED_FIELDS: [&str; 4] = [
    "number_of_units",
    "loan_term_years",
    "amortization_years",
    "holding_period_years",
];

/// A decimal-valued assumption that a sensitivity run can perturb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DealVariable {
    PurchasePrice,
    LandValue,
    DepreciableLife,
    BuildingSf,
    RentableSf,
    ImprovementCostPerSf,
    ClosingCosts,
    DebtShare,
    InterestRate,
    OperatingExpensesPerUnit,
    CapitalReservesPerUnit,
    AnnualGrowth,
    RealEstateTaxRate,
    IncomeTaxRate,
    SellCapRate,
    MonthlySchoolRent,
    DailySummerRent,
    SchoolYearMonths,
    SummerMonths,
    SchoolYearOccupancyRate,
    SummerOccupancyRate,
    GrossRentRoll,
    VacancyRate,
    InvestorContribution,
    InvestorPreferredReturn,
    SponsorPreferredReturn,
    InvestorProfitShare,
}

impl DealVariable {
    pub const ALL: [DealVariable; 27] = [
        DealVariable::PurchasePrice,
        DealVariable::LandValue,
        DealVariable::DepreciableLife,
        DealVariable::BuildingSf,
        DealVariable::RentableSf,
        DealVariable::ImprovementCostPerSf,
        DealVariable::ClosingCosts,
        DealVariable::DebtShare,
        DealVariable::InterestRate,
        DealVariable::OperatingExpensesPerUnit,
        DealVariable::CapitalReservesPerUnit,
        DealVariable::AnnualGrowth,
        DealVariable::RealEstateTaxRate,
        DealVariable::IncomeTaxRate,
        DealVariable::SellCapRate,
        DealVariable::MonthlySchoolRent,
        DealVariable::DailySummerRent,
        DealVariable::SchoolYearMonths,
        DealVariable::SummerMonths,
        DealVariable::SchoolYearOccupancyRate,
        DealVariable::SummerOccupancyRate,
        DealVariable::GrossRentRoll,
        DealVariable::VacancyRate,
        DealVariable::InvestorContribution,
        DealVariable::InvestorPreferredReturn,
        DealVariable::SponsorPreferredReturn,
        DealVariable::InvestorProfitShare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DealVariable::PurchasePrice => "purchase_price",
            DealVariable::LandValue => "land_value",
            DealVariable::DepreciableLife => "depreciable_life",
            DealVariable::BuildingSf => "building_sf",
            DealVariable::RentableSf => "rentable_sf",
            DealVariable::ImprovementCostPerSf => "improvement_cost_per_sf",
            DealVariable::ClosingCosts => "closing_costs",
            DealVariable::DebtShare => "debt_share",
            DealVariable::InterestRate => "interest_rate",
            DealVariable::OperatingExpensesPerUnit => "operating_expenses_per_unit",
            DealVariable::CapitalReservesPerUnit => "capital_reserves_per_unit",
            DealVariable::AnnualGrowth => "annual_growth",
            DealVariable::RealEstateTaxRate => "real_estate_tax_rate",
            DealVariable::IncomeTaxRate => "income_tax_rate",
            DealVariable::SellCapRate => "sell_cap_rate",
            DealVariable::MonthlySchoolRent => "monthly_school_rent",
            DealVariable::DailySummerRent => "daily_summer_rent",
            DealVariable::SchoolYearMonths => "school_year_months",
            DealVariable::SummerMonths => "summer_months",
            DealVariable::SchoolYearOccupancyRate => "school_year_occupancy_rate",
            DealVariable::SummerOccupancyRate => "summer_occupancy_rate",
            DealVariable::GrossRentRoll => "gross_rent_roll",
            DealVariable::VacancyRate => "vacancy_rate",
            DealVariable::InvestorContribution => "investor_contribution",
            DealVariable::InvestorPreferredReturn => "investor_preferred_return",
            DealVariable::SponsorPreferredReturn => "sponsor_preferred_return",
            DealVariable::InvestorProfitShare => "investor_profit_share",
        }
    }

    /// Current value in `deal`, or `None` when the field belongs to the
    /// other rent-roll variant.
    pub fn get(&self, deal: &DealAssumptions) -> Option<Decimal> {
        let p = &deal.property;
        let w = &deal.waterfall;
        let value = match *self {
            DealVariable::PurchasePrice => p.purchase_price,
            DealVariable::LandValue => p.land_value,
            DealVariable::DepreciableLife => deal.depreciable_life,
            DealVariable::BuildingSf => p.building_sf,
            DealVariable::RentableSf => p.rentable_sf,
            DealVariable::ImprovementCostPerSf => p.improvement_cost_per_sf,
            DealVariable::ClosingCosts => p.closing_costs,
            DealVariable::DebtShare => p.debt_share,
            DealVariable::InterestRate => p.interest_rate,
            DealVariable::OperatingExpensesPerUnit => p.operating_expenses_per_unit,
            DealVariable::CapitalReservesPerUnit => p.capital_reserves_per_unit,
            DealVariable::AnnualGrowth => p.annual_growth,
            DealVariable::RealEstateTaxRate => p.real_estate_tax_rate,
            DealVariable::IncomeTaxRate => p.income_tax_rate,
            DealVariable::SellCapRate => p.sell_cap_rate,
            DealVariable::InvestorContribution => w.investor.contribution_share,
            DealVariable::InvestorPreferredReturn => w.investor.preferred_return,
            DealVariable::SponsorPreferredReturn => w.sponsor.preferred_return,
            DealVariable::InvestorProfitShare => w.investor.profit_share,
            var => return rent_roll_field(&p.rent_roll, var),
        };
        Some(value)
    }

    /// Substitute `value` for this variable in `deal`.
    ///
    /// Waterfall shares keep the sponsor as the complement of the investor.
    pub fn apply(&self, deal: &mut DealAssumptions, value: Decimal) -> DealAnalyzerResult<()> {
        let p = &mut deal.property;
        match *self {
            DealVariable::PurchasePrice => p.purchase_price = value,
            DealVariable::LandValue => p.land_value = value,
            DealVariable::DepreciableLife => deal.depreciable_life = value,
            DealVariable::BuildingSf => p.building_sf = value,
            DealVariable::RentableSf => p.rentable_sf = value,
            DealVariable::ImprovementCostPerSf => p.improvement_cost_per_sf = value,
            DealVariable::ClosingCosts => p.closing_costs = value,
            DealVariable::DebtShare => p.debt_share = value,
            DealVariable::InterestRate => p.interest_rate = value,
            DealVariable::OperatingExpensesPerUnit => p.operating_expenses_per_unit = value,
            DealVariable::CapitalReservesPerUnit => p.capital_reserves_per_unit = value,
            DealVariable::AnnualGrowth => p.annual_growth = value,
            DealVariable::RealEstateTaxRate => p.real_estate_tax_rate = value,
            DealVariable::IncomeTaxRate => p.income_tax_rate = value,
            DealVariable::SellCapRate => p.sell_cap_rate = value,
            DealVariable::InvestorContribution => {
                deal.waterfall.set_investor_contribution(value)
            }
            DealVariable::InvestorPreferredReturn => {
                deal.waterfall.investor.preferred_return = value
            }
            DealVariable::SponsorPreferredReturn => deal.waterfall.sponsor.preferred_return = value,
            DealVariable::InvestorProfitShare => deal.waterfall.set_investor_profit_share(value),
            var => {
                let slot = match (&mut p.rent_roll, var) {
                    (RentRoll::Seasonal(s), _) => seasonal_field_mut(s, var),
                    (RentRoll::Stated { gross_rent_roll, .. }, DealVariable::GrossRentRoll) => {
                        Some(gross_rent_roll)
                    }
                    (RentRoll::Stated { vacancy_rate, .. }, DealVariable::VacancyRate) => {
                        Some(vacancy_rate)
                    }
                    _ => None,
                };
                match slot {
                    Some(slot) => *slot = value,
                    None => return Err(not_in_rent_roll(var)),
                }
            }
        }
        Ok(())
    }
}

fn rent_roll_field(roll: &RentRoll, var: DealVariable) -> Option<Decimal> {
    match (roll, var) {
        (RentRoll::Seasonal(s), _) => seasonal_field(s, var).copied(),
        (RentRoll::Stated { gross_rent_roll, .. }, DealVariable::GrossRentRoll) => {
            Some(*gross_rent_roll)
        }
        (RentRoll::Stated { vacancy_rate, .. }, DealVariable::VacancyRate) => Some(*vacancy_rate),
        _ => None,
    }
}

fn seasonal_field(s: &SeasonalRentRoll, var: DealVariable) -> Option<&Decimal> {
    match var {
        DealVariable::MonthlySchoolRent => Some(&s.monthly_school_rent),
        DealVariable::DailySummerRent => Some(&s.daily_summer_rent),
        DealVariable::SchoolYearMonths => Some(&s.school_year_months),
        DealVariable::SummerMonths => Some(&s.summer_months),
        DealVariable::SchoolYearOccupancyRate => Some(&s.school_year_occupancy_rate),
        DealVariable::SummerOccupancyRate => Some(&s.summer_occupancy_rate),
        _ => None,
    }
}

fn seasonal_field_mut(s: &mut SeasonalRentRoll, var: DealVariable) -> Option<&mut Decimal> {
    match var {
        DealVariable::MonthlySchoolRent => Some(&mut s.monthly_school_rent),
        DealVariable::DailySummerRent => Some(&mut s.daily_summer_rent),
        DealVariable::SchoolYearMonths => Some(&mut s.school_year_months),
        DealVariable::SummerMonths => Some(&mut s.summer_months),
        DealVariable::SchoolYearOccupancyRate => Some(&mut s.school_year_occupancy_rate),
        DealVariable::SummerOccupancyRate => Some(&mut s.summer_occupancy_rate),
        _ => None,
    }
}

pub(crate) fn not_in_rent_roll(var: DealVariable) -> DealAnalyzerError {
    DealAnalyzerError::invalid(
        var.as_str(),
        "Variable does not exist in this deal's rent roll",
    )
}

impl fmt::Display for DealVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealVariable {
    type Err = DealAnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if let Some(v) = DealVariable::ALL.iter().find(|v| v.as_str() == name) {
            return Ok(*v);
        }
        if FIXED_FIELDS.contains(&name) {
            return Err(DealAnalyzerError::invalid(
                name,
                "Integer-valued assumption cannot be perturbed",
            ));
        }
        Err(DealAnalyzerError::invalid(name, "Unknown deal variable"))
    }
}

impl TryFrom<String> for DealVariable {
    type Error = DealAnalyzerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DealVariable> for String {
    fn from(v: DealVariable) -> Self {
        v.as_str().to_string()
    }
}
