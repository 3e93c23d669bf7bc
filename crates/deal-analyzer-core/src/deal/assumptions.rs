use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::DealAnalyzerError;
use crate::types::{Money, Rate, Years};
use crate::DealAnalyzerResult;

/// Days per month used to turn a daily summer rate into a monthly one.
pub const DAYS_PER_MONTH: Decimal = dec!(30);

const SHARE_TOLERANCE: Decimal = dec!(0.000001);

// ---------------------------------------------------------------------------
// Rent roll
// ---------------------------------------------------------------------------

/// How the first-year rent roll is obtained.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RentRoll {
    /// School-year / summer split, computed from rates and occupancies.
    Seasonal(SeasonalRentRoll),
    /// Rent roll and blended vacancy supplied up front.
    Stated {
        gross_rent_roll: Money,
        vacancy_rate: Rate,
    },
}

/// Seasonal rent inputs for student housing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalRentRoll {
    /// Monthly rent per unit during the school year
    pub monthly_school_rent: Money,
    /// Daily rent per unit during the summer (30 days per month)
    pub daily_summer_rent: Money,
    /// Length of the school year in months
    #[serde(default = "default_school_year_months")]
    pub school_year_months: Decimal,
    /// Length of the summer season in months
    #[serde(default = "default_summer_months")]
    pub summer_months: Decimal,
    pub school_year_occupancy_rate: Rate,
    pub summer_occupancy_rate: Rate,
}

fn default_school_year_months() -> Decimal {
    dec!(9)
}

fn default_summer_months() -> Decimal {
    dec!(3)
}

impl SeasonalRentRoll {
    pub fn monthly_summer_rent(&self) -> Money {
        self.daily_summer_rent * DAYS_PER_MONTH
    }
}

// ---------------------------------------------------------------------------
// Property (reduced record: no depreciation, no waterfall)
// ---------------------------------------------------------------------------

/// Everything needed to finance, operate and price the exit of a property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyAssumptions {
    pub purchase_price: Money,
    pub land_value: Money,
    /// Gross building area (informational)
    pub building_sf: Decimal,
    /// Area the improvement budget applies to
    pub rentable_sf: Decimal,
    pub improvement_cost_per_sf: Money,
    pub closing_costs: Money,
    /// Fraction of total cost financed; values above 1 are treated as 1
    pub debt_share: Rate,
    /// Annual rate, compounded monthly
    pub interest_rate: Rate,
    /// Loan term in years (informational, the balloon sits at the sale date)
    pub loan_term_years: u32,
    pub amortization_years: u32,
    pub number_of_units: u32,
    pub rent_roll: RentRoll,
    pub operating_expenses_per_unit: Money,
    pub capital_reserves_per_unit: Money,
    /// Annual NOI growth (may be negative)
    pub annual_growth: Rate,
    pub real_estate_tax_rate: Rate,
    pub income_tax_rate: Rate,
    pub sell_cap_rate: Rate,
    pub holding_period_years: u32,
}

// ---------------------------------------------------------------------------
// Waterfall terms
// ---------------------------------------------------------------------------

/// The two capital classes sharing deal equity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalClass {
    Investor,
    Sponsor,
}

/// Economic terms of one capital class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassTerms {
    /// Fraction of total equity contributed
    pub contribution_share: Rate,
    /// Annual preferred return on contributed capital
    pub preferred_return: Rate,
    /// Fraction of residual cash after preferred returns and capital
    pub profit_share: Rate,
}

/// Investor and sponsor terms. Preferred returns are drawn investor first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallTerms {
    pub investor: ClassTerms,
    pub sponsor: ClassTerms,
}

impl WaterfallTerms {
    /// Investor terms with the sponsor taking the complement of capital and
    /// profit at the same preferred rate. Contribution is capped at 100%.
    pub fn investor_sponsor(contribution: Rate, preferred_return: Rate, profit_share: Rate) -> Self {
        let contribution = contribution.min(Decimal::ONE);
        WaterfallTerms {
            investor: ClassTerms {
                contribution_share: contribution,
                preferred_return,
                profit_share,
            },
            sponsor: ClassTerms {
                contribution_share: Decimal::ONE - contribution,
                preferred_return,
                profit_share: Decimal::ONE - profit_share,
            },
        }
    }

    /// Classes in order of payment priority.
    pub fn classes(&self) -> [(CapitalClass, &ClassTerms); 2] {
        [
            (CapitalClass::Investor, &self.investor),
            (CapitalClass::Sponsor, &self.sponsor),
        ]
    }

    /// Reset the investor contribution and give the sponsor the remainder.
    pub fn set_investor_contribution(&mut self, contribution: Rate) {
        let contribution = contribution.min(Decimal::ONE);
        self.investor.contribution_share = contribution;
        self.sponsor.contribution_share = Decimal::ONE - contribution;
    }

    /// Cap an over-allocated investor contribution at 100%, leaving the
    /// sponsor nothing. Shares at or below 1 are untouched.
    pub fn clamp_investor_contribution(&mut self) {
        if self.investor.contribution_share > Decimal::ONE {
            self.set_investor_contribution(Decimal::ONE);
        }
    }

    /// Reset the investor profit share and give the sponsor the remainder.
    pub fn set_investor_profit_share(&mut self, profit_share: Rate) {
        self.investor.profit_share = profit_share;
        self.sponsor.profit_share = Decimal::ONE - profit_share;
    }
}

// ---------------------------------------------------------------------------
// Full deal
// ---------------------------------------------------------------------------

/// Complete deal record: property plus depreciation and equity waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAssumptions {
    #[serde(flatten)]
    pub property: PropertyAssumptions,
    /// Straight-line depreciable life of the building in years
    pub depreciable_life: Years,
    pub waterfall: WaterfallTerms,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require_fraction(field: &str, value: Rate) -> DealAnalyzerResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(DealAnalyzerError::invalid(
            field,
            format!("Must be between 0 and 1, got {value}"),
        ));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: Decimal) -> DealAnalyzerResult<()> {
    if value < Decimal::ZERO {
        return Err(DealAnalyzerError::invalid(
            field,
            format!("Must not be negative, got {value}"),
        ));
    }
    Ok(())
}

/// Validate inputs shared by property and deal analyses.
pub fn validate_property(input: &PropertyAssumptions) -> DealAnalyzerResult<()> {
    if input.holding_period_years < 1 {
        return Err(DealAnalyzerError::invalid(
            "holding_period_years",
            "Holding period must be at least 1 year",
        ));
    }
    if input.amortization_years < 1 {
        return Err(DealAnalyzerError::invalid(
            "amortization_years",
            "Amortization period must be at least 1 year",
        ));
    }
    if input.purchase_price <= Decimal::ZERO {
        return Err(DealAnalyzerError::invalid(
            "purchase_price",
            "Purchase price must be positive",
        ));
    }
    if input.sell_cap_rate <= Decimal::ZERO || input.sell_cap_rate > Decimal::ONE {
        return Err(DealAnalyzerError::invalid(
            "sell_cap_rate",
            format!("Sale cap rate must be in (0, 1], got {}", input.sell_cap_rate),
        ));
    }
    if input.annual_growth <= dec!(-1) {
        return Err(DealAnalyzerError::invalid(
            "annual_growth",
            "Growth must be greater than -100%",
        ));
    }

    require_non_negative("land_value", input.land_value)?;
    require_non_negative("rentable_sf", input.rentable_sf)?;
    require_non_negative("improvement_cost_per_sf", input.improvement_cost_per_sf)?;
    require_non_negative("closing_costs", input.closing_costs)?;
    require_non_negative("debt_share", input.debt_share)?;
    require_fraction("interest_rate", input.interest_rate)?;
    require_non_negative("operating_expenses_per_unit", input.operating_expenses_per_unit)?;
    require_non_negative("capital_reserves_per_unit", input.capital_reserves_per_unit)?;
    require_fraction("real_estate_tax_rate", input.real_estate_tax_rate)?;
    require_fraction("income_tax_rate", input.income_tax_rate)?;

    match &input.rent_roll {
        RentRoll::Seasonal(s) => {
            require_non_negative("monthly_school_rent", s.monthly_school_rent)?;
            require_non_negative("daily_summer_rent", s.daily_summer_rent)?;
            require_non_negative("school_year_months", s.school_year_months)?;
            require_non_negative("summer_months", s.summer_months)?;
            require_fraction("school_year_occupancy_rate", s.school_year_occupancy_rate)?;
            require_fraction("summer_occupancy_rate", s.summer_occupancy_rate)?;
        }
        RentRoll::Stated {
            gross_rent_roll,
            vacancy_rate,
        } => {
            require_non_negative("gross_rent_roll", *gross_rent_roll)?;
            require_fraction("vacancy_rate", *vacancy_rate)?;
        }
    }

    Ok(())
}

/// Validate waterfall terms: each share a fraction, shares summing to 1.
pub fn validate_waterfall(terms: &WaterfallTerms) -> DealAnalyzerResult<()> {
    for (class, t) in terms.classes() {
        let prefix = match class {
            CapitalClass::Investor => "investor",
            CapitalClass::Sponsor => "sponsor",
        };
        require_fraction(&format!("{prefix}.contribution_share"), t.contribution_share)?;
        require_fraction(&format!("{prefix}.profit_share"), t.profit_share)?;
        require_non_negative(&format!("{prefix}.preferred_return"), t.preferred_return)?;
    }

    let contribution_total = terms.investor.contribution_share + terms.sponsor.contribution_share;
    if (contribution_total - Decimal::ONE).abs() > SHARE_TOLERANCE {
        return Err(DealAnalyzerError::invalid(
            "waterfall.contribution_share",
            format!("Investor and sponsor contributions must sum to 1, got {contribution_total}"),
        ));
    }

    let profit_total = terms.investor.profit_share + terms.sponsor.profit_share;
    if (profit_total - Decimal::ONE).abs() > SHARE_TOLERANCE {
        return Err(DealAnalyzerError::invalid(
            "waterfall.profit_share",
            format!("Investor and sponsor profit shares must sum to 1, got {profit_total}"),
        ));
    }

    Ok(())
}

/// Validate a full deal record.
pub fn validate_deal(input: &DealAssumptions) -> DealAnalyzerResult<()> {
    validate_property(&input.property)?;
    if input.depreciable_life <= Decimal::ZERO {
        return Err(DealAnalyzerError::invalid(
            "depreciable_life",
            "Depreciable life must be positive",
        ));
    }
    validate_waterfall(&input.waterfall)
}
