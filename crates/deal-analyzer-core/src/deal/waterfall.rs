use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::assumptions::{CapitalClass, DealAssumptions, WaterfallTerms};
use super::financing::DerivedFinancing;
use super::operations::FirstYearOperatingStatement;
use super::sale::{project_operations, settle_sale, SaleSummary};
use crate::time_value::irr;
use crate::types::{Money, Rate};
use crate::DealAnalyzerResult;

/// Starting point for every IRR solve in the pro-forma.
pub const IRR_GUESS: Rate = dec!(0.10);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Year-by-year allocation to one capital class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub class: CapitalClass,
    pub contribution: Money,
    /// Preferred return owed each year
    pub preferred_target: Money,
    pub preferred_return: Vec<Money>,
    pub return_of_capital: Vec<Money>,
    pub residual_share: Vec<Money>,
    /// Unpaid preferred return summed over the hold (not carried forward)
    pub preferred_shortfall: Money,
    /// Outlay followed by yearly distributions
    pub cash_flows: Vec<Money>,
    pub irr: Rate,
    /// Sum of the cash-flow series, outlay included
    pub total_cash_out: Money,
    /// Distributions over contribution
    pub equity_multiple: Decimal,
}

impl ClassDistribution {
    /// Distribution in year `year` (1-based).
    pub fn distribution(&self, year: usize) -> Money {
        self.cash_flows.get(year).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Multi-year result of the deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waterfall {
    pub net_operating_income: Vec<Money>,
    pub cash_flow_after_financing: Vec<Money>,
    pub sale: SaleSummary,
    /// Equity outlay followed by yearly deal distributions
    pub cash_flows: Vec<Money>,
    pub deal_irr: Rate,
    pub investor: ClassDistribution,
    pub sponsor: ClassDistribution,
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

struct Allocation {
    class: CapitalClass,
    contribution: Money,
    preferred_target: Money,
    profit_share: Rate,
    preferred_return: Vec<Money>,
    return_of_capital: Vec<Money>,
    preferred_shortfall: Money,
}

/// Split deal distributions between the classes.
///
/// Preferred returns come out of each year's operating cash flow, earlier
/// classes drawing first. Capital comes back in the final year only. Whatever
/// the deal distributes beyond preferred returns and capital is split by
/// profit share, so the classes always sum to the deal.
pub fn distribute(
    terms: &WaterfallTerms,
    equity: Money,
    cash_flow_after_financing: &[Money],
    deal_cash_flows: &[Money],
) -> DealAnalyzerResult<(ClassDistribution, ClassDistribution)> {
    let years = cash_flow_after_financing.len();

    let mut allocations: [Allocation; 2] = terms.classes().map(|(class, t)| {
        let contribution = equity * t.contribution_share;
        Allocation {
            class,
            contribution,
            preferred_target: contribution * t.preferred_return,
            profit_share: t.profit_share,
            preferred_return: Vec::with_capacity(years),
            return_of_capital: Vec::with_capacity(years),
            preferred_shortfall: Decimal::ZERO,
        }
    });

    for (year, cfaf) in cash_flow_after_financing.iter().enumerate() {
        let final_year = year + 1 == years;
        let mut drawn = Decimal::ZERO;
        for a in allocations.iter_mut() {
            let available = (*cfaf - drawn).max(Decimal::ZERO);
            let paid = a.preferred_target.min(available);
            drawn += paid;
            a.preferred_shortfall += a.preferred_target - paid;
            a.preferred_return.push(paid);
            a.return_of_capital.push(if final_year {
                a.contribution
            } else {
                Decimal::ZERO
            });
        }
    }

    let mut residual = Vec::with_capacity(years);
    for year in 0..years {
        let deal_distribution = deal_cash_flows.get(year + 1).copied().unwrap_or(Decimal::ZERO);
        let claimed: Money = allocations
            .iter()
            .map(|a| a.preferred_return[year] + a.return_of_capital[year])
            .sum();
        residual.push(deal_distribution - claimed);
    }

    let [investor, sponsor] = allocations;
    Ok((finish_class(investor, &residual)?, finish_class(sponsor, &residual)?))
}

fn finish_class(a: Allocation, residual: &[Money]) -> DealAnalyzerResult<ClassDistribution> {
    let residual_share: Vec<Money> = residual.iter().map(|r| *r * a.profit_share).collect();

    let mut cash_flows = Vec::with_capacity(residual.len() + 1);
    cash_flows.push(-a.contribution);
    for year in 0..residual.len() {
        cash_flows.push(a.preferred_return[year] + residual_share[year] + a.return_of_capital[year]);
    }

    let irr = irr(&cash_flows, IRR_GUESS)?;
    let total_cash_out: Money = cash_flows.iter().sum();
    let distributed: Money = cash_flows.iter().skip(1).sum();
    let equity_multiple = if a.contribution.is_zero() {
        Decimal::ZERO
    } else {
        distributed / a.contribution
    };

    Ok(ClassDistribution {
        class: a.class,
        contribution: a.contribution,
        preferred_target: a.preferred_target,
        preferred_return: a.preferred_return,
        return_of_capital: a.return_of_capital,
        residual_share,
        preferred_shortfall: a.preferred_shortfall,
        cash_flows,
        irr,
        total_cash_out,
        equity_multiple,
    })
}

// ---------------------------------------------------------------------------
// Pipeline stages 3-9
// ---------------------------------------------------------------------------

/// Project the hold, sell, and run the waterfall.
pub fn build_waterfall(
    deal: &DealAssumptions,
    financing: &DerivedFinancing,
    first_year: &FirstYearOperatingStatement,
) -> DealAnalyzerResult<Waterfall> {
    let property = &deal.property;
    let projection =
        project_operations(first_year, property.annual_growth, property.holding_period_years)?;
    let sale = settle_sale(property, deal.depreciable_life, financing, &projection)?;

    let mut cash_flows = Vec::with_capacity(projection.cash_flow_after_financing.len() + 1);
    cash_flows.push(-financing.equity_investment);
    cash_flows.extend(projection.cash_flow_after_financing.iter().copied());
    if let Some(last) = cash_flows.last_mut() {
        *last += sale.net_cash_from_sale;
    }

    let deal_irr = irr(&cash_flows, IRR_GUESS)?;
    let (investor, sponsor) = distribute(
        &deal.waterfall,
        financing.equity_investment,
        &projection.cash_flow_after_financing,
        &cash_flows,
    )?;

    Ok(Waterfall {
        net_operating_income: projection.net_operating_income,
        cash_flow_after_financing: projection.cash_flow_after_financing,
        sale,
        cash_flows,
        deal_irr,
        investor,
        sponsor,
    })
}
