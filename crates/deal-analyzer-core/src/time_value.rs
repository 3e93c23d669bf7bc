use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::DealAnalyzerError;
use crate::types::{Money, Rate};
use crate::DealAnalyzerResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const STEP_THRESHOLD: Decimal = dec!(0.000000000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const IRR_FLOOR: Decimal = dec!(-0.99);
const BISECTION_FLOOR: Decimal = dec!(-0.9);
const IRR_CEILING: Decimal = dec!(100.0);

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> DealAnalyzerResult<Money> {
    if rate <= dec!(-1) {
        return Err(DealAnalyzerError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(DealAnalyzerError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV(r) = sum CF_t / (1+r)^t and its derivative d(NPV)/dr.
///
/// Returns `None` when the discount factors overflow (rates close to -100%
/// over long horizons).
fn npv_and_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        let pv = cf.checked_mul(discount)?;
        npv = npv.checked_add(pv)?;
        if t > 0 {
            // d/dr of CF_t / (1+r)^t = -t * CF_t / (1+r)^(t+1)
            let term = Decimal::from(t as i64)
                .checked_mul(pv)?
                .checked_div(one_plus_r)?;
            dnpv = dnpv.checked_sub(term)?;
        }
        discount = discount.checked_div(one_plus_r)?;
    }

    Some((npv, dnpv))
}

/// Internal Rate of Return.
///
/// Newton-Raphson from `guess`, falling back to bisection over
/// [-90%, 10 000%] when Newton stalls. The series must contain at least one
/// sign change; otherwise no real root exists and `InsufficientData` is
/// returned.
pub fn irr(cash_flows: &[Money], guess: Rate) -> DealAnalyzerResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(DealAnalyzerError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !(has_outflow && has_inflow) {
        return Err(DealAnalyzerError::InsufficientData(
            "IRR requires at least one sign change in the cash flows".into(),
        ));
    }

    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let Some((npv_val, dnpv)) = npv_and_derivative(cash_flows, rate) else {
            break;
        };

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }
        if dnpv.is_zero() {
            break;
        }

        let step = npv_val / dnpv;
        rate -= step;

        // Guard against divergence
        if rate < IRR_FLOOR {
            rate = IRR_FLOOR;
        } else if rate > IRR_CEILING {
            rate = IRR_CEILING;
        }

        if step.abs() < STEP_THRESHOLD {
            return Ok(rate);
        }
    }

    irr_bisection(cash_flows)
}

fn irr_bisection(cash_flows: &[Money]) -> DealAnalyzerResult<Rate> {
    let failure = |last_delta: Decimal| DealAnalyzerError::ConvergenceFailure {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS + MAX_BISECTION_ITERATIONS,
        last_delta,
    };
    let npv_at = |rate: Rate| {
        npv_and_derivative(cash_flows, rate)
            .map(|(v, _)| v)
            .ok_or_else(|| failure(Decimal::MAX))
    };

    let mut lo = BISECTION_FLOOR;
    let mut hi = IRR_CEILING;
    let mut npv_lo = npv_at(lo)?;
    let npv_hi = npv_at(hi)?;

    if npv_lo.is_sign_negative() == npv_hi.is_sign_negative() {
        return Err(failure(npv_lo));
    }

    let mut npv_mid = npv_lo;
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        npv_mid = npv_at(mid)?;
        if npv_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo) < STEP_THRESHOLD {
            return Ok(mid);
        }
        if npv_mid.is_sign_negative() == npv_lo.is_sign_negative() {
            lo = mid;
            npv_lo = npv_mid;
        } else {
            hi = mid;
        }
    }

    Err(failure(npv_mid))
}

/// `(1 + rate)^nper`, or an overflow error.
fn compound_factor(rate: Rate, nper: u32, context: &str) -> DealAnalyzerResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powu(u64::from(nper))
        .ok_or_else(|| DealAnalyzerError::overflow(context))
}

/// Present Value
pub fn pv(rate: Rate, nper: u32, pmt: Money, fv: Money) -> DealAnalyzerResult<Money> {
    if rate.is_zero() {
        return Ok(-(pmt * Decimal::from(nper) + fv));
    }

    let factor = compound_factor(rate, nper, "PV factor")?;

    if factor.is_zero() {
        return Err(DealAnalyzerError::DivisionByZero {
            context: "PV factor".into(),
        });
    }

    let annuity_factor = (Decimal::ONE - Decimal::ONE / factor) / rate;
    Ok(-(pmt * annuity_factor + fv / factor))
}

/// Future Value
pub fn fv(rate: Rate, nper: u32, pmt: Money, present_value: Money) -> DealAnalyzerResult<Money> {
    if rate.is_zero() {
        return Ok(-(present_value + pmt * Decimal::from(nper)));
    }

    let factor = compound_factor(rate, nper, "FV factor")?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    present_value
        .checked_mul(factor)
        .zip(pmt.checked_mul(annuity_factor))
        .and_then(|(grown, annuity)| grown.checked_add(annuity))
        .map(|total| -total)
        .ok_or_else(|| DealAnalyzerError::overflow("FV"))
}

/// Payment (PMT). Negative for a positive present value (cash outflow).
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> DealAnalyzerResult<Money> {
    if nper == 0 {
        return Err(DealAnalyzerError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let factor = compound_factor(rate, nper, "PMT factor")?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    if annuity_factor.is_zero() {
        return Err(DealAnalyzerError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    let owed = present_value
        .checked_mul(factor)
        .and_then(|grown| grown.checked_add(future_value))
        .ok_or_else(|| DealAnalyzerError::overflow("PMT"))?;
    Ok(-owed / annuity_factor)
}

fn check_period(per: u32, nper: u32) -> DealAnalyzerResult<()> {
    if per == 0 || per > nper {
        return Err(DealAnalyzerError::InvalidInput {
            field: "per".into(),
            reason: format!("Period must be within 1..={nper}, got {per}"),
        });
    }
    Ok(())
}

/// Interest portion of payment `per` (1-based) of a level-payment loan.
pub fn ipmt(rate: Rate, per: u32, nper: u32, present_value: Money) -> DealAnalyzerResult<Money> {
    check_period(per, nper)?;
    let payment = pmt(rate, nper, present_value, Decimal::ZERO)?;
    // fv after per-1 payments is the negated opening balance of period `per`
    Ok(fv(rate, per - 1, payment, present_value)? * rate)
}

/// Principal portion of payment `per` (1-based) of a level-payment loan.
pub fn ppmt(rate: Rate, per: u32, nper: u32, present_value: Money) -> DealAnalyzerResult<Money> {
    let payment = pmt(rate, nper, present_value, Decimal::ZERO)?;
    Ok(payment - ipmt(rate, per, nper, present_value)?)
}

/// Principal repaid over periods `1..=through`, as a positive amount.
pub fn cumulative_principal(
    rate: Rate,
    through: u32,
    nper: u32,
    present_value: Money,
) -> DealAnalyzerResult<Money> {
    let mut total = Decimal::ZERO;
    for per in 1..=through.min(nper) {
        total += ppmt(rate, per, nper, present_value)?;
    }
    Ok(-total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_round_trip() {
        // Level annuity priced at 12%: Y = X * r / (1 - (1+r)^-3)
        let r = dec!(0.12);
        let x = dec!(250000);
        let factor = (Decimal::ONE + r).powu(3);
        let y = x * r / (Decimal::ONE - Decimal::ONE / factor);
        let result = irr(&[-x, y, y, y], dec!(0.10)).unwrap();
        assert!((result - r).abs() < dec!(0.000001), "irr={result}");
    }

    #[test]
    fn test_irr_high_rate_from_low_guess() {
        // Short hold with a large exit: IRR well above 100%
        let cfs = vec![dec!(-100), dec!(10), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        let check = npv(result, &cfs).unwrap();
        assert!(check.abs() < dec!(0.0001), "npv at irr={check}");
        assert!(result > Decimal::ONE);
    }

    #[test]
    fn test_irr_requires_sign_change() {
        let cfs = vec![dec!(100), dec!(50), dec!(50)];
        match irr(&cfs, dec!(0.10)) {
            Err(DealAnalyzerError::InsufficientData(_)) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn test_irr_requires_two_flows() {
        assert!(irr(&[dec!(-100)], dec!(0.10)).is_err());
    }

    #[test]
    fn test_pv_basic() {
        let result = pv(dec!(0.08), 10, dec!(-100), dec!(0)).unwrap();
        // PV of annuity: 100 * (1 - 1/1.08^10) / 0.08 = ~671
        assert!((result - dec!(671)).abs() < dec!(2.0));
    }

    #[test]
    fn test_pmt_mortgage_sign_convention() {
        // 300k over 30 years at 6% => ~1798.65 / month, returned as outflow
        let result = pmt(dec!(0.06) / dec!(12), 360, dec!(300000), Decimal::ZERO).unwrap();
        assert!(result < Decimal::ZERO);
        assert!((result + dec!(1798.65)).abs() < dec!(0.01), "pmt={result}");
    }

    #[test]
    fn test_pmt_overflow_is_an_error() {
        match pmt(dec!(5), 360, dec!(1000000), Decimal::ZERO) {
            Err(DealAnalyzerError::Overflow { context }) => assert_eq!(context, "PMT factor"),
            other => panic!("Expected Overflow, got {other:?}"),
        }
        assert!(fv(dec!(5), 360, dec!(-100), dec!(1000)).is_err());
        assert!(pv(dec!(5), 360, dec!(-100), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_pmt_zero_periods() {
        assert!(pmt(dec!(0.01), 0, dec!(1000), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_first_period_interest() {
        let rate = dec!(0.005);
        let result = ipmt(rate, 1, 120, dec!(100000)).unwrap();
        assert_eq!(result, dec!(-500));
    }

    #[test]
    fn test_ppmt_plus_ipmt_is_payment() {
        let rate = dec!(0.0425) / dec!(12);
        let payment = pmt(rate, 300, dec!(1012162.5), Decimal::ZERO).unwrap();
        for per in [1, 12, 60, 299, 300] {
            let p = ppmt(rate, per, 300, dec!(1012162.5)).unwrap();
            let i = ipmt(rate, per, 300, dec!(1012162.5)).unwrap();
            assert!((p + i - payment).abs() < dec!(0.000001));
        }
    }

    #[test]
    fn test_ppmt_out_of_range() {
        assert!(ppmt(dec!(0.01), 0, 12, dec!(1000)).is_err());
        assert!(ppmt(dec!(0.01), 13, 12, dec!(1000)).is_err());
    }

    #[test]
    fn test_cumulative_principal_full_term_repays_loan() {
        let rate = dec!(0.05) / dec!(12);
        let paid = cumulative_principal(rate, 120, 120, dec!(50000)).unwrap();
        assert!((paid - dec!(50000)).abs() < dec!(0.0001), "paid={paid}");
    }

    #[test]
    fn test_amortization_principal_plus_interest_equals_payments() {
        let rate = dec!(0.0425) / dec!(12);
        let principal = dec!(750000);
        let nper = 300;
        let payment = -pmt(rate, nper, principal, Decimal::ZERO).unwrap();

        // Synthetic monthly schedule
        let mut balance = principal;
        let mut total_interest = Decimal::ZERO;
        let mut total_principal = Decimal::ZERO;
        for _ in 0..nper {
            let interest = balance * rate;
            let repaid = payment - interest;
            balance -= repaid;
            total_interest += interest;
            total_principal += repaid;
        }
        let total_paid = payment * Decimal::from(nper);
        assert!((total_principal + total_interest - total_paid).abs() < dec!(0.0001));
        assert!(balance.abs() < dec!(0.0001), "balance={balance}");

        let via_ppmt = cumulative_principal(rate, 60, nper, principal).unwrap();
        let mut schedule_balance = principal;
        for _ in 0..60 {
            schedule_balance -= payment - schedule_balance * rate;
        }
        assert!((principal - via_ppmt - schedule_balance).abs() < dec!(0.0001));
    }
}
