//! Net present value and internal rate of return.
//!
//! Cashflow `t` (0-based) is discounted by `Π_{k=1..t} 1/(1+rate[k])`, so the
//! first cashflow is never discounted and a scalar rate gives the usual
//! `Σ cf_t / (1+r)^t`. The internal rate of return is found with a
//! one-dimensional Nelder-Mead search on the squared residual.

use super::Invocation;
use crate::column::TypedColumn;
use crate::expression::broadcast::Broadcast;
use crate::expression::eval::EvalConfig;
use crate::expression::{ExpressionError, ExpressionResult};
use log::{debug, trace};

/// Inner simplex steps per major iteration
const SIMPLEX_STEPS: usize = 100;
const INITIAL_STEP: f64 = 0.1;

fn discounted(cashflows: &[f64], rate_at: impl Fn(usize) -> f64) -> f64 {
    let mut factor = 1.0;
    let mut total = 0.0;
    for (t, cashflow) in cashflows.iter().enumerate() {
        if t > 0 {
            factor /= 1.0 + rate_at(t);
        }
        total += cashflow * factor;
    }
    total
}

/// Present value of `cashflows` under a scalar rate or one rate per period
pub fn net_present_value(rates: &[f64], cashflows: &[f64]) -> ExpressionResult<f64> {
    let shape = Broadcast::new("npv", &[rates.len(), cashflows.len()])?;
    if let Some(rate) = rates.iter().find(|r| **r <= -1.0) {
        return Err(ExpressionError::domain(
            "npv",
            format!("rate {} is not greater than -1", rate),
        ));
    }
    Ok(discounted(cashflows, |t| rates[shape.index(0, t)]))
}

/// Minimize `f` over one variable starting from the simplex `{start, start + step}`
fn nelder_mead(f: impl Fn(f64) -> f64, start: f64, step: f64) -> (f64, f64) {
    let mut best = (start, f(start));
    let mut worst = (start + step, f(start + step));
    for _ in 0..SIMPLEX_STEPS {
        if worst.1 < best.1 {
            std::mem::swap(&mut best, &mut worst);
        }
        if (worst.0 - best.0).abs() <= 1e-12 * (1.0 + best.0.abs()) {
            break;
        }
        let reflected = 2.0 * best.0 - worst.0;
        let f_reflected = f(reflected);
        worst = if f_reflected < best.1 {
            let expanded = 3.0 * best.0 - 2.0 * worst.0;
            let f_expanded = f(expanded);
            if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            }
        } else if f_reflected < worst.1 {
            let contracted = best.0 + 0.5 * (reflected - best.0);
            let f_contracted = f(contracted);
            if f_contracted <= f_reflected {
                (contracted, f_contracted)
            } else {
                (reflected, f_reflected)
            }
        } else {
            // Inside contraction; in one dimension a shrink lands on the same point
            let contracted = best.0 + 0.5 * (worst.0 - best.0);
            (contracted, f(contracted))
        };
    }
    if worst.1 < best.1 {
        worst
    } else {
        best
    }
}

/// Rate `r` with `npv(r, cashflows) == cost`
pub fn internal_rate_of_return(
    cost: f64,
    cashflows: &[f64],
    config: &EvalConfig,
) -> ExpressionResult<f64> {
    if cashflows.is_empty() {
        return Err(ExpressionError::domain("irr", "no cashflows"));
    }
    let residual = |rate: f64| discounted(cashflows, |_| rate) - cost;
    let objective = |rate: f64| {
        if rate <= -1.0 || !rate.is_finite() {
            return f64::INFINITY;
        }
        let r = residual(rate);
        if r.is_finite() {
            r * r
        } else {
            f64::INFINITY
        }
    };
    let tolerance = config.irr_tolerance * cost.abs().max(1.0);

    let mut best = config.irr_initial_guess;
    let mut step = INITIAL_STEP;
    for iteration in 0..config.irr_max_iterations {
        let (candidate, value) = nelder_mead(&objective, best, step);
        if value < objective(best) {
            best = candidate;
        }
        let error = residual(best).abs();
        trace!("irr iteration {}: rate={} residual={}", iteration, best, error);
        if error <= tolerance {
            debug!("irr converged after {} iterations: {}", iteration + 1, best);
            return Ok(best);
        }
        // Restart with a wider simplex on alternating sides
        step = -step * 1.5;
    }
    let remaining = residual(best).abs();
    debug!("irr did not converge, residual {}", remaining);
    Err(ExpressionError::NoConvergence {
        function: "irr".to_string(),
        residual: remaining,
    })
}

/// `npv(rate, cashflows)`
pub fn npv(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let rates = invocation.floats(0)?;
    let cashflows = invocation.floats(1)?;
    net_present_value(&rates, &cashflows).map(TypedColumn::scalar_float)
}

/// `irr(cost, cashflows)`; `cost` may be a constant column
pub fn irr(invocation: &mut Invocation<'_, '_>) -> ExpressionResult<TypedColumn> {
    let cost = invocation.uniform(0)?;
    let cashflows = invocation.floats(1)?;
    internal_rate_of_return(cost, &cashflows, invocation.config).map(TypedColumn::scalar_float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::functions::testing::{call, floats};
    use crate::expression::ErrorCategory;

    #[test]
    fn test_npv_scalar_rate() {
        let value = net_present_value(&[0.1], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((value - 8.302778).abs() < 1e-4);
        assert_eq!(net_present_value(&[0.5], &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_npv_rate_per_period() {
        // rate[0] never applies
        let value = net_present_value(&[9.0, 1.0, 0.0], &[1.0, 2.0, 4.0]).unwrap();
        assert!((value - 4.0).abs() < 1e-12);
        assert!(net_present_value(&[0.1, 0.2], &[1.0, 2.0, 3.0]).is_err());
        let err = net_present_value(&[-1.0], &[1.0, 2.0]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Domain);
    }

    #[test]
    fn test_irr_solves_for_cost() {
        let config = EvalConfig::default();
        let rate = internal_rate_of_return(6.0, &[1.0, 2.0, 3.0, 4.0], &config).unwrap();
        assert!((rate - 0.316908).abs() < 1e-4);
        let back = net_present_value(&[rate], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((back - 6.0).abs() <= config.irr_tolerance * 6.0);
    }

    #[test]
    fn test_irr_negative_rate() {
        let config = EvalConfig::default();
        // 10 + 10/(1+r) == 25 at r = -1/3
        let rate = internal_rate_of_return(25.0, &[10.0, 10.0], &config).unwrap();
        assert!((rate + 1.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_irr_without_solution() {
        let config = EvalConfig::default();
        // Positive cashflows can never be worth less than the first one
        let err = internal_rate_of_return(-5.0, &[1.0, 1.0], &config).unwrap_err();
        assert!(matches!(err, ExpressionError::NoConvergence { .. }));
        assert_eq!(err.category(), ErrorCategory::Domain);
    }

    #[test]
    fn test_functions_return_scalars() {
        let cashflows = floats(&[1.0, 2.0, 3.0, 4.0]);
        let value = call("npv", npv, &[floats(&[0.1]), cashflows.clone()]).unwrap();
        assert_eq!(value.len(), 1);
        let rate = call("irr", irr, &[floats(&[6.0]), cashflows]).unwrap();
        assert!((rate.as_floats().unwrap()[0] - 0.316908).abs() < 1e-4);
    }

    #[test]
    fn test_irr_cost_from_constant_column() {
        let cashflows = floats(&[1.0, 2.0, 3.0, 4.0]);
        let rate = call("irr", irr, &[floats(&[6.0; 4]), cashflows.clone()]).unwrap();
        assert!((rate.as_floats().unwrap()[0] - 0.316908).abs() < 1e-4);

        let err = call("irr", irr, &[floats(&[6.0, 7.0]), cashflows.clone()]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Shape);
        let err = call("irr", irr, &[floats(&[]), cashflows]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Shape);
    }
}
