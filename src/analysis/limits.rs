//! One-sided limits.
//!
//! Rational functions of `x` at `±∞` are decided exactly by degree and leading
//! coefficients. Everything else is found by numeric approach: the function is sampled along a geometric sequence tending to the target: `a ± h0*10^-k`
//! for a finite point, `±10^k` towards infinity. The tail of the sequence is then
//! classified:
//! - differences below the noise floor: the last value is the limit;
//! - monotone tail whose steps never shrink: divergence in the direction of the steps;
//! - monotone tail with geometrically shrinking steps: the geometric series is summed and
//!   the sum is taken as the limit;
//! - anything else (oscillation, NaN, steps that shrink and then grow): undefined.
//!
//! Finite limits are mapped back to exact form with a tolerance slightly looser than the
//! default one; a limit lost in the noise of the sampled values is zero.
use crate::analysis::real_set::ExactValue;
use crate::symbolic::nsimplify::nsimplify;
use crate::symbolic::polynomial::Poly;
use crate::symbolic::symbolic_engine::{Expr, VAR};
use num::Signed;
use num::traits::CheckedDiv;
use std::cmp::Ordering;
use std::fmt;

const STEPS: i32 = 9;
const NOISE: f64 = 1e-10;
const LIMIT_TOLERANCE: f64 = 1e-9;

/// Direction of approach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Approach {
    /// from below towards `a`
    Left(f64),
    /// from above towards `a`
    Right(f64),
    PosInfinity,
    NegInfinity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LimitValue {
    Finite(ExactValue),
    PosInfinity,
    NegInfinity,
    Undefined,
}

impl LimitValue {
    pub fn value(&self) -> f64 {
        match self {
            LimitValue::Finite(v) => v.value,
            LimitValue::PosInfinity => f64::INFINITY,
            LimitValue::NegInfinity => f64::NEG_INFINITY,
            LimitValue::Undefined => f64::NAN,
        }
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LimitValue::Finite(v) => write!(f, "{}", v),
            LimitValue::PosInfinity => write!(f, "∞"),
            LimitValue::NegInfinity => write!(f, "-∞"),
            LimitValue::Undefined => write!(f, "undefined"),
        }
    }
}

/// Points of the approach sequence. `reach` bounds how far from a finite target the
/// first sample may be (half of it is used), so that the sequence stays inside the
/// interval being examined.
fn approach_points(approach: Approach, reach: f64) -> Vec<f64> {
    match approach {
        Approach::Left(a) | Approach::Right(a) => {
            let mut h0 = 0.1 * a.abs().max(1.0);
            if reach.is_finite() && reach > 0.0 {
                h0 = h0.min(reach / 2.0);
            }
            let sign = if matches!(approach, Approach::Left(_)) { -1.0 } else { 1.0 };
            (0..STEPS).map(|k| a + sign * h0 * 10f64.powi(-k)).collect()
        }
        Approach::PosInfinity => (1..=STEPS).map(|k| 10f64.powi(k)).collect(),
        Approach::NegInfinity => (1..=STEPS).map(|k| -(10f64.powi(k))).collect(),
    }
}

/// Limit of `expr` along `approach`.
pub fn limit(expr: &Expr, approach: Approach, reach: f64) -> LimitValue {
    if matches!(approach, Approach::PosInfinity | Approach::NegInfinity) {
        if let Some(value) = rational_at_infinity(expr, approach) {
            return value;
        }
    }
    let values: Vec<f64> = approach_points(approach, reach)
        .into_iter()
        .map(|x| expr.eval(VAR, x))
        .collect();
    classify(&values)
}

/// `p(x)/q(x)` at `±∞`: compare degrees, then the leading coefficients
fn rational_at_infinity(expr: &Expr, approach: Approach) -> Option<LimitValue> {
    let (num, den) = expr.together();
    let num = Poly::from_expr(&num, VAR)?;
    let den = Poly::from_expr(&den, VAR)?;
    if den.is_zero() {
        return None;
    }
    if num.is_zero() {
        return Some(LimitValue::Finite(ExactValue::new(Expr::int(0))));
    }
    let (p, q) = (num.degree(), den.degree());
    let value = match p.cmp(&q) {
        Ordering::Less => LimitValue::Finite(ExactValue::new(Expr::int(0))),
        Ordering::Equal => {
            let ratio = num.leading().checked_div(&den.leading())?;
            LimitValue::Finite(ExactValue::new(Expr::Num(ratio)))
        }
        Ordering::Greater => {
            let mut positive = num.leading().is_positive() == den.leading().is_positive();
            if approach == Approach::NegInfinity && (p - q) % 2 == 1 {
                positive = !positive;
            }
            if positive {
                LimitValue::PosInfinity
            } else {
                LimitValue::NegInfinity
            }
        }
    };
    Some(value)
}

fn classify(values: &[f64]) -> LimitValue {
    let Some(&last) = values.last() else {
        return LimitValue::Undefined;
    };
    if last.is_infinite() {
        return if last > 0.0 {
            LimitValue::PosInfinity
        } else {
            LimitValue::NegInfinity
        };
    }
    if values.iter().any(|v| !v.is_finite()) {
        return LimitValue::Undefined;
    }
    let magnitude = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &diffs[diffs.len().saturating_sub(4)..];
    let scale = last.abs().max(1.0);
    if tail[1..].iter().all(|d| d.abs() <= NOISE * scale) {
        return finite(last, magnitude);
    }
    let increasing = tail.iter().all(|&d| d > 0.0);
    let decreasing = tail.iter().all(|&d| d < 0.0);
    if !increasing && !decreasing {
        return LimitValue::Undefined;
    }
    let ratios: Vec<f64> = tail.windows(2).map(|w| w[1] / w[0]).collect();
    let ratio = ratios[ratios.len() - 1];
    if ratio < 0.5 {
        let step = tail[tail.len() - 1];
        return finite(last + step * ratio / (1.0 - ratio), magnitude);
    }
    if ratios.iter().all(|&r| r >= 0.5) {
        if increasing {
            LimitValue::PosInfinity
        } else {
            LimitValue::NegInfinity
        }
    } else {
        LimitValue::Undefined
    }
}

/// `magnitude` is the largest sampled value, the yardstick for "indistinguishable from 0"
fn finite(value: f64, magnitude: f64) -> LimitValue {
    if value.abs() <= LIMIT_TOLERANCE * magnitude {
        return LimitValue::Finite(ExactValue::new(Expr::int(0)));
    }
    LimitValue::Finite(ExactValue::new(nsimplify(value, LIMIT_TOLERANCE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lim(text: &str, approach: Approach) -> LimitValue {
        let e = Expr::parse_expression(text).unwrap().simplify();
        limit(&e, approach, f64::INFINITY)
    }

    #[test]
    fn test_poles() {
        assert_eq!(lim("1/x", Approach::Right(0.0)), LimitValue::PosInfinity);
        assert_eq!(lim("1/x", Approach::Left(0.0)), LimitValue::NegInfinity);
        assert_eq!(lim("1/x**2", Approach::Left(0.0)), LimitValue::PosInfinity);
        assert_eq!(lim("log(x)", Approach::Right(0.0)), LimitValue::NegInfinity);
    }

    #[test]
    fn test_at_infinity() {
        assert_eq!(lim("1/x", Approach::PosInfinity).to_string(), "0");
        assert_eq!(lim("x**2 - 4", Approach::NegInfinity), LimitValue::PosInfinity);
        assert_eq!(lim("exp(x)", Approach::PosInfinity), LimitValue::PosInfinity);
        assert_eq!(lim("exp(x)", Approach::NegInfinity).to_string(), "0");
        assert_eq!(lim("sqrt(x)", Approach::PosInfinity), LimitValue::PosInfinity);
    }

    #[test]
    fn test_exact_recovery() {
        assert_eq!(lim("atan(x)", Approach::PosInfinity).to_string(), "pi/2");
        assert_eq!(lim("atan(x)", Approach::NegInfinity).to_string(), "-pi/2");
        assert_eq!(lim("sin(x)/x", Approach::Right(0.0)).to_string(), "1");
        assert_eq!(lim("(2*x + 1)/(x - 3)", Approach::PosInfinity).to_string(), "2");
    }

    #[test]
    fn test_polynomials_at_infinity_follow_the_leading_term() {
        // the numeric tail of this one is still falling at x = 1e9
        assert_eq!(lim("x**2 - 5000000000*x", Approach::PosInfinity), LimitValue::PosInfinity);
        assert_eq!(lim("x**2 - 5000000000*x", Approach::NegInfinity), LimitValue::PosInfinity);
        assert_eq!(lim("3000000000 - x**3", Approach::NegInfinity), LimitValue::PosInfinity);
        assert_eq!(lim("(x**2 + 1)/(3*x**2 - x)", Approach::NegInfinity).to_string(), "1/3");
        assert_eq!(lim("(1 - x**3)/(x + 2)", Approach::PosInfinity), LimitValue::NegInfinity);
        assert_eq!(lim("x/(x**2 + 1)", Approach::NegInfinity).to_string(), "0");
    }

    #[test]
    fn test_steps_that_shrink_then_grow_are_undefined() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 5.1, 5.6, 6.6];
        assert_eq!(classify(&values), LimitValue::Undefined);
        let values = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0, 256.0];
        assert_eq!(classify(&values), LimitValue::PosInfinity);
    }

    #[test]
    fn test_continuous_point() {
        let v = lim("x + 2", Approach::Left(1.0));
        assert_relative_eq!(v.value(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_oscillation_is_undefined() {
        assert_eq!(lim("sin(x)", Approach::PosInfinity), LimitValue::Undefined);
    }

    #[test]
    fn test_reach_keeps_samples_inside() {
        let points = approach_points(Approach::Right(0.0), 0.01);
        assert!(points.iter().all(|&x| x > 0.0 && x <= 0.005));
    }
}
