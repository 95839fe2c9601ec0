//! Image of a function over its domain.
//!
//! For a function continuous on each piece of the domain, the image of a piece is spanned
//! by the values at its closed ends, at the interior critical points (`f' = 0` and points
//! where `f'` is undefined) and by the one-sided limits at open or infinite ends. The
//! smallest and largest of these bound the image; a bound is closed when it is attained.
//!
//! Periodic functions are examined over one period. `Piecewise`, `Max` and `Min` at the top
//! level are handled branch by branch.
use crate::analysis::limits::{Approach, LimitValue, limit};
use crate::analysis::real_set::{Bound, ExactValue, Interval, RealSet, same_point};
use crate::analysis::solveset::{SolveOutcome, Unsolved, condition_region, solve_equation, zero_set};
use crate::symbolic::symbolic_engine::{Condition, Expr, Func, Number, Relation, VAR};
use crate::symbolic::symbolic_engine_derivatives::extremum_as_piecewise;
use crate::symbolic::polynomial::Poly;
use log::debug;
use num::Integer;
use num::rational::Rational64;

/// Image of `expr` over `domain`.
pub fn function_range(expr: &Expr, domain: &RealSet) -> Result<RealSet, String> {
    if domain.is_empty() {
        return Ok(RealSet::empty());
    }
    if !expr.contains_variable(VAR) {
        let value = ExactValue::exact(expr);
        if !value.is_finite() {
            debug!("{} takes no real value", expr);
            return Ok(RealSet::empty());
        }
        return Ok(RealSet::points(vec![value]));
    }
    match expr {
        Expr::Piecewise(branches) => return piecewise_range(branches, domain),
        Expr::Max(args) => return function_range(&extremum_as_piecewise(args, Relation::Ge), domain),
        Expr::Min(args) => return function_range(&extremum_as_piecewise(args, Relation::Le), domain),
        _ => {}
    }
    if expr.contains_piecewise() {
        return Err(format!("{} has a nested piecewise part", expr));
    }
    if expr.contains_func(&|f| matches!(f, Func::Floor | Func::Ceiling)) {
        return Err(format!("{} is a step function", expr));
    }
    let domain = match period(expr, domain) {
        Some(p) => {
            debug!("{} is periodic with period {}", expr, p);
            domain.restrict(&ExactValue::new(Expr::int(0)), &p)
        }
        None if !domain.holes().is_empty() => {
            return Err(format!(
                "{} is not periodic and its domain has infinitely many gaps",
                expr
            ));
        }
        None => domain.clone(),
    };
    let derivative = expr.diff(VAR).simplify();
    let mut image = Vec::new();
    for piece in domain.intervals() {
        image.push(piece_image(expr, &derivative, piece)?);
    }
    Ok(RealSet::from_intervals(image))
}

fn piecewise_range(branches: &[(Expr, Condition)], domain: &RealSet) -> Result<RealSet, String> {
    let mut covered = RealSet::empty();
    let mut image = RealSet::empty();
    for (value, cond) in branches {
        let region = condition_region(cond)?;
        let active = region.intersect(&covered.complement()).intersect(domain);
        covered = covered.union(&region);
        image = image.union(&function_range(value, &active)?);
    }
    Ok(image)
}

/// Common period of the trigonometric parts, when every one of them has a linear argument
/// and the whole expression repeats with it.
fn period(expr: &Expr, domain: &RealSet) -> Option<ExactValue> {
    let mut multiples: Vec<Rational64> = Vec::new();
    collect_periods(expr, &mut multiples)?;
    let first = *multiples.first()?;
    let lcm = multiples.iter().skip(1).fold(first, |acc, q| {
        Rational64::new(acc.numer().lcm(q.numer()), acc.denom().gcd(q.denom()))
    });
    let p = ExactValue::new(Expr::product(Number::Exact(lcm), vec![Expr::Pi]));
    let repeats = [-2.7, -0.9, 0.35, 1.3, 2.2].iter().all(|&t| {
        if !domain.contains(t) {
            return true;
        }
        let (a, b) = (expr.eval(VAR, t), expr.eval(VAR, t + p.value));
        !a.is_finite() || (a - b).abs() <= 1e-9 * a.abs().max(1.0)
    });
    repeats.then_some(p)
}

/// Periods as multiples of `pi`; `None` when a trigonometric argument is not linear.
fn collect_periods(e: &Expr, out: &mut Vec<Rational64>) -> Option<()> {
    match e {
        Expr::Fun(func, arg) if func.is_trigonometric() && arg.contains_variable(VAR) => {
            let p = Poly::from_expr(arg, VAR)?;
            if p.degree() != 1 {
                return None;
            }
            let slope = p.coeffs()[1];
            let base = match func {
                Func::Tan | Func::Cot => Rational64::from_integer(1),
                _ => Rational64::from_integer(2),
            };
            let q = base / slope;
            out.push(if q < Rational64::from_integer(0) { -q } else { q });
            Some(())
        }
        Expr::Var(_) | Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => Some(()),
        Expr::Add(lhs, rhs)
        | Expr::Sub(lhs, rhs)
        | Expr::Mul(lhs, rhs)
        | Expr::Div(lhs, rhs)
        | Expr::Pow(lhs, rhs) => {
            collect_periods(lhs, out)?;
            collect_periods(rhs, out)
        }
        Expr::Fun(_, arg) => collect_periods(arg, out),
        Expr::Max(_) | Expr::Min(_) | Expr::Piecewise(_) => None,
    }
}

/// candidate extreme value
struct Candidate {
    value: ExactValue,
    attained: bool,
}

fn value_at(expr: &Expr, at: &ExactValue) -> Option<Candidate> {
    // polynomials at rational points stay in exact arithmetic, even past f64's 2^53
    let exact = at
        .expr
        .as_rational()
        .and_then(|r| Poly::from_expr(expr, VAR)?.eval(r));
    let value = match exact {
        Some(r) => ExactValue::new(Expr::Num(r)),
        None => ExactValue::exact(&expr.subs(VAR, &at.expr)),
    };
    value.is_finite().then_some(Candidate {
        value,
        attained: true,
    })
}

fn piece_image(expr: &Expr, derivative: &Expr, piece: &Interval) -> Result<Interval, String> {
    if piece.is_point() {
        let at = piece.lo.exact().ok_or("degenerate interval")?;
        return value_at(expr, at)
            .map(|c| Interval::point(c.value))
            .ok_or_else(|| format!("{} is not finite at x = {}", expr, at));
    }
    let reach = piece.hi_value() - piece.lo_value();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut infinite_above = false;
    let mut infinite_below = false;
    for (bound, approach) in [
        (&piece.lo, lower_approach(piece)),
        (&piece.hi, upper_approach(piece)),
    ] {
        if let Bound::Closed(at) = bound {
            if let Some(c) = value_at(expr, at) {
                candidates.push(c);
                continue;
            }
        }
        match limit(expr, approach, reach) {
            LimitValue::Finite(value) => candidates.push(Candidate {
                value,
                attained: false,
            }),
            LimitValue::PosInfinity => infinite_above = true,
            LimitValue::NegInfinity => infinite_below = true,
            LimitValue::Undefined => {
                return Err(format!("no limit of {} at the end of {}", expr, piece));
            }
        }
    }
    let interior = RealSet::from_interval(piece.interior());
    for at in critical_points(derivative, &interior)? {
        candidates.extend(value_at(expr, &at));
    }
    let lo = if infinite_below {
        Bound::Unbounded
    } else {
        extreme(&candidates, |a, b| a < b)?
    };
    let hi = if infinite_above {
        Bound::Unbounded
    } else {
        extreme(&candidates, |a, b| a > b)?
    };
    Ok(Interval::new(lo, hi))
}

fn lower_approach(piece: &Interval) -> Approach {
    match piece.lo {
        Bound::Unbounded => Approach::NegInfinity,
        _ => Approach::Right(piece.lo_value()),
    }
}

fn upper_approach(piece: &Interval) -> Approach {
    match piece.hi {
        Bound::Unbounded => Approach::PosInfinity,
        _ => Approach::Left(piece.hi_value()),
    }
}

/// Smallest (or largest, depending on `better`) candidate; closed when some candidate with
/// that value is attained.
fn extreme(candidates: &[Candidate], better: impl Fn(f64, f64) -> bool) -> Result<Bound, String> {
    let mut best: Option<&Candidate> = None;
    for c in candidates {
        best = match best {
            None => Some(c),
            Some(b) if same_point(c.value.value, b.value.value) => {
                Some(if c.attained { c } else { b })
            }
            Some(b) if better(c.value.value, b.value.value) => Some(c),
            keep => keep,
        };
    }
    let best = best.ok_or("no candidate values")?;
    Ok(if best.attained {
        Bound::Closed(best.value.clone())
    } else {
        Bound::Open(best.value.clone())
    })
}

/// Zeros of `f'` and points where `f'` is undefined, inside `interior`.
fn critical_points(derivative: &Expr, interior: &RealSet) -> Result<Vec<ExactValue>, String> {
    let mut points = match solve_equation(derivative, interior) {
        SolveOutcome::Resolved(points) => points,
        SolveOutcome::Unresolvable(Unsolved::Set(set)) => {
            let mut flat = set.isolated_points();
            flat.extend(
                set.intervals()
                    .iter()
                    .filter(|i| !i.is_point())
                    .map(|i| ExactValue::from_f64(i.sample())),
            );
            flat
        }
        SolveOutcome::Unresolvable(other) => {
            return Err(format!("critical points of f are not enumerable: {}", other));
        }
        SolveOutcome::Error(message) => return Err(message),
    };
    let (_, den) = derivative.together();
    if den.contains_variable(VAR) {
        let singular = zero_set(&den)?;
        if !singular.intervals.is_empty() {
            return Err(format!("{} vanishes on a whole interval", den));
        }
        points.extend(
            singular
                .points
                .iter()
                .map(ExactValue::exact)
                .filter(|p| interior.contains(p.value)),
        );
        if !singular.lattices.is_empty() {
            if !interior.is_bounded() {
                return Err(format!("{} has infinitely many zeros", den));
            }
            let lo = interior.intervals().first().map(|i| i.lo_value());
            let hi = interior.intervals().last().map(|i| i.hi_value());
            if let (Some(lo), Some(hi)) = (lo, hi) {
                for lattice in &singular.lattices {
                    points.extend(
                        lattice
                            .points_between(lo, hi)
                            .into_iter()
                            .filter(|p| interior.contains(p.value)),
                    );
                }
            }
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::continuous_domain;

    fn range(text: &str) -> Result<String, String> {
        let e = Expr::parse_expression(text).unwrap().simplify();
        let domain = continuous_domain(&e)?;
        function_range(&e, &domain).map(|r| r.to_string())
    }

    #[test]
    fn test_polynomials() {
        assert_eq!(range("x**2 - 4").unwrap(), "[-4, ∞)");
        assert_eq!(range("-x**2 + 2*x").unwrap(), "(-∞, 1]");
        assert_eq!(range("x**3").unwrap(), "ℝ");
        assert_eq!(range("7").unwrap(), "{7}");
    }

    #[test]
    fn test_large_coefficients() {
        assert_eq!(range("x**2 - 5000000000*x").unwrap(), "[-6250000000000000000, ∞)");
        assert_eq!(range("-x**2 + 5000000000*x").unwrap(), "(-∞, 6250000000000000000]");
    }

    #[test]
    fn test_undefined_constants_have_an_empty_image() {
        let domain = RealSet::reals();
        for text in ["sqrt(-1)", "log(-1)", "1/0"] {
            let e = Expr::parse_expression(text).unwrap().simplify();
            assert!(function_range(&e, &domain).unwrap().is_empty(), "{}", text);
        }
        assert_eq!(range("sqrt(-1)").unwrap(), "∅");
    }

    #[test]
    fn test_rational_functions() {
        assert_eq!(range("1/x").unwrap(), "(-∞, 0) ∪ (0, ∞)");
        assert_eq!(range("1/(x**2 + 1)").unwrap(), "(0, 1]");
    }

    #[test]
    fn test_roots_logs_and_exponentials() {
        assert_eq!(range("sqrt(x)").unwrap(), "[0, ∞)");
        assert_eq!(range("sqrt(4 - x**2)").unwrap(), "[0, 2]");
        assert_eq!(range("log(x)").unwrap(), "ℝ");
        assert_eq!(range("exp(x)").unwrap(), "(0, ∞)");
        assert_eq!(range("atan(x)").unwrap(), "(-pi/2, pi/2)");
    }

    #[test]
    fn test_abs_uses_the_kink() {
        assert_eq!(range("Abs(x) - 1").unwrap(), "[-1, ∞)");
    }

    #[test]
    fn test_periodic() {
        assert_eq!(range("sin(x)").unwrap(), "[-1, 1]");
        assert_eq!(range("3*cos(2*x) + 1").unwrap(), "[-2, 4]");
        assert_eq!(range("tan(x)").unwrap(), "ℝ");
    }

    #[test]
    fn test_piecewise_branches() {
        assert_eq!(range("Piecewise((x, x < 0), (1, True))").unwrap(), "(-∞, 0) ∪ {1}");
        assert_eq!(range("Max(x, 0)").unwrap(), "[0, ∞)");
    }

    #[test]
    fn test_undetermined_cases() {
        assert!(range("floor(x)").is_err());
        assert!(range("x*sin(x)").is_err());
    }
}
