//! Recovery of exact forms from floating point values.
//!
//! A float is matched, within a tolerance relative to the float itself, against: integers,
//! rationals with a small denominator, rational multiples of `pi` (denominator up to 12),
//! `sqrt(m)/q` with `m` up to [`MAX_RADICAND`] and `q` up to 12, and `a + b*sqrt(n)` for
//! small square-free `n`. Candidate sets shrink as the magnitude grows, so a large float
//! is not "explained" by an arbitrary surd. Only magnitudes below [`ZERO_FLOOR`], the
//! leftovers of float cancellation, are read as zero. When nothing matches the float is
//! kept.
use crate::symbolic::symbolic_engine::{Expr, Number};
use crate::symbolic::symbolic_simplify::{add_terms, mul_factors, simplify_pow, surd};
use num::rational::Rational64;
use std::f64::consts::PI;

pub const DEFAULT_TOLERANCE: f64 = 1e-10;
/// `0.1 + 0.2 - 0.3` and the like
pub const ZERO_FLOOR: f64 = 1e-15;
/// largest `m` tried for `sqrt(m)/q`
pub const MAX_RADICAND: i64 = 10_000;
/// `a + b*sqrt(n)` is only tried below this magnitude
const MAX_SURD_SUM: f64 = 100.0;

/// relative to `a`: an exact zero only matches zero
fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * a.abs()
}

/// Largest denominator worth trying for a float of this size: the tolerance window of a
/// large value holds many fractions with big denominators.
fn denominator_bound(value: f64, max_den: i64, tol: f64) -> i64 {
    let window = tol * value.abs();
    if window <= 0.0 {
        return max_den;
    }
    let bound = (1e-3 / window).sqrt().floor();
    if bound >= max_den as f64 {
        max_den
    } else {
        (bound as i64).max(1)
    }
}

/// smallest-denominator rational within tolerance
fn rational_near(value: f64, max_den: i64, tol: f64) -> Option<Rational64> {
    if value.abs() > 1e12 {
        return None;
    }
    (1..=denominator_bound(value, max_den, tol)).find_map(|q| {
        let p = (value * q as f64).round();
        close(value, p / q as f64, tol).then(|| Rational64::new(p as i64, q))
    })
}

/// `(m, q)` with `|value| = sqrt(m)/q`, `m` not a perfect square
fn radical_near(value: f64, tol: f64) -> Option<(i64, i64)> {
    let magnitude = value.abs();
    for q in 1..=12_i64 {
        let scaled = magnitude * q as f64;
        let m = (scaled * scaled).round();
        if m > MAX_RADICAND as f64 {
            break;
        }
        if m < 1.0 {
            continue;
        }
        if close(magnitude, m.sqrt() / q as f64, tol) {
            return Some((m as i64, q));
        }
    }
    None
}

fn surd_sum_near(value: f64, tol: f64) -> Option<Expr> {
    if value.abs() > MAX_SURD_SUM {
        return None;
    }
    for n in [2, 3, 5, 6, 7] {
        let sqrt_n = (n as f64).sqrt();
        for den in 1..=4 {
            for num in -40..=40 {
                if num == 0 {
                    continue;
                }
                let b_f = num as f64 / den as f64;
                let rest = value - b_f * sqrt_n;
                for q in 1..=12 {
                    let p = (rest * q as f64).round();
                    if p == 0.0 {
                        continue;
                    }
                    if close(value, p / q as f64 + b_f * sqrt_n, tol) {
                        let a = Rational64::new(p as i64, q);
                        return Some(add_terms(vec![Expr::Num(a), surd(Rational64::new(num, den), n)]));
                    }
                }
            }
        }
    }
    None
}

/// Exact form of `value`, or `Expr::Const(value)` when no candidate matches.
pub fn nsimplify(value: f64, tol: f64) -> Expr {
    if !value.is_finite() {
        return Expr::Const(value);
    }
    if value.abs() < ZERO_FLOOR {
        return Expr::int(0);
    }
    if let Some(r) = rational_near(value, 1000, tol) {
        return Expr::Num(r);
    }
    if let Some(q) = rational_near(value / PI, 12, tol) {
        return Expr::product(Number::Exact(q), vec![Expr::Pi]);
    }
    if let Some((m, q)) = radical_near(value, tol) {
        let root = simplify_pow(Expr::Num(Rational64::new(m, q * q)), Expr::rational(1, 2));
        return if value < 0.0 {
            mul_factors(vec![Expr::int(-1), root])
        } else {
            root
        };
    }
    surd_sum_near(value, tol).unwrap_or(Expr::Const(value))
}

/// Applies [`nsimplify`] to float leaves; exact expressions are returned unchanged.
pub fn nsimplify_expr(e: &Expr) -> Expr {
    match e {
        Expr::Const(v) => nsimplify(*v, DEFAULT_TOLERANCE),
        _ if e.is_constant() && !e.is_exact_constant() => {
            nsimplify(e.eval_const(), DEFAULT_TOLERANCE)
        }
        _ => e.clone(),
    }
}
