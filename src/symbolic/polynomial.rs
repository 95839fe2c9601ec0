//! Univariate polynomials with exact rational coefficients.
//!
//! Used for removable-singularity cancellation (gcd of numerator and denominator) and
//! for exact real root finding: zero roots, rational roots by the rational-root theorem,
//! the quadratic formula, n-th roots of binomials `a*x**n + c`, biquadratic substitution
//! and numeric isolation of whatever irreducible remainder is left. All coefficient
//! arithmetic is overflow-checked; an overflow makes the operation return `None` instead
//! of panicking.

use crate::symbolic::symbolic_engine::{Expr, Number, ratio_to_f64};
use crate::symbolic::symbolic_simplify::{add_terms, mul_factors, simplify_pow};
use num::rational::Rational64;
use num::traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub};
use num::{Signed, Zero};

#[derive(Clone, Debug, PartialEq)]
pub struct Poly {
    /// coefficients in ascending order of degree, no trailing zeros
    coeffs: Vec<Rational64>,
}

impl Poly {
    pub fn new(mut coeffs: Vec<Rational64>) -> Poly {
        while coeffs.last().is_some_and(|c| c.is_zero()) {
            coeffs.pop();
        }
        Poly { coeffs }
    }

    pub fn zero() -> Poly {
        Poly { coeffs: Vec::new() }
    }

    pub fn constant(c: Rational64) -> Poly {
        Poly::new(vec![c])
    }

    pub fn x() -> Poly {
        Poly::new(vec![Rational64::zero(), Rational64::from_integer(1)])
    }

    pub fn coeffs(&self) -> &[Rational64] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// degree; the zero polynomial has degree 0
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn leading(&self) -> Rational64 {
        self.coeffs.last().copied().unwrap_or_else(Rational64::zero)
    }

    fn coeff(&self, i: usize) -> Rational64 {
        self.coeffs.get(i).copied().unwrap_or_else(Rational64::zero)
    }

    /// Converts an expression that is a polynomial in `var` with rational coefficients.
    pub fn from_expr(e: &Expr, var: &str) -> Option<Poly> {
        match e {
            Expr::Var(name) if name == var => Some(Poly::x()),
            Expr::Num(r) => Some(Poly::constant(*r)),
            // short decimals typed by the user, e.g. 2.5
            Expr::Const(v) => match Number::from_f64(*v) {
                Number::Exact(r) => Some(Poly::constant(r)),
                _ => None,
            },
            Expr::Add(lhs, rhs) => Poly::from_expr(lhs, var)?.add(&Poly::from_expr(rhs, var)?),
            Expr::Sub(lhs, rhs) => Poly::from_expr(lhs, var)?.sub(&Poly::from_expr(rhs, var)?),
            Expr::Mul(lhs, rhs) => Poly::from_expr(lhs, var)?.mul(&Poly::from_expr(rhs, var)?),
            Expr::Div(lhs, rhs) => {
                let den = Poly::from_expr(rhs, var)?;
                if den.is_zero() || den.degree() > 0 {
                    return None;
                }
                Poly::from_expr(lhs, var)?.scale(den.leading().recip())
            }
            Expr::Pow(base, exp) => {
                let n = exp.as_integer()?;
                if !(0..=64).contains(&n) {
                    return None;
                }
                Poly::from_expr(base, var)?.pow(n as u32)
            }
            _ => None,
        }
    }

    pub fn add(&self, other: &Poly) -> Option<Poly> {
        let n = self.coeffs.len().max(other.coeffs.len());
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(self.coeff(i).checked_add(&other.coeff(i))?);
        }
        Some(Poly::new(out))
    }

    pub fn sub(&self, other: &Poly) -> Option<Poly> {
        let n = self.coeffs.len().max(other.coeffs.len());
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(self.coeff(i).checked_sub(&other.coeff(i))?);
        }
        Some(Poly::new(out))
    }

    pub fn mul(&self, other: &Poly) -> Option<Poly> {
        if self.is_zero() || other.is_zero() {
            return Some(Poly::zero());
        }
        let mut out = vec![Rational64::zero(); self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                out[i + j] = out[i + j].checked_add(&a.checked_mul(b)?)?;
            }
        }
        Some(Poly::new(out))
    }

    pub fn scale(&self, factor: Rational64) -> Option<Poly> {
        let out = self
            .coeffs
            .iter()
            .map(|c| c.checked_mul(&factor))
            .collect::<Option<Vec<_>>>()?;
        Some(Poly::new(out))
    }

    pub fn pow(&self, n: u32) -> Option<Poly> {
        let mut acc = Poly::constant(Rational64::from_integer(1));
        for _ in 0..n {
            acc = acc.mul(self)?;
        }
        Some(acc)
    }

    /// Long division, `None` for a zero divisor or on overflow.
    pub fn div_rem(&self, divisor: &Poly) -> Option<(Poly, Poly)> {
        if divisor.is_zero() {
            return None;
        }
        let mut rem = self.coeffs.clone();
        let d = divisor.degree();
        let lead = divisor.leading();
        if self.coeffs.len() < divisor.coeffs.len() {
            return Some((Poly::zero(), self.clone()));
        }
        let mut quot = vec![Rational64::zero(); self.coeffs.len() - d];
        for k in (0..quot.len()).rev() {
            let q = rem[k + d].checked_div(&lead)?;
            quot[k] = q;
            for (j, c) in divisor.coeffs.iter().enumerate() {
                rem[k + j] = rem[k + j].checked_sub(&q.checked_mul(c)?)?;
            }
        }
        rem.truncate(d);
        Some((Poly::new(quot), Poly::new(rem)))
    }

    pub fn monic(&self) -> Option<Poly> {
        if self.is_zero() {
            return Some(self.clone());
        }
        self.scale(self.leading().recip())
    }

    /// Monic greatest common divisor; the constant 1 when it cannot be computed exactly.
    pub fn gcd(&self, other: &Poly) -> Poly {
        let one = Poly::constant(Rational64::from_integer(1));
        let mut a = self.clone();
        let mut b = other.clone();
        while !b.is_zero() {
            let r = match a.div_rem(&b).and_then(|(_, r)| r.monic()) {
                Some(r) => r,
                None => return one,
            };
            a = b;
            b = r;
        }
        a.monic().filter(|g| !g.is_zero()).unwrap_or(one)
    }

    pub fn derivative(&self) -> Poly {
        let coeffs = self
            .coeffs
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, c)| c * Rational64::from_integer(i as i64))
            .collect();
        Poly::new(coeffs)
    }

    /// exact value at a rational point
    pub fn eval(&self, x: Rational64) -> Option<Rational64> {
        let mut acc = Rational64::zero();
        for c in self.coeffs.iter().rev() {
            acc = acc.checked_mul(&x)?.checked_add(c)?;
        }
        Some(acc)
    }

    pub fn eval_f64(&self, x: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + ratio_to_f64(c))
    }

    pub fn to_expr(&self, var: &str) -> Expr {
        let terms = self
            .coeffs
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_zero())
            .map(|(k, c)| {
                let power = match k {
                    0 => return Expr::Num(*c),
                    1 => Expr::Var(var.to_string()),
                    _ => Expr::Var(var.to_string()).pow(Expr::int(k as i64)),
                };
                Expr::product(Number::Exact(*c), vec![power])
            })
            .collect();
        add_terms(terms)
    }

    /// coefficients scaled to integers, when they fit
    fn integer_coefficients(&self) -> Option<Vec<i64>> {
        let mut lcm: i64 = 1;
        for c in &self.coeffs {
            lcm = num::integer::lcm(lcm, *c.denom());
            if lcm > 1_000_000_000 {
                return None;
            }
        }
        self.coeffs
            .iter()
            .map(|c| {
                let scaled = c.checked_mul(&Rational64::from_integer(lcm))?;
                Some(*scaled.numer())
            })
            .collect()
    }

    /// Distinct real roots in ascending order.
    ///
    /// Exact forms (integers, rationals, radicals) where they exist; the irreducible
    /// remainder of degree three or more is isolated numerically and reported as floats.
    pub fn real_roots(&self) -> Vec<Expr> {
        if self.degree() == 0 {
            return Vec::new();
        }
        let mut roots: Vec<Expr> = Vec::new();
        let mut p = self.clone();
        if p.coeff(0).is_zero() {
            roots.push(Expr::int(0));
            let first = p.coeffs.iter().position(|c| !c.is_zero()).unwrap_or(0);
            p = Poly::new(p.coeffs[first..].to_vec());
        }
        for candidate in p.rational_root_candidates() {
            if p.degree() == 0 {
                break;
            }
            let mut found = false;
            while p.degree() > 0 && p.eval(candidate) == Some(Rational64::zero()) {
                let linear = Poly::new(vec![-candidate, Rational64::from_integer(1)]);
                match p.div_rem(&linear) {
                    Some((q, _)) => p = q,
                    None => break,
                }
                found = true;
            }
            if found {
                roots.push(Expr::Num(candidate));
            }
        }
        roots.extend(p.remaining_roots());
        roots.sort_by(|a, b| a.eval_const().total_cmp(&b.eval_const()));
        roots.dedup_by(|a, b| (a.eval_const() - b.eval_const()).abs() < 1e-12);
        roots
    }

    fn rational_root_candidates(&self) -> Vec<Rational64> {
        let Some(ints) = self.integer_coefficients() else {
            return Vec::new();
        };
        let (a0, an) = (ints[0].abs(), ints[ints.len() - 1].abs());
        if a0 == 0 || a0 > 10_000_000_000 || an > 10_000_000_000 {
            return Vec::new();
        }
        let mut candidates = Vec::new();
        for p in divisors(a0) {
            for q in divisors(an) {
                let r = Rational64::new(p, q);
                for c in [r, -r] {
                    if !candidates.contains(&c) {
                        candidates.push(c);
                    }
                }
                if candidates.len() > 20_000 {
                    return candidates;
                }
            }
        }
        candidates
    }

    fn remaining_roots(&self) -> Vec<Expr> {
        match self.degree() {
            0 => Vec::new(),
            1 => vec![Expr::Num(-self.coeff(0) / self.coeff(1))],
            2 => quadratic_roots(self.coeff(2), self.coeff(1), self.coeff(0))
                .unwrap_or_else(|| self.numeric_roots()),
            n if (1..n).all(|k| self.coeff(k).is_zero()) => {
                self.binomial_roots().unwrap_or_else(|| self.numeric_roots())
            }
            4 if self.coeff(1).is_zero() && self.coeff(3).is_zero() => {
                self.biquadratic_roots().unwrap_or_else(|| self.numeric_roots())
            }
            _ => self.numeric_roots(),
        }
    }

    /// `a*x**n + c`: the real n-th roots of `-c/a`
    fn binomial_roots(&self) -> Option<Vec<Expr>> {
        let n = self.degree();
        let target = (-self.coeff(0)).checked_div(&self.leading())?;
        let index = i64::try_from(n).ok()?;
        let root = simplify_pow(Expr::Num(target.abs()), Expr::rational(1, index));
        let negated = mul_factors(vec![Expr::int(-1), root.clone()]);
        Some(match (n % 2 == 0, target.is_negative()) {
            (true, true) => Vec::new(),
            (true, false) => vec![negated, root],
            (false, true) => vec![negated],
            (false, false) => vec![root],
        })
    }

    /// `a*x**4 + b*x**2 + c` solved through `y = x**2`
    fn biquadratic_roots(&self) -> Option<Vec<Expr>> {
        let ys = quadratic_roots(self.coeff(4), self.coeff(2), self.coeff(0))?;
        let mut roots = Vec::new();
        for y in ys {
            let v = y.eval_const();
            if v.abs() < 1e-15 {
                roots.push(Expr::int(0));
            } else if v > 0.0 {
                let r = simplify_pow(y, Expr::rational(1, 2));
                roots.push(mul_factors(vec![Expr::int(-1), r.clone()]));
                roots.push(r);
            }
        }
        Some(roots)
    }

    fn numeric_roots(&self) -> Vec<Expr> {
        let coeffs: Vec<f64> = self.coeffs.iter().map(ratio_to_f64).collect();
        numeric_real_roots(&coeffs)
            .into_iter()
            .map(Expr::Const)
            .collect()
    }
}

fn divisors(n: i64) -> Vec<i64> {
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d: i64 = 1;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d != n / d {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    small
}

/// Exact real roots of `a*x**2 + b*x + c` with rational coefficients, ascending.
pub fn quadratic_roots(a: Rational64, b: Rational64, c: Rational64) -> Option<Vec<Expr>> {
    let four = Rational64::from_integer(4);
    let disc = b.checked_mul(&b)?.checked_sub(&four.checked_mul(&a)?.checked_mul(&c)?)?;
    let two_a = a.checked_mul(&Rational64::from_integer(2))?;
    let vertex = (-b).checked_div(&two_a)?;
    if disc.is_negative() {
        return Some(Vec::new());
    }
    if disc.is_zero() {
        return Some(vec![Expr::Num(vertex)]);
    }
    let root = simplify_pow(Expr::Num(disc), Expr::rational(1, 2));
    let half_width = mul_factors(vec![Expr::Num(two_a.recip().abs()), root]);
    Some(vec![
        add_terms(vec![
            Expr::Num(vertex),
            mul_factors(vec![Expr::int(-1), half_width.clone()]),
        ]),
        add_terms(vec![Expr::Num(vertex), half_width]),
    ])
}

fn eval_f64(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Real roots of a float polynomial, isolated between critical points and refined by
/// bisection.
pub fn numeric_real_roots(coeffs: &[f64]) -> Vec<f64> {
    let mut coeffs = coeffs.to_vec();
    while coeffs.last().is_some_and(|c| *c == 0.0) {
        coeffs.pop();
    }
    let deg = coeffs.len().saturating_sub(1);
    if deg == 0 {
        return Vec::new();
    }
    if deg == 1 {
        return vec![-coeffs[0] / coeffs[1]];
    }
    let lead = coeffs[deg];
    let bound = 1.0
        + coeffs[..deg]
            .iter()
            .map(|c| (c / lead).abs())
            .fold(0.0, f64::max);
    let derivative: Vec<f64> = coeffs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, c)| c * i as f64)
        .collect();
    let mut points = vec![-bound];
    let mut critical: Vec<f64> = numeric_real_roots(&derivative)
        .into_iter()
        .filter(|c| c.abs() < bound)
        .collect();
    critical.sort_by(f64::total_cmp);
    points.extend(critical);
    points.push(bound);
    let scale = coeffs.iter().map(|c| c.abs()).fold(0.0, f64::max);
    let mut roots = Vec::new();
    for w in points.windows(2) {
        let (mut a, mut b) = (w[0], w[1]);
        let (mut fa, fb) = (eval_f64(&coeffs, a), eval_f64(&coeffs, b));
        if fa.abs() <= 1e-12 * scale {
            roots.push(a);
            continue;
        }
        if fa.signum() == fb.signum() || fb == 0.0 {
            continue;
        }
        for _ in 0..200 {
            let mid = 0.5 * (a + b);
            let fm = eval_f64(&coeffs, mid);
            if fm == 0.0 {
                a = mid;
                b = mid;
                break;
            }
            if fm.signum() == fa.signum() {
                a = mid;
                fa = fm;
            } else {
                b = mid;
            }
        }
        roots.push(0.5 * (a + b));
    }
    if let Some(last) = points.last() {
        if eval_f64(&coeffs, *last).abs() <= 1e-12 * scale {
            roots.push(*last);
        }
    }
    roots.sort_by(f64::total_cmp);
    roots.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    roots
}
