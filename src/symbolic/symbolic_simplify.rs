//! # Symbolic Expression Simplification Module
//!
//! Canonicalisation of expression trees. `simplify` is applied once right after parsing
//! and every downstream consumer works with its output.
//!
//! ## Canonical form
//!
//! - sums are flat chains of `Add`; subtraction becomes a negative coefficient, like
//!   terms are collected and the numeric term comes last (`x**2 - 4`)
//! - products are flat chains of `Mul` with the numeric coefficient first; division
//!   becomes a negative power and equal bases are merged (`x*x → x**2`, `x/x → 1`)
//! - numeric powers are folded exactly: integer powers of rationals, roots with
//!   square-factor extraction and rationalised denominators (`sqrt(8) → 2*sqrt(2)`,
//!   `1/sqrt(2) → sqrt(2)/2`)
//! - functions of special arguments are evaluated (`sin(pi/6) → 1/2`, `atan(1) → pi/4`,
//!   `exp(0) → 1`, `log(E) → 1`) and odd/even symmetries are pulled out
//! - `E**u` is written `exp(u)`
//!
//! On top of that, [`Expr::simplify`] cancels common polynomial factors of rational
//! functions (`(x**2 - 4)/(x - 2) → x + 2`).

use crate::symbolic::polynomial::Poly;
use crate::symbolic::symbolic_engine::{Condition, Expr, Func, Number, VAR, real_pow};
use num::Integer;
use num::rational::Rational64;
use num::traits::CheckedMul;
use std::cmp::Ordering;
use std::f64::consts::PI;

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Full simplification: canonical form plus cancellation of common polynomial factors.
    pub fn simplify(&self) -> Expr {
        self.simplify_basic().cancel_common_factors()
    }

    /// Bottom-up canonicalisation without polynomial cancellation.
    pub fn simplify_basic(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => self.clone(),
            Expr::Add(lhs, rhs) => add_terms(vec![lhs.simplify_basic(), rhs.simplify_basic()]),
            Expr::Sub(lhs, rhs) => {
                add_terms(vec![lhs.simplify_basic(), negate(&rhs.simplify_basic())])
            }
            Expr::Mul(lhs, rhs) => mul_factors(vec![lhs.simplify_basic(), rhs.simplify_basic()]),
            Expr::Div(lhs, rhs) => mul_factors(vec![
                lhs.simplify_basic(),
                simplify_pow(rhs.simplify_basic(), Expr::int(-1)),
            ]),
            Expr::Pow(base, exp) => simplify_pow(base.simplify_basic(), exp.simplify_basic()),
            Expr::Fun(func, arg) => simplify_fun(*func, arg.simplify_basic()),
            Expr::Max(args) => {
                simplify_extremum(true, args.iter().map(|a| a.simplify_basic()).collect())
            }
            Expr::Min(args) => {
                simplify_extremum(false, args.iter().map(|a| a.simplify_basic()).collect())
            }
            Expr::Piecewise(branches) => simplify_piecewise(branches),
        }
    }

    /// Cancels the polynomial gcd of numerator and denominator of a rational function.
    ///
    /// Applied to the whole expression when it is rational in `x`, otherwise to each
    /// child. Expressions without a common factor are returned unchanged.
    pub fn cancel_common_factors(&self) -> Expr {
        if let Some((num, den)) = self.rational_parts() {
            if den.degree() == 0 {
                return self.clone();
            }
            let common = num.gcd(&den);
            if common.degree() == 0 {
                return self.clone();
            }
            let reduced = num
                .div_rem(&common)
                .zip(den.div_rem(&common))
                .map(|((n, _), (d, _))| (n, d));
            return match reduced {
                Some((n, d)) => rational_expr(&n, &d).unwrap_or_else(|| self.clone()),
                None => self.clone(),
            };
        }
        let mapped = self.map_children(&|child: &Expr| child.cancel_common_factors());
        if mapped == *self {
            mapped
        } else {
            mapped.simplify_basic()
        }
    }

    /// Numerator and denominator as polynomials in `x`, when the expression is rational.
    pub fn rational_parts(&self) -> Option<(Poly, Poly)> {
        let (num, den) = self.together();
        Some((Poly::from_expr(&num, VAR)?, Poly::from_expr(&den, VAR)?))
    }

    /// Numerator/denominator decomposition over a common denominator.
    ///
    /// `sin(x) + 1/x` gives `(x*sin(x) + 1, x)`; expressions without a denominator give
    /// `(self, 1)`.
    pub fn together(&self) -> (Expr, Expr) {
        let (num, den) = together_raw(self);
        (num.simplify_basic(), den.simplify_basic())
    }

    /// true when the expression has no variables and no floating point numbers
    pub fn is_exact_constant(&self) -> bool {
        self.is_constant() && !contains_float(self)
    }
}

fn contains_float(e: &Expr) -> bool {
    match e {
        Expr::Const(_) => true,
        Expr::Var(_) | Expr::Num(_) | Expr::E | Expr::Pi => false,
        Expr::Add(lhs, rhs)
        | Expr::Sub(lhs, rhs)
        | Expr::Mul(lhs, rhs)
        | Expr::Div(lhs, rhs)
        | Expr::Pow(lhs, rhs) => contains_float(lhs) || contains_float(rhs),
        Expr::Fun(_, arg) => contains_float(arg),
        Expr::Max(args) | Expr::Min(args) => args.iter().any(contains_float),
        Expr::Piecewise(branches) => branches.iter().any(|(v, _)| contains_float(v)),
    }
}

fn rational_expr(num: &Poly, den: &Poly) -> Option<Expr> {
    // monic denominator keeps signs in the numerator
    let lead = den.leading();
    let num = num.scale(lead.recip())?;
    let den = den.scale(lead.recip())?;
    let num_expr = num.to_expr(VAR);
    if den.degree() == 0 {
        return Some(num_expr);
    }
    Some(mul_factors(vec![
        num_expr,
        simplify_pow(den.to_expr(VAR), Expr::int(-1)),
    ]))
}

fn together_raw(e: &Expr) -> (Expr, Expr) {
    match e {
        Expr::Num(r) if !r.is_integer() => (Expr::int(*r.numer()), Expr::int(*r.denom())),
        Expr::Add(_, _) | Expr::Sub(_, _) => {
            let mut terms = Vec::new();
            collect_signed_terms(e, false, &mut terms);
            let mut acc: Option<(Expr, Expr)> = None;
            for (negated, term) in terms {
                let (mut n, d) = together_raw(&term);
                if negated {
                    n = negate(&n);
                }
                acc = Some(match acc {
                    None => (n, d),
                    Some((an, ad)) => add_fractions(an, ad, n, d),
                });
            }
            acc.unwrap_or((Expr::int(0), Expr::int(1)))
        }
        Expr::Mul(lhs, rhs) => {
            let (ln, ld) = together_raw(lhs);
            let (rn, rd) = together_raw(rhs);
            (mul_factors(vec![ln, rn]), mul_factors(vec![ld, rd]))
        }
        Expr::Div(lhs, rhs) => {
            let (ln, ld) = together_raw(lhs);
            let (rn, rd) = together_raw(rhs);
            (mul_factors(vec![ln, rd]), mul_factors(vec![ld, rn]))
        }
        Expr::Pow(base, exp) => match exp.as_number() {
            Some(n) if n.is_negative() => {
                let (bn, bd) = together_raw(base);
                let flipped = Expr::number(n.neg());
                (
                    simplify_pow(bd, flipped.clone()),
                    simplify_pow(bn, flipped),
                )
            }
            Some(n) if n.as_integer().is_some() => {
                let (bn, bd) = together_raw(base);
                (
                    simplify_pow(bn, (**exp).clone()),
                    simplify_pow(bd, (**exp).clone()),
                )
            }
            _ => (e.clone(), Expr::int(1)),
        },
        _ => (e.clone(), Expr::int(1)),
    }
}

fn add_fractions(n1: Expr, d1: Expr, n2: Expr, d2: Expr) -> (Expr, Expr) {
    if d1 == d2 {
        (add_terms(vec![n1, n2]), d1)
    } else if d1.is_one() {
        (add_terms(vec![mul_factors(vec![n1, d2.clone()]), n2]), d2)
    } else if d2.is_one() {
        (add_terms(vec![n1, mul_factors(vec![n2, d1.clone()])]), d1)
    } else {
        let num = add_terms(vec![
            mul_factors(vec![n1, d2.clone()]),
            mul_factors(vec![n2, d1.clone()]),
        ]);
        (num, mul_factors(vec![d1, d2]))
    }
}

fn collect_signed_terms(e: &Expr, negated: bool, out: &mut Vec<(bool, Expr)>) {
    match e {
        Expr::Add(lhs, rhs) => {
            collect_signed_terms(lhs, negated, out);
            collect_signed_terms(rhs, negated, out);
        }
        Expr::Sub(lhs, rhs) => {
            collect_signed_terms(lhs, negated, out);
            collect_signed_terms(rhs, !negated, out);
        }
        _ => out.push((negated, e.clone())),
    }
}

//___________________________________SUMS____________________________________

/// `-e` in canonical form
pub fn negate(e: &Expr) -> Expr {
    mul_factors(vec![Expr::int(-1), e.clone()])
}

/// polynomial degree of a monomial in x, 0 for anything else
fn x_degree(factors: &[Expr]) -> f64 {
    factors
        .iter()
        .map(|f| match f {
            Expr::Var(_) => 1.0,
            Expr::Pow(base, exp) if matches!(**base, Expr::Var(_)) => {
                exp.as_number().map(|n| n.to_f64()).unwrap_or(0.0)
            }
            _ => 0.0,
        })
        .sum()
}

fn term_order(a: &[Expr], b: &[Expr]) -> Ordering {
    x_degree(b)
        .partial_cmp(&x_degree(a))
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            Expr::product(Number::int(1), a.to_vec())
                .to_string()
                .cmp(&Expr::product(Number::int(1), b.to_vec()).to_string())
        })
}

/// Canonical sum of already simplified terms.
pub fn add_terms(terms: Vec<Expr>) -> Expr {
    fn flatten(e: Expr, out: &mut Vec<Expr>) {
        match e {
            Expr::Add(lhs, rhs) => {
                flatten(*lhs, out);
                flatten(*rhs, out);
            }
            other => out.push(other),
        }
    }
    let mut flat = Vec::new();
    for t in terms {
        flatten(t, &mut flat);
    }
    let mut constant = Number::int(0);
    let mut collected: Vec<(Vec<Expr>, Number)> = Vec::new();
    for term in flat {
        if let Some(n) = term.as_number() {
            constant = constant.add(n);
            continue;
        }
        let (coeff, factors) = term.as_coeff_factors();
        match collected.iter_mut().find(|(f, _)| *f == factors) {
            Some((_, c)) => *c = c.add(coeff),
            None => collected.push((factors, coeff)),
        }
    }
    collected.retain(|(_, c)| !c.is_zero());
    collected.sort_by(|a, b| term_order(&a.0, &b.0));
    let mut out: Vec<Expr> = collected
        .into_iter()
        .map(|(factors, coeff)| Expr::product(coeff, factors))
        .collect();
    if !constant.is_zero() || out.is_empty() {
        out.push(Expr::number(constant));
    }
    Expr::sum(out)
}

//___________________________________PRODUCTS____________________________________

fn factor_rank(e: &Expr) -> u8 {
    match e {
        Expr::Pow(base, _) if base.is_number() => 0,
        Expr::Var(_) => 1,
        Expr::Pow(base, _) if matches!(**base, Expr::Var(_)) => 1,
        Expr::E | Expr::Pi => 1,
        Expr::Fun(..) => 2,
        _ => 3,
    }
}

fn factor_order(a: &Expr, b: &Expr) -> Ordering {
    factor_rank(a)
        .cmp(&factor_rank(b))
        .then_with(|| a.to_string().cmp(&b.to_string()))
}

fn radical_parts(e: &Expr) -> Option<(Rational64, Rational64)> {
    match e {
        Expr::Pow(base, exp) => {
            let base = base.as_rational().filter(|b| *b > Rational64::from_integer(0))?;
            Some((base, exp.as_rational()?))
        }
        _ => None,
    }
}

/// Canonical product of already simplified factors.
pub fn mul_factors(factors: Vec<Expr>) -> Expr {
    fn flatten(e: Expr, out: &mut Vec<Expr>) {
        match e {
            Expr::Mul(lhs, rhs) => {
                flatten(*lhs, out);
                flatten(*rhs, out);
            }
            other => out.push(other),
        }
    }
    let mut flat = Vec::new();
    for f in factors {
        flatten(f, &mut flat);
    }
    let mut coeff = Number::int(1);
    let mut powers: Vec<(Expr, Expr)> = Vec::new();
    for factor in flat {
        if let Some(n) = factor.as_number() {
            coeff = coeff.mul(n);
            continue;
        }
        let (base, exp) = match factor {
            Expr::Pow(base, exp) => (*base, *exp),
            Expr::Fun(Func::Exp, arg) => (Expr::E, *arg),
            other => (other, Expr::int(1)),
        };
        match powers.iter_mut().find(|(b, _)| *b == base) {
            Some((_, e)) => *e = add_terms(vec![e.clone(), exp]),
            None => powers.push((base, exp)),
        }
    }
    let mut out: Vec<Expr> = Vec::new();
    for (base, exp) in powers {
        let power = if exp.is_one() && exp.as_integer().is_some() {
            base
        } else {
            simplify_pow(base, exp)
        };
        let (c, fs) = power.as_coeff_factors();
        coeff = coeff.mul(c);
        out.extend(fs);
    }
    // sqrt(2)*sqrt(3) → sqrt(6), sqrt(2)*sqrt(2) → 2
    loop {
        let mut merge = None;
        'search: for i in 0..out.len() {
            for j in (i + 1)..out.len() {
                if let (Some((a, e1)), Some((b, e2))) = (radical_parts(&out[i]), radical_parts(&out[j])) {
                    if e1 == e2 {
                        merge = Some((i, j, a, b, e1));
                        break 'search;
                    }
                }
            }
        }
        let Some((i, j, a, b, e)) = merge else { break };
        let product = match Number::Exact(a).mul(Number::Exact(b)) {
            Number::Exact(p) => p,
            Number::Float(_) => break,
        };
        out.remove(j);
        out.remove(i);
        let merged = simplify_pow(Expr::Num(product), Expr::Num(e));
        let (c, fs) = merged.as_coeff_factors();
        coeff = coeff.mul(c);
        out.extend(fs);
    }
    if coeff.is_zero() && coeff.is_exact() {
        return Expr::int(0);
    }
    if out.len() == 1 && !coeff.is_one() {
        if let Expr::Add(_, _) = &out[0] {
            let mut terms = Vec::new();
            collect_signed_terms(&out[0], false, &mut terms);
            let distributed = terms
                .into_iter()
                .map(|(_, t)| mul_factors(vec![Expr::number(coeff), t]))
                .collect();
            return add_terms(distributed);
        }
    }
    let has_duplicates = out
        .iter()
        .enumerate()
        .any(|(i, f)| out[i + 1..].iter().any(|g| base_of(g) == base_of(f)));
    if has_duplicates {
        let mut again = vec![Expr::number(coeff)];
        again.extend(out);
        return mul_factors(again);
    }
    out.sort_by(factor_order);
    Expr::product(coeff, out)
}

fn base_of(e: &Expr) -> &Expr {
    match e {
        Expr::Pow(base, _) => base,
        other => other,
    }
}

//___________________________________POWERS____________________________________

/// `m = outside**n * inside` with `inside` free of n-th powers
fn extract_root(m: i64, n: u32) -> (i64, i64) {
    let mut outside: i64 = 1;
    let mut inside: i64 = 1;
    let mut rest = m;
    let mut p: i64 = 2;
    let mut steps = 0;
    while p.checked_mul(p).is_some_and(|pp| pp <= rest) && steps < 1_000_000 {
        let mut count = 0u32;
        while rest % p == 0 {
            rest /= p;
            count += 1;
        }
        outside *= p.pow(count / n);
        inside *= p.pow(count % n);
        p += if p == 2 { 1 } else { 2 };
        steps += 1;
    }
    (outside, inside * rest)
}

/// exact `r**q` for a non-negative rational base and rational exponent
fn exact_root_pow(r: Rational64, q: Rational64) -> Option<Expr> {
    let n = *q.denom();
    let (k, rem) = q.numer().div_mod_floor(&n);
    let integer_part = Number::Exact(r).powi(k)?;
    if rem == 0 {
        return Some(Expr::number(integer_part));
    }
    let radicand = match Number::Exact(r).powi(rem)? {
        Number::Exact(v) => v,
        Number::Float(_) => return None,
    };
    if radicand == Rational64::from_integer(0) {
        return Some(Expr::int(0));
    }
    let index = u32::try_from(n).ok().filter(|&i| i <= 64)?;
    let (a, b) = (*radicand.numer(), *radicand.denom());
    // (a/b)^(1/n) = (a*b^(n-1))^(1/n) / b
    let inner = a.checked_mul(b.checked_pow(index - 1)?)?;
    let (outside, inside) = extract_root(inner, index);
    let coeff = integer_part.mul(Number::Exact(Rational64::new(outside, b)));
    if inside == 1 {
        return Some(Expr::number(coeff));
    }
    Some(Expr::product(
        coeff,
        vec![Expr::Pow(
            Expr::int(inside).boxed(),
            Expr::Num(Rational64::new(1, n)).boxed(),
        )],
    ))
}

fn number_pow(base: Number, exp: Number) -> Option<Expr> {
    if let Some(n) = exp.as_integer() {
        return base.powi(n).map(Expr::number);
    }
    match (base, exp) {
        (Number::Exact(r), Number::Exact(q)) => {
            if r < Rational64::from_integer(0) {
                None
            } else {
                exact_root_pow(r, q)
            }
        }
        _ => {
            let v = real_pow(base.to_f64(), exp.to_f64());
            v.is_finite().then_some(Expr::Const(v))
        }
    }
}

/// Canonical `base**exp` of already simplified operands.
pub fn simplify_pow(base: Expr, exp: Expr) -> Expr {
    if exp.is_zero() {
        return Expr::int(1);
    }
    if exp.is_one() && exp.as_integer().is_some() {
        return base;
    }
    if base.is_one() && base.as_integer().is_some() {
        return Expr::int(1);
    }
    if base == Expr::E {
        return simplify_fun(Func::Exp, exp);
    }
    if let (Some(b), Some(e)) = (base.as_number(), exp.as_number()) {
        return number_pow(b, e).unwrap_or(Expr::Pow(base.boxed(), exp.boxed()));
    }
    if let Some(n) = exp.as_integer() {
        match &base {
            Expr::Pow(inner_base, inner_exp) => {
                let combined = mul_factors(vec![(**inner_exp).clone(), exp.clone()]);
                return simplify_pow((**inner_base).clone(), combined);
            }
            Expr::Mul(_, _) => {
                let (c, fs) = base.as_coeff_factors();
                let mut parts = Vec::with_capacity(fs.len() + 1);
                match c.powi(n) {
                    Some(cn) => parts.push(Expr::number(cn)),
                    None => return Expr::Pow(base.boxed(), exp.boxed()),
                }
                for f in fs {
                    parts.push(simplify_pow(f, exp.clone()));
                }
                return mul_factors(parts);
            }
            Expr::Fun(Func::Exp, arg) => {
                return simplify_fun(Func::Exp, mul_factors(vec![exp.clone(), (**arg).clone()]));
            }
            _ => {}
        }
    }
    if let Some(outer) = exp.as_rational() {
        // (a**p)**q = a**(p*q) holds for a > 0
        if let Expr::Pow(inner_base, inner_exp) = &base {
            let positive = inner_base.as_number().is_some_and(|n| n.to_f64() > 0.0);
            if let (true, Some(inner)) = (positive, inner_exp.as_rational()) {
                if let Some(combined) = inner.checked_mul(&outer) {
                    return simplify_pow((**inner_base).clone(), Expr::Num(combined));
                }
            }
        }
        if let Expr::Mul(_, _) = &base {
            let (c, fs) = base.as_coeff_factors();
            if c.is_exact() && !c.is_negative() && !c.is_one() {
                return mul_factors(vec![
                    simplify_pow(Expr::number(c), exp.clone()),
                    simplify_pow(Expr::product(Number::int(1), fs), exp),
                ]);
            }
        }
    }
    Expr::Pow(base.boxed(), exp.boxed())
}

//___________________________________FUNCTIONS____________________________________

/// `q*sqrt(n)` in canonical form
pub fn surd(coeff: Rational64, radicand: i64) -> Expr {
    if radicand == 1 {
        return Expr::Num(coeff);
    }
    Expr::product(
        Number::Exact(coeff),
        vec![Expr::Pow(
            Expr::int(radicand).boxed(),
            Expr::rational(1, 2).boxed(),
        )],
    )
}

/// exact values taken by trigonometric functions at multiples of pi/12
fn special_values() -> Vec<Expr> {
    let base = [
        (Rational64::new(1, 2), 1),
        (Rational64::new(1, 1), 1),
        (Rational64::new(2, 1), 1),
        (Rational64::new(1, 2), 2),
        (Rational64::new(1, 2), 3),
        (Rational64::new(1, 1), 2),
        (Rational64::new(1, 1), 3),
        (Rational64::new(1, 3), 3),
        (Rational64::new(2, 3), 3),
    ];
    let mut out = vec![Expr::int(0)];
    for (c, r) in base {
        out.push(surd(c, r));
        out.push(surd(-c, r));
    }
    out
}

fn recognize_special(value: f64) -> Option<Expr> {
    special_values()
        .into_iter()
        .find(|candidate| (candidate.eval_const() - value).abs() < 1e-12)
}

/// `q` when the argument is `q*pi` with exact rational `q`
fn pi_multiple(arg: &Expr) -> Option<Rational64> {
    if arg.is_zero() {
        return Some(Rational64::from_integer(0));
    }
    let (coeff, factors) = arg.as_coeff_factors();
    match (coeff, factors.as_slice()) {
        (Number::Exact(q), [Expr::Pi]) => Some(q),
        _ => None,
    }
}

/// The `(-1)*u` form of an argument, as `Some(u)`.
pub fn split_negative(e: &Expr) -> Option<Expr> {
    match e {
        Expr::Num(_) | Expr::Const(_) => {
            let n = e.as_number()?;
            n.is_negative().then(|| Expr::number(n.neg()))
        }
        Expr::Mul(_, _) => {
            let (c, fs) = e.as_coeff_factors();
            c.is_negative().then(|| Expr::product(c.neg(), fs))
        }
        _ => None,
    }
}

/// Canonical `func(arg)` of an already simplified argument.
pub fn simplify_fun(func: Func, arg: Expr) -> Expr {
    if let Expr::Const(v) = arg {
        let value = func.apply(v);
        if value.is_finite() {
            return Expr::Const(value);
        }
        return Expr::fun(func, arg);
    }
    match func {
        Func::Exp => {
            if arg.is_zero() {
                return Expr::int(1);
            }
            if arg.is_one() {
                return Expr::E;
            }
            if let Expr::Fun(Func::Log, inner) = &arg {
                return (**inner).clone();
            }
        }
        Func::Log => {
            if arg.is_one() {
                return Expr::int(0);
            }
            if arg == Expr::E {
                return Expr::int(1);
            }
            if let Expr::Fun(Func::Exp, inner) = &arg {
                if inner.is_constant() {
                    return (**inner).clone();
                }
            }
        }
        Func::Abs => {
            if let Some(n) = arg.as_number() {
                return Expr::number(n.abs());
            }
            if let Some(positive) = split_negative(&arg) {
                return simplify_fun(Func::Abs, positive);
            }
            match &arg {
                Expr::Fun(Func::Abs, _) | Expr::Fun(Func::Exp, _) => return arg,
                Expr::Pow(_, exp) if exp.as_integer().is_some_and(|n| n % 2 == 0) => return arg,
                _ => {}
            }
            if arg.is_exact_constant() {
                let v = arg.eval_const();
                if v > 0.0 {
                    return arg;
                }
                if v < 0.0 {
                    return negate(&arg);
                }
            }
        }
        Func::Floor | Func::Ceiling => {
            if let Some(r) = arg.as_rational() {
                let rounded = if func == Func::Floor { r.floor() } else { r.ceil() };
                return Expr::Num(rounded);
            }
            if arg.is_exact_constant() {
                let v = arg.eval_const();
                if v.is_finite() && (v - v.round()).abs() > 1e-9 {
                    return Expr::from_f64(func.apply(v));
                }
            }
        }
        _ => {}
    }
    if func.is_trigonometric() {
        if let Some(q) = pi_multiple(&arg) {
            let value = func.apply(PI * *q.numer() as f64 / *q.denom() as f64);
            if value.is_finite() && value.abs() < 1e10 {
                if let Some(exact) = recognize_special(value) {
                    return exact;
                }
            }
        }
    }
    if matches!(func, Func::Asin | Func::Acos | Func::Atan) && arg.is_exact_constant() {
        let angle = func.apply(arg.eval_const());
        if angle.is_finite() {
            let twelfths = angle / PI * 12.0;
            if (twelfths - twelfths.round()).abs() < 1e-9 {
                let q = Rational64::new(twelfths.round() as i64, 12);
                return Expr::product(Number::Exact(q), vec![Expr::Pi]);
            }
        }
    }
    if arg.is_zero() && matches!(func, Func::Sinh | Func::Tanh | Func::Cosh) {
        return Expr::int(if func == Func::Cosh { 1 } else { 0 });
    }
    if func.is_odd() {
        if let Some(positive) = split_negative(&arg) {
            return negate(&simplify_fun(func, positive));
        }
    }
    if func.is_even() {
        if let Some(positive) = split_negative(&arg) {
            return simplify_fun(func, positive);
        }
    }
    Expr::fun(func, arg)
}

//___________________________________PIECEWISE____________________________________

fn simplify_extremum(is_max: bool, args: Vec<Expr>) -> Expr {
    let mut flat = Vec::new();
    for a in args {
        match a {
            Expr::Max(inner) if is_max => flat.extend(inner),
            Expr::Min(inner) if !is_max => flat.extend(inner),
            other => flat.push(other),
        }
    }
    let mut best: Option<(f64, Expr)> = None;
    let mut symbolic: Vec<Expr> = Vec::new();
    for a in flat {
        let v = if a.is_constant() { a.eval_const() } else { f64::NAN };
        if v.is_finite() {
            let better = match &best {
                None => true,
                Some((b, _)) => (is_max && v > *b) || (!is_max && v < *b),
            };
            if better {
                best = Some((v, a));
            }
        } else if !symbolic.contains(&a) {
            symbolic.push(a);
        }
    }
    if let Some((_, e)) = best {
        symbolic.insert(0, e);
    }
    if symbolic.len() == 1 {
        return symbolic.remove(0);
    }
    if is_max {
        Expr::Max(symbolic)
    } else {
        Expr::Min(symbolic)
    }
}

/// Constant relations are decided, `True`/`False` absorbed into `&`/`|`.
pub fn simplify_condition(cond: &Condition) -> Condition {
    match cond {
        Condition::True | Condition::False => cond.clone(),
        Condition::Rel(lhs, rel, rhs) => {
            let (lhs, rhs) = (lhs.simplify_basic(), rhs.simplify_basic());
            if lhs.is_constant() && rhs.is_constant() {
                let (a, b) = (lhs.eval_const(), rhs.eval_const());
                if a.is_finite() && b.is_finite() {
                    return if rel.holds(a, b) {
                        Condition::True
                    } else {
                        Condition::False
                    };
                }
            }
            Condition::Rel(lhs.boxed(), *rel, rhs.boxed())
        }
        Condition::And(parts) => {
            let mut kept = Vec::new();
            for p in parts.iter().map(simplify_condition) {
                match p {
                    Condition::False => return Condition::False,
                    Condition::True => {}
                    other => kept.push(other),
                }
            }
            match kept.len() {
                0 => Condition::True,
                1 => kept.remove(0),
                _ => Condition::And(kept),
            }
        }
        Condition::Or(parts) => {
            let mut kept = Vec::new();
            for p in parts.iter().map(simplify_condition) {
                match p {
                    Condition::True => return Condition::True,
                    Condition::False => {}
                    other => kept.push(other),
                }
            }
            match kept.len() {
                0 => Condition::False,
                1 => kept.remove(0),
                _ => Condition::Or(kept),
            }
        }
    }
}

fn simplify_piecewise(branches: &[(Expr, Condition)]) -> Expr {
    let mut out: Vec<(Expr, Condition)> = Vec::new();
    for (value, cond) in branches {
        match simplify_condition(cond) {
            Condition::False => continue,
            Condition::True => {
                out.push((value.simplify_basic(), Condition::True));
                break;
            }
            other => out.push((value.simplify_basic(), other)),
        }
    }
    if let Some((value, Condition::True)) = out.first() {
        return value.clone();
    }
    Expr::Piecewise(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::x()
    }

    fn simp(text: &str) -> String {
        Expr::parse_expression(text).unwrap().simplify().to_string()
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(simp("2 + 3*4"), "14");
        assert_eq!(simp("1/2 + 1/3"), "5/6");
        assert_eq!(simp("2**10"), "1024");
        assert_eq!(simp("2.5*2"), "5.0");
    }

    #[test]
    fn test_like_terms() {
        assert_eq!(simp("x + x"), "2*x");
        assert_eq!(simp("x - x"), "0");
        assert_eq!(simp("3*x - 4 + x**2 + 2*x"), "x**2 + 5*x - 4");
    }

    #[test]
    fn test_powers_collected() {
        assert_eq!(simp("x*x"), "x**2");
        assert_eq!(simp("x/x"), "1");
        assert_eq!(simp("x**3/x"), "x**2");
        assert_eq!(simp("(x**2)**3"), "x**6");
    }

    #[test]
    fn test_division_printing() {
        assert_eq!(simp("1/x"), "1/x");
        assert_eq!(simp("x/2"), "x/2");
        assert_eq!(simp("sin(x) + 1/x"), "sin(x) + 1/x");
        assert_eq!(simp("1/(x + 1)"), "1/(x + 1)");
    }

    #[test]
    fn test_roots() {
        assert_eq!(simp("sqrt(8)"), "2*sqrt(2)");
        assert_eq!(simp("sqrt(1/2)"), "sqrt(2)/2");
        assert_eq!(simp("sqrt(4)"), "2");
        assert_eq!(simp("sqrt(2)*sqrt(2)"), "2");
        assert_eq!(simp("sqrt(2)*sqrt(3)"), "sqrt(6)");
        assert_eq!(simp("8**(1/3)"), "2");
        assert_eq!(simp("sqrt(sqrt(2))"), "2**(1/4)");
        assert_eq!(simp("(4**(1/3))**(3/2)"), "2");
        assert_eq!(simp("sqrt(9*sqrt(2))"), "3*2**(1/4)");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(simp("sin(pi/6)"), "1/2");
        assert_eq!(simp("cos(pi/4)"), "sqrt(2)/2");
        assert_eq!(simp("atan(1)"), "pi/4");
        assert_eq!(simp("exp(0)"), "1");
        assert_eq!(simp("log(E)"), "1");
        assert_eq!(simp("cos(0)"), "1");
        assert_eq!(simp("E**x"), "exp(x)");
    }

    #[test]
    fn test_symmetry() {
        assert_eq!(simp("sin(-x)"), "-sin(x)");
        assert_eq!(simp("cos(-x)"), "cos(x)");
        assert_eq!(simp("Abs(-x)"), "Abs(x)");
    }

    #[test]
    fn test_cancel_removable_singularity() {
        assert_eq!(simp("(x**2 - 4)/(x - 2)"), "x + 2");
        assert_eq!(simp("(x**2 - 1)/(x**2 + 2*x + 1)"), "(x - 1)/(x + 1)");
    }

    #[test]
    fn test_no_cancel_keeps_form() {
        assert_eq!(simp("x*(x + 1)"), "x*(x + 1)");
    }

    #[test]
    fn test_distribute_coefficient() {
        assert_eq!(simp("2*(x + 1)"), "2*x + 2");
        assert_eq!(simp("-(x - 3)"), "-x + 3");
    }

    #[test]
    fn test_together() {
        let e = Expr::parse_expression("sin(x) + 1/x").unwrap().simplify();
        let (num, den) = e.together();
        assert_eq!(den, x());
        assert_eq!(num.to_string(), "x*sin(x) + 1");
    }

    #[test]
    fn test_extremum_and_piecewise() {
        assert_eq!(simp("Max(1, 3, x)"), "Max(3, x)");
        assert_eq!(simp("Min(2, 5)"), "2");
        assert_eq!(simp("Piecewise((x, 1 > 2), (x**2, True))"), "x**2");
    }
}
