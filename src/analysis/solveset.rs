//! # Solving equations and inequalities over the reals
//!
//! [`solve_equation`] finds the real zeros of `f` inside a domain and reports them as a
//! tagged [`SolveOutcome`]: a finite explicit list, an infinite or non-isolable set, or
//! an error. Callers match on it exhaustively.
//!
//! The zeros of an expression are found by inversion:
//! 1) `f` is brought over a common denominator and only the numerator is solved; zeros
//!    of the denominator are discarded afterwards
//! 2) polynomials (and rational functions) are solved exactly, see [`Poly::real_roots`]
//! 3) a product vanishes where one of its factors does
//! 4) `a*g(u) + c = 0` is inverted through `g`: powers, `exp`/`log`, `Abs`, hyperbolic and
//!    inverse trigonometric functions directly; periodic functions of linear arguments
//!    give lattices `offset + k*period`
//! 5) sums that are a polynomial in a single non-polynomial kernel are solved for the
//!    kernel first (`log(x)**2 - log(x) - 2 = 0`)
//! 6) `Piecewise`, `Max` and `Min` are solved branch by branch inside the branch regions
//!
//! Anything else cannot be isolated and is reported as a condition set.
//!
//! [`solve_inequality`] builds a sign chart over the zeros and poles of `f`.

use crate::analysis::real_set::{Bound, ExactValue, Interval, Lattice, RealSet, same_point};
use crate::symbolic::polynomial::Poly;
use crate::symbolic::symbolic_engine::{Condition, Expr, Func, Relation, VAR};
use crate::symbolic::symbolic_engine_derivatives::extremum_as_piecewise;
use crate::symbolic::symbolic_simplify::{add_terms, mul_factors, negate, simplify_fun, simplify_pow};
use log::debug;
use num::rational::Rational64;
use std::fmt;

/// Result of solving `f(x) = 0` over a domain.
#[derive(Clone, Debug, PartialEq)]
pub enum SolveOutcome {
    /// finite explicit set of real solutions, ascending
    Resolved(Vec<ExactValue>),
    /// the solution set exists but is not a finite list
    Unresolvable(Unsolved),
    /// the solver failed
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Unsolved {
    /// infinitely many isolated solutions
    Periodic {
        lattices: Vec<Lattice>,
        points: Vec<ExactValue>,
        excluded: Vec<ExactValue>,
    },
    /// the equation holds on whole intervals
    Set(RealSet),
    /// the variable could not be isolated
    Condition { expr: Expr, domain: RealSet },
}

impl fmt::Display for Unsolved {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Unsolved::Periodic {
                lattices,
                points,
                excluded,
            } => {
                let mut parts: Vec<String> = lattices.iter().map(|l| l.to_string()).collect();
                if !points.is_empty() {
                    parts.push(RealSet::points(points.clone()).to_string());
                }
                let text = parts.join(" ∪ ");
                if excluded.is_empty() {
                    write!(f, "{}", text)
                } else {
                    let text = if parts.len() > 1 { format!("({})", text) } else { text };
                    write!(f, "{} \\ {}", text, RealSet::points(excluded.clone()))
                }
            }
            Unsolved::Set(set) => write!(f, "{}", set),
            Unsolved::Condition { expr, domain } => {
                write!(f, "ConditionSet(x, Eq({}, 0), {})", expr, domain)
            }
        }
    }
}

//___________________________________ZERO SETS____________________________________

/// Zeros of an expression: isolated points, periodic families and whole intervals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ZeroSet {
    pub points: Vec<Expr>,
    pub lattices: Vec<Lattice>,
    pub intervals: Vec<Interval>,
}

impl ZeroSet {
    fn point(p: Expr) -> ZeroSet {
        ZeroSet {
            points: vec![p],
            ..ZeroSet::default()
        }
    }

    fn everywhere() -> ZeroSet {
        ZeroSet {
            intervals: vec![Interval::reals()],
            ..ZeroSet::default()
        }
    }

    fn lattice(l: Lattice) -> ZeroSet {
        ZeroSet {
            lattices: vec![l],
            ..ZeroSet::default()
        }
    }

    fn extend(&mut self, other: ZeroSet) {
        self.points.extend(other.points);
        for l in other.lattices {
            if !self.lattices.contains(&l) {
                self.lattices.push(l);
            }
        }
        self.intervals.extend(other.intervals);
    }

    /// true when the zeros are finitely many isolated points
    pub fn is_finite(&self) -> bool {
        self.lattices.is_empty() && self.intervals.is_empty()
    }

    /// the zeros lying in `region`
    fn restricted_to(self, region: &RealSet) -> Result<ZeroSet, Stuck> {
        let mut out = ZeroSet::default();
        out.points = self
            .points
            .into_iter()
            .filter(|p| region.contains(p.eval_const()))
            .collect();
        for l in self.lattices {
            if region.is_reals() {
                out.lattices.push(l);
            } else if region.is_bounded() {
                let (lo, hi) = hull(region);
                out.points.extend(
                    l.points_between(lo, hi)
                        .into_iter()
                        .filter(|p| region.contains(p.value))
                        .map(|p| p.expr),
                );
            } else {
                return Err(Stuck::Condition);
            }
        }
        if !self.intervals.is_empty() {
            let covered = RealSet::from_intervals(self.intervals).intersect(region);
            out.intervals = covered.intervals().to_vec();
        }
        Ok(out)
    }
}

fn hull(set: &RealSet) -> (f64, f64) {
    let lo = set.intervals().first().map(|i| i.lo_value()).unwrap_or(f64::NAN);
    let hi = set.intervals().last().map(|i| i.hi_value()).unwrap_or(f64::NAN);
    (lo, hi)
}

/// why inversion stopped
#[derive(Debug)]
enum Stuck {
    /// the variable cannot be isolated
    Condition,
    Error(String),
}

/// Zeros of `e` over ℝ.
pub fn zero_set(e: &Expr) -> Result<ZeroSet, String> {
    zeros_of(e).map_err(|stuck| match stuck {
        Stuck::Condition => format!("cannot isolate x in {} = 0", e),
        Stuck::Error(message) => message,
    })
}

fn zeros_of(e: &Expr) -> Result<ZeroSet, Stuck> {
    if !e.contains_variable(VAR) {
        return Ok(if e.is_zero() || e.eval_const() == 0.0 {
            ZeroSet::everywhere()
        } else {
            ZeroSet::default()
        });
    }
    if let Some(p) = Poly::from_expr(e, VAR) {
        return Ok(polynomial_zeros(&p));
    }
    if let Some((num, den)) = e.rational_parts() {
        let poles = den.real_roots();
        let mut zeros = polynomial_zeros(&num);
        zeros.points.retain(|z| {
            let v = z.eval_const();
            !poles.iter().any(|p| same_point(p.eval_const(), v))
        });
        return Ok(zeros);
    }
    match e {
        Expr::Mul(_, _) => {
            let (coeff, factors) = e.as_coeff_factors();
            if coeff.is_zero() {
                return Ok(ZeroSet::everywhere());
            }
            let mut out = ZeroSet::default();
            for factor in &factors {
                out.extend(zeros_of(factor)?);
            }
            Ok(out)
        }
        Expr::Div(num, _) => zeros_of(num),
        Expr::Pow(base, exp) => {
            if !exp.contains_variable(VAR) {
                if exp.eval_const() > 0.0 {
                    zeros_of(base)
                } else {
                    Ok(ZeroSet::default())
                }
            } else if base.contains_variable(VAR) {
                zeros_of(base)
            } else {
                Ok(ZeroSet::default())
            }
        }
        Expr::Fun(func, arg) => fun_zeros(*func, arg),
        Expr::Add(_, _) | Expr::Sub(_, _) => invert_sum(e),
        Expr::Piecewise(branches) => piecewise_zeros(branches),
        Expr::Max(args) => zeros_of(&extremum_as_piecewise(args, Relation::Ge)),
        Expr::Min(args) => zeros_of(&extremum_as_piecewise(args, Relation::Le)),
        _ => Err(Stuck::Condition),
    }
}

fn polynomial_zeros(p: &Poly) -> ZeroSet {
    if p.is_zero() {
        ZeroSet::everywhere()
    } else {
        ZeroSet {
            points: p.real_roots(),
            ..ZeroSet::default()
        }
    }
}

/// `u - c`
fn shifted(u: &Expr, c: Expr) -> Expr {
    add_terms(vec![u.clone(), negate(&c)])
}

fn fun_zeros(func: Func, u: &Expr) -> Result<ZeroSet, Stuck> {
    match func {
        Func::Abs | Func::Asin | Func::Atan | Func::Sinh | Func::Tanh => zeros_of(u),
        Func::Log | Func::Acos => zeros_of(&shifted(u, Expr::int(1))),
        Func::Exp | Func::Cosh | Func::Sec | Func::Csc => Ok(ZeroSet::default()),
        Func::Sin | Func::Tan => periodic(u, Expr::int(0), Expr::Pi),
        Func::Cos | Func::Cot => periodic(u, half_pi(), Expr::Pi),
        Func::Floor => step_region(u, Rational64::from_integer(0), true, false),
        Func::Ceiling => step_region(u, Rational64::from_integer(-1), false, true),
    }
}

fn half_pi() -> Expr {
    mul_factors(vec![Expr::rational(1, 2), Expr::Pi])
}

fn two_pi() -> Expr {
    mul_factors(vec![Expr::int(2), Expr::Pi])
}

/// `u = a*x + b` as `(a, b)`
fn linear_parts(u: &Expr) -> Option<(Rational64, Rational64)> {
    let p = Poly::from_expr(u, VAR)?;
    if p.degree() != 1 {
        return None;
    }
    Some((p.coeffs()[1], p.coeffs()[0]))
}

/// solutions of `u = offset + k*period`
fn periodic(u: &Expr, offset: Expr, period: Expr) -> Result<ZeroSet, Stuck> {
    let (a, b) = linear_parts(u).ok_or(Stuck::Condition)?;
    let inv = Expr::Num(a.recip());
    let x_offset = mul_factors(vec![add_terms(vec![offset, Expr::Num(-b)]), inv.clone()]);
    let x_period = mul_factors(vec![period, inv]);
    Lattice::new(&x_offset, &x_period)
        .map(ZeroSet::lattice)
        .ok_or_else(|| Stuck::Error(format!("degenerate period in {}", u)))
}

/// `{x : n + lo <= u < n + lo + 1}` style regions of `floor`/`ceiling`, `u` linear
fn step_region(u: &Expr, lo: Rational64, lo_closed: bool, hi_closed: bool) -> Result<ZeroSet, Stuck> {
    let (a, b) = linear_parts(u).ok_or(Stuck::Condition)?;
    let hi = lo + Rational64::from_integer(1);
    let to_x = |v: Rational64| ExactValue::new(Expr::Num((v - b) / a));
    let bound = |v: Rational64, closed: bool| {
        if closed { Bound::Closed(to_x(v)) } else { Bound::Open(to_x(v)) }
    };
    let interval = if a > Rational64::from_integer(0) {
        Interval::new(bound(lo, lo_closed), bound(hi, hi_closed))
    } else {
        Interval::new(bound(hi, hi_closed), bound(lo, lo_closed))
    };
    Ok(ZeroSet {
        intervals: vec![interval],
        ..ZeroSet::default()
    })
}

fn sum_terms(e: &Expr) -> Vec<Expr> {
    match e {
        Expr::Add(lhs, rhs) => {
            let mut out = sum_terms(lhs);
            out.extend(sum_terms(rhs));
            out
        }
        Expr::Sub(lhs, rhs) => {
            let mut out = sum_terms(lhs);
            out.extend(sum_terms(rhs).iter().map(negate));
            out
        }
        _ => vec![e.clone()],
    }
}

/// `a*g(u) + c = 0` solved as `g(u) = -c/a`; otherwise a polynomial in one kernel
fn invert_sum(e: &Expr) -> Result<ZeroSet, Stuck> {
    let (var_terms, const_terms): (Vec<Expr>, Vec<Expr>) = sum_terms(e)
        .into_iter()
        .partition(|t| t.contains_variable(VAR));
    if let [term] = var_terms.as_slice() {
        let (coeff, factors) = term.as_coeff_factors();
        if let [factor] = factors.as_slice() {
            let inverse = coeff.recip().ok_or(Stuck::Condition)?;
            let target = mul_factors(vec![negate(&add_terms(const_terms)), Expr::number(inverse)]);
            return solve_for(factor, &target.simplify());
        }
    }
    substitute_kernel(e)
}

/// the subexpressions through which `x` enters a polynomial expression
fn collect_kernels(e: &Expr, out: &mut Vec<Expr>) {
    if !e.contains_variable(VAR) {
        return;
    }
    match e {
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) => {
            collect_kernels(lhs, out);
            collect_kernels(rhs, out);
        }
        Expr::Pow(base, exp) if exp.as_integer().is_some_and(|n| n > 0) => {
            collect_kernels(base, out)
        }
        _ => {
            if !out.contains(e) {
                out.push(e.clone())
            }
        }
    }
}

fn replace(e: &Expr, target: &Expr, with: &Expr) -> Expr {
    if e == target {
        with.clone()
    } else {
        e.map_children(&|child: &Expr| replace(child, target, with))
    }
}

fn substitute_kernel(e: &Expr) -> Result<ZeroSet, Stuck> {
    let mut kernels = Vec::new();
    collect_kernels(e, &mut kernels);
    let [kernel] = kernels.as_slice() else {
        return Err(Stuck::Condition);
    };
    if matches!(kernel, Expr::Var(_)) {
        return Err(Stuck::Condition);
    }
    let placeholder = "kernel";
    let reduced = replace(e, kernel, &Expr::Var(placeholder.to_string()));
    let p = Poly::from_expr(&reduced, placeholder).ok_or(Stuck::Condition)?;
    debug!("solving {} as a polynomial in {}", e, kernel);
    let mut out = ZeroSet::default();
    for root in p.real_roots() {
        out.extend(solve_for(kernel, &root)?);
    }
    Ok(out)
}

/// Solutions of `u = target` for a constant `target`.
fn solve_for(u: &Expr, target: &Expr) -> Result<ZeroSet, Stuck> {
    let v = target.eval_const();
    if !v.is_finite() {
        return Ok(ZeroSet::default());
    }
    let none = Ok(ZeroSet::default());
    match u {
        Expr::Var(name) if name == VAR => Ok(ZeroSet::point(target.clone())),
        Expr::Pow(base, exp) if !exp.contains_variable(VAR) => {
            let p = exp.eval_const();
            if v == 0.0 {
                return if p > 0.0 { zeros_of(base) } else { none };
            }
            match exp.as_integer() {
                Some(0) => Err(Stuck::Condition),
                Some(n) if n % 2 == 0 => {
                    if v < 0.0 {
                        return none;
                    }
                    let r = simplify_pow(target.clone(), Expr::rational(1, n));
                    let mut out = solve_for(base, &r)?;
                    out.extend(solve_for(base, &negate(&r))?);
                    Ok(out)
                }
                Some(n) => {
                    // odd powers are invertible on the whole line
                    let r = if v < 0.0 {
                        negate(&simplify_pow(negate(target), Expr::rational(1, n)))
                    } else {
                        simplify_pow(target.clone(), Expr::rational(1, n))
                    };
                    solve_for(base, &r)
                }
                None => {
                    if v < 0.0 {
                        return none;
                    }
                    let inverse = match exp.as_rational() {
                        Some(q) => Expr::Num(q.recip()),
                        None => Expr::Const(1.0 / p),
                    };
                    solve_for(base, &simplify_pow(target.clone(), inverse))
                }
            }
        }
        Expr::Pow(base, exp) if !base.contains_variable(VAR) => {
            let b = base.eval_const();
            if v <= 0.0 || b <= 0.0 || b == 1.0 {
                return none;
            }
            let w = mul_factors(vec![
                simplify_fun(Func::Log, target.clone()),
                simplify_pow(simplify_fun(Func::Log, (**base).clone()), Expr::int(-1)),
            ]);
            solve_for(exp, &w)
        }
        Expr::Fun(func, arg) => invert_fun(*func, arg, target, v),
        Expr::Mul(_, _) => {
            let (coeff, factors) = u.as_coeff_factors();
            match (factors.as_slice(), coeff.recip()) {
                ([factor], Some(inverse)) => {
                    solve_for(factor, &mul_factors(vec![target.clone(), Expr::number(inverse)]))
                }
                _ if Poly::from_expr(u, VAR).is_some() => zeros_of(&shifted(u, target.clone())),
                _ => Err(Stuck::Condition),
            }
        }
        Expr::Piecewise(branches) => piecewise_zeros(
            &branches
                .iter()
                .map(|(value, cond)| (shifted(value, target.clone()), cond.clone()))
                .collect::<Vec<_>>(),
        ),
        Expr::Max(args) => solve_for(&extremum_as_piecewise(args, Relation::Ge), target),
        Expr::Min(args) => solve_for(&extremum_as_piecewise(args, Relation::Le), target),
        Expr::Add(_, _) | Expr::Sub(_, _) => zeros_of(&shifted(u, target.clone())),
        _ => Err(Stuck::Condition),
    }
}

fn union_of(parts: Vec<Result<ZeroSet, Stuck>>) -> Result<ZeroSet, Stuck> {
    let mut out = ZeroSet::default();
    for part in parts {
        out.extend(part?);
    }
    Ok(out)
}

/// `func(w) = target`
fn invert_fun(func: Func, w: &Expr, target: &Expr, v: f64) -> Result<ZeroSet, Stuck> {
    let none = Ok(ZeroSet::default());
    let fun = |f: Func, arg: &Expr| simplify_fun(f, arg.clone());
    match func {
        Func::Exp => {
            if v <= 0.0 {
                return none;
            }
            solve_for(w, &fun(Func::Log, target))
        }
        Func::Log => solve_for(w, &fun(Func::Exp, target)),
        Func::Abs => {
            if v < 0.0 {
                none
            } else if v == 0.0 {
                zeros_of(w)
            } else {
                union_of(vec![solve_for(w, target), solve_for(w, &negate(target))])
            }
        }
        Func::Sin => {
            if v.abs() > 1.0 {
                return none;
            }
            let a = fun(Func::Asin, target);
            let mirrored = add_terms(vec![Expr::Pi, negate(&a)]);
            union_of(vec![periodic(w, a, two_pi()), periodic(w, mirrored, two_pi())])
        }
        Func::Cos => {
            if v.abs() > 1.0 {
                return none;
            }
            let a = fun(Func::Acos, target);
            union_of(vec![periodic(w, negate(&a), two_pi()), periodic(w, a, two_pi())])
        }
        Func::Tan => periodic(w, fun(Func::Atan, target), Expr::Pi),
        Func::Cot => {
            if v == 0.0 {
                return periodic(w, half_pi(), Expr::Pi);
            }
            let reciprocal = simplify_pow(target.clone(), Expr::int(-1));
            periodic(w, fun(Func::Atan, &reciprocal), Expr::Pi)
        }
        Func::Sec | Func::Csc => {
            if v.abs() < 1.0 {
                return none;
            }
            let inner = if func == Func::Sec { Func::Cos } else { Func::Sin };
            let reciprocal = simplify_pow(target.clone(), Expr::int(-1));
            invert_fun(inner, w, &reciprocal, 1.0 / v)
        }
        Func::Asin => {
            if v.abs() > std::f64::consts::FRAC_PI_2 {
                return none;
            }
            solve_for(w, &fun(Func::Sin, target))
        }
        Func::Acos => {
            if !(0.0..=std::f64::consts::PI).contains(&v) {
                return none;
            }
            solve_for(w, &fun(Func::Cos, target))
        }
        Func::Atan => {
            if v.abs() >= std::f64::consts::FRAC_PI_2 {
                return none;
            }
            solve_for(w, &fun(Func::Tan, target))
        }
        Func::Sinh => {
            let a = if target.is_exact_constant() {
                log_form(target, 1)
            } else {
                ExactValue::from_f64(v.asinh()).expr
            };
            solve_for(w, &a)
        }
        Func::Tanh => {
            if v.abs() >= 1.0 {
                return none;
            }
            let a = if target.is_exact_constant() {
                // atanh(u) = log((1 + u)/(1 - u))/2
                let one_plus = add_terms(vec![Expr::int(1), target.clone()]);
                let one_minus = add_terms(vec![Expr::int(1), negate(target)]);
                let ratio = mul_factors(vec![one_plus, simplify_pow(one_minus, Expr::int(-1))]);
                mul_factors(vec![Expr::rational(1, 2), fun(Func::Log, &ratio)])
            } else {
                ExactValue::from_f64(v.atanh()).expr
            };
            solve_for(w, &a)
        }
        Func::Cosh => {
            if v < 1.0 {
                none
            } else if v == 1.0 {
                zeros_of(w)
            } else {
                let a = if target.is_exact_constant() {
                    log_form(target, -1)
                } else {
                    ExactValue::from_f64(v.acosh()).expr
                };
                union_of(vec![solve_for(w, &negate(&a)), solve_for(w, &a)])
            }
        }
        Func::Floor | Func::Ceiling => {
            if v.fract() != 0.0 {
                return none;
            }
            let n = Rational64::from_integer(v as i64);
            if func == Func::Floor {
                step_region(w, n, true, false)
            } else {
                step_region(w, n - Rational64::from_integer(1), false, true)
            }
        }
    }
}

fn piecewise_zeros(branches: &[(Expr, Condition)]) -> Result<ZeroSet, Stuck> {
    let mut covered = RealSet::empty();
    let mut out = ZeroSet::default();
    for (value, cond) in branches {
        let region = condition_region(cond).map_err(Stuck::Error)?;
        let active = region.intersect(&covered.complement());
        covered = covered.union(&region);
        if active.is_empty() {
            continue;
        }
        out.extend(zeros_of(value)?.restricted_to(&active)?);
    }
    Ok(out)
}

//___________________________________EQUATIONS____________________________________

/// `log(u + sqrt(u**2 + shift))`: asinh for `shift = 1`, acosh for `shift = -1`
fn log_form(u: &Expr, shift: i64) -> Expr {
    let square = simplify_pow(u.clone(), Expr::int(2));
    let root = simplify_pow(add_terms(vec![square, Expr::int(shift)]), Expr::rational(1, 2));
    simplify_fun(Func::Log, add_terms(vec![u.clone(), root]))
}

/// Exact form of a zero of `f`. A float zero whose exact look-alike does not make `f`
/// vanish as well as the float does is kept as a float.
fn exact_zero(f: &Expr, zero: &Expr) -> ExactValue {
    let simplified = zero.simplify();
    if simplified.is_exact_constant() {
        return ExactValue::new(simplified);
    }
    let root = simplified.eval_const();
    let candidate = ExactValue::from_f64(root);
    if candidate.expr.is_exact_constant() && !residual_agrees(f, candidate.value, root) {
        debug!("{} is not a zero of {}, keeping {}", candidate, f, root);
        return ExactValue::new(Expr::Const(root));
    }
    candidate
}

fn residual_agrees(f: &Expr, candidate: f64, root: f64) -> bool {
    let at_candidate = f.eval(VAR, candidate).abs();
    let at_root = f.eval(VAR, root).abs();
    // rounding noise of evaluating the terms of f near the root
    let scale: f64 = sum_terms(f).iter().map(|t| t.eval(VAR, root).abs()).sum();
    at_candidate <= (16.0 * at_root).max(64.0 * f64::EPSILON * scale)
}

/// Solves `expr = 0` over `domain`.
///
/// Solutions are simplified to exact form (floats are recovered as radicals, rationals
/// or multiples of `pi` when possible) and listed in ascending order.
pub fn solve_equation(expr: &Expr, domain: &RealSet) -> SolveOutcome {
    if domain.is_empty() {
        return SolveOutcome::Resolved(Vec::new());
    }
    if domain.intervals().iter().all(|i| i.is_point()) && domain.holes().is_empty() {
        // nothing to isolate: check every point of the domain
        let points = domain
            .isolated_points()
            .into_iter()
            .filter(|p| vanishes_at(expr, p))
            .collect();
        return SolveOutcome::Resolved(points);
    }
    let (num, den) = expr.together();
    let zeros = match zeros_of(&num) {
        Ok(z) => z,
        Err(Stuck::Condition) => {
            debug!("cannot isolate x in {} = 0", expr);
            return SolveOutcome::Unresolvable(Unsolved::Condition {
                expr: expr.clone(),
                domain: domain.clone(),
            });
        }
        Err(Stuck::Error(message)) => return SolveOutcome::Error(message),
    };
    let admissible = |x: f64| {
        domain.contains(x)
            && (!den.contains_variable(VAR) || {
                let d = den.eval(VAR, x);
                d.is_finite() && d.abs() > 1e-12
            })
    };
    let mut points: Vec<ExactValue> = zeros
        .points
        .iter()
        .map(|p| exact_zero(&num, p))
        .filter(|p| p.is_finite() && admissible(p.value))
        .collect();
    let mut lattices = Vec::new();
    for lattice in zeros.lattices {
        if domain.is_bounded() {
            let (lo, hi) = hull(domain);
            points.extend(
                lattice
                    .points_between(lo, hi)
                    .into_iter()
                    .filter(|p| admissible(p.value)),
            );
        } else {
            lattices.push(lattice);
        }
    }
    sort_points(&mut points);
    if !zeros.intervals.is_empty() {
        let region = RealSet::from_intervals(zeros.intervals).intersect(domain);
        if region.intervals().iter().any(|i| !i.is_point()) {
            return SolveOutcome::Unresolvable(Unsolved::Set(
                region.union(&RealSet::points(points)),
            ));
        }
        points.extend(region.isolated_points());
        sort_points(&mut points);
    }
    if !lattices.is_empty() {
        let excluded = excluded_lattice_points(&lattices, &den, domain, &admissible);
        return SolveOutcome::Unresolvable(Unsolved::Periodic {
            lattices,
            points,
            excluded,
        });
    }
    SolveOutcome::Resolved(points)
}

fn vanishes_at(expr: &Expr, at: &ExactValue) -> bool {
    let value = expr.subs(VAR, &at.expr).simplify();
    if value.is_zero() {
        return true;
    }
    let v = value.eval_const();
    v.is_finite() && v.abs() <= 1e-12
}

/// lattice points ruled out by poles or by finite domain boundaries
fn excluded_lattice_points(
    lattices: &[Lattice],
    den: &Expr,
    domain: &RealSet,
    admissible: &impl Fn(f64) -> bool,
) -> Vec<ExactValue> {
    let mut candidates: Vec<ExactValue> = Vec::new();
    if den.contains_variable(VAR) {
        if let Ok(zeros) = zero_set(den) {
            candidates.extend(zeros.points.iter().map(ExactValue::exact));
        }
    }
    for i in domain.intervals() {
        candidates.extend(i.lo.exact().cloned());
        candidates.extend(i.hi.exact().cloned());
    }
    let mut excluded: Vec<ExactValue> = candidates
        .into_iter()
        .filter(|c| !admissible(c.value) && lattices.iter().any(|l| l.contains(c.value)))
        .collect();
    sort_points(&mut excluded);
    excluded
}

fn sort_points(points: &mut Vec<ExactValue>) {
    points.sort_by(|a, b| a.value.total_cmp(&b.value));
    points.dedup_by(|a, b| same_point(a.value, b.value));
}

//___________________________________INEQUALITIES____________________________________

/// finitely many zeros of `e`, exact and ascending
fn finite_zeros(e: &Expr) -> Result<Vec<ExactValue>, String> {
    let zeros = zero_set(e)?;
    if !zeros.is_finite() {
        return Err(format!("the zeros of {} are not a finite set of points", e));
    }
    let mut points: Vec<ExactValue> = zeros
        .points
        .iter()
        .map(ExactValue::exact)
        .filter(|p| p.is_finite())
        .collect();
    sort_points(&mut points);
    Ok(points)
}

/// Solves `expr rel 0` over ℝ with a sign chart over the zeros and poles of `expr`.
pub fn solve_inequality(expr: &Expr, rel: Relation) -> Result<RealSet, String> {
    let (num, den) = expr.together();
    let zeros = finite_zeros(&num)?;
    let poles = if den.contains_variable(VAR) {
        finite_zeros(&den)?
    } else {
        Vec::new()
    };
    let is_pole = |p: &ExactValue| poles.iter().any(|q| same_point(q.value, p.value));
    match rel {
        Relation::Eq => {
            return Ok(RealSet::points(zeros.into_iter().filter(|z| !is_pole(z)).collect()));
        }
        Relation::Ne => {
            let mut removed = zeros.clone();
            removed.extend(poles.iter().cloned());
            return Ok(RealSet::reals().remove_points(&removed));
        }
        _ => {}
    }
    let mut breaks: Vec<(ExactValue, bool)> = zeros
        .iter()
        .filter(|z| !is_pole(z))
        .map(|z| (z.clone(), true))
        .chain(poles.iter().map(|p| (p.clone(), false)))
        .collect();
    breaks.sort_by(|a, b| a.0.value.total_cmp(&b.0.value));
    let holds = |x: f64| rel.holds(expr.eval(VAR, x), 0.0);
    let non_strict = matches!(rel, Relation::Le | Relation::Ge);
    let mut pieces = Vec::new();
    let mut lo = Bound::Unbounded;
    for (p, is_zero) in breaks {
        let segment = Interval::new(lo, Bound::Open(p.clone()));
        if holds(segment.sample()) {
            pieces.push(segment);
        }
        if is_zero && non_strict {
            pieces.push(Interval::point(p.clone()));
        }
        lo = Bound::Open(p);
    }
    let last = Interval::new(lo, Bound::Unbounded);
    if holds(last.sample()) {
        pieces.push(last);
    }
    Ok(RealSet::from_intervals(pieces))
}

/// Region of ℝ where a `Piecewise` condition holds.
pub fn condition_region(cond: &Condition) -> Result<RealSet, String> {
    match cond {
        Condition::True => Ok(RealSet::reals()),
        Condition::False => Ok(RealSet::empty()),
        Condition::Rel(lhs, rel, rhs) => {
            let difference = shifted(lhs, (**rhs).clone()).simplify();
            solve_inequality(&difference, *rel)
        }
        Condition::And(parts) => parts.iter().try_fold(RealSet::reals(), |acc, c| {
            Ok(acc.intersect(&condition_region(c)?))
        }),
        Condition::Or(parts) => parts.iter().try_fold(RealSet::empty(), |acc, c| {
            Ok(acc.union(&condition_region(c)?))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn f(text: &str) -> Expr {
        Expr::parse_expression(text).unwrap().simplify()
    }

    fn solve(text: &str) -> SolveOutcome {
        solve_equation(&f(text), &RealSet::reals())
    }

    fn resolved(text: &str) -> Vec<String> {
        match solve(text) {
            SolveOutcome::Resolved(points) => points.iter().map(|p| p.to_string()).collect(),
            other => panic!("{} was not resolved: {:?}", text, other),
        }
    }

    #[test]
    fn test_polynomial_roots() {
        assert_eq!(resolved("x**2 - 4"), vec!["-2", "2"]);
        assert_eq!(resolved("x**2 - 2"), vec!["-sqrt(2)", "sqrt(2)"]);
        assert_eq!(resolved("x**2 + 1"), Vec::<String>::new());
        assert_eq!(resolved("2*x - 1"), vec!["1/2"]);
    }

    #[test]
    fn test_rational_function_drops_poles() {
        assert!(resolved("1/x").is_empty());
        assert_eq!(resolved("(x - 1)/(x + 1)"), vec!["1"]);
    }

    #[test]
    fn test_inversion_through_functions() {
        assert_eq!(resolved("log(x) - 1"), vec!["E"]);
        assert_eq!(resolved("exp(x) - 1"), vec!["0"]);
        assert!(resolved("exp(x) + 1").is_empty());
        assert_eq!(resolved("sqrt(x) - 3"), vec!["9"]);
        assert_eq!(resolved("Abs(x) - 2"), vec!["-2", "2"]);
        assert_eq!(resolved("atan(x) - pi/4"), vec!["1"]);
    }

    #[test]
    fn test_product_of_factors() {
        assert_eq!(resolved("x*(x - 3)*exp(x)"), vec!["0", "3"]);
    }

    #[test]
    fn test_kernel_substitution() {
        let roots = resolved("log(x)**2 - log(x) - 2");
        assert_eq!(roots.len(), 2);
        assert!(roots.contains(&"exp(2)".to_string()));
    }

    #[test]
    fn test_periodic_solutions_are_unresolvable() {
        match solve("sin(x)") {
            SolveOutcome::Unresolvable(u @ Unsolved::Periodic { .. }) => {
                assert_eq!(u.to_string(), "{k*pi | k ∈ ℤ}");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_periodic_solutions_enumerated_on_bounded_domain() {
        let window = RealSet::from_interval(Interval::closed(
            ExactValue::new(Expr::int(0)),
            ExactValue::new(two_pi()),
        ));
        match solve_equation(&f("cos(x)"), &window) {
            SolveOutcome::Resolved(points) => {
                let texts: Vec<String> = points.iter().map(|p| p.to_string()).collect();
                assert_eq!(texts, vec!["pi/2", "3*pi/2"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sin_over_x_excludes_the_pole() {
        match solve_equation(&f("sin(x)/x"), &RealSet::reals().remove_points(&[ExactValue::new(Expr::int(0))])) {
            SolveOutcome::Unresolvable(u) => assert_eq!(u.to_string(), "{k*pi | k ∈ ℤ} \\ {0}"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_condition_set() {
        match solve("x + sin(x) + 1") {
            SolveOutcome::Unresolvable(u @ Unsolved::Condition { .. }) => {
                assert!(u.to_string().starts_with("ConditionSet(x, Eq("));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_identically_zero_is_a_set() {
        assert!(matches!(
            solve_equation(&Expr::int(0), &RealSet::reals()),
            SolveOutcome::Unresolvable(Unsolved::Set(_))
        ));
        assert_eq!(resolved("5"), Vec::<String>::new());
    }

    #[test]
    fn test_domain_filters_solutions() {
        let positive = RealSet::from_interval(Interval::new(
            Bound::Open(ExactValue::new(Expr::int(0))),
            Bound::Unbounded,
        ));
        match solve_equation(&f("x**2 - 4"), &positive) {
            SolveOutcome::Resolved(points) => assert_eq!(points.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_point_domain_is_checked_directly() {
        let one = RealSet::points(vec![ExactValue::new(Expr::int(1))]);
        match solve_equation(&f("sqrt(x - 1) + sqrt(1 - x)"), &one) {
            SolveOutcome::Resolved(points) => {
                assert_eq!(points.iter().map(|p| p.to_string()).collect::<Vec<_>>(), vec!["1"])
            }
            other => panic!("unexpected {:?}", other),
        }
        let two_points = RealSet::points(vec![
            ExactValue::new(Expr::int(1)),
            ExactValue::new(Expr::int(2)),
        ]);
        match solve_equation(&f("x - 2 + sin(x - 2)"), &two_points) {
            SolveOutcome::Resolved(points) => {
                assert_eq!(points.iter().map(|p| p.to_string()).collect::<Vec<_>>(), vec!["2"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_hyperbolic_inverses_are_exact() {
        assert_eq!(resolved("cosh(x) - 2"), vec!["-log(sqrt(3) + 2)", "log(sqrt(3) + 2)"]);
        assert_eq!(resolved("sinh(x) - 1"), vec!["log(sqrt(2) + 1)"]);
        assert_eq!(resolved("tanh(x) - 1/2"), vec!["log(3)/2"]);
        assert!(resolved("cosh(x) + 2").is_empty());
    }

    #[test]
    fn test_binomials_give_real_roots() {
        assert_eq!(resolved("x**3 - 2"), vec!["2**(1/3)"]);
        assert_eq!(resolved("x**4 - 2"), vec!["-2**(1/4)", "2**(1/4)"]);
    }

    #[test]
    fn test_float_zeros_are_not_snapped() {
        // the small root is about 8.1e-12, not 0
        let points = match solve("x**2 - 123456789012*x + 1") {
            SolveOutcome::Resolved(points) => points,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(points.len(), 2);
        assert!(!points[0].expr.is_zero());
        assert_relative_eq!(points[0].value, 1.0 / 123456789012.0, max_relative = 1e-6);
        assert_relative_eq!(points[1].value, 123456789012.0, max_relative = 1e-12);
    }

    #[test]
    fn test_exact_zero_rejects_look_alikes() {
        let g = f("x**2 - 123456789012*x + 1");
        let kept = exact_zero(&g, &Expr::Const(1e-13));
        assert_eq!(kept.expr, Expr::Const(1e-13));
        let recovered = exact_zero(&f("x**2 - 2"), &Expr::Const(2f64.sqrt()));
        assert_eq!(recovered.to_string(), "sqrt(2)");
    }

    #[test]
    fn test_piecewise_zeros() {
        assert_eq!(resolved("Piecewise((x + 1, x < 0), (x - 1, True))"), vec!["-1", "1"]);
        assert_eq!(resolved("Max(x, 2) - 3"), vec!["3"]);
    }

    #[test]
    fn test_inequalities() {
        let s = solve_inequality(&f("1 - x**2"), Relation::Ge).unwrap();
        assert_eq!(s.to_string(), "[-1, 1]");
        let s = solve_inequality(&f("x**2 - 1"), Relation::Gt).unwrap();
        assert_eq!(s.to_string(), "(-∞, -1) ∪ (1, ∞)");
        let s = solve_inequality(&f("1/x"), Relation::Gt).unwrap();
        assert_eq!(s.to_string(), "(0, ∞)");
        let s = solve_inequality(&f("x**2 + 1"), Relation::Gt).unwrap();
        assert!(s.is_reals());
    }

    #[test]
    fn test_condition_region() {
        let cond = Condition::And(vec![
            Condition::Rel(Expr::x().boxed(), Relation::Ge, Expr::int(0).boxed()),
            Condition::Rel(Expr::x().boxed(), Relation::Lt, Expr::int(2).boxed()),
        ]);
        assert_eq!(condition_region(&cond).unwrap().to_string(), "[0, 2)");
    }
}
