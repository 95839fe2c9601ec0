//! Continuous domain of a real function of `x`.
//!
//! Every subexpression contributes a constraint on `x`:
//! - `u**(-n)`: `u != 0`
//! - `u**(p/q)` with non-integer exponent: `u >= 0` (`u > 0` when the exponent is negative)
//! - `u**v` with `v` depending on `x`: `u > 0`
//! - `log(u)`: `u > 0`; `asin(u)`, `acos(u)`: `-1 <= u <= 1`
//! - `tan(u)`, `sec(u)`: `cos(u) != 0`; `csc(u)`, `cot(u)`: `sin(u) != 0`
//! - `Piecewise`: each branch's domain inside the part of its region not claimed by an
//!   earlier branch
//!
//! The domain is the intersection of all constraints. Anything the solver cannot handle
//! makes the whole discovery fail; the caller decides on the fallback.
use crate::analysis::real_set::{ExactValue, RealSet};
use crate::analysis::solveset::{condition_region, solve_inequality, zero_set};
use crate::symbolic::symbolic_engine::{Condition, Expr, Func, Relation, VAR};
use crate::symbolic::symbolic_simplify::{add_terms, negate};
use log::debug;

/// Largest subset of ℝ on which `expr` is real-valued and defined.
pub fn continuous_domain(expr: &Expr) -> Result<RealSet, String> {
    let mut domain = RealSet::reals();
    constrain(expr, &mut domain)?;
    debug!("domain of {}: {}", expr, domain);
    Ok(domain)
}

fn constrain(e: &Expr, domain: &mut RealSet) -> Result<(), String> {
    if !e.contains_variable(VAR) {
        // a constant such as sqrt(-1) is undefined for every x
        if !e.eval_const().is_finite() {
            debug!("{} is not a finite real number", e);
            *domain = RealSet::empty();
        }
        return Ok(());
    }
    match e {
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) => {
            constrain(lhs, domain)?;
            constrain(rhs, domain)
        }
        Expr::Div(lhs, rhs) => {
            constrain(lhs, domain)?;
            constrain(rhs, domain)?;
            if !rhs.contains_variable(VAR) {
                if rhs.eval_const() == 0.0 {
                    *domain = RealSet::empty();
                }
                return Ok(());
            }
            exclude_zeros(rhs, domain)
        }
        Expr::Pow(base, exp) => {
            constrain(base, domain)?;
            constrain(exp, domain)?;
            if exp.contains_variable(VAR) {
                if base.contains_variable(VAR) {
                    return require(base, Relation::Gt, domain);
                }
                let b = base.eval_const();
                if b > 0.0 {
                    return Ok(());
                }
                return Err(format!("{} has a non-positive base", e));
            }
            match exp.as_integer() {
                Some(n) if n < 0 => exclude_zeros(base, domain),
                Some(_) => Ok(()),
                None if exp.eval_const() < 0.0 => require(base, Relation::Gt, domain),
                None => require(base, Relation::Ge, domain),
            }
        }
        Expr::Fun(func, arg) => {
            constrain(arg, domain)?;
            match func {
                Func::Log => require(arg, Relation::Gt, domain),
                Func::Asin | Func::Acos => {
                    let plus_one = add_terms(vec![(**arg).clone(), Expr::int(1)]);
                    let one_minus = add_terms(vec![Expr::int(1), negate(arg)]);
                    require(&plus_one, Relation::Ge, domain)?;
                    require(&one_minus, Relation::Ge, domain)
                }
                Func::Tan | Func::Sec => exclude_zeros(&Expr::fun(Func::Cos, (**arg).clone()), domain),
                Func::Csc | Func::Cot => exclude_zeros(&Expr::fun(Func::Sin, (**arg).clone()), domain),
                _ => Ok(()),
            }
        }
        Expr::Max(args) | Expr::Min(args) => {
            for a in args {
                constrain(a, domain)?;
            }
            Ok(())
        }
        Expr::Piecewise(branches) => {
            let covered = piecewise_domain(branches)?;
            *domain = domain.intersect(&covered);
            Ok(())
        }
        Expr::Var(_) | Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => Ok(()),
    }
}

/// `u rel 0`
fn require(u: &Expr, rel: Relation, domain: &mut RealSet) -> Result<(), String> {
    let allowed = solve_inequality(u, rel)?;
    *domain = domain.intersect(&allowed);
    Ok(())
}

/// `u != 0`
fn exclude_zeros(u: &Expr, domain: &mut RealSet) -> Result<(), String> {
    let zeros = zero_set(u)?;
    let points: Vec<ExactValue> = zeros.points.iter().map(ExactValue::exact).collect();
    let mut out = domain.remove_points(&points);
    for lattice in zeros.lattices {
        out = out.remove_lattice(lattice);
    }
    if !zeros.intervals.is_empty() {
        out = out.intersect(&RealSet::from_intervals(zeros.intervals).complement());
    }
    *domain = out;
    Ok(())
}

fn piecewise_domain(branches: &[(Expr, Condition)]) -> Result<RealSet, String> {
    let mut covered = RealSet::empty();
    let mut total = RealSet::empty();
    for (value, cond) in branches {
        let region = condition_region(cond)?;
        let active = region.intersect(&covered.complement());
        covered = covered.union(&region);
        if active.is_empty() {
            continue;
        }
        let branch_domain = continuous_domain(value)?;
        total = total.union(&branch_domain.intersect(&active));
    }
    Ok(total)
}
