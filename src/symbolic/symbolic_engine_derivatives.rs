//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of expressions. Range discovery needs `f'` to locate
//! critical points and the points where `f'` itself is undefined.
//!
//! ## Key Methods
//!
//! - `diff(var)` - derivative in canonical form
//! - `n_th_derivative1D(var, n)` - repeated differentiation
//!
//! `Piecewise` is differentiated branch by branch; `Max`/`Min` are rewritten as
//! two-branch `Piecewise` first. `floor` and `ceiling` have derivative zero wherever
//! they are differentiable.

use crate::symbolic::symbolic_engine::{Condition, Expr, Func, Relation};

impl Expr {
    /// Derivative with respect to `var`, simplified.
    pub fn diff(&self, var: &str) -> Expr {
        self.diff_raw(var).simplify_basic()
    }

    pub fn n_th_derivative1D(&self, var: &str, n: usize) -> Expr {
        (0..n).fold(self.clone(), |acc, _| acc.diff(var))
    }

    fn diff_raw(&self, var: &str) -> Expr {
        if !self.contains_variable(var) {
            return Expr::int(0);
        }
        match self {
            Expr::Var(name) => Expr::int(if name == var { 1 } else { 0 }),
            Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => Expr::int(0),
            Expr::Add(lhs, rhs) => lhs.diff_raw(var) + rhs.diff_raw(var),
            Expr::Sub(lhs, rhs) => lhs.diff_raw(var) - rhs.diff_raw(var),
            Expr::Mul(lhs, rhs) => {
                lhs.diff_raw(var) * *rhs.clone() + *lhs.clone() * rhs.diff_raw(var)
            }
            Expr::Div(lhs, rhs) => {
                let numerator = lhs.diff_raw(var) * *rhs.clone() - *lhs.clone() * rhs.diff_raw(var);
                numerator / rhs.clone().pow(Expr::int(2))
            }
            Expr::Pow(base, exp) => {
                if !exp.contains_variable(var) {
                    // power rule
                    *exp.clone()
                        * base.clone().pow(*exp.clone() - Expr::int(1))
                        * base.diff_raw(var)
                } else if !base.contains_variable(var) {
                    self.clone() * base.clone().ln() * exp.diff_raw(var)
                } else {
                    // d(u^v) = u^v * (v' ln u + v u'/u)
                    self.clone()
                        * (exp.diff_raw(var) * base.clone().ln()
                            + *exp.clone() * base.diff_raw(var) / *base.clone())
                }
            }
            Expr::Fun(func, arg) => {
                let u = *arg.clone();
                let outer = match func {
                    Func::Abs => u.clone() / Expr::fun(Func::Abs, u.clone()),
                    Func::Sin => Expr::fun(Func::Cos, u.clone()),
                    Func::Cos => -Expr::fun(Func::Sin, u.clone()),
                    Func::Tan => Expr::fun(Func::Sec, u.clone()).pow(Expr::int(2)),
                    Func::Asin => {
                        Expr::int(1) / Expr::sqrt(Expr::int(1) - u.clone().pow(Expr::int(2)))
                    }
                    Func::Acos => {
                        -(Expr::int(1) / Expr::sqrt(Expr::int(1) - u.clone().pow(Expr::int(2))))
                    }
                    Func::Atan => Expr::int(1) / (Expr::int(1) + u.clone().pow(Expr::int(2))),
                    Func::Sec => Expr::fun(Func::Sec, u.clone()) * Expr::fun(Func::Tan, u.clone()),
                    Func::Csc => -(Expr::fun(Func::Csc, u.clone()) * Expr::fun(Func::Cot, u.clone())),
                    Func::Cot => -(Expr::fun(Func::Csc, u.clone()).pow(Expr::int(2))),
                    Func::Sinh => Expr::fun(Func::Cosh, u.clone()),
                    Func::Cosh => Expr::fun(Func::Sinh, u.clone()),
                    Func::Tanh => Expr::int(1) - Expr::fun(Func::Tanh, u.clone()).pow(Expr::int(2)),
                    Func::Exp => Expr::fun(Func::Exp, u.clone()),
                    Func::Log => Expr::int(1) / u.clone(),
                    Func::Floor | Func::Ceiling => Expr::int(0),
                };
                outer * u.diff_raw(var)
            }
            Expr::Max(args) | Expr::Min(args) => {
                let rel = if matches!(self, Expr::Max(_)) {
                    Relation::Ge
                } else {
                    Relation::Le
                };
                extremum_as_piecewise(args, rel).diff_raw(var)
            }
            Expr::Piecewise(branches) => Expr::Piecewise(
                branches
                    .iter()
                    .map(|(value, cond)| (value.diff_raw(var), cond.clone()))
                    .collect(),
            ),
        }
    }
}

/// `Max(a, b, ...)` as `Piecewise((a, a >= Max(b, ...)), (Max(b, ...), True))`
pub fn extremum_as_piecewise(args: &[Expr], rel: Relation) -> Expr {
    match args {
        [] => Expr::Piecewise(Vec::new()),
        [single] => single.clone(),
        [first, rest @ ..] => {
            let tail = if rest.len() == 1 {
                rest[0].clone()
            } else if rel == Relation::Ge {
                Expr::Max(rest.to_vec())
            } else {
                Expr::Min(rest.to_vec())
            };
            let tail_expanded = extremum_as_piecewise(rest, rel);
            Expr::Piecewise(vec![
                (
                    first.clone(),
                    Condition::Rel(first.clone().boxed(), rel, tail.boxed()),
                ),
                (tail_expanded, Condition::True),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(text: &str) -> Expr {
        Expr::parse_expression(text).unwrap().simplify().diff("x")
    }

    #[test]
    fn test_polynomial_derivative() {
        assert_eq!(d("x**3 - 2*x + 1").to_string(), "3*x**2 - 2");
        assert_eq!(d("5").to_string(), "0");
    }

    #[test]
    fn test_quotient_derivative() {
        let df = d("1/x");
        assert_relative_eq!(df.eval("x", 2.0), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_chain_rule() {
        let df = d("sin(x**2)");
        assert_relative_eq!(df.eval("x", 1.5), 3.0 * (2.25f64).cos(), epsilon = 1e-12);
        let df = d("log(x**2 + 1)");
        assert_relative_eq!(df.eval("x", 1.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_and_hyperbolic() {
        assert_relative_eq!(d("atan(x)").eval("x", 1.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(d("asin(x)").eval("x", 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(d("tanh(x)").eval("x", 0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_variable_exponent() {
        let df = d("x**x");
        assert_relative_eq!(df.eval("x", 2.0), 4.0 * (2f64.ln() + 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_max_derivative() {
        let df = d("Max(0, x)");
        assert_relative_eq!(df.eval("x", 1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(df.eval("x", -1.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_second_derivative() {
        let f = Expr::parse_expression("x**3").unwrap();
        assert_eq!(f.n_th_derivative1D("x", 2).to_string(), "6*x");
    }
}
