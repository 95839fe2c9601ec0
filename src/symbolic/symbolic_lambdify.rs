use crate::symbolic::symbolic_engine::{Condition, Expr, VAR, ratio_to_f64, real_pow};
use std::f64::consts::{E, PI};

/// compiled one-variable function, shareable between sampling threads
pub type Fn1D = Box<dyn Fn(f64) -> f64 + Send + Sync>;

type Predicate = Box<dyn Fn(f64) -> bool + Send + Sync>;

impl Expr {
    /// LAMBDIFICATION - Converting Symbolic Expressions to Executable Functions

    /// Converts the expression into a closure of `x`.
    ///
    /// The closure follows real semantics: non-real results are NaN, poles are infinite.
    /// Fails when the expression depends on any variable other than `x`.
    ///
    /// # Examples
    /// ```
    /// use RustedFunAnalyzer::symbolic::symbolic_engine::Expr;
    /// let f = Expr::parse_expression("x**2 + 1").unwrap().lambdify1D().unwrap();
    /// assert_eq!(f(3.0), 10.0);
    /// ```
    pub fn lambdify1D(&self) -> Result<Fn1D, String> {
        let foreign: Vec<String> = self
            .free_symbols()
            .into_iter()
            .filter(|name| name != VAR)
            .collect();
        if !foreign.is_empty() {
            return Err(format!(
                "cannot build a numeric function of x: unexpected symbols {}",
                foreign.join(", ")
            ));
        }
        Ok(self.compile())
    }

    fn compile(&self) -> Fn1D {
        match self {
            Expr::Var(_) => Box::new(|x| x),
            Expr::Num(r) => {
                let val = ratio_to_f64(r);
                Box::new(move |_| val)
            }
            Expr::Const(val) => {
                let val = *val;
                Box::new(move |_| val)
            }
            Expr::E => Box::new(|_| E),
            Expr::Pi => Box::new(|_| PI),
            Expr::Add(lhs, rhs) => {
                let (lhs_fn, rhs_fn) = (lhs.compile(), rhs.compile());
                Box::new(move |x| lhs_fn(x) + rhs_fn(x))
            }
            Expr::Sub(lhs, rhs) => {
                let (lhs_fn, rhs_fn) = (lhs.compile(), rhs.compile());
                Box::new(move |x| lhs_fn(x) - rhs_fn(x))
            }
            Expr::Mul(lhs, rhs) => {
                let (lhs_fn, rhs_fn) = (lhs.compile(), rhs.compile());
                Box::new(move |x| lhs_fn(x) * rhs_fn(x))
            }
            Expr::Div(lhs, rhs) => {
                let (lhs_fn, rhs_fn) = (lhs.compile(), rhs.compile());
                Box::new(move |x| lhs_fn(x) / rhs_fn(x))
            }
            Expr::Pow(base, exp) => {
                let base_fn = base.compile();
                match exp.as_integer() {
                    Some(n) if n.unsigned_abs() <= i32::MAX as u64 => {
                        let n = n as i32;
                        Box::new(move |x| base_fn(x).powi(n))
                    }
                    _ => {
                        let exp_fn = exp.compile();
                        Box::new(move |x| real_pow(base_fn(x), exp_fn(x)))
                    }
                }
            }
            Expr::Fun(func, arg) => {
                let func = *func;
                let arg_fn = arg.compile();
                Box::new(move |x| func.apply(arg_fn(x)))
            }
            Expr::Max(args) | Expr::Min(args) => {
                let is_max = matches!(self, Expr::Max(_));
                let arg_fns: Vec<Fn1D> = args.iter().map(|a| a.compile()).collect();
                Box::new(move |x| {
                    let mut acc = f64::NAN;
                    for (i, f) in arg_fns.iter().enumerate() {
                        let v = f(x);
                        if v.is_nan() {
                            return f64::NAN;
                        }
                        acc = if i == 0 {
                            v
                        } else if is_max {
                            acc.max(v)
                        } else {
                            acc.min(v)
                        };
                    }
                    acc
                })
            }
            Expr::Piecewise(branches) => {
                let compiled: Vec<(Fn1D, Predicate)> = branches
                    .iter()
                    .map(|(value, cond)| (value.compile(), compile_condition(cond)))
                    .collect();
                Box::new(move |x| {
                    compiled
                        .iter()
                        .find(|(_, cond)| cond(x))
                        .map(|(value, _)| value(x))
                        .unwrap_or(f64::NAN)
                })
            }
        }
    }
}

fn compile_condition(cond: &Condition) -> Predicate {
    match cond {
        Condition::True => Box::new(|_| true),
        Condition::False => Box::new(|_| false),
        Condition::Rel(lhs, rel, rhs) => {
            let (lhs_fn, rhs_fn, rel) = (lhs.compile(), rhs.compile(), *rel);
            Box::new(move |x| rel.holds(lhs_fn(x), rhs_fn(x)))
        }
        Condition::And(parts) => {
            let parts: Vec<Predicate> = parts.iter().map(compile_condition).collect();
            Box::new(move |x| parts.iter().all(|p| p(x)))
        }
        Condition::Or(parts) => {
            let parts: Vec<Predicate> = parts.iter().map(compile_condition).collect();
            Box::new(move |x| parts.iter().any(|p| p(x)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn f(text: &str) -> Fn1D {
        Expr::parse_expression(text)
            .unwrap()
            .simplify()
            .lambdify1D()
            .unwrap()
    }

    #[test]
    fn test_polynomial() {
        let g = f("x**2 - 4");
        assert_eq!(g(3.0), 5.0);
        assert_eq!(g(-2.0), 0.0);
    }

    #[test]
    fn test_matches_eval() {
        let e = Expr::parse_expression("sin(x) + 1/x + exp(-x**2)").unwrap().simplify();
        let g = e.lambdify1D().unwrap();
        for x in [-2.5, -0.3, 0.7, 4.0] {
            assert_relative_eq!(g(x), e.eval("x", x), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_non_real_is_nan() {
        assert!(f("sqrt(x)")(-1.0).is_nan());
        assert!(f("log(x)")(-1.0).is_nan());
        assert!(f("1/x")(0.0).is_infinite());
    }

    #[test]
    fn test_piecewise_and_extremum() {
        let g = f("Piecewise((-x, x < 0), (x**2, True))");
        assert_eq!(g(-3.0), 3.0);
        assert_eq!(g(2.0), 4.0);
        let h = f("Max(0, x)");
        assert_eq!(h(-1.0), 0.0);
        assert_eq!(h(2.0), 2.0);
    }

    #[test]
    fn test_foreign_symbol_rejected() {
        assert!(Expr::parse_expression("x + y").unwrap().lambdify1D().is_err());
    }

    #[test]
    fn test_thread_safe() {
        let g = f("x**3");
        let handle = std::thread::spawn(move || g(2.0));
        assert_eq!(handle.join().unwrap(), 8.0);
    }
}
