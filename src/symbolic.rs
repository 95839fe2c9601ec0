#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a validated symbolic expression
///
///# Example
/// ```
/// use RustedFunAnalyzer::symbolic::parse_expr::FunctionParser;
/// let parsed = FunctionParser::new().parse("sin(x) + 1/x").unwrap();
/// println!("parsed expression {}", parsed.expr);
/// // anything outside the allow-list is rejected
/// assert!(FunctionParser::new().parse("os.system('x')").is_err());
/// assert!(FunctionParser::new().parse("y + 1").is_err());
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) holds the expression tree over the single variable x
/// 2) substitutes, collects free symbols, evaluates numerically
/// 3) prints expressions the way they are typed: x**2 - 4, sqrt(2)/2, pi/4
///# Example#
/// ```
/// use RustedFunAnalyzer::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x**2 - 4").unwrap().simplify();
/// let at_three = f.subs("x", &Expr::int(3)).simplify();
/// assert_eq!(at_three.to_string(), "5");
/// ```
pub mod symbolic_engine;
/// canonical simplification, numerator/denominator decomposition, cancellation of
/// removable singularities
pub mod symbolic_simplify;
/// analytical derivatives
pub mod symbolic_engine_derivatives;
/// closures for fast numeric sampling
pub mod symbolic_lambdify;
/// exact rational polynomials: gcd, division, real roots
pub mod polynomial;
/// exact forms of floating values
pub mod nsimplify;
pub mod utils;
#[cfg(test)]
mod symbolic_engine_tests;
