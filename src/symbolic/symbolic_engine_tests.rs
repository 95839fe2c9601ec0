use crate::symbolic::symbolic_engine::{
    Condition, Expr, Func, Number, Relation, VAR, fmt_float, ratio_to_f64, real_pow,
};
use num::rational::Rational64;
use std::f64;
use std::str::FromStr;
//___________________________________TESTS____________________________________

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn x() -> Expr {
        Expr::x()
    }

    #[test]
    fn test_operators_build_trees() {
        let expr = x() + Expr::int(2);
        assert_eq!(expr, Expr::Add(Box::new(x()), Box::new(Expr::int(2))));
        let expr = x() / Expr::int(2);
        assert_eq!(expr, Expr::Div(Box::new(x()), Box::new(Expr::int(2))));
        let expr = -x();
        assert_eq!(expr, Expr::Mul(Box::new(Expr::int(-1)), Box::new(x())));
    }

    #[test]
    fn test_display_of_raw_trees() {
        assert_eq!((x() + Expr::int(2)).to_string(), "x + 2");
        assert_eq!((x() - Expr::int(4)).to_string(), "x - 4");
        assert_eq!(x().pow(Expr::int(2)).to_string(), "x**2");
        assert_eq!(Expr::sqrt(x()).to_string(), "sqrt(x)");
        assert_eq!(Expr::fun(Func::Sin, x()).to_string(), "sin(x)");
        assert_eq!(Expr::fun(Func::Abs, x()).to_string(), "Abs(x)");
        assert_eq!(x().exp().to_string(), "exp(x)");
        assert_eq!(x().ln().to_string(), "log(x)");
        assert_eq!(Expr::rational(1, 2).to_string(), "1/2");
        assert_eq!(Expr::int(-3).to_string(), "-3");
        assert_eq!(Expr::Const(2.5).to_string(), "2.5");
        assert_eq!(Expr::Pi.to_string(), "pi");
        assert_eq!(Expr::E.to_string(), "E");
    }

    #[test]
    fn test_display_grouping() {
        let sum = x() + Expr::int(1);
        assert_eq!((sum.clone() * x()).to_string(), "(x + 1)*x");
        assert_eq!(sum.clone().pow(Expr::int(2)).to_string(), "(x + 1)**2");
        assert_eq!((Expr::int(1) / sum).to_string(), "1/(x + 1)");
        assert_eq!(Expr::Max(vec![x(), Expr::int(0)]).to_string(), "Max(x, 0)");
    }

    #[test]
    fn test_display_of_products() {
        let half_pi = Expr::product(Number::Exact(Rational64::new(1, 2)), vec![Expr::Pi]);
        assert_eq!(half_pi.to_string(), "pi/2");
        let e = Expr::product(Number::int(-3), vec![x(), Expr::fun(Func::Sin, x())]);
        assert_eq!(e.to_string(), "-3*x*sin(x)");
        assert_eq!(Expr::product(Number::int(1), vec![x()]), x());
        assert_eq!(Expr::product(Number::int(0), vec![x()]), Expr::int(0));
    }

    #[test]
    fn test_display_of_piecewise() {
        let e = Expr::Piecewise(vec![
            (
                x(),
                Condition::Rel(Box::new(x()), Relation::Lt, Box::new(Expr::int(0))),
            ),
            (x().pow(Expr::int(2)), Condition::True),
        ]);
        assert_eq!(e.to_string(), "Piecewise((x, x < 0), (x**2, True))");
    }

    #[test]
    fn test_free_symbols() {
        let e = Expr::fun(Func::Sin, x()) + Expr::int(1) / x();
        assert_eq!(e.free_symbols().into_iter().collect::<Vec<_>>(), vec!["x"]);
        assert!(e.contains_variable(VAR));
        assert!(Expr::Pi.free_symbols().is_empty());
        let foreign = x() + Expr::Var("y".to_string());
        assert!(foreign.contains_variable("y"));
        assert!(!(Expr::Pi + Expr::E).contains_variable(VAR));
    }

    #[test]
    fn test_subs_and_set_variable() {
        let e = x().pow(Expr::int(2)) - Expr::int(4);
        let at_three = e.subs(VAR, &Expr::int(3));
        assert_eq!(at_three.to_string(), "3**2 - 4");
        assert!(!at_three.contains_variable(VAR));
        assert_eq!(e.set_variable(VAR, 0.5), e.subs(VAR, &Expr::rational(1, 2)));
    }

    #[test]
    fn test_eval_real_semantics() {
        let e = x().pow(Expr::int(2)) - Expr::int(4);
        assert_relative_eq!(e.eval(VAR, 3.0), 5.0);
        assert!(Expr::sqrt(x()).eval(VAR, -1.0).is_nan());
        assert!(x().ln().eval(VAR, -1.0).is_nan());
        assert!((Expr::int(1) / x()).eval(VAR, 0.0).is_infinite());
        assert_relative_eq!(Expr::Pi.eval_const(), f64::consts::PI);
        assert!(Expr::Var("y".to_string()).eval(VAR, 1.0).is_nan());
        assert_relative_eq!(real_pow(-8.0, 3.0), -512.0);
        assert!(real_pow(-8.0, 1.0 / 3.0).is_nan());
    }

    #[test]
    fn test_eval_piecewise_and_extrema() {
        let e = Expr::Piecewise(vec![
            (
                -x(),
                Condition::Rel(Box::new(x()), Relation::Lt, Box::new(Expr::int(0))),
            ),
            (x(), Condition::True),
        ]);
        assert_relative_eq!(e.eval(VAR, -2.0), 2.0);
        assert_relative_eq!(e.eval(VAR, 3.0), 3.0);
        let no_match = Expr::Piecewise(vec![(x(), Condition::False)]);
        assert!(no_match.eval(VAR, 1.0).is_nan());
        let m = Expr::Max(vec![x(), Expr::int(1)]);
        assert_relative_eq!(m.eval(VAR, 0.0), 1.0);
        assert!(Expr::Min(vec![x(), Expr::sqrt(x())]).eval(VAR, -1.0).is_nan());
    }

    #[test]
    fn test_conditions() {
        let inside = Condition::And(vec![
            Condition::Rel(Box::new(x()), Relation::Ge, Box::new(Expr::int(0))),
            Condition::Rel(Box::new(x()), Relation::Lt, Box::new(Expr::int(2))),
        ]);
        assert!(inside.holds_at(VAR, 1.0));
        assert!(!inside.holds_at(VAR, 2.0));
        assert_eq!(inside.to_string(), "(x >= 0) & (x < 2)");
        assert!(!Relation::Lt.holds(f64::NAN, 1.0));
        assert_eq!(Relation::from_symbol("!="), Some(Relation::Ne));
        assert_eq!(Relation::from_symbol("=>"), None);
        let shifted = inside.map_exprs(&|e| e.subs(VAR, &(x() + Expr::int(1))));
        assert!(shifted.holds_at(VAR, 0.5));
        assert!(!shifted.holds_at(VAR, 1.5));
    }

    #[test]
    fn test_func_allow_list_lookup() {
        assert_eq!(Func::from_str("sin"), Ok(Func::Sin));
        assert_eq!(Func::from_str("ln"), Ok(Func::Log));
        assert_eq!(Func::from_str("abs"), Ok(Func::Abs));
        assert_eq!(Func::from_str("Abs"), Ok(Func::Abs));
        assert!(Func::from_str("system").is_err());
        assert!(Func::from_str("eval").is_err());
        assert!(Func::Tan.is_trigonometric());
        assert!(!Func::Atan.is_trigonometric());
        assert!(Func::Sin.is_odd() && Func::Cos.is_even());
    }

    #[test]
    fn test_func_apply() {
        assert_relative_eq!(Func::Sec.apply(0.0), 1.0);
        assert_relative_eq!(Func::Floor.apply(-1.5), -2.0);
        assert_relative_eq!(Func::Ceiling.apply(-1.5), -1.0);
        assert!(Func::Asin.apply(2.0).is_nan());
        assert!(Func::Log.apply(0.0).is_infinite());
    }

    #[test]
    fn test_number_arithmetic() {
        let half = Number::Exact(Rational64::new(1, 2));
        assert_eq!(half.add(half), Number::int(1));
        assert_eq!(half.mul(Number::int(4)), Number::int(2));
        assert_eq!(Number::int(2).recip(), Some(half));
        assert_eq!(Number::int(0).recip(), None);
        assert_eq!(Number::int(2).powi(-2), Some(Number::Exact(Rational64::new(1, 4))));
        assert!(!half.add(Number::Float(0.25)).is_exact());
        assert_relative_eq!(half.add(Number::Float(0.25)).to_f64(), 0.75);
        assert_eq!(Number::int(-3).abs(), Number::int(3));
        assert_eq!(Number::int(7).as_integer(), Some(7));
        assert_eq!(half.as_integer(), None);
    }

    #[test]
    fn test_number_overflow_degrades_to_float() {
        let big = Number::int(i64::MAX);
        let sum = big.add(Number::int(1));
        assert!(!sum.is_exact());
        assert_relative_eq!(sum.to_f64(), i64::MAX as f64);
    }

    #[test]
    fn test_number_from_f64() {
        assert_eq!(Number::from_f64(3.0), Number::int(3));
        assert_eq!(Number::from_f64(2.5), Number::Exact(Rational64::new(5, 2)));
        assert_eq!(Number::from_f64(-0.125), Number::Exact(Rational64::new(-1, 8)));
        assert!(!Number::from_f64(f64::consts::PI).is_exact());
        assert_eq!(Expr::from_f64(4.0), Expr::int(4));
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(fmt_float(9.0), "9.0");
        assert_eq!(fmt_float(-4.0), "-4.0");
        assert_eq!(fmt_float(0.25), "0.25");
        assert_eq!(fmt_float(f64::INFINITY), "inf");
        assert_eq!(fmt_float(f64::NAN), "nan");
        assert_eq!(fmt_float(1e308), "1e+308");
        assert_eq!(fmt_float(-2.5e20), "-2.5e+20");
        assert_eq!(fmt_float(1e16), "1e+16");
        assert_eq!(fmt_float(1e15), "1000000000000000.0");
        assert_eq!(fmt_float(8.1e-12), "8.1e-12");
        assert_eq!(fmt_float(0.0), "0.0");
        assert_eq!(Expr::Const(1e300).to_string(), "1e+300");
        assert_relative_eq!(ratio_to_f64(&Rational64::new(1, 3)), 1.0 / 3.0);
    }

    #[test]
    fn test_coeff_factors() {
        let e = Expr::int(-3) * (x() * Expr::fun(Func::Cos, x()));
        let (coeff, factors) = e.as_coeff_factors();
        assert_eq!(coeff, Number::int(-3));
        assert_eq!(factors, vec![x(), Expr::fun(Func::Cos, x())]);
        let (coeff, factors) = Expr::int(5).as_coeff_factors();
        assert_eq!(coeff, Number::int(5));
        assert!(factors.is_empty());
    }

    #[test]
    fn test_sum_builder() {
        assert_eq!(Expr::sum(Vec::new()), Expr::int(0));
        assert_eq!(Expr::sum(vec![x()]), x());
        assert_eq!(Expr::sum(vec![x(), Expr::int(1), Expr::Pi]).to_string(), "x + 1 + pi");
    }

    #[test]
    fn test_queries() {
        assert!(Expr::int(0).is_zero());
        assert!(Expr::Const(1.0).is_one());
        assert!((Expr::Pi + Expr::int(1)).is_constant());
        assert!(!x().is_constant());
        assert_eq!(Expr::int(-2).as_integer(), Some(-2));
        assert_eq!(Expr::rational(1, 2).as_integer(), None);
        assert!(Expr::fun(Func::Floor, x()).contains_func(&|f| f == Func::Floor));
        assert!(Expr::Max(vec![x()]).contains_piecewise());
        assert!(!Expr::fun(Func::Sin, x()).contains_piecewise());
    }

    #[test]
    fn test_simplified_parse_round_trip_to_text() {
        for (input, expected) in [
            ("x**2 - 4", "x**2 - 4"),
            ("2*x/4", "x/2"),
            ("sqrt(8)", "2*sqrt(2)"),
        ] {
            let e = Expr::parse_expression(input).unwrap().simplify();
            assert_eq!(e.to_string(), expected, "input {}", input);
        }
    }
}
