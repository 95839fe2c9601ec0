#[cfg(test)]
mod tests {
    use crate::analysis::analyzer::{
        DomainResult, FunctionAnalyzer, NO_CLOSED_FORM, PointEvaluation, RangeResult, UNDETERMINED,
        XIntercepts,
    };
    use crate::symbolic::parse_expr::FunctionParser;
    use approx::assert_relative_eq;

    fn analyzer(text: &str) -> FunctionAnalyzer {
        let parsed = FunctionParser::new().parse(text).unwrap();
        FunctionAnalyzer::new(&parsed)
    }

    #[test]
    fn test_reciprocal() {
        let a = analyzer("1/x");
        let report = a.analyze(None);
        assert!(report.domain.is_verified());
        assert!(!report.domain.contains(0.0));
        assert_eq!(report.domain.to_string(), "(-∞, 0) ∪ (0, ∞)");
        assert_eq!(report.y_intercept, None);
        // no spurious zero
        match &report.x_intercepts {
            XIntercepts::Found(points) => assert!(points.is_empty()),
            XIntercepts::NoClosedForm { .. } => {}
        }
        assert_eq!(report.range.to_string(), "(-∞, 0) ∪ (0, ∞)");
        let text = report.text_fields();
        assert!(text.x_intercepts.iter().all(|s| s != "0"));
        assert_eq!(
            text.y_intercept_steps.as_deref(),
            Some("The function is not defined at x = 0, so there is no Y intercept.")
        );
        assert!(text.x_intercept_steps.unwrap().ends_with("No real solutions in the domain."));
    }

    #[test]
    fn test_quadratic() {
        let report = analyzer("x^2 - 4").analyze(None);
        let text = report.text_fields();
        assert_eq!(text.expression, "x**2 - 4");
        assert_eq!(text.domain, "ℝ");
        assert_eq!(text.range, "[-4, ∞)");
        assert_eq!(text.x_intercepts, vec!["-2", "2"]);
        assert_eq!(text.y_intercept.as_deref(), Some("-4"));
        assert_eq!(text.point_steps, None);
        assert_eq!(
            text.x_intercept_steps.as_deref(),
            Some(
                "X-axis intercepts (solve f(x)=0):\nf(x) = x**2 - 4\nSolve: f(x) = 0\n\
                 Real solutions in the domain: x = -2, x = 2"
            )
        );
        assert_eq!(
            text.y_intercept_steps.as_deref(),
            Some(
                "Y-axis intercept (x=0):\nf(x) = x**2 - 4\nSubstituting x = 0 ⇒ f(0) = -4\n\
                 Numeric evaluation ⇒ f(0) ≈ -4.0"
            )
        );
    }

    #[test]
    fn test_irrational_intercepts_are_exact() {
        let text = analyzer("x**2 - 2").analyze(None).text_fields();
        assert_eq!(text.x_intercepts, vec!["-sqrt(2)", "sqrt(2)"]);
    }

    #[test]
    fn test_decimal_coefficients_are_kept() {
        let text = analyzer("x^2 - 2.5").analyze(None).text_fields();
        assert_eq!(text.x_intercepts, vec!["-sqrt(10)/2", "sqrt(10)/2"]);
        let a = analyzer("0.5*x + 0.25");
        assert_relative_eq!(a.evaluate_at(1.0).value().unwrap(), 0.75);
    }

    #[test]
    fn test_point_on_a_pole() {
        let a = analyzer("sin(x) + 1/x");
        match a.evaluate_at(0.0) {
            PointEvaluation::Undefined { denominator, .. } => {
                assert_eq!(denominator.to_string(), "x")
            }
            other => panic!("expected an undefined point, got {:?}", other),
        }
        let expected = format!(
            "f(x) = {}\nSubstituting x = 0 ⇒ the denominator vanishes: x = 0.\n\
             The function is not defined at x = 0 (division by zero).",
            a.expr()
        );
        assert_eq!(a.point_steps(0.0), expected);
    }

    #[test]
    fn test_point_value() {
        let a = analyzer("x^2");
        let evaluation = a.evaluate_at(3.0);
        match &evaluation {
            PointEvaluation::Value {
                substituted,
                numeric,
                ..
            } => {
                assert_eq!(substituted.to_string(), "9");
                assert_relative_eq!(*numeric, 9.0);
            }
            other => panic!("expected a value, got {:?}", other),
        }
        assert_eq!(
            evaluation.steps(a.expr()),
            "f(x) = x**2\nSubstituting x = 3 ⇒ f(3) = 9\nNumeric evaluation ⇒ f(3) ≈ 9.0"
        );
    }

    #[test]
    fn test_decimal_point_is_substituted_exactly() {
        let a = analyzer("2*x");
        let steps = a.point_steps(2.5);
        assert!(steps.contains("Substituting x = 2.5 ⇒ f(2.5) = 5"));
        assert!(steps.ends_with("≈ 5.0"));
    }

    #[test]
    fn test_failed_evaluation_outside_the_domain() {
        let a = analyzer("sqrt(x)");
        match a.evaluate_at(-1.0) {
            PointEvaluation::Failed { detail, .. } => assert!(detail.contains("not a real number")),
            other => panic!("expected a failure, got {:?}", other),
        }
        assert!(a.point_steps(-1.0).starts_with("Could not evaluate at x = -1. Detail:"));
        match a.evaluate_at(-1.0).value() {
            None => {}
            Some(v) => panic!("unexpected value {}", v),
        }
    }

    #[test]
    fn test_log_at_zero_is_not_finite() {
        let a = analyzer("log(x)");
        assert!(matches!(a.evaluate_at(0.0), PointEvaluation::Failed { .. }));
    }

    #[test]
    fn test_periodic_zeros_are_not_enumerable() {
        let report = analyzer("sin(x)").analyze(None);
        match &report.x_intercepts {
            XIntercepts::NoClosedForm { reason } => assert_eq!(reason, "{k*pi | k ∈ ℤ}"),
            other => panic!("expected no closed form, got {:?}", other),
        }
        let text = report.text_fields();
        assert_eq!(text.x_intercepts, vec![NO_CLOSED_FORM]);
        assert_eq!(text.y_intercept.as_deref(), Some("0"));
        assert_eq!(text.range, "[-1, 1]");
        assert!(text.x_intercept_steps.unwrap().ends_with(
            "No finite symbolic solution set was obtained: {k*pi | k ∈ ℤ}"
        ));
    }

    #[test]
    fn test_unsolvable_equation() {
        let report = analyzer("x + sin(x) + 1").analyze(None);
        assert!(matches!(report.x_intercepts, XIntercepts::NoClosedForm { .. }));
        assert!(report.x_intercept_steps.contains("ConditionSet(x, Eq("));
    }

    #[test]
    fn test_degraded_fields() {
        let report = analyzer("log(x + sin(x))").analyze(None);
        assert_eq!(report.domain, DomainResult::Assumed);
        assert_eq!(report.domain.to_string(), "ℝ (assumed, not verified)");
        let report = analyzer("floor(x)").analyze(None);
        assert!(matches!(report.range, RangeResult::Undetermined(_)));
        assert_eq!(report.text_fields().range, UNDETERMINED);
    }

    #[test]
    fn test_constant_function() {
        let text = analyzer("5").analyze(Some(1.0)).text_fields();
        assert_eq!(text.range, "{5}");
        assert!(text.x_intercepts.is_empty());
        assert_eq!(text.y_intercept.as_deref(), Some("5"));
    }

    #[test]
    fn test_domain_restricts_intercepts() {
        let text = analyzer("sqrt(x)*(x + 1)").analyze(None).text_fields();
        assert_eq!(text.domain, "[0, ∞)");
        assert_eq!(text.x_intercepts, vec!["0"]);
    }

    #[test]
    fn test_tiny_intercept_is_not_zero() {
        let text = analyzer("x^2 - 123456789012*x + 1").analyze(None).text_fields();
        assert_eq!(text.y_intercept.as_deref(), Some("1"));
        assert_eq!(text.x_intercepts.len(), 2);
        assert_ne!(text.x_intercepts[0], "0");
        assert!(text.x_intercepts[0].ends_with("e-12"));
    }

    #[test]
    fn test_undefined_constants() {
        for input in ["sqrt(-1)", "log(-1)", "1/0"] {
            let text = analyzer(input).analyze(None).text_fields();
            assert_eq!(text.domain, "∅", "{}", input);
            assert_eq!(text.range, "∅", "{}", input);
            assert!(text.x_intercepts.is_empty());
            assert_eq!(text.y_intercept, None);
        }
        let text = analyzer("log(x, 1)").analyze(None).text_fields();
        assert_eq!(text.domain, "∅");
        assert!(text.x_intercepts.is_empty());
    }

    #[test]
    fn test_single_point_domain() {
        let text = analyzer("sqrt(x - 1) + sqrt(1 - x)").analyze(None).text_fields();
        assert_eq!(text.domain, "{1}");
        assert_eq!(text.range, "{0}");
        assert_eq!(text.x_intercepts, vec!["1"]);
    }

    #[test]
    fn test_cube_root_and_cosh_intercepts() {
        let text = analyzer("x^3 - 2").analyze(None).text_fields();
        assert_eq!(text.x_intercepts, vec!["2**(1/3)"]);
        let text = analyzer("cosh(x) - 2").analyze(None).text_fields();
        assert_eq!(text.x_intercepts, vec!["-log(sqrt(3) + 2)", "log(sqrt(3) + 2)"]);
    }

    #[test]
    fn test_huge_point_uses_exponent_notation() {
        let a = analyzer("2*x");
        let steps = a.point_steps(1e20);
        assert!(steps.contains("Substituting x = 1e+20"));
        assert!(steps.ends_with("f(1e+20) ≈ 2e+20"));
        let text = a.analyze(Some(1e20)).text_fields();
        assert!(!text.point_steps.unwrap().contains("100000000000000000000"));
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let a = analyzer("sin(x) + 1/x");
        let first = a.analyze(Some(2.0));
        let second = a.analyze(Some(2.0));
        assert_eq!(first.text_fields(), second.text_fields());
        let fresh = analyzer("sin(x) + 1/x").analyze(Some(2.0));
        assert_eq!(first.text_fields(), fresh.text_fields());
    }

    #[test]
    fn test_report_rendering() {
        let report = analyzer("x^2 - 4").analyze(Some(3.0));
        let rendered = report.to_string();
        assert!(rendered.starts_with("f(x) = x**2 - 4\nDomain: ℝ\nRange: [-4, ∞)\n"));
        assert!(rendered.contains("X intercepts: -2, 2"));
        assert!(rendered.contains("Numeric evaluation ⇒ f(3) ≈ 5.0"));
        let table = report.summary_table();
        assert!(table.contains("Domain"));
        assert!(table.contains("f(3) ≈ 5.0"));
    }
}
