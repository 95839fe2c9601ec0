/// # Function analyzer
/// domain, range, intercepts and step-by-step evaluation of a function of x
///# Example
/// ```
/// use RustedFunAnalyzer::symbolic::parse_expr::FunctionParser;
/// use RustedFunAnalyzer::analysis::analyzer::FunctionAnalyzer;
/// let parsed = FunctionParser::new().parse("sin(x) + 1/x").unwrap();
/// let report = FunctionAnalyzer::new(&parsed).analyze(Some(0.0));
/// // the denominator x vanishes at 0, so the point report explains why f(0) is undefined
/// let text = report.text_fields();
/// assert!(text.point_steps.unwrap().contains("the denominator vanishes: x = 0"));
/// println!("{}", report);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod analyzer;
/// subsets of the real line: unions of intervals with exact endpoints minus periodic lattices
pub mod real_set;
/// solving f(x) = 0 and f(x) > 0 over the reals; the outcome is a tagged variant
/// (Resolved / Unresolvable / Error)
pub mod solveset;
/// continuous domain discovery
pub mod domain;
/// image of a function over its domain
pub mod function_range;
/// numeric one-sided limits with exact-form recovery
pub mod limits;
#[cfg(test)]
mod analyzer_tests;
