//! # Function analyzer
//!
//! Given a validated expression, builds the report shown to the user:
//! domain, range, x- and y-intercepts, an optional evaluation at a chosen point and the
//! step-by-step narratives for the intercepts.
//!
//! Every field degrades on its own. When domain discovery fails the domain is assumed to
//! be ℝ and flagged as such; a range that cannot be computed is "undetermined"; an
//! equation `f(x) = 0` that has no finite list of solutions gives "no closed-form
//! intercepts found", which is not the same as having no intercepts.
//!
//! # Example
//! ```
//! use RustedFunAnalyzer::symbolic::parse_expr::FunctionParser;
//! use RustedFunAnalyzer::analysis::analyzer::FunctionAnalyzer;
//! let parsed = FunctionParser::new().parse("x^2 - 4").unwrap();
//! let report = FunctionAnalyzer::new(&parsed).analyze(Some(3.0));
//! let text = report.text_fields();
//! assert_eq!(text.x_intercepts, vec!["-2", "2"]);
//! assert_eq!(text.y_intercept.as_deref(), Some("-4"));
//! println!("{}", report);
//! ```
use crate::analysis::domain::continuous_domain;
use crate::analysis::function_range::function_range;
use crate::analysis::real_set::{ExactValue, RealSet};
use crate::analysis::solveset::{SolveOutcome, solve_equation};
use crate::symbolic::parse_expr::ParsedFunction;
use crate::symbolic::symbolic_engine::{Expr, VAR, fmt_float, fmt_scientific, uses_exponent};
use log::{debug, info, warn};
use std::fmt;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// printed in place of the intercept list when `f(x) = 0` has no finite explicit solution set
pub const NO_CLOSED_FORM: &str = "no closed-form intercepts found";
/// printed in place of a range that could not be computed
pub const UNDETERMINED: &str = "undetermined";

//___________________________________RESULT TYPES____________________________________

#[derive(Debug, Clone, PartialEq)]
pub enum DomainResult {
    Discovered(RealSet),
    /// discovery failed, ℝ is used without proof
    Assumed,
}

impl DomainResult {
    /// the set used as the universe by the other analysis steps
    pub fn set(&self) -> RealSet {
        match self {
            DomainResult::Discovered(set) => set.clone(),
            DomainResult::Assumed => RealSet::reals(),
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        match self {
            DomainResult::Discovered(set) => set.contains(x),
            DomainResult::Assumed => true,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, DomainResult::Discovered(_))
    }
}

impl fmt::Display for DomainResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DomainResult::Discovered(set) => write!(f, "{}", set),
            DomainResult::Assumed => write!(f, "ℝ (assumed, not verified)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeResult {
    Discovered(RealSet),
    Undetermined(String),
}

impl fmt::Display for RangeResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RangeResult::Discovered(set) => write!(f, "{}", set),
            RangeResult::Undetermined(_) => write!(f, "{}", UNDETERMINED),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XIntercepts {
    /// all real zeros in the domain, possibly none
    Found(Vec<ExactValue>),
    NoClosedForm { reason: String },
}

impl XIntercepts {
    fn from_outcome(outcome: &SolveOutcome) -> XIntercepts {
        match outcome {
            SolveOutcome::Resolved(points) => XIntercepts::Found(points.clone()),
            SolveOutcome::Unresolvable(set) => XIntercepts::NoClosedForm {
                reason: set.to_string(),
            },
            SolveOutcome::Error(message) => XIntercepts::NoClosedForm {
                reason: message.clone(),
            },
        }
    }

    pub fn as_strings(&self) -> Vec<String> {
        match self {
            XIntercepts::Found(points) => points.iter().map(|p| p.to_string()).collect(),
            XIntercepts::NoClosedForm { .. } => vec![NO_CLOSED_FORM.to_string()],
        }
    }
}

/// Outcome of evaluating `f` at a user supplied `x0`.
#[derive(Debug, Clone, PartialEq)]
pub enum PointEvaluation {
    Value {
        x0: f64,
        substituted: Expr,
        numeric: f64,
    },
    /// the denominator of `f` vanishes at `x0`
    Undefined { x0: f64, denominator: Expr },
    Failed { x0: f64, detail: String },
}

impl PointEvaluation {
    pub fn value(&self) -> Option<f64> {
        match self {
            PointEvaluation::Value { numeric, .. } => Some(*numeric),
            _ => None,
        }
    }

    /// Narrative lines for the evaluation of `expr`.
    pub fn steps(&self, expr: &Expr) -> String {
        match self {
            PointEvaluation::Value {
                x0,
                substituted,
                numeric,
            } => {
                let x0 = show_x(*x0);
                [
                    format!("f(x) = {}", expr),
                    format!("Substituting x = {} ⇒ f({}) = {}", x0, x0, substituted),
                    format!("Numeric evaluation ⇒ f({}) ≈ {}", x0, fmt_float(*numeric)),
                ]
                .join("\n")
            }
            PointEvaluation::Undefined { x0, denominator } => {
                let x0 = show_x(*x0);
                [
                    format!("f(x) = {}", expr),
                    format!(
                        "Substituting x = {} ⇒ the denominator vanishes: {} = 0.",
                        x0, denominator
                    ),
                    format!(
                        "The function is not defined at x = {} (division by zero).",
                        x0
                    ),
                ]
                .join("\n")
            }
            PointEvaluation::Failed { x0, detail } => {
                format!("Could not evaluate at x = {}. Detail: {}", show_x(*x0), detail)
            }
        }
    }
}

/// integral values without a fractional part, e.g. `3` rather than `3.0`
fn show_x(x0: f64) -> String {
    if uses_exponent(x0) {
        fmt_scientific(x0)
    } else if x0.fract() == 0.0 && x0.abs() < 1e15 {
        format!("{}", x0 as i64)
    } else {
        format!("{}", x0)
    }
}

//___________________________________REPORT____________________________________

/// Strings handed to the display surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportText {
    pub expression: String,
    pub domain: String,
    pub range: String,
    pub x_intercepts: Vec<String>,
    pub y_intercept: Option<String>,
    pub point_steps: Option<String>,
    pub y_intercept_steps: Option<String>,
    pub x_intercept_steps: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub expr: Expr,
    pub domain: DomainResult,
    pub range: RangeResult,
    pub x_intercepts: XIntercepts,
    pub y_intercept: Option<ExactValue>,
    pub point: Option<PointEvaluation>,
    pub y_intercept_steps: String,
    pub x_intercept_steps: String,
}

#[derive(Tabled)]
struct SummaryRow {
    key: &'static str,
    value: String,
}

impl AnalysisReport {
    pub fn text_fields(&self) -> ReportText {
        ReportText {
            expression: self.expr.to_string(),
            domain: self.domain.to_string(),
            range: self.range.to_string(),
            x_intercepts: self.x_intercepts.as_strings(),
            y_intercept: self.y_intercept.as_ref().map(|v| v.to_string()),
            point_steps: self.point.as_ref().map(|p| p.steps(&self.expr)),
            y_intercept_steps: Some(self.y_intercept_steps.clone()),
            x_intercept_steps: Some(self.x_intercept_steps.clone()),
        }
    }

    /// two-column summary of the main results
    pub fn summary_table(&self) -> String {
        let text = self.text_fields();
        let mut rows = vec![
            SummaryRow {
                key: "f(x)",
                value: text.expression,
            },
            SummaryRow {
                key: "Domain",
                value: text.domain,
            },
            SummaryRow {
                key: "Range",
                value: text.range,
            },
            SummaryRow {
                key: "X intercepts",
                value: if text.x_intercepts.is_empty() {
                    "none".to_string()
                } else {
                    text.x_intercepts.join(", ")
                },
            },
            SummaryRow {
                key: "Y intercept",
                value: text.y_intercept.unwrap_or_else(|| "none".to_string()),
            },
        ];
        if let Some(PointEvaluation::Value { x0, numeric, .. }) = &self.point {
            rows.push(SummaryRow {
                key: "Value at x0",
                value: format!("f({}) ≈ {}", show_x(*x0), fmt_float(*numeric)),
            });
        }
        let mut table = Table::new(&rows);
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = self.text_fields();
        writeln!(f, "f(x) = {}", text.expression)?;
        writeln!(f, "Domain: {}", text.domain)?;
        writeln!(f, "Range: {}", text.range)?;
        if text.x_intercepts.is_empty() {
            writeln!(f, "X intercepts: none")?;
        } else {
            writeln!(f, "X intercepts: {}", text.x_intercepts.join(", "))?;
        }
        match &text.y_intercept {
            Some(y) => writeln!(f, "Y intercept: {}", y)?,
            None => writeln!(f, "Y intercept: none")?,
        }
        for steps in [
            &text.point_steps,
            &text.y_intercept_steps,
            &text.x_intercept_steps,
        ]
        .into_iter()
        .flatten()
        {
            write!(f, "\n{}\n", steps)?;
        }
        Ok(())
    }
}

//___________________________________ANALYZER____________________________________

/// Stateless analysis of one function of `x`.
#[derive(Debug, Clone)]
pub struct FunctionAnalyzer {
    expr: Expr,
}

impl FunctionAnalyzer {
    /// Analyzer of an already simplified parsed function.
    pub fn new(parsed: &ParsedFunction) -> Self {
        FunctionAnalyzer {
            expr: parsed.expr.clone(),
        }
    }

    /// Analyzer of an expression built in code; it is simplified once here.
    pub fn from_expr(expr: &Expr) -> Self {
        FunctionAnalyzer {
            expr: expr.simplify(),
        }
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn domain(&self) -> DomainResult {
        match continuous_domain(&self.expr) {
            Ok(set) => DomainResult::Discovered(set),
            Err(reason) => {
                warn!(
                    "domain of {} not determined ({}), assuming ℝ",
                    self.expr, reason
                );
                DomainResult::Assumed
            }
        }
    }

    pub fn range(&self, domain: &DomainResult) -> RangeResult {
        match function_range(&self.expr, &domain.set()) {
            Ok(set) => RangeResult::Discovered(set),
            Err(reason) => {
                warn!("range of {} undetermined: {}", self.expr, reason);
                RangeResult::Undetermined(reason)
            }
        }
    }

    fn solve_zeros(&self, domain: &DomainResult) -> SolveOutcome {
        let outcome = solve_equation(&self.expr, &domain.set());
        match &outcome {
            SolveOutcome::Resolved(points) => debug!("{} zeros of {}", points.len(), self.expr),
            SolveOutcome::Unresolvable(set) => info!("zeros of {} are not a finite set: {}", self.expr, set),
            SolveOutcome::Error(message) => warn!("solving {} = 0 failed: {}", self.expr, message),
        }
        outcome
    }

    pub fn x_intercepts(&self, domain: &DomainResult) -> XIntercepts {
        XIntercepts::from_outcome(&self.solve_zeros(domain))
    }

    /// `f(0)` when 0 is in the domain and the value is real.
    pub fn y_intercept(&self, domain: &DomainResult) -> Option<ExactValue> {
        if !domain.contains(0.0) {
            return None;
        }
        let value = ExactValue::exact(&self.expr.subs(VAR, &Expr::int(0)));
        value.is_finite().then_some(value)
    }

    /// Evaluates at `x0`, checking the denominator of the numerator/denominator form first.
    pub fn evaluate_at(&self, x0: f64) -> PointEvaluation {
        let at = Expr::from_f64(x0);
        let (_, denominator) = self.expr.together();
        if denominator.contains_variable(VAR) {
            let vanishes = denominator.subs(VAR, &at).simplify().is_zero()
                || denominator.eval(VAR, x0) == 0.0;
            if vanishes {
                debug!("denominator {} of {} vanishes at {}", denominator, self.expr, x0);
                return PointEvaluation::Undefined { x0, denominator };
            }
        }
        let substituted = self.expr.subs(VAR, &at).simplify();
        let numeric = substituted.eval_const();
        if numeric.is_nan() {
            return PointEvaluation::Failed {
                x0,
                detail: format!("f({}) = {} is not a real number", show_x(x0), substituted),
            };
        }
        if numeric.is_infinite() {
            return PointEvaluation::Failed {
                x0,
                detail: format!("f({}) = {} is not finite", show_x(x0), substituted),
            };
        }
        PointEvaluation::Value {
            x0,
            substituted,
            numeric,
        }
    }

    pub fn point_steps(&self, x0: f64) -> String {
        self.evaluate_at(x0).steps(&self.expr)
    }

    pub fn y_intercept_steps(&self, domain: &DomainResult) -> String {
        if !domain.contains(0.0) {
            return "The function is not defined at x = 0, so there is no Y intercept.".to_string();
        }
        format!("Y-axis intercept (x=0):\n{}", self.point_steps(0.0))
    }

    pub fn x_intercept_steps(&self, domain: &DomainResult) -> String {
        self.x_steps_for(&self.solve_zeros(domain))
    }

    fn x_steps_for(&self, outcome: &SolveOutcome) -> String {
        let mut lines = vec![
            "X-axis intercepts (solve f(x)=0):".to_string(),
            format!("f(x) = {}", self.expr),
            "Solve: f(x) = 0".to_string(),
        ];
        lines.push(match outcome {
            SolveOutcome::Resolved(points) if points.is_empty() => {
                "No real solutions in the domain.".to_string()
            }
            SolveOutcome::Resolved(points) => format!(
                "Real solutions in the domain: {}",
                points
                    .iter()
                    .map(|p| format!("x = {}", p))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            SolveOutcome::Unresolvable(set) => {
                format!("No finite symbolic solution set was obtained: {}", set)
            }
            SolveOutcome::Error(message) => {
                format!("Could not solve symbolically. Detail: {}", message)
            }
        });
        lines.join("\n")
    }

    /// Full report; `x0` adds the point evaluation.
    pub fn analyze(&self, x0: Option<f64>) -> AnalysisReport {
        info!("analyzing f(x) = {}", self.expr);
        let domain = self.domain();
        let range = self.range(&domain);
        let zeros = self.solve_zeros(&domain);
        let report = AnalysisReport {
            expr: self.expr.clone(),
            x_intercepts: XIntercepts::from_outcome(&zeros),
            y_intercept: self.y_intercept(&domain),
            point: x0.map(|x0| self.evaluate_at(x0)),
            y_intercept_steps: self.y_intercept_steps(&domain),
            x_intercept_steps: self.x_steps_for(&zeros),
            domain,
            range,
        };
        debug!("report:\n{}", report);
        report
    }
}
