//! # Real sets
//!
//! Subsets of ℝ as produced by domain, range and equation solving: a sorted, disjoint
//! union of intervals with exact endpoints, minus periodic families of excluded points
//! ("holes", e.g. the poles of `tan`).
//!
//! Every endpoint keeps its exact symbolic form ([`ExactValue`]) for display and a float
//! for ordering. Comparisons between endpoints use a small relative tolerance, so that
//! `sqrt(2)` obtained by two different routes is recognised as one point.
//!
//! ```
//! use RustedFunAnalyzer::analysis::real_set::{ExactValue, RealSet};
//! use RustedFunAnalyzer::symbolic::symbolic_engine::Expr;
//! let zero = ExactValue::new(Expr::int(0));
//! let punctured = RealSet::reals().remove_points(&[zero]);
//! assert_eq!(punctured.to_string(), "(-∞, 0) ∪ (0, ∞)");
//! assert!(!punctured.contains(0.0));
//! ```
use crate::symbolic::nsimplify::{DEFAULT_TOLERANCE, nsimplify};
use crate::symbolic::symbolic_engine::{Expr, Number};
use crate::symbolic::symbolic_simplify::{add_terms, mul_factors};
use std::cmp::Ordering;
use std::fmt;

const EPS: f64 = 1e-12;
/// lattices are never enumerated beyond this many points
const MAX_LATTICE_POINTS: i64 = 10_000;

/// `a == b` up to rounding
pub fn same_point(a: f64, b: f64) -> bool {
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= EPS * a.abs().max(b.abs()).max(1.0)
}

//___________________________________EXACT VALUES____________________________________

/// Exact constant together with its numeric value.
#[derive(Clone, Debug, PartialEq)]
pub struct ExactValue {
    pub expr: Expr,
    pub value: f64,
}

impl ExactValue {
    pub fn new(expr: Expr) -> ExactValue {
        let value = expr.eval_const();
        ExactValue { expr, value }
    }

    /// Simplified form of a constant expression; floating results are mapped back to
    /// exact form when one matches.
    pub fn exact(expr: &Expr) -> ExactValue {
        let simplified = expr.simplify();
        if simplified.is_exact_constant() {
            ExactValue::new(simplified)
        } else {
            ExactValue::from_f64(simplified.eval_const())
        }
    }

    pub fn from_f64(value: f64) -> ExactValue {
        ExactValue::new(nsimplify(value, DEFAULT_TOLERANCE))
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}

impl fmt::Display for ExactValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

//___________________________________INTERVALS____________________________________

/// One end of an interval.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    Unbounded,
    Open(ExactValue),
    Closed(ExactValue),
}

impl Bound {
    pub fn exact(&self) -> Option<&ExactValue> {
        match self {
            Bound::Unbounded => None,
            Bound::Open(v) | Bound::Closed(v) => Some(v),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Bound::Closed(_))
    }

    fn value_or(&self, infinity: f64) -> f64 {
        self.exact().map(|v| v.value).unwrap_or(infinity)
    }

    fn opened(&self) -> Bound {
        match self {
            Bound::Closed(v) => Bound::Open(v.clone()),
            other => other.clone(),
        }
    }
}

/// Interval of the real line; a degenerate closed interval `[a, a]` is the point `a`.
#[derive(Clone, Debug, PartialEq)]
pub struct Interval {
    pub lo: Bound,
    pub hi: Bound,
}

impl Interval {
    pub fn new(lo: Bound, hi: Bound) -> Interval {
        Interval { lo, hi }
    }

    pub fn reals() -> Interval {
        Interval::new(Bound::Unbounded, Bound::Unbounded)
    }

    pub fn point(v: ExactValue) -> Interval {
        Interval::new(Bound::Closed(v.clone()), Bound::Closed(v))
    }

    pub fn closed(a: ExactValue, b: ExactValue) -> Interval {
        Interval::new(Bound::Closed(a), Bound::Closed(b))
    }

    pub fn open(a: ExactValue, b: ExactValue) -> Interval {
        Interval::new(Bound::Open(a), Bound::Open(b))
    }

    pub fn lo_value(&self) -> f64 {
        self.lo.value_or(f64::NEG_INFINITY)
    }

    pub fn hi_value(&self) -> f64 {
        self.hi.value_or(f64::INFINITY)
    }

    pub fn is_point(&self) -> bool {
        same_point(self.lo_value(), self.hi_value()) && self.lo.is_closed() && self.hi.is_closed()
    }

    pub fn is_empty(&self) -> bool {
        let (a, b) = (self.lo_value(), self.hi_value());
        if same_point(a, b) {
            !(self.lo.is_closed() && self.hi.is_closed())
        } else {
            a > b
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.lo_value().is_finite() && self.hi_value().is_finite()
    }

    /// the same interval without its endpoints
    pub fn interior(&self) -> Interval {
        Interval::new(self.lo.opened(), self.hi.opened())
    }

    pub fn contains(&self, x: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        let above_lo = match &self.lo {
            Bound::Unbounded => true,
            Bound::Open(v) => x > v.value && !same_point(x, v.value),
            Bound::Closed(v) => x > v.value || same_point(x, v.value),
        };
        let below_hi = match &self.hi {
            Bound::Unbounded => true,
            Bound::Open(v) => x < v.value && !same_point(x, v.value),
            Bound::Closed(v) => x < v.value || same_point(x, v.value),
        };
        above_lo && below_hi
    }

    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let lo = tighter(&self.lo, &other.lo, true);
        let hi = tighter(&self.hi, &other.hi, false);
        let out = Interval::new(lo, hi);
        (!out.is_empty()).then_some(out)
    }

    /// a point strictly inside, where the sign chart is read
    pub fn sample(&self) -> f64 {
        match (self.lo_value(), self.hi_value()) {
            (a, b) if a.is_finite() && b.is_finite() => 0.5 * (a + b),
            (a, _) if a.is_finite() => a + a.abs().max(1.0),
            (_, b) if b.is_finite() => b - b.abs().max(1.0),
            _ => 0.0,
        }
    }
}

/// the more restrictive of two lower (or upper) bounds
fn tighter(a: &Bound, b: &Bound, lower: bool) -> Bound {
    let infinity = if lower { f64::NEG_INFINITY } else { f64::INFINITY };
    let (va, vb) = (a.value_or(infinity), b.value_or(infinity));
    if same_point(va, vb) {
        if a.is_closed() { b.clone() } else { a.clone() }
    } else if (va > vb) == lower {
        a.clone()
    } else {
        b.clone()
    }
}

fn format_bound(b: &Bound, lower: bool) -> String {
    match b {
        Bound::Unbounded if lower => "(-∞".to_string(),
        Bound::Unbounded => "∞)".to_string(),
        Bound::Open(v) if lower => format!("({}", v),
        Bound::Closed(v) if lower => format!("[{}", v),
        Bound::Open(v) => format!("{})", v),
        Bound::Closed(v) => format!("{}]", v),
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_point() {
            if let Some(v) = self.lo.exact() {
                return write!(f, "{{{}}}", v);
            }
        }
        write!(f, "{}, {}", format_bound(&self.lo, true), format_bound(&self.hi, false))
    }
}

//___________________________________LATTICES____________________________________

/// The points `offset + k*period`, `k ∈ ℤ`, with `0 <= offset < period`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice {
    pub offset: ExactValue,
    pub period: ExactValue,
}

impl Lattice {
    /// `None` when the period is not a positive finite number
    pub fn new(offset: &Expr, period: &Expr) -> Option<Lattice> {
        let period = ExactValue::exact(period);
        let period = if period.value < 0.0 {
            ExactValue::exact(&mul_factors(vec![Expr::int(-1), period.expr]))
        } else {
            period
        };
        if !(period.value.is_finite() && period.value > 0.0) {
            return None;
        }
        let offset = ExactValue::exact(offset);
        if !offset.is_finite() {
            return None;
        }
        let shift = (offset.value / period.value).floor();
        let offset = if shift == 0.0 {
            offset
        } else {
            let k = Expr::from_f64(-shift);
            ExactValue::exact(&add_terms(vec![
                offset.expr,
                mul_factors(vec![k, period.expr.clone()]),
            ]))
        };
        // rounding may leave the offset a hair below zero or at one full period
        let offset = if same_point(offset.value, period.value) {
            ExactValue::new(Expr::int(0))
        } else {
            offset
        };
        Some(Lattice { offset, period })
    }

    pub fn contains(&self, x: f64) -> bool {
        if !x.is_finite() {
            return false;
        }
        let k = (x - self.offset.value) / self.period.value;
        let nearest = k.round();
        same_point(x, self.offset.value + nearest * self.period.value)
    }

    fn point(&self, k: i64) -> ExactValue {
        if k == 0 {
            return self.offset.clone();
        }
        ExactValue::exact(&add_terms(vec![
            self.offset.expr.clone(),
            mul_factors(vec![Expr::int(k), self.period.expr.clone()]),
        ]))
    }

    /// lattice points in `[lo, hi]`, ascending
    pub fn points_between(&self, lo: f64, hi: f64) -> Vec<ExactValue> {
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Vec::new();
        }
        let k_min = ((lo - self.offset.value) / self.period.value - EPS).ceil() as i64;
        let k_max = ((hi - self.offset.value) / self.period.value + EPS).floor() as i64;
        if k_max - k_min > MAX_LATTICE_POINTS {
            return Vec::new();
        }
        (k_min..=k_max).map(|k| self.point(k)).collect()
    }

    fn same_as(&self, other: &Lattice) -> bool {
        same_point(self.period.value, other.period.value)
            && same_point(self.offset.value, other.offset.value)
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (coeff, mut factors) = self.period.expr.as_coeff_factors();
        factors.insert(0, Expr::Var("k".to_string()));
        let step = Expr::product(coeff, factors);
        if self.offset.expr.is_zero() {
            write!(f, "{{{} | k ∈ ℤ}}", step)
        } else {
            write!(f, "{{{} + {} | k ∈ ℤ}}", self.offset, step)
        }
    }
}

//___________________________________SETS____________________________________

/// Union of disjoint intervals minus periodic holes.
#[derive(Clone, Debug, PartialEq)]
pub struct RealSet {
    intervals: Vec<Interval>,
    holes: Vec<Lattice>,
}

impl RealSet {
    pub fn reals() -> RealSet {
        RealSet {
            intervals: vec![Interval::reals()],
            holes: Vec::new(),
        }
    }

    pub fn empty() -> RealSet {
        RealSet {
            intervals: Vec::new(),
            holes: Vec::new(),
        }
    }

    pub fn from_intervals(intervals: Vec<Interval>) -> RealSet {
        RealSet {
            intervals: normalize(intervals),
            holes: Vec::new(),
        }
    }

    pub fn from_interval(interval: Interval) -> RealSet {
        RealSet::from_intervals(vec![interval])
    }

    pub fn points(points: Vec<ExactValue>) -> RealSet {
        RealSet::from_intervals(points.into_iter().map(Interval::point).collect())
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn holes(&self) -> &[Lattice] {
        &self.holes
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_reals(&self) -> bool {
        self.holes.is_empty() && self.intervals.as_slice() == [Interval::reals()]
    }

    pub fn is_bounded(&self) -> bool {
        match (self.intervals.first(), self.intervals.last()) {
            (Some(first), Some(last)) => {
                first.lo_value().is_finite() && last.hi_value().is_finite()
            }
            _ => true,
        }
    }

    /// isolated points of the set
    pub fn isolated_points(&self) -> Vec<ExactValue> {
        self.intervals
            .iter()
            .filter(|i| i.is_point())
            .filter_map(|i| i.lo.exact().cloned())
            .collect()
    }

    pub fn contains(&self, x: f64) -> bool {
        self.intervals.iter().any(|i| i.contains(x)) && !self.holes.iter().any(|h| h.contains(x))
    }

    pub fn intersect(&self, other: &RealSet) -> RealSet {
        let mut pieces = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                if let Some(i) = a.intersect(b) {
                    pieces.push(i);
                }
            }
        }
        let mut holes = self.holes.clone();
        for h in &other.holes {
            if !holes.iter().any(|k| k.same_as(h)) {
                holes.push(h.clone());
            }
        }
        RealSet {
            intervals: normalize(pieces),
            holes,
        }
    }

    /// Union; a hole survives only when both operands exclude it.
    pub fn union(&self, other: &RealSet) -> RealSet {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut pieces = self.intervals.clone();
        pieces.extend(other.intervals.iter().cloned());
        let holes = self
            .holes
            .iter()
            .filter(|h| other.holes.iter().any(|k| k.same_as(h)))
            .cloned()
            .collect();
        RealSet {
            intervals: normalize(pieces),
            holes,
        }
    }

    /// Complement of the interval part; holes are not taken into account.
    pub fn complement(&self) -> RealSet {
        let mut gaps = Vec::new();
        let mut lo = Bound::Unbounded;
        for i in &self.intervals {
            let hi = match &i.lo {
                Bound::Unbounded => None,
                Bound::Open(v) => Some(Bound::Closed(v.clone())),
                Bound::Closed(v) => Some(Bound::Open(v.clone())),
            };
            if let Some(hi) = hi {
                gaps.push(Interval::new(lo, hi));
            }
            lo = match &i.hi {
                Bound::Unbounded => return RealSet::from_intervals(gaps),
                Bound::Open(v) => Bound::Closed(v.clone()),
                Bound::Closed(v) => Bound::Open(v.clone()),
            };
        }
        gaps.push(Interval::new(lo, Bound::Unbounded));
        RealSet::from_intervals(gaps)
    }

    /// the set without the given points
    pub fn remove_points(&self, points: &[ExactValue]) -> RealSet {
        let mut intervals = self.intervals.clone();
        for p in points {
            let mut next = Vec::with_capacity(intervals.len() + 1);
            for i in intervals {
                if !i.contains(p.value) {
                    next.push(i);
                    continue;
                }
                let left = Interval::new(i.lo.clone(), Bound::Open(p.clone()));
                let right = Interval::new(Bound::Open(p.clone()), i.hi.clone());
                next.extend([left, right].into_iter().filter(|s| !s.is_empty()));
            }
            intervals = next;
        }
        RealSet {
            intervals: normalize(intervals),
            holes: self.holes.clone(),
        }
    }

    pub fn remove_lattice(&self, lattice: Lattice) -> RealSet {
        let mut out = self.clone();
        if !out.holes.iter().any(|h| h.same_as(&lattice)) {
            out.holes.push(lattice);
        }
        out
    }

    /// Intersection with the closed window `[lo, hi]`; holes inside the window become
    /// removed points, so the result has no holes.
    pub fn restrict(&self, lo: &ExactValue, hi: &ExactValue) -> RealSet {
        let window = RealSet::from_interval(Interval::closed(lo.clone(), hi.clone()));
        let clipped = RealSet {
            intervals: self.intervals.clone(),
            holes: Vec::new(),
        }
        .intersect(&window);
        let points: Vec<ExactValue> = self
            .holes
            .iter()
            .flat_map(|h| h.points_between(lo.value, hi.value))
            .collect();
        clipped.remove_points(&points)
    }

    /// Holes materialised over the bounded hull of the set; unbounded sets with holes are
    /// returned unchanged.
    pub fn materialize_holes(&self) -> RealSet {
        if self.holes.is_empty() || !self.is_bounded() {
            return self.clone();
        }
        match (self.intervals.first(), self.intervals.last()) {
            (Some(first), Some(last)) => match (first.lo.exact(), last.hi.exact()) {
                (Some(lo), Some(hi)) => self.restrict(lo, hi),
                _ => self.clone(),
            },
            _ => self.clone(),
        }
    }
}

fn lo_order(a: &Interval, b: &Interval) -> Ordering {
    a.lo_value()
        .partial_cmp(&b.lo_value())
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.lo.is_closed().cmp(&a.lo.is_closed()))
}

/// sorted, disjoint, with touching pieces merged
fn normalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|i| !i.is_empty());
    intervals.sort_by(lo_order);
    let mut out: Vec<Interval> = Vec::with_capacity(intervals.len());
    for next in intervals {
        let Some(cur) = out.last_mut() else {
            out.push(next);
            continue;
        };
        let (cur_hi, next_lo) = (cur.hi_value(), next.lo_value());
        let touching = same_point(cur_hi, next_lo) && (cur.hi.is_closed() || next.lo.is_closed());
        if (next_lo < cur_hi && !same_point(cur_hi, next_lo)) || touching {
            let (next_hi, cur_hi) = (next.hi_value(), cur.hi_value());
            if same_point(next_hi, cur_hi) {
                if next.hi.is_closed() {
                    cur.hi = next.hi;
                }
            } else if next_hi > cur_hi {
                cur.hi = next.hi;
            }
        } else {
            out.push(next);
        }
    }
    out
}

impl fmt::Display for RealSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "∅");
        }
        let mut pieces: Vec<String> = Vec::new();
        let mut run: Vec<String> = Vec::new();
        for i in &self.intervals {
            if i.is_point() {
                run.push(i.lo.exact().map(|v| v.to_string()).unwrap_or_default());
                continue;
            }
            if !run.is_empty() {
                pieces.push(format!("{{{}}}", run.join(", ")));
                run.clear();
            }
            if *i == Interval::reals() {
                pieces.push("ℝ".to_string());
            } else {
                pieces.push(i.to_string());
            }
        }
        if !run.is_empty() {
            pieces.push(format!("{{{}}}", run.join(", ")));
        }
        let base = pieces.join(" ∪ ");
        if self.holes.is_empty() {
            return write!(f, "{}", base);
        }
        let base = if pieces.len() > 1 { format!("({})", base) } else { base };
        let holes: Vec<String> = self.holes.iter().map(|h| h.to_string()).collect();
        if holes.len() == 1 {
            write!(f, "{} \\ {}", base, holes[0])
        } else {
            write!(f, "{} \\ ({})", base, holes.join(" ∪ "))
        }
    }
}

/// integer endpoint
pub fn exact_int(n: i64) -> ExactValue {
    ExactValue::new(Expr::number(Number::int(n)))
}
