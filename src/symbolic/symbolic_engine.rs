//! # Symbolic Engine Module
//!
//! Core expression tree of the analyzer. An [`Expr`] is an immutable tree over the
//! single free variable `x`, built only from the closed vocabulary of [`Func`] plus
//! `Max`, `Min`, `Piecewise`, the constants `E` and `pi`, and the arithmetic operators.
//!
//! ## Main Structures
//!
//! - [`Number`]: exact rational (`Rational64`) or floating value, with overflow-safe
//!   arithmetic that degrades to floats
//! - [`Func`]: allow-listed unary functions; its string mapping is the parser allow-list
//! - [`Condition`] / [`Relation`]: boolean conditions of `Piecewise` branches
//! - [`Expr`]: the expression tree itself
//!
//! ## Printing
//!
//! `Display` renders expressions the way users type them: `x**2 - 4`, `sin(x) + 1/x`,
//! `sqrt(2)/2`, `pi/2`. Subtraction and division are recovered from the canonical
//! `a + (-1)*b` and `a*b**(-1)` forms produced by the simplifier.

#![allow(non_camel_case_types)]

use num::rational::Rational64;
use num::traits::{CheckedAdd, CheckedDiv, CheckedMul};
use num::{Signed, Zero};
use std::collections::BTreeSet;
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// the only free variable the analyzer accepts
pub const VAR: &str = "x";

//___________________________________NUMBERS____________________________________

/// Numeric leaf value: exact rational or floating point.
///
/// Integer and rational literals stay exact; decimal literals and anything that overflowed
/// `i64` arithmetic become floats. Mixing the two yields a float.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Exact(Rational64),
    Float(f64),
}

pub fn ratio_to_f64(r: &Rational64) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}

impl Number {
    pub fn int(n: i64) -> Number {
        Number::Exact(Rational64::from_integer(n))
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Exact(r) => ratio_to_f64(r),
            Number::Float(v) => *v,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Exact(r) => r.is_zero(),
            Number::Float(v) => *v == 0.0,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Number::Exact(r) => *r == Rational64::from_integer(1),
            Number::Float(v) => *v == 1.0,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.to_f64() < 0.0
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Number::Exact(_))
    }

    /// integer value of an exact number
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Number::Exact(r) if r.is_integer() => Some(*r.numer()),
            _ => None,
        }
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Exact(r) => Number::Exact(-r),
            Number::Float(v) => Number::Float(-v),
        }
    }

    pub fn abs(self) -> Number {
        match self {
            Number::Exact(r) => Number::Exact(r.abs()),
            Number::Float(v) => Number::Float(v.abs()),
        }
    }

    pub fn add(self, other: Number) -> Number {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) => a
                .checked_add(&b)
                .map(Number::Exact)
                .unwrap_or(Number::Float(ratio_to_f64(&a) + ratio_to_f64(&b))),
            _ => Number::Float(self.to_f64() + other.to_f64()),
        }
    }

    pub fn mul(self, other: Number) -> Number {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) => a
                .checked_mul(&b)
                .map(Number::Exact)
                .unwrap_or(Number::Float(ratio_to_f64(&a) * ratio_to_f64(&b))),
            _ => Number::Float(self.to_f64() * other.to_f64()),
        }
    }

    /// reciprocal; `None` for an exact zero
    pub fn recip(self) -> Option<Number> {
        match self {
            Number::Exact(r) if r.is_zero() => None,
            Number::Exact(r) => Some(Number::Exact(r.recip())),
            Number::Float(v) => Some(Number::Float(1.0 / v)),
        }
    }

    pub fn div(self, other: Number) -> Option<Number> {
        match (self, other) {
            (Number::Exact(a), Number::Exact(b)) => {
                if b.is_zero() {
                    return None;
                }
                Some(
                    a.checked_div(&b)
                        .map(Number::Exact)
                        .unwrap_or(Number::Float(ratio_to_f64(&a) / ratio_to_f64(&b))),
                )
            }
            _ => Some(Number::Float(self.to_f64() / other.to_f64())),
        }
    }

    /// integer power; `None` when the result is undefined (0 to a negative power)
    pub fn powi(self, n: i64) -> Option<Number> {
        match self {
            Number::Exact(r) => {
                if n < 0 && r.is_zero() {
                    return None;
                }
                if n.unsigned_abs() > 64 {
                    return Some(Number::Float(ratio_to_f64(&r).powf(n as f64)));
                }
                let mut acc = Rational64::from_integer(1);
                for _ in 0..n.unsigned_abs() {
                    match acc.checked_mul(&r) {
                        Some(v) => acc = v,
                        None => return Some(Number::Float(ratio_to_f64(&r).powf(n as f64))),
                    }
                }
                Some(Number::Exact(if n < 0 { acc.recip() } else { acc }))
            }
            Number::Float(v) => Some(Number::Float(v.powf(n as f64))),
        }
    }

    /// Exact form of a float when it is an integer or a short decimal, e.g. `2.5 -> 5/2`.
    pub fn from_f64(value: f64) -> Number {
        if !value.is_finite() {
            return Number::Float(value);
        }
        if value.fract() == 0.0 && value.abs() < 1e15 {
            return Number::int(value as i64);
        }
        let mut scale: i64 = 1;
        for _ in 0..12 {
            scale *= 10;
            let scaled = value * scale as f64;
            if scaled.abs() >= 1e15 {
                break;
            }
            let rounded = scaled.round();
            if rounded != 0.0 && (scaled - rounded).abs() <= 1e-6 {
                return Number::Exact(Rational64::new(rounded as i64, scale));
            }
        }
        Number::Float(value)
    }
}

/// Python-like float formatting: integral values keep a trailing `.0`
pub fn fmt_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else if uses_exponent(v) {
        fmt_scientific(v)
    } else if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// magnitudes printed with an exponent, as Python's `repr` does
pub fn uses_exponent(v: f64) -> bool {
    v.is_finite() && v != 0.0 && (v.abs() >= 1e16 || v.abs() < 1e-4)
}

/// `1e+308`, `-2.5e+20`, `8.1e-12`
pub fn fmt_scientific(v: f64) -> String {
    let text = format!("{:e}", v);
    match text.split_once('e').map(|(m, e)| (m, e.parse::<i32>())) {
        Some((mantissa, Ok(exp))) => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        _ => text,
    }
}

//___________________________________FUNCTIONS____________________________________

/// Allow-listed unary functions.
///
/// `FromStr` (derived) is the name lookup used by the parser: anything that does not
/// parse into a `Func` is not a function the user may call. `abs` and `ln` are aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, EnumString, Display, AsRefStr)]
pub enum Func {
    #[strum(to_string = "Abs", serialize = "abs")]
    Abs,
    #[strum(to_string = "sin")]
    Sin,
    #[strum(to_string = "cos")]
    Cos,
    #[strum(to_string = "tan")]
    Tan,
    #[strum(to_string = "asin")]
    Asin,
    #[strum(to_string = "acos")]
    Acos,
    #[strum(to_string = "atan")]
    Atan,
    #[strum(to_string = "sec")]
    Sec,
    #[strum(to_string = "csc")]
    Csc,
    #[strum(to_string = "cot")]
    Cot,
    #[strum(to_string = "sinh")]
    Sinh,
    #[strum(to_string = "cosh")]
    Cosh,
    #[strum(to_string = "tanh")]
    Tanh,
    #[strum(to_string = "exp")]
    Exp,
    #[strum(to_string = "log", serialize = "ln")]
    Log,
    #[strum(to_string = "floor")]
    Floor,
    #[strum(to_string = "ceiling")]
    Ceiling,
}

impl Func {
    /// real-valued evaluation; NaN or infinity where the function is not real/finite
    pub fn apply(&self, u: f64) -> f64 {
        match self {
            Func::Abs => u.abs(),
            Func::Sin => u.sin(),
            Func::Cos => u.cos(),
            Func::Tan => u.tan(),
            Func::Asin => u.asin(),
            Func::Acos => u.acos(),
            Func::Atan => u.atan(),
            Func::Sec => 1.0 / u.cos(),
            Func::Csc => 1.0 / u.sin(),
            Func::Cot => u.cos() / u.sin(),
            Func::Sinh => u.sinh(),
            Func::Cosh => u.cosh(),
            Func::Tanh => u.tanh(),
            Func::Exp => u.exp(),
            Func::Log => u.ln(),
            Func::Floor => u.floor(),
            Func::Ceiling => u.ceil(),
        }
    }

    pub fn is_trigonometric(&self) -> bool {
        matches!(
            self,
            Func::Sin | Func::Cos | Func::Tan | Func::Sec | Func::Csc | Func::Cot
        )
    }

    /// f(-u) = -f(u)
    pub fn is_odd(&self) -> bool {
        matches!(
            self,
            Func::Sin
                | Func::Tan
                | Func::Csc
                | Func::Cot
                | Func::Asin
                | Func::Atan
                | Func::Sinh
                | Func::Tanh
        )
    }

    /// f(-u) = f(u)
    pub fn is_even(&self) -> bool {
        matches!(self, Func::Cos | Func::Sec | Func::Cosh | Func::Abs)
    }
}

//___________________________________CONDITIONS____________________________________

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Relation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Gt => ">",
            Relation::Ge => ">=",
            Relation::Eq => "==",
            Relation::Ne => "!=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Relation> {
        match symbol {
            "<" => Some(Relation::Lt),
            "<=" => Some(Relation::Le),
            ">" => Some(Relation::Gt),
            ">=" => Some(Relation::Ge),
            "==" => Some(Relation::Eq),
            "!=" => Some(Relation::Ne),
            _ => None,
        }
    }

    /// NaN operands never satisfy a relation
    pub fn holds(&self, lhs: f64, rhs: f64) -> bool {
        if lhs.is_nan() || rhs.is_nan() {
            return false;
        }
        match self {
            Relation::Lt => lhs < rhs,
            Relation::Le => lhs <= rhs,
            Relation::Gt => lhs > rhs,
            Relation::Ge => lhs >= rhs,
            Relation::Eq => lhs == rhs,
            Relation::Ne => lhs != rhs,
        }
    }
}

/// Condition of a `Piecewise` branch.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    True,
    False,
    Rel(Box<Expr>, Relation, Box<Expr>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn holds_at(&self, var: &str, x: f64) -> bool {
        match self {
            Condition::True => true,
            Condition::False => false,
            Condition::Rel(lhs, rel, rhs) => rel.holds(lhs.eval(var, x), rhs.eval(var, x)),
            Condition::And(parts) => parts.iter().all(|c| c.holds_at(var, x)),
            Condition::Or(parts) => parts.iter().any(|c| c.holds_at(var, x)),
        }
    }

    pub fn map_exprs(&self, f: &impl Fn(&Expr) -> Expr) -> Condition {
        match self {
            Condition::True => Condition::True,
            Condition::False => Condition::False,
            Condition::Rel(lhs, rel, rhs) => {
                Condition::Rel(Box::new(f(lhs)), *rel, Box::new(f(rhs)))
            }
            Condition::And(parts) => Condition::And(parts.iter().map(|c| c.map_exprs(f)).collect()),
            Condition::Or(parts) => Condition::Or(parts.iter().map(|c| c.map_exprs(f)).collect()),
        }
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Condition::True | Condition::False => {}
            Condition::Rel(lhs, _, rhs) => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Condition::And(parts) | Condition::Or(parts) => {
                parts.iter().for_each(|c| c.collect_symbols(out))
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let grouped = |c: &Condition| match c {
            Condition::True | Condition::False => c.to_string(),
            _ => format!("({})", c),
        };
        match self {
            Condition::True => write!(f, "True"),
            Condition::False => write!(f, "False"),
            Condition::Rel(lhs, rel, rhs) => write!(f, "{} {} {}", lhs, rel.symbol(), rhs),
            Condition::And(parts) => {
                let parts: Vec<String> = parts.iter().map(grouped).collect();
                write!(f, "{}", parts.join(" & "))
            }
            Condition::Or(parts) => {
                let parts: Vec<String> = parts.iter().map(grouped).collect();
                write!(f, "{}", parts.join(" | "))
            }
        }
    }
}

//___________________________________EXPRESSIONS____________________________________

/// Symbolic expression tree.
///
/// Each variant is either a leaf (variable, number, named constant) or a node owning its
/// children through `Box`/`Vec`. Trees are never mutated after construction; every
/// transformation returns a new tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable; after parsing only `x` can appear
    Var(String),
    /// Exact rational number
    Num(Rational64),
    /// Floating point number (decimal literals, inexact results)
    Const(f64),
    /// Euler's number
    E,
    /// Archimedes' constant
    Pi,
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    /// base ^ exponent; `sqrt(u)` is `u ^ (1/2)`
    Pow(Box<Expr>, Box<Expr>),
    /// allow-listed unary function
    Fun(Func, Box<Expr>),
    Max(Vec<Expr>),
    Min(Vec<Expr>),
    /// (value, condition) pairs, first matching condition wins
    Piecewise(Vec<(Expr, Condition)>),
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::int(-1)), Box::new(self))
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn x() -> Expr {
        Expr::Var(VAR.to_string())
    }

    pub fn int(n: i64) -> Expr {
        Expr::Num(Rational64::from_integer(n))
    }

    pub fn rational(numer: i64, denom: i64) -> Expr {
        Expr::Num(Rational64::new(numer, denom))
    }

    pub fn number(n: Number) -> Expr {
        match n {
            Number::Exact(r) => Expr::Num(r),
            Number::Float(v) => Expr::Const(v),
        }
    }

    /// exact form of a float when it has one, see [`Number::from_f64`]
    pub fn from_f64(value: f64) -> Expr {
        Expr::number(Number::from_f64(value))
    }

    pub fn fun(func: Func, arg: Expr) -> Expr {
        Expr::Fun(func, arg.boxed())
    }

    pub fn sqrt(arg: Expr) -> Expr {
        Expr::Pow(arg.boxed(), Expr::rational(1, 2).boxed())
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    pub fn exp(self) -> Expr {
        Expr::fun(Func::Exp, self)
    }

    pub fn ln(self) -> Expr {
        Expr::fun(Func::Log, self)
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Expr::Num(r) => Some(Number::Exact(*r)),
            Expr::Const(v) => Some(Number::Float(*v)),
            _ => None,
        }
    }

    pub fn as_rational(&self) -> Option<Rational64> {
        match self {
            Expr::Num(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.as_number().and_then(|n| n.as_integer())
    }

    pub fn is_number(&self) -> bool {
        self.as_number().is_some()
    }

    /// Checks if expression is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.as_number().is_some_and(|n| n.is_zero())
    }

    pub fn is_one(&self) -> bool {
        self.as_number().is_some_and(|n| n.is_one())
    }

    /// true when no variable occurs in the expression
    pub fn is_constant(&self) -> bool {
        self.free_symbols().is_empty()
    }

    /// all variable names occurring in the expression
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => {}
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.collect_symbols(out);
                rhs.collect_symbols(out);
            }
            Expr::Fun(_, arg) => arg.collect_symbols(out),
            Expr::Max(args) | Expr::Min(args) => args.iter().for_each(|a| a.collect_symbols(out)),
            Expr::Piecewise(branches) => {
                for (value, cond) in branches {
                    value.collect_symbols(out);
                    cond.collect_symbols(out);
                }
            }
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        self.free_symbols().contains(var_name)
    }

    /// true when a function of the given kind occurs anywhere in the tree
    pub fn contains_func(&self, pred: &impl Fn(Func) -> bool) -> bool {
        match self {
            Expr::Var(_) | Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => false,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => lhs.contains_func(pred) || rhs.contains_func(pred),
            Expr::Fun(func, arg) => pred(*func) || arg.contains_func(pred),
            Expr::Max(args) | Expr::Min(args) => args.iter().any(|a| a.contains_func(pred)),
            Expr::Piecewise(branches) => branches.iter().any(|(v, _)| v.contains_func(pred)),
        }
    }

    pub fn contains_piecewise(&self) -> bool {
        match self {
            Expr::Piecewise(_) | Expr::Max(_) | Expr::Min(_) => true,
            Expr::Var(_) | Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => false,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => lhs.contains_piecewise() || rhs.contains_piecewise(),
            Expr::Fun(_, arg) => arg.contains_piecewise(),
        }
    }

    /// Rebuilds the node with `f` applied to every direct child.
    pub fn map_children(&self, f: &impl Fn(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Var(_) | Expr::Num(_) | Expr::Const(_) | Expr::E | Expr::Pi => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Sub(lhs, rhs) => Expr::Sub(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Mul(lhs, rhs) => Expr::Mul(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Div(lhs, rhs) => Expr::Div(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Pow(base, exp) => Expr::Pow(f(base).boxed(), f(exp).boxed()),
            Expr::Fun(func, arg) => Expr::Fun(*func, f(arg).boxed()),
            Expr::Max(args) => Expr::Max(args.iter().map(f).collect()),
            Expr::Min(args) => Expr::Min(args.iter().map(f).collect()),
            Expr::Piecewise(branches) => Expr::Piecewise(
                branches
                    .iter()
                    .map(|(value, cond)| (f(value), cond.map_exprs(f)))
                    .collect(),
            ),
        }
    }

    /// substitute a variable with an expression
    pub fn subs(&self, var: &str, value: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => value.clone(),
            _ => self.map_children(&|child: &Expr| child.subs(var, value)),
        }
    }

    /// Substitutes a variable with the exact form of a float value.
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        self.subs(var, &Expr::from_f64(value))
    }

    /// Splits a product into its numeric coefficient and remaining factors.
    ///
    /// `-3*x*sin(x)` gives `(-3, [x, sin(x)])`; a lone number gives `(n, [])`.
    pub fn as_coeff_factors(&self) -> (Number, Vec<Expr>) {
        let mut coeff = Number::int(1);
        let mut factors = Vec::new();
        fn walk(e: &Expr, coeff: &mut Number, factors: &mut Vec<Expr>) {
            match e {
                Expr::Mul(lhs, rhs) => {
                    walk(lhs, coeff, factors);
                    walk(rhs, coeff, factors);
                }
                _ => match e.as_number() {
                    Some(n) => *coeff = coeff.mul(n),
                    None => factors.push(e.clone()),
                },
            }
        }
        walk(self, &mut coeff, &mut factors);
        (coeff, factors)
    }

    /// Builds `coeff * f1 * f2 * ...` with the coefficient first and dropped when one.
    pub fn product(coeff: Number, factors: Vec<Expr>) -> Expr {
        if coeff.is_zero() {
            return Expr::number(coeff);
        }
        let mut iter = factors.into_iter().rev();
        let tail = match iter.next() {
            None => return Expr::number(coeff),
            Some(last) => iter.fold(last, |acc, f| Expr::Mul(f.boxed(), acc.boxed())),
        };
        if coeff.is_one() && coeff.is_exact() {
            tail
        } else {
            Expr::Mul(Expr::number(coeff).boxed(), tail.boxed())
        }
    }

    /// Builds `t1 + t2 + ...`; an empty list is zero.
    pub fn sum(terms: Vec<Expr>) -> Expr {
        let mut iter = terms.into_iter();
        match iter.next() {
            None => Expr::int(0),
            Some(first) => iter.fold(first, |acc, t| Expr::Add(acc.boxed(), t.boxed())),
        }
    }

    /// Numeric evaluation with `var` bound to `x`.
    ///
    /// Real semantics only: results that would be complex come back as NaN, poles as
    /// infinities. Unbound variables evaluate to NaN.
    pub fn eval(&self, var: &str, x: f64) -> f64 {
        match self {
            Expr::Var(name) => {
                if name == var {
                    x
                } else {
                    f64::NAN
                }
            }
            Expr::Num(r) => ratio_to_f64(r),
            Expr::Const(v) => *v,
            Expr::E => std::f64::consts::E,
            Expr::Pi => std::f64::consts::PI,
            Expr::Add(lhs, rhs) => lhs.eval(var, x) + rhs.eval(var, x),
            Expr::Sub(lhs, rhs) => lhs.eval(var, x) - rhs.eval(var, x),
            Expr::Mul(lhs, rhs) => lhs.eval(var, x) * rhs.eval(var, x),
            Expr::Div(lhs, rhs) => lhs.eval(var, x) / rhs.eval(var, x),
            Expr::Pow(base, exp) => real_pow(base.eval(var, x), exp.eval(var, x)),
            Expr::Fun(func, arg) => func.apply(arg.eval(var, x)),
            Expr::Max(args) => fold_nan_aware(args.iter().map(|a| a.eval(var, x)), f64::max),
            Expr::Min(args) => fold_nan_aware(args.iter().map(|a| a.eval(var, x)), f64::min),
            Expr::Piecewise(branches) => branches
                .iter()
                .find(|(_, cond)| cond.holds_at(var, x))
                .map(|(value, _)| value.eval(var, x))
                .unwrap_or(f64::NAN),
        }
    }

    /// value of a variable-free expression
    pub fn eval_const(&self) -> f64 {
        self.eval(VAR, f64::NAN)
    }
}

/// real power: a negative base with a non-integer exponent is not real
pub fn real_pow(base: f64, exp: f64) -> f64 {
    if base < 0.0 && exp.fract() != 0.0 {
        return f64::NAN;
    }
    base.powf(exp)
}

fn fold_nan_aware(values: impl Iterator<Item = f64>, op: fn(f64, f64) -> f64) -> f64 {
    let mut acc: Option<f64> = None;
    for v in values {
        if v.is_nan() {
            return f64::NAN;
        }
        acc = Some(match acc {
            None => v,
            Some(a) => op(a, v),
        });
    }
    acc.unwrap_or(f64::NAN)
}

//___________________________________PRINTING____________________________________

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_POW: u8 = 3;
const PREC_ATOM: u8 = 4;

fn wrap((text, prec): (String, u8), min_prec: u8) -> String {
    if prec < min_prec {
        format!("({})", text)
    } else {
        text
    }
}

fn render_rational(r: &Rational64) -> (String, u8) {
    if r.is_integer() {
        let prec = if r.is_negative() { PREC_ADD } else { PREC_ATOM };
        (r.numer().to_string(), prec)
    } else {
        let prec = if r.is_negative() { PREC_ADD } else { PREC_MUL };
        (format!("{}/{}", r.numer(), r.denom()), prec)
    }
}

impl Expr {
    /// `Some(-self)` when the term prints with a leading minus sign
    fn negated_for_print(&self) -> Option<Expr> {
        match self {
            Expr::Num(r) if r.is_negative() => Some(Expr::Num(-r)),
            Expr::Const(v) if *v < 0.0 => Some(Expr::Const(-v)),
            Expr::Mul(_, _) => {
                let (coeff, factors) = self.as_coeff_factors();
                if coeff.is_negative() {
                    Some(Expr::product(coeff.neg(), factors))
                } else {
                    None
                }
            }
            Expr::Div(num, den) => num
                .negated_for_print()
                .map(|n| Expr::Div(n.boxed(), den.clone())),
            _ => None,
        }
    }

    fn render(&self) -> (String, u8) {
        match self {
            Expr::Var(name) => (name.clone(), PREC_ATOM),
            Expr::Num(r) => render_rational(r),
            Expr::Const(v) => {
                let prec = if *v < 0.0 { PREC_ADD } else { PREC_ATOM };
                (fmt_float(*v), prec)
            }
            Expr::E => ("E".to_string(), PREC_ATOM),
            Expr::Pi => ("pi".to_string(), PREC_ATOM),
            Expr::Add(_, _) | Expr::Sub(_, _) => self.render_sum(),
            Expr::Mul(_, _) | Expr::Div(_, _) => self.render_product(),
            Expr::Pow(base, exp) => {
                if let Some(e) = exp.as_number() {
                    if e.is_negative() {
                        return self.render_product();
                    }
                    if e == Number::Exact(Rational64::new(1, 2)) {
                        return (format!("sqrt({})", base.render().0), PREC_ATOM);
                    }
                }
                let base_s = wrap(base.render(), PREC_ATOM);
                let exp_s = wrap(exp.render(), PREC_ATOM);
                (format!("{}**{}", base_s, exp_s), PREC_POW)
            }
            Expr::Fun(func, arg) => (format!("{}({})", func, arg.render().0), PREC_ATOM),
            Expr::Max(args) => (format!("Max({})", join_args(args)), PREC_ATOM),
            Expr::Min(args) => (format!("Min({})", join_args(args)), PREC_ATOM),
            Expr::Piecewise(branches) => {
                let parts: Vec<String> = branches
                    .iter()
                    .map(|(value, cond)| format!("({}, {})", value, cond))
                    .collect();
                (format!("Piecewise({})", parts.join(", ")), PREC_ATOM)
            }
        }
    }

    fn render_sum(&self) -> (String, u8) {
        fn collect(e: &Expr, negated: bool, out: &mut Vec<(bool, Expr)>) {
            match e {
                Expr::Add(lhs, rhs) => {
                    collect(lhs, negated, out);
                    collect(rhs, negated, out);
                }
                Expr::Sub(lhs, rhs) => {
                    collect(lhs, negated, out);
                    out.push((!negated, (**rhs).clone()));
                }
                _ => out.push((negated, e.clone())),
            }
        }
        let mut terms = Vec::new();
        collect(self, false, &mut terms);
        let mut text = String::new();
        for (i, (negated, term)) in terms.into_iter().enumerate() {
            let (negated, term) = match term.negated_for_print() {
                Some(positive) => (!negated, positive),
                None => (negated, term),
            };
            let body = wrap(term.render(), PREC_MUL);
            match (i, negated) {
                (0, false) => text.push_str(&body),
                (0, true) => text.push_str(&format!("-{}", body)),
                (_, false) => text.push_str(&format!(" + {}", body)),
                (_, true) => text.push_str(&format!(" - {}", body)),
            }
        }
        (text, PREC_ADD)
    }

    fn render_product(&self) -> (String, u8) {
        if let Expr::Div(num, den) = self {
            let num_s = wrap(num.render(), PREC_MUL);
            let den_s = wrap(den.render(), PREC_POW);
            return (format!("{}/{}", num_s, den_s), PREC_MUL);
        }
        let (coeff, factors) = self.as_coeff_factors();
        let negative = coeff.is_negative();
        let mut numerator: Vec<String> = Vec::new();
        let mut denominator: Vec<String> = Vec::new();
        match coeff.abs() {
            Number::Exact(r) => {
                if *r.numer() != 1 {
                    numerator.push(r.numer().to_string());
                }
                if *r.denom() != 1 {
                    denominator.push(r.denom().to_string());
                }
            }
            Number::Float(v) => {
                if v != 1.0 {
                    numerator.push(fmt_float(v));
                }
            }
        }
        for factor in &factors {
            if let Expr::Pow(base, exp) = factor {
                if let Some(e) = exp.as_number() {
                    if e.is_negative() {
                        let flipped = e.neg();
                        let positive = if flipped.is_one() {
                            (**base).clone()
                        } else {
                            Expr::Pow(base.clone(), Expr::number(flipped).boxed())
                        };
                        denominator.push(wrap(positive.render(), PREC_POW));
                        continue;
                    }
                }
            }
            numerator.push(wrap(factor.render(), PREC_MUL));
        }
        let num_s = if numerator.is_empty() {
            "1".to_string()
        } else {
            numerator.join("*")
        };
        let text = match denominator.len() {
            0 => num_s,
            1 => format!("{}/{}", num_s, denominator[0]),
            _ => format!("{}/({})", num_s, denominator.join("*")),
        };
        if negative {
            (format!("-{}", text), PREC_ADD)
        } else {
            (text, PREC_MUL)
        }
    }
}

fn join_args(args: &[Expr]) -> String {
    args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
}

/// Display implementation for pretty printing symbolic expressions.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render().0)
    }
}
