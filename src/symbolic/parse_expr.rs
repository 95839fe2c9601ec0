//! Turns untrusted text into a validated symbolic expression.
//!
//! Parsing happens in two stages:
//! 1) a `nom` grammar recognises the surface syntax (numbers, identifiers, calls, tuples,
//!    operators `+ - * / **`, relations and `& |` for `Piecewise` conditions) and builds a
//!    raw syntax tree;
//! 2) the raw tree is lowered into [`Expr`] through an explicit allow-list: the only names
//!    that resolve are `x`, `E`, `pi`, the [`Func`] vocabulary, `sqrt`, `Max`, `Min` and
//!    `Piecewise`. Nothing outside that mapping is ever evaluated, so the input text cannot
//!    reach arbitrary code.
//!
//! # Example
//! ```
//! use RustedFunAnalyzer::symbolic::parse_expr::FunctionParser;
//! let parsed = FunctionParser::new().parse("x^2 - 4").unwrap();
//! assert_eq!(parsed.expr.to_string(), "x**2 - 4");
//! ```
use crate::symbolic::symbolic_engine::{Condition, Expr, Func, Relation, VAR};
use log::{debug, info};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{map, not, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded, terminated},
};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Errors raised while turning user text into an expression or a number.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// empty or whitespace-only input
    Empty,
    /// the text does not follow the expression grammar
    Syntax(String),
    /// a call to a name outside the allow-list
    UnknownFunction(String),
    /// an allowed function called with the wrong number of arguments
    WrongArity {
        name: String,
        expected: &'static str,
        found: usize,
    },
    /// the expression depends on variables other than `x`
    ForeignSymbols(Vec<String>),
    /// an x-value that is not a decimal number
    InvalidNumber(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::Empty => write!(
                f,
                "Enter a non-empty function, for example: sin(x) + 1/x"
            ),
            ParseError::Syntax(detail) => write!(
                f,
                "Could not interpret the function. Check the syntax. Detail: {}",
                detail
            ),
            ParseError::UnknownFunction(name) => write!(
                f,
                "Could not interpret the function. Check the syntax. Detail: '{}' is not an allowed function",
                name
            ),
            ParseError::WrongArity {
                name,
                expected,
                found,
            } => write!(
                f,
                "Could not interpret the function. Check the syntax. Detail: {} takes {} argument(s), {} given",
                name, expected, found
            ),
            ParseError::ForeignSymbols(names) => write!(
                f,
                "The function may only depend on 'x' (found: {})",
                names.join(", ")
            ),
            ParseError::InvalidNumber(text) => {
                write!(f, "'{}' is not a valid number, for example: 2.5 or 2,5", text)
            }
        }
    }
}

impl std::error::Error for ParseError {}

//___________________________________SYNTAX TREE____________________________________

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Surface syntax before name resolution.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(String),
    Ident(String),
    Call(String, Vec<Node>),
    Tuple(Vec<Node>),
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Compare(Relation, Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

type PError<'a> = nom::error::Error<&'a str>;

/// skips whitespace around a token
fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = PError<'a>>
where
    F: Parser<&'a str, Output = O, Error = PError<'a>>,
{
    delimited(multispace0, inner, multispace0)
}

/// decimal literal; signs never reach it since `parse_unary` takes them first
fn parse_number(input: &str) -> IResult<&str, Node> {
    map(recognize_float, |s: &str| Node::Number(s.to_string())).parse(input)
}

fn parse_identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

/// identifier, optionally followed by a call argument list
fn parse_name(input: &str) -> IResult<&str, Node> {
    let (input, name) = parse_identifier(input)?;
    let arguments = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), parse_or),
        ws(char(')')),
    );
    let (input, args) = opt(arguments).parse(input)?;
    let node = match args {
        Some(args) => Node::Call(name, args),
        None => Node::Ident(name),
    };
    Ok((input, node))
}

/// parenthesised group, or a tuple when it holds several comma-separated items
fn parse_group(input: &str) -> IResult<&str, Node> {
    let (input, mut items) = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), parse_or),
        ws(char(')')),
    )
    .parse(input)?;
    let node = if items.len() == 1 {
        items.remove(0)
    } else {
        Node::Tuple(items)
    };
    Ok((input, node))
}

fn parse_atom(input: &str) -> IResult<&str, Node> {
    ws(alt((parse_number, parse_name, parse_group))).parse(input)
}

/// `atom ** unary`, right associative through the unary exponent
fn parse_power(input: &str) -> IResult<&str, Node> {
    let (input, base) = parse_atom(input)?;
    let (input, exponent) = opt(preceded(ws(tag("**")), parse_unary)).parse(input)?;
    let node = match exponent {
        Some(exp) => Node::Binary(BinOp::Pow, Box::new(base), Box::new(exp)),
        None => base,
    };
    Ok((input, node))
}

fn parse_unary(input: &str) -> IResult<&str, Node> {
    let (input, signs) = many0(ws(one_of("+-"))).parse(input)?;
    let (input, node) = parse_power(input)?;
    let negations = signs.iter().filter(|&&c| c == '-').count();
    let node = if negations % 2 == 1 {
        Node::Neg(Box::new(node))
    } else {
        node
    };
    Ok((input, node))
}

fn parse_term(input: &str) -> IResult<&str, Node> {
    let (input, first) = parse_unary(input)?;
    let mul_op = ws(alt((terminated(char('*'), not(char('*'))), char('/'))));
    let (input, rest) = many0(pair(mul_op, parse_unary)).parse(input)?;
    let node = rest.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '*' { BinOp::Mul } else { BinOp::Div };
        Node::Binary(op, Box::new(acc), Box::new(rhs))
    });
    Ok((input, node))
}

fn parse_sum(input: &str) -> IResult<&str, Node> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), parse_term)).parse(input)?;
    let node = rest.into_iter().fold(first, |acc, (op, rhs)| {
        let op = if op == '+' { BinOp::Add } else { BinOp::Sub };
        Node::Binary(op, Box::new(acc), Box::new(rhs))
    });
    Ok((input, node))
}

fn parse_comparison(input: &str) -> IResult<&str, Node> {
    let (input, lhs) = parse_sum(input)?;
    let relation = ws(alt((
        tag("<="),
        tag(">="),
        tag("=="),
        tag("!="),
        tag("<"),
        tag(">"),
    )));
    let (input, rhs) = opt(pair(relation, parse_sum)).parse(input)?;
    let node = match rhs {
        Some((symbol, rhs)) => match Relation::from_symbol(symbol) {
            Some(rel) => Node::Compare(rel, Box::new(lhs), Box::new(rhs)),
            None => lhs,
        },
        None => lhs,
    };
    Ok((input, node))
}

fn parse_and(input: &str) -> IResult<&str, Node> {
    let (input, first) = parse_comparison(input)?;
    let (input, rest) = many0(preceded(ws(char('&')), parse_comparison)).parse(input)?;
    let node = rest
        .into_iter()
        .fold(first, |acc, rhs| Node::And(Box::new(acc), Box::new(rhs)));
    Ok((input, node))
}

fn parse_or(input: &str) -> IResult<&str, Node> {
    let (input, first) = parse_and(input)?;
    let (input, rest) = many0(preceded(ws(char('|')), parse_and)).parse(input)?;
    let node = rest
        .into_iter()
        .fold(first, |acc, rhs| Node::Or(Box::new(acc), Box::new(rhs)));
    Ok((input, node))
}

fn parse_syntax(input: &str) -> Result<Node, ParseError> {
    let (rest, node) = parse_or(input).map_err(|e| ParseError::Syntax(e.to_string()))?;
    if !rest.trim().is_empty() {
        return Err(ParseError::Syntax(format!(
            "unexpected input near '{}'",
            rest.trim()
        )));
    }
    Ok(node)
}

//___________________________________ALLOW-LIST____________________________________

fn check_arity(name: &str, args: &[Node], expected: &'static str, ok: bool) -> Result<(), ParseError> {
    if ok {
        Ok(())
    } else {
        Err(ParseError::WrongArity {
            name: name.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn build_number(text: &str) -> Result<Expr, ParseError> {
    if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>()
            .map(Expr::Const)
            .map_err(|_| ParseError::Syntax(format!("malformed number '{}'", text)))
    } else {
        match text.parse::<i64>() {
            Ok(n) => Ok(Expr::int(n)),
            Err(_) => text
                .parse::<f64>()
                .map(Expr::Const)
                .map_err(|_| ParseError::Syntax(format!("malformed number '{}'", text))),
        }
    }
}

/// Maps a call to its constructor; names outside the allow-list are rejected here.
fn build_call(name: &str, args: &[Node]) -> Result<Expr, ParseError> {
    match name {
        "sqrt" => {
            check_arity(name, args, "1", args.len() == 1)?;
            Ok(Expr::sqrt(build(&args[0])?))
        }
        "Max" | "Min" => {
            check_arity(name, args, "at least 1", !args.is_empty())?;
            let built = args.iter().map(build).collect::<Result<Vec<_>, _>>()?;
            Ok(if name == "Max" {
                Expr::Max(built)
            } else {
                Expr::Min(built)
            })
        }
        "Piecewise" => {
            check_arity(name, args, "at least 1", !args.is_empty())?;
            let mut branches = Vec::with_capacity(args.len());
            for arg in args {
                match arg {
                    Node::Tuple(pair) if pair.len() == 2 => {
                        branches.push((build(&pair[0])?, build_condition(&pair[1])?));
                    }
                    _ => {
                        return Err(ParseError::Syntax(
                            "Piecewise expects (expression, condition) pairs".to_string(),
                        ));
                    }
                }
            }
            Ok(Expr::Piecewise(branches))
        }
        _ => {
            let func = Func::from_str(name)
                .map_err(|_| ParseError::UnknownFunction(name.to_string()))?;
            if func == Func::Log && args.len() == 2 {
                // log(u, b) is the logarithm of u in base b
                let value = build(&args[0])?;
                let base = build(&args[1])?;
                return Ok(Expr::fun(Func::Log, value) / Expr::fun(Func::Log, base));
            }
            let expected = if func == Func::Log { "1 or 2" } else { "1" };
            check_arity(name, args, expected, args.len() == 1)?;
            Ok(Expr::fun(func, build(&args[0])?))
        }
    }
}

fn build(node: &Node) -> Result<Expr, ParseError> {
    match node {
        Node::Number(text) => build_number(text),
        Node::Ident(name) => match name.as_str() {
            "E" => Ok(Expr::E),
            "pi" => Ok(Expr::Pi),
            "True" | "False" => Err(ParseError::Syntax(format!(
                "{} is only allowed as a Piecewise condition",
                name
            ))),
            // unknown plain names are symbols; the free-symbol check rejects all but x
            _ => Ok(Expr::Var(name.clone())),
        },
        Node::Call(name, args) => build_call(name, args),
        Node::Tuple(_) => Err(ParseError::Syntax(
            "tuples are only allowed inside Piecewise".to_string(),
        )),
        Node::Neg(inner) => Ok(-build(inner)?),
        Node::Binary(op, lhs, rhs) => {
            let (lhs, rhs) = (build(lhs)?, build(rhs)?);
            Ok(match op {
                BinOp::Add => lhs + rhs,
                BinOp::Sub => lhs - rhs,
                BinOp::Mul => lhs * rhs,
                BinOp::Div => lhs / rhs,
                BinOp::Pow => lhs.pow(rhs),
            })
        }
        Node::Compare(..) | Node::And(..) | Node::Or(..) => Err(ParseError::Syntax(
            "relations are only allowed as Piecewise conditions".to_string(),
        )),
    }
}

fn build_condition(node: &Node) -> Result<Condition, ParseError> {
    match node {
        Node::Ident(name) if name == "True" => Ok(Condition::True),
        Node::Ident(name) if name == "False" => Ok(Condition::False),
        Node::Compare(rel, lhs, rhs) => Ok(Condition::Rel(
            build(lhs)?.boxed(),
            *rel,
            build(rhs)?.boxed(),
        )),
        Node::And(lhs, rhs) => {
            let mut parts = Vec::new();
            for side in [lhs, rhs] {
                match build_condition(side)? {
                    Condition::And(inner) => parts.extend(inner),
                    other => parts.push(other),
                }
            }
            Ok(Condition::And(parts))
        }
        Node::Or(lhs, rhs) => {
            let mut parts = Vec::new();
            for side in [lhs, rhs] {
                match build_condition(side)? {
                    Condition::Or(inner) => parts.extend(inner),
                    other => parts.push(other),
                }
            }
            Ok(Condition::Or(parts))
        }
        _ => Err(ParseError::Syntax(
            "a Piecewise condition must be a relation, True or False".to_string(),
        )),
    }
}

impl Expr {
    /// Parses text (with `**` as the power operator) into an unsimplified expression
    /// built only from allow-listed names.
    pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
        let node = parse_syntax(input)?;
        build(&node)
    }
}

//___________________________________FUNCTION PARSER____________________________________

/// validated expression together with the cleaned input text
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFunction {
    pub expr: Expr,
    pub text: String,
}

/// Parser of user-entered functions f(x).
#[derive(Debug, Default, Clone)]
pub struct FunctionParser;

impl FunctionParser {
    pub fn new() -> Self {
        FunctionParser
    }

    /// Parses, checks that `x` is the only free symbol and simplifies once.
    pub fn parse(&self, text: &str) -> Result<ParsedFunction, ParseError> {
        let cleaned = text.trim();
        if cleaned.is_empty() {
            return Err(ParseError::Empty);
        }
        let normalized = cleaned.replace('^', "**");
        let expr = Expr::parse_expression(&normalized).inspect_err(|e| {
            info!("rejected input '{}': {}", cleaned, e);
        })?;
        let foreign: Vec<String> = expr
            .free_symbols()
            .into_iter()
            .filter(|name| name != VAR)
            .collect();
        if !foreign.is_empty() {
            info!("rejected input '{}': foreign symbols {:?}", cleaned, foreign);
            return Err(ParseError::ForeignSymbols(foreign));
        }
        let simplified = expr.simplify();
        debug!("parsed '{}' as {}", cleaned, simplified);
        Ok(ParsedFunction {
            expr: simplified,
            text: cleaned.to_string(),
        })
    }
}

/// Parses the optional x-value typed by the user; both `.` and `,` are decimal separators.
pub fn parse_x_value(text: &str) -> Result<Option<f64>, ParseError> {
    let cleaned = text.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let re = Regex::new(r"^[+-]?(\d+([.,]\d*)?|[.,]\d+)([eE][+-]?\d+)?$")
        .map_err(|e| ParseError::InvalidNumber(e.to_string()))?;
    if !re.is_match(cleaned) {
        return Err(ParseError::InvalidNumber(cleaned.to_string()));
    }
    cleaned
        .replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ParseError::InvalidNumber(cleaned.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::x()
    }

    #[test]
    fn test_parse_polynomial() {
        let expr = Expr::parse_expression("x**2 - 4").unwrap();
        assert_eq!(expr, x().pow(Expr::int(2)) - Expr::int(4));
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = Expr::parse_expression("2**x**2").unwrap();
        assert_eq!(expr, Expr::int(2).pow(x().pow(Expr::int(2))));
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = Expr::parse_expression("-x**2").unwrap();
        assert_eq!(expr, -(x().pow(Expr::int(2))));
    }

    #[test]
    fn test_decimal_literal_is_float() {
        assert_eq!(Expr::parse_expression("2.5").unwrap(), Expr::Const(2.5));
        assert_eq!(Expr::parse_expression(".75").unwrap(), Expr::Const(0.75));
        assert_eq!(Expr::parse_expression("3.5e-1").unwrap(), Expr::Const(0.35));
        assert_eq!(
            Expr::parse_expression("x - 12.125").unwrap(),
            Expr::x() - Expr::Const(12.125)
        );
        assert_eq!(Expr::parse_expression("5/2").unwrap(), Expr::int(5) / Expr::int(2));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            Expr::parse_expression("abs(x)").unwrap(),
            Expr::parse_expression("Abs(x)").unwrap()
        );
        assert_eq!(
            Expr::parse_expression("ln(x)").unwrap(),
            Expr::fun(Func::Log, x())
        );
    }

    #[test]
    fn test_log_with_base() {
        let expr = Expr::parse_expression("log(x, 2)").unwrap();
        assert_eq!(
            expr,
            Expr::fun(Func::Log, x()) / Expr::fun(Func::Log, Expr::int(2))
        );
    }

    #[test]
    fn test_piecewise() {
        let expr = Expr::parse_expression("Piecewise((x, x < 0), (x**2, True))").unwrap();
        match expr {
            Expr::Piecewise(branches) => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].1, Condition::True);
                assert_eq!(
                    branches[0].1,
                    Condition::Rel(x().boxed(), Relation::Lt, Expr::int(0).boxed())
                );
            }
            other => panic!("expected Piecewise, got {:?}", other),
        }
    }

    #[test]
    fn test_piecewise_compound_condition() {
        let expr =
            Expr::parse_expression("Piecewise((1, x > 0 & x < 1), (0, True))").unwrap();
        match expr {
            Expr::Piecewise(branches) => match &branches[0].1 {
                Condition::And(parts) => assert_eq!(parts.len(), 2),
                other => panic!("expected And, got {:?}", other),
            },
            other => panic!("expected Piecewise, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_function_rejected() {
        let err = Expr::parse_expression("system(x)").unwrap_err();
        assert_eq!(err, ParseError::UnknownFunction("system".to_string()));
        assert!(Expr::parse_expression("__import__(x)").is_err());
    }

    #[test]
    fn test_code_injection_rejected() {
        let parser = FunctionParser::new();
        assert!(parser.parse("os.system('x')").is_err());
        assert!(parser.parse("eval(x)").is_err());
        assert!(parser.parse("x; 1").is_err());
    }

    #[test]
    fn test_invalid_expression() {
        assert!(Expr::parse_expression("(x +").is_err());
        assert!(Expr::parse_expression("x +* 2").is_err());
        assert!(Expr::parse_expression("sin()").is_err());
    }

    #[test]
    fn test_relation_outside_piecewise_rejected() {
        assert!(Expr::parse_expression("x < 1").is_err());
        assert!(Expr::parse_expression("True").is_err());
    }

    #[test]
    fn test_foreign_symbol_rejected() {
        let err = FunctionParser::new().parse("y + 1").unwrap_err();
        assert_eq!(err, ParseError::ForeignSymbols(vec!["y".to_string()]));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(FunctionParser::new().parse("   ").unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_caret_is_power() {
        let parser = FunctionParser::new();
        let a = parser.parse("x^2").unwrap();
        let b = parser.parse("x**2").unwrap();
        assert_eq!(a.expr, b.expr);
        assert_eq!(a.text, "x^2");
    }

    #[test]
    fn test_constant_function_allowed() {
        let parsed = FunctionParser::new().parse("pi + 1").unwrap();
        assert!(parsed.expr.free_symbols().is_empty());
    }

    #[test]
    fn test_parse_x_value() {
        assert_eq!(parse_x_value("").unwrap(), None);
        assert_eq!(parse_x_value("2,5").unwrap(), Some(2.5));
        assert_eq!(parse_x_value(" -3.25 ").unwrap(), Some(-3.25));
        assert_eq!(parse_x_value("1e3").unwrap(), Some(1000.0));
        assert!(parse_x_value("abc").is_err());
        assert!(parse_x_value("1,2,3").is_err());
    }
}
