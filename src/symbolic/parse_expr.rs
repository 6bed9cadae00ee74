// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Turns the text of a function into a symbolic expression bound to one variable.
//!
//! Parsing is done in two passes:
//! 1. a `nom` grammar produces an unchecked syntax tree (`RawExpr`); identifiers are just
//!    strings at this point
//! 2. a lowering pass resolves every identifier against the closed vocabulary: the bound
//!    variable, the constants `E` and `pi`, the whitelisted functions and `Piecewise`.
//!    Nothing else can ever reach the `Expr` tree.
//!
//! Grammar (lowest to highest binding):
//! ```text
//!  comparison := expr [ ("<" | "<=" | ">" | ">=") expr ]
//!  expr       := term { ("+" | "-") term }
//!  term       := unary { ("*" | "/") unary }
//!  unary      := "-" unary | "+" unary | power
//!  power      := atom [ ("^" | "**") unary ]
//!  atom       := number | name "(" argument { "," argument } ")" | name | "(" expr ")"
//!  argument   := "(" comparison "," comparison ")" | comparison
//! ```
//! so `-x^2` is `-(x^2)` and `x^2^3` is `x^(2^3)`.
//! ```
//! use RustedFunAn::symbolic::parse_expr::parse;
//! let expression = parse("(x-1)/(x+2)").unwrap();
//! assert_eq!(expression.expr.to_string(), "(x - 1)/(x + 2)");
//! assert!(parse("y + 1").is_err());
//! ```
use crate::analysis::budget::Budget;
use crate::analysis::error::AnalysisError;
use crate::symbolic::exact_value::parse_rational_literal;
use crate::symbolic::symbolic_engine::{Condition, Expr, Function, MathConst, Relation};
use log::debug;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{map, not, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// which part of the vocabulary is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ValidationPolicy {
    /// the whole whitelist: functions, constants, Piecewise
    #[default]
    Extended,
    /// polynomials and rational functions only: no calls, no named constants, integer exponents
    Strict,
}

/// settings of the parser, the `parser` section of the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ParserSettings {
    pub max_length: usize,
    pub variable: String,
    pub require_variable: bool,
    pub policy: ValidationPolicy,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            max_length: 500,
            variable: "x".to_string(),
            require_variable: true,
            policy: ValidationPolicy::Extended,
        }
    }
}

/// a validated expression: the tree, the variable it is a function of, and the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub expr: Expr,
    pub variable: String,
    pub source: String,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

// deeper nesting of parentheses is rejected before the recursive parser runs
const MAX_NESTING: usize = 64;
// length of the fragment quoted in syntax errors
const FRAGMENT_LEN: usize = 24;

/// syntax tree before identifiers are resolved
#[derive(Debug, Clone, PartialEq)]
enum RawExpr {
    Number(String),
    Ident(String),
    Call(String, Vec<RawExpr>),
    Tuple(Box<RawExpr>, Box<RawExpr>),
    Compare(Box<RawExpr>, Relation, Box<RawExpr>),
    Binary(char, Box<RawExpr>, Box<RawExpr>),
    Neg(Box<RawExpr>),
}

//___________________________________GRAMMAR____________________________________

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// 12, 1.5, .5, 2e-3
fn number(input: &str) -> IResult<&str, RawExpr> {
    let mantissa = alt((
        map(pair(digit1, opt(pair(char('.'), digit0))), |_| ()),
        map(pair(char('.'), digit1), |_| ()),
    ));
    let exponent = opt((one_of("eE"), opt(one_of("+-")), digit1));
    let (rest, _) = pair(mantissa, exponent).parse(input)?;
    // the literal is the consumed prefix
    let literal = &input[..input.len() - rest.len()];
    Ok((rest, RawExpr::Number(literal.to_string())))
}

/// word characters, same as the titles of the task documents
fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

fn relation(input: &str) -> IResult<&str, Relation> {
    alt((
        value(Relation::Le, tag("<=")),
        value(Relation::Ge, tag(">=")),
        value(Relation::Lt, tag("<")),
        value(Relation::Gt, tag(">")),
    ))
    .parse(input)
}

fn comparison(input: &str) -> IResult<&str, RawExpr> {
    let (input, lhs) = expr(input)?;
    let (input, rhs) = opt(pair(ws(relation), expr)).parse(input)?;
    Ok(match rhs {
        Some((rel, rhs)) => (input, RawExpr::Compare(Box::new(lhs), rel, Box::new(rhs))),
        None => (input, lhs),
    })
}

/// (expr, condition) pair of a Piecewise call
fn tuple_argument(input: &str) -> IResult<&str, RawExpr> {
    map(
        delimited(
            ws(char('(')),
            (comparison, ws(char(',')), comparison),
            ws(char(')')),
        ),
        |(first, _, second)| RawExpr::Tuple(Box::new(first), Box::new(second)),
    )
    .parse(input)
}

fn call(input: &str) -> IResult<&str, RawExpr> {
    let (input, name) = identifier(input)?;
    let argument = alt((tuple_argument, comparison));
    let (input, args) = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), argument),
        ws(char(')')),
    )
    .parse(input)?;
    Ok((input, RawExpr::Call(name, args)))
}

fn atom(input: &str) -> IResult<&str, RawExpr> {
    ws(alt((
        number,
        call,
        map(identifier, RawExpr::Ident),
        delimited(char('('), expr, char(')')),
    )))
    .parse(input)
}

/// right associative, the exponent may carry its own unary minus: x^-2
fn power(input: &str) -> IResult<&str, RawExpr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(ws(alt((tag("**"), tag("^")))), unary)).parse(input)?;
    Ok(match exponent {
        Some(exponent) => (
            input,
            RawExpr::Binary('^', Box::new(base), Box::new(exponent)),
        ),
        None => (input, base),
    })
}

fn unary(input: &str) -> IResult<&str, RawExpr> {
    alt((
        map(preceded(ws(char('-')), unary), |e| RawExpr::Neg(Box::new(e))),
        preceded(ws(char('+')), unary),
        power,
    ))
    .parse(input)
}

fn term(input: &str) -> IResult<&str, RawExpr> {
    let (input, first) = unary(input)?;
    let operator = ws(alt((terminated(char('*'), not(char('*'))), char('/'))));
    let (input, rest) = many0(pair(operator, unary)).parse(input)?;
    let tree = rest.into_iter().fold(first, |acc, (op, rhs)| {
        RawExpr::Binary(op, Box::new(acc), Box::new(rhs))
    });
    Ok((input, tree))
}

fn expr(input: &str) -> IResult<&str, RawExpr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(one_of("+-")), term)).parse(input)?;
    let tree = rest.into_iter().fold(first, |acc, (op, rhs)| {
        RawExpr::Binary(op, Box::new(acc), Box::new(rhs))
    });
    Ok((input, tree))
}

//___________________________________ERRORS____________________________________

fn fragment_of(rest: &str) -> String {
    let rest = rest.trim();
    if rest.is_empty() {
        "end of input".to_string()
    } else {
        rest.chars().take(FRAGMENT_LEN).collect()
    }
}

fn syntax_error(fragment: &str, message: &str) -> AnalysisError {
    AnalysisError::SyntaxError {
        fragment: fragment.to_string(),
        message: message.to_string(),
    }
}

/// balanced parentheses with bounded depth, checked before recursive descent
fn check_parentheses(text: &str) -> Result<(), AnalysisError> {
    let mut depth: usize = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(syntax_error(
                        &fragment_of(&text[i..]),
                        "parentheses are nested too deeply",
                    ));
                }
            }
            ')' => {
                if depth == 0 {
                    return Err(syntax_error(
                        &fragment_of(&text[i..]),
                        "closing parenthesis without an opening one",
                    ));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    if depth > 0 {
        return Err(syntax_error("(", "unbalanced parentheses"));
    }
    Ok(())
}

//___________________________________LOWERING____________________________________

struct Lowering<'s> {
    settings: &'s ParserSettings,
}

impl Lowering<'_> {
    fn strict(&self) -> bool {
        self.settings.policy == ValidationPolicy::Strict
    }

    fn lower(&self, raw: &RawExpr) -> Result<Expr, AnalysisError> {
        match raw {
            RawExpr::Number(text) => parse_rational_literal(text)
                .map(Expr::Const)
                .ok_or_else(|| syntax_error(text, "number out of range")),
            RawExpr::Ident(name) => self.lower_identifier(name),
            RawExpr::Neg(inner) => Ok(match self.lower(inner)? {
                Expr::Const(q) => Expr::Const(-q),
                other => Expr::Neg(other.boxed()),
            }),
            RawExpr::Binary(op, lhs, rhs) => {
                let l = self.lower(lhs)?;
                let r = self.lower(rhs)?;
                match op {
                    '+' => Ok(Expr::Add(l.boxed(), r.boxed())),
                    '-' => Ok(Expr::Sub(l.boxed(), r.boxed())),
                    '*' => Ok(Expr::Mul(l.boxed(), r.boxed())),
                    '/' => Ok(Expr::Div(l.boxed(), r.boxed())),
                    _ => {
                        // constant exponents are reduced to one rational: x^(1/2), x^-(2/3)
                        let r = match r {
                            Expr::Const(_) => r,
                            other if !other.contains_variable(&self.settings.variable) => {
                                match other.fold(&mut Budget::unlimited()) {
                                    Ok(folded @ Expr::Const(_)) => folded,
                                    _ => other,
                                }
                            }
                            other => other,
                        };
                        if self.strict() && !matches!(&r, Expr::Const(q) if q.is_integer()) {
                            return Err(AnalysisError::DisallowedSymbol(format!(
                                "^{} (only integer exponents are allowed)",
                                r
                            )));
                        }
                        Ok(Expr::Pow(l.boxed(), r.boxed()))
                    }
                }
            }
            RawExpr::Call(name, args) => self.lower_call(name, args),
            RawExpr::Tuple(..) => Err(syntax_error(
                "(",
                "a pair is only allowed inside Piecewise",
            )),
            RawExpr::Compare(..) => Err(syntax_error(
                "comparison",
                "comparisons are only allowed as Piecewise conditions",
            )),
        }
    }

    fn lower_identifier(&self, name: &str) -> Result<Expr, AnalysisError> {
        if name == self.settings.variable {
            return Ok(Expr::Var(name.to_string()));
        }
        if let Some(constant) = MathConst::from_name(name) {
            if self.strict() {
                return Err(AnalysisError::DisallowedSymbol(name.to_string()));
            }
            return Ok(Expr::Constant(constant));
        }
        if Function::from_str(name).is_ok() {
            return Err(syntax_error(name, "function name without an argument"));
        }
        Err(AnalysisError::DisallowedSymbol(name.to_string()))
    }

    fn lower_call(&self, name: &str, args: &[RawExpr]) -> Result<Expr, AnalysisError> {
        if name == "Piecewise" {
            if self.strict() {
                return Err(AnalysisError::DisallowedSymbol(name.to_string()));
            }
            let mut branches = Vec::with_capacity(args.len());
            for arg in args {
                match arg {
                    RawExpr::Tuple(branch, condition) => {
                        let branch = self.lower(branch)?;
                        let condition = self.lower_condition(condition)?;
                        branches.push((branch, condition));
                    }
                    _ => {
                        return Err(syntax_error(
                            "Piecewise",
                            "every argument must be an (expression, condition) pair",
                        ));
                    }
                }
            }
            return Ok(Expr::Piecewise(branches));
        }
        let function = match Function::from_str(name) {
            Ok(function) => function,
            Err(_) if name == self.settings.variable || MathConst::from_name(name).is_some() => {
                return Err(syntax_error(name, "is not a function"));
            }
            Err(_) => return Err(AnalysisError::DisallowedSymbol(name.to_string())),
        };
        if self.strict() {
            return Err(AnalysisError::DisallowedSymbol(name.to_string()));
        }
        match args {
            [arg] => Ok(Expr::Func(function, self.lower(arg)?.boxed())),
            _ => Err(syntax_error(name, "expects exactly one argument")),
        }
    }

    fn lower_condition(&self, raw: &RawExpr) -> Result<Condition, AnalysisError> {
        match raw {
            RawExpr::Ident(name) if name == "True" => Ok(Condition::Always),
            RawExpr::Compare(lhs, rel, rhs) => Ok(Condition::Compare(
                self.lower(lhs)?.boxed(),
                *rel,
                self.lower(rhs)?.boxed(),
            )),
            _ => Err(syntax_error(
                "Piecewise",
                "a condition must be True or a single comparison",
            )),
        }
    }
}

//___________________________________API____________________________________

/// parses with the default settings: variable x, at most 500 characters, extended vocabulary
pub fn parse(text: &str) -> Result<Expression, AnalysisError> {
    parse_with(text, &ParserSettings::default())
}

pub fn parse_with(text: &str, settings: &ParserSettings) -> Result<Expression, AnalysisError> {
    let source = text.trim();
    if source.is_empty() {
        return Err(AnalysisError::EmptyExpression);
    }
    let len = source.chars().count();
    if len > settings.max_length {
        return Err(AnalysisError::ExpressionTooLong {
            len,
            max: settings.max_length,
        });
    }
    check_parentheses(source)?;
    let (rest, raw) = match expr(source) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            return Err(syntax_error(&fragment_of(e.input), "unexpected symbol"));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(syntax_error("end of input", "incomplete expression"));
        }
    };
    if !rest.trim().is_empty() {
        return Err(syntax_error(&fragment_of(rest), "unexpected symbol"));
    }
    let tree = Lowering { settings }.lower(&raw)?;
    if settings.require_variable && !tree.contains_variable(&settings.variable) {
        return Err(AnalysisError::MissingVariable(settings.variable.clone()));
    }
    debug!("parsed '{}' as {}", source, tree);
    Ok(Expression {
        expr: tree,
        variable: settings.variable.clone(),
        source: source.to_string(),
    })
}

impl Expr {
    /// parses a function of x with the default settings
    pub fn parse_expression(input: &str) -> Result<Expr, AnalysisError> {
        parse(input).map(|expression| expression.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn test_parse_rational_function() {
        let expr = Expr::parse_expression("(x-1)/(x+2)").unwrap();
        assert_eq!(
            expr,
            (x() - Expr::int(1)) / (x() + Expr::int(2))
        );
    }

    #[test]
    fn test_parse_power_forms() {
        assert_eq!(
            Expr::parse_expression("x**2").unwrap(),
            x().pow(Expr::int(2))
        );
        assert_eq!(
            Expr::parse_expression("x^2").unwrap(),
            x().pow(Expr::int(2))
        );
        assert_eq!(
            Expr::parse_expression("-x^2").unwrap(),
            -(x().pow(Expr::int(2)))
        );
        assert_eq!(
            Expr::parse_expression("x^2^3").unwrap(),
            x().pow(Expr::int(8))
        );
        assert_eq!(
            Expr::parse_expression("x^(1/3)").unwrap(),
            x().pow(Expr::ratio(1, 3))
        );
        assert_eq!(
            Expr::parse_expression("x^-2").unwrap(),
            x().pow(Expr::int(-2))
        );
        assert_eq!(
            Expr::parse_expression("x^0.5").unwrap(),
            x().pow(Expr::ratio(1, 2))
        );
    }

    #[test]
    fn test_decimal_literal_at_end_of_input() {
        assert_eq!(number("2.25"), Ok(("", RawExpr::Number("2.25".to_string()))));
        assert_eq!(number("1.5e-3)"), Ok((")", RawExpr::Number("1.5e-3".to_string()))));
        assert_eq!(number(".5"), Ok(("", RawExpr::Number(".5".to_string()))));
        assert_eq!(number("3."), Ok(("", RawExpr::Number("3.".to_string()))));
        assert_eq!(
            Expr::parse_expression("x+2.25").unwrap(),
            x() + Expr::ratio(9, 4)
        );
        assert_eq!(
            Expr::parse_expression("x - 0.5").unwrap(),
            x() - Expr::ratio(1, 2)
        );
        assert_eq!(
            Expr::parse_expression("x^1.5").unwrap(),
            x().pow(Expr::ratio(3, 2))
        );
        assert_eq!(parse("x^0.5").unwrap().to_string(), parse("x^(1/2)").unwrap().to_string());
    }

    #[test]
    fn test_parse_precedence_and_associativity() {
        assert_eq!(
            Expr::parse_expression("x - 2 - 3").unwrap(),
            (x() - Expr::int(2)) - Expr::int(3)
        );
        assert_eq!(
            Expr::parse_expression("x / 2 * 3").unwrap(),
            (x() / Expr::int(2)) * Expr::int(3)
        );
        assert_eq!(
            Expr::parse_expression("2 + 3*x").unwrap(),
            Expr::int(2) + Expr::int(3) * x()
        );
        assert_eq!(
            Expr::parse_expression(" 1.5e1 * x ").unwrap(),
            Expr::int(15) * x()
        );
    }

    #[test]
    fn test_parse_functions_and_aliases() {
        assert_eq!(
            Expr::parse_expression("sqrt(x+1)").unwrap(),
            Expr::func(Function::Sqrt, x() + Expr::int(1))
        );
        assert_eq!(
            Expr::parse_expression("ln(x)").unwrap(),
            Expr::func(Function::Log, x())
        );
        assert_eq!(
            Expr::parse_expression("tg(x) + arcsin(x)").unwrap(),
            Expr::func(Function::Tan, x()) + Expr::func(Function::Asin, x())
        );
        assert_eq!(
            Expr::parse_expression("sin(cos(x))").unwrap(),
            Expr::func(Function::Sin, Expr::func(Function::Cos, x()))
        );
        assert_eq!(
            Expr::parse_expression("E^x + pi").unwrap(),
            Expr::Constant(MathConst::E).pow(x()) + Expr::Constant(MathConst::Pi)
        );
    }

    #[test]
    fn test_parse_piecewise() {
        let expr = Expr::parse_expression("Piecewise((x, x < 0), (x^2, True))").unwrap();
        let expected = Expr::Piecewise(vec![
            (
                x(),
                Condition::Compare(Box::new(x()), Relation::Lt, Box::new(Expr::zero())),
            ),
            (x().pow(Expr::int(2)), Condition::Always),
        ]);
        assert_eq!(expr, expected);
        assert!(matches!(
            Expr::parse_expression("Piecewise((x, x))"),
            Err(AnalysisError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_disallowed_symbols() {
        assert_eq!(
            parse("y + 1"),
            Err(AnalysisError::DisallowedSymbol("y".to_string()))
        );
        assert_eq!(
            parse("x + __import__(os)"),
            Err(AnalysisError::DisallowedSymbol("__import__".to_string()))
        );
        assert_eq!(
            parse("eval(x)"),
            Err(AnalysisError::DisallowedSymbol("eval".to_string()))
        );
        assert!(matches!(
            parse("x < 1"),
            Err(AnalysisError::SyntaxError { .. })
        ));
    }

    #[test]
    fn test_input_constraints() {
        assert_eq!(parse("   "), Err(AnalysisError::EmptyExpression));
        assert_eq!(
            parse("2 + 3"),
            Err(AnalysisError::MissingVariable("x".to_string()))
        );
        let long = format!("x{}", "+1".repeat(300));
        assert_eq!(
            parse(&long),
            Err(AnalysisError::ExpressionTooLong { len: 601, max: 500 })
        );
        let settings = ParserSettings {
            require_variable: false,
            ..ParserSettings::default()
        };
        assert!(parse_with("2 + 3", &settings).is_ok());
    }

    #[test]
    fn test_syntax_errors_carry_fragment() {
        match parse("x + * 2") {
            Err(AnalysisError::SyntaxError { fragment, .. }) => assert!(fragment.contains('+')),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse("(x + 1"), Err(AnalysisError::SyntaxError { .. })));
        assert!(matches!(parse("x + 1)"), Err(AnalysisError::SyntaxError { .. })));
        assert!(matches!(parse("2x"), Err(AnalysisError::SyntaxError { .. })));
        assert!(matches!(parse("x; 1"), Err(AnalysisError::SyntaxError { .. })));
        assert!(matches!(parse("sin(x, 2)"), Err(AnalysisError::SyntaxError { .. })));
        let deep = format!("{}x{}", "(".repeat(70), ")".repeat(70));
        assert!(matches!(parse(&deep), Err(AnalysisError::SyntaxError { .. })));
    }

    #[test]
    fn test_strict_policy() {
        let settings = ParserSettings {
            policy: ValidationPolicy::Strict,
            ..ParserSettings::default()
        };
        assert!(parse_with("(x^2 - 1)/(x - 3)", &settings).is_ok());
        assert_eq!(
            parse_with("sin(x)", &settings),
            Err(AnalysisError::DisallowedSymbol("sin".to_string()))
        );
        assert!(matches!(
            parse_with("x^(1/2)", &settings),
            Err(AnalysisError::DisallowedSymbol(_))
        ));
        assert_eq!(
            parse_with("x + pi", &settings),
            Err(AnalysisError::DisallowedSymbol("pi".to_string()))
        );
        assert_eq!(ValidationPolicy::from_str("strict").unwrap(), ValidationPolicy::Strict);
    }

    #[test]
    fn test_other_variable() {
        let settings = ParserSettings {
            variable: "t".to_string(),
            ..ParserSettings::default()
        };
        let expression = parse_with("t^2 + 1", &settings).unwrap();
        assert_eq!(expression.variable, "t");
        assert_eq!(expression.source, "t^2 + 1");
        assert!(parse_with("x + 1", &settings).is_err());
    }
}
