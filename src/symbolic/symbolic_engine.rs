// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Symbolic Engine Module
//!
//! The expression tree every other part of the crate works on.
//!
//! ## Main Structures
//!
//! ### `Expr` Enum
//! A closed vocabulary:
//! - **Variables**: `Var(String)` - the bound variable (conventionally "x")
//! - **Constants**: `Const(BigRational)` - exact rational constants
//! - **Named constants**: `Constant(MathConst)` - `E` and `pi`
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`, `Neg`
//! - **Functions**: `Func(Function, arg)` - one variant for the whole whitelist of functions
//! - **Piecewise**: ordered `(expr, condition)` branches, the first true condition wins
//!
//! ### `Function` Enum
//! The whitelist of callable names. Parsing goes through `strum`'s `EnumString`, so a name
//! that is not a variant (or one of its aliases such as `ln`, `tg`, `arcsin`) can never be
//! resolved.
//!
//! ## Interesting Code Features
//!
//! 1. **Exact constants**: numbers are `num::BigRational`, so `1/3` stays `1/3` until the very
//!    last numeric read-out
//!
//! 2. **Operator Overloading**: implements std::ops traits (Add, Sub, Mul, Div, Neg) for
//!    natural construction: `x.clone() * x - Expr::int(1)`
//!
//! 3. **Precedence-aware printing**: `Display` only writes the parentheses that are needed,
//!    and wraps operands that start with a minus sign, e.g. `3*(-2)`, `(-2)^2`

use num::bigint::BigInt;
use num::rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::f64::consts::{E, PI};
use std::fmt;
use strum_macros::{AsRefStr, Display, EnumString};

/// Named mathematical constants that may appear in an expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum MathConst {
    #[strum(to_string = "E")]
    E,
    #[strum(to_string = "pi")]
    Pi,
}

impl MathConst {
    pub fn value(&self) -> f64 {
        match self {
            MathConst::E => E,
            MathConst::Pi => PI,
        }
    }
    /// resolves the spellings accepted in input text
    pub fn from_name(name: &str) -> Option<MathConst> {
        match name {
            "E" | "e" => Some(MathConst::E),
            "pi" | "Pi" | "PI" => Some(MathConst::Pi),
            _ => None,
        }
    }
}

/// Whitelisted functions. `to_string` is the canonical printed name, every `serialize` is an
/// accepted alias in input text.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
)]
pub enum Function {
    #[strum(to_string = "sin")]
    Sin,
    #[strum(to_string = "cos")]
    Cos,
    #[strum(to_string = "tan", serialize = "tg")]
    Tan,
    #[strum(to_string = "cot", serialize = "ctg")]
    Cot,
    #[strum(to_string = "sec")]
    Sec,
    #[strum(to_string = "csc")]
    Csc,
    #[strum(to_string = "asin", serialize = "arcsin")]
    Asin,
    #[strum(to_string = "acos", serialize = "arccos")]
    Acos,
    #[strum(to_string = "atan", serialize = "arctan", serialize = "arctg")]
    Atan,
    #[strum(to_string = "sinh")]
    Sinh,
    #[strum(to_string = "cosh")]
    Cosh,
    #[strum(to_string = "tanh")]
    Tanh,
    #[strum(to_string = "asinh", serialize = "arcsinh")]
    Asinh,
    #[strum(to_string = "acosh", serialize = "arccosh")]
    Acosh,
    #[strum(to_string = "atanh", serialize = "arctanh")]
    Atanh,
    #[strum(to_string = "exp")]
    Exp,
    #[strum(to_string = "log", serialize = "ln")]
    Log,
    #[strum(to_string = "sqrt")]
    Sqrt,
    #[strum(to_string = "abs", serialize = "Abs")]
    Abs,
    #[strum(to_string = "floor")]
    Floor,
    #[strum(to_string = "ceiling", serialize = "ceil")]
    Ceiling,
}

impl Function {
    /// real-valued evaluation, NaN outside the real domain and ±inf at poles
    pub fn apply_f64(&self, v: f64) -> f64 {
        match self {
            Function::Sin => v.sin(),
            Function::Cos => v.cos(),
            Function::Tan => v.tan(),
            Function::Cot => 1.0 / v.tan(),
            Function::Sec => 1.0 / v.cos(),
            Function::Csc => 1.0 / v.sin(),
            Function::Asin => v.asin(),
            Function::Acos => v.acos(),
            Function::Atan => v.atan(),
            Function::Sinh => v.sinh(),
            Function::Cosh => v.cosh(),
            Function::Tanh => v.tanh(),
            Function::Asinh => v.asinh(),
            Function::Acosh => v.acosh(),
            Function::Atanh => v.atanh(),
            Function::Exp => v.exp(),
            Function::Log => v.ln(),
            Function::Sqrt => v.sqrt(),
            Function::Abs => v.abs(),
            Function::Floor => v.floor(),
            Function::Ceiling => v.ceil(),
        }
    }

    /// trigonometric functions with a period of 2*pi (or pi)
    pub fn is_periodic(&self) -> bool {
        matches!(
            self,
            Function::Sin
                | Function::Cos
                | Function::Tan
                | Function::Cot
                | Function::Sec
                | Function::Csc
        )
    }
}

/// comparison operators allowed in Piecewise conditions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum Relation {
    #[strum(to_string = "<")]
    Lt,
    #[strum(to_string = "<=")]
    Le,
    #[strum(to_string = ">")]
    Gt,
    #[strum(to_string = ">=")]
    Ge,
}

impl Relation {
    /// does `lhs - rhs` having this ordering against zero satisfy the relation
    pub fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Relation::Lt => ordering == Less,
            Relation::Le => ordering != Greater,
            Relation::Gt => ordering == Greater,
            Relation::Ge => ordering != Less,
        }
    }
}

/// condition of a Piecewise branch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Compare(Box<Expr>, Relation, Box<Expr>),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "True"),
            Condition::Compare(lhs, rel, rhs) => write!(f, "{} {} {}", lhs, rel, rhs),
        }
    }
}

/// Core symbolic expression enum representing the function as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// use RustedFunAn::symbolic::symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = (x.clone() - Expr::int(1)) / (x + Expr::int(2));
/// assert_eq!(expr.to_string(), "(x - 1)/(x + 2)");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// the bound variable
    Var(String),
    /// exact rational constant
    Const(BigRational),
    /// E or pi
    Constant(MathConst),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// unary minus
    Neg(Box<Expr>),
    /// call of a whitelisted function
    Func(Function, Box<Expr>),
    /// ordered branches, the first branch whose condition holds is the value
    Piecewise(Vec<(Expr, Condition)>),
}

fn write_rational(f: &mut fmt::Formatter, q: &BigRational) -> fmt::Result {
    if q.denom().is_one() {
        write!(f, "{}", q.numer())
    } else {
        write!(f, "{}/{}", q.numer(), q.denom())
    }
}

impl Expr {
    /// binding strength used by the printer: 1 sums, 2 products, 3 unary minus, 4 powers, 5 atoms
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Pow(base, exp) if Expr::is_sqrt_form(base, exp) => 5,
            Expr::Pow(..) => 4,
            Expr::Const(q) => {
                if !q.is_integer() {
                    2
                } else if q.is_negative() {
                    3
                } else {
                    5
                }
            }
            _ => 5,
        }
    }

    fn starts_with_minus(&self) -> bool {
        match self {
            Expr::Neg(_) => true,
            Expr::Const(q) => q.is_negative(),
            Expr::Add(lhs, _) | Expr::Sub(lhs, _) | Expr::Mul(lhs, _) | Expr::Div(lhs, _) => {
                lhs.starts_with_minus()
            }
            Expr::Pow(base, exp) if !Expr::is_sqrt_form(base, exp) => base.starts_with_minus(),
            _ => false,
        }
    }

    // constant square roots print as sqrt(..)
    fn is_sqrt_form(base: &Expr, exp: &Expr) -> bool {
        matches!(base, Expr::Const(_))
            && matches!(exp, Expr::Const(q) if *q == BigRational::new(BigInt::one(), BigInt::from(2)))
    }

    fn write_operand(
        f: &mut fmt::Formatter,
        child: &Expr,
        min_precedence: u8,
        wrap_minus: bool,
    ) -> fmt::Result {
        if child.precedence() < min_precedence || (wrap_minus && child.starts_with_minus()) {
            write!(f, "({})", child)
        } else {
            write!(f, "{}", child)
        }
    }
}

/// Display implementation for pretty printing symbolic expressions.
///
/// Writes the minimal set of parentheses, `^` for powers and `sqrt(c)` for square roots of
/// constants, so that the output can be parsed back into the same tree shape.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(q) => write_rational(f, q),
            Expr::Constant(c) => write!(f, "{}", c),
            Expr::Add(lhs, rhs) => {
                Expr::write_operand(f, lhs, 1, false)?;
                write!(f, " + ")?;
                Expr::write_operand(f, rhs, 1, true)
            }
            Expr::Sub(lhs, rhs) => {
                Expr::write_operand(f, lhs, 1, false)?;
                write!(f, " - ")?;
                Expr::write_operand(f, rhs, 2, true)
            }
            Expr::Mul(lhs, rhs) => {
                Expr::write_operand(f, lhs, 2, false)?;
                write!(f, "*")?;
                Expr::write_operand(f, rhs, 2, true)
            }
            Expr::Div(lhs, rhs) => {
                Expr::write_operand(f, lhs, 2, false)?;
                write!(f, "/")?;
                Expr::write_operand(f, rhs, 3, true)
            }
            Expr::Pow(base, exp) => {
                if Expr::is_sqrt_form(base, exp) {
                    return write!(f, "sqrt({})", base);
                }
                Expr::write_operand(f, base, 5, true)?;
                write!(f, "^")?;
                Expr::write_operand(f, exp, 4, true)
            }
            Expr::Neg(inner) => {
                write!(f, "-")?;
                Expr::write_operand(f, inner, 3, true)
            }
            Expr::Func(func, arg) => write!(f, "{}({})", func, arg),
            Expr::Piecewise(branches) => {
                write!(f, "Piecewise(")?;
                for (i, (expr, cond)) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({}, {})", expr, cond)?;
                }
                write!(f, ")")
            }
        }
    }
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
        Expr::Neg(self.boxed())
    }
}

impl From<BigRational> for Expr {
    fn from(q: BigRational) -> Self {
        Expr::Const(q)
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn int(n: i64) -> Expr {
        Expr::Const(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn ratio(numer: i64, denom: i64) -> Expr {
        Expr::Const(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn zero() -> Expr {
        Expr::Const(BigRational::zero())
    }

    pub fn one() -> Expr {
        Expr::Const(BigRational::one())
    }

    pub fn func(function: Function, arg: Expr) -> Expr {
        Expr::Func(function, arg.boxed())
    }

    /// Creates power expression self^rhs.
    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// exact rational value of a `Const` node
    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            Expr::Const(q) => Some(q),
            _ => None,
        }
    }

    /// Checks if expression is exactly the constant 0
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(q) if q.is_zero())
    }

    /// Checks if expression is exactly the constant 1
    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(q) if q.is_one())
    }

    /// substitute a variable with an expression
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            Expr::Var(_) | Expr::Const(_) | Expr::Constant(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Sub(lhs, rhs) => Expr::Sub(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Mul(lhs, rhs) => Expr::Mul(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(lhs.substitute_variable(var, expr)),
                Box::new(rhs.substitute_variable(var, expr)),
            ),
            Expr::Pow(base, exp) => Expr::Pow(
                Box::new(base.substitute_variable(var, expr)),
                Box::new(exp.substitute_variable(var, expr)),
            ),
            Expr::Neg(inner) => Expr::Neg(Box::new(inner.substitute_variable(var, expr))),
            Expr::Func(func, arg) => Expr::Func(*func, Box::new(arg.substitute_variable(var, expr))),
            Expr::Piecewise(branches) => Expr::Piecewise(
                branches
                    .iter()
                    .map(|(e, cond)| {
                        let cond = match cond {
                            Condition::Always => Condition::Always,
                            Condition::Compare(lhs, rel, rhs) => Condition::Compare(
                                Box::new(lhs.substitute_variable(var, expr)),
                                *rel,
                                Box::new(rhs.substitute_variable(var, expr)),
                            ),
                        };
                        (e.substitute_variable(var, expr), cond)
                    })
                    .collect(),
            ),
        }
    }

    /// Substitutes a variable with an exact rational value throughout the expression.
    pub fn set_variable(&self, var: &str, value: &BigRational) -> Expr {
        self.substitute_variable(var, &Expr::Const(value.clone()))
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) | Expr::Constant(_) => false,
            Expr::Add(left, right)
            | Expr::Sub(left, right)
            | Expr::Mul(left, right)
            | Expr::Div(left, right)
            | Expr::Pow(left, right) => {
                left.contains_variable(var_name) || right.contains_variable(var_name)
            }
            Expr::Neg(inner) | Expr::Func(_, inner) => inner.contains_variable(var_name),
            Expr::Piecewise(branches) => branches.iter().any(|(e, cond)| {
                e.contains_variable(var_name)
                    || match cond {
                        Condition::Always => false,
                        Condition::Compare(lhs, _, rhs) => {
                            lhs.contains_variable(var_name) || rhs.contains_variable(var_name)
                        }
                    }
            }),
        }
    }

    /// names of all variables in order of first appearance
    pub fn extract_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Expr::Var(name) => {
                if !vars.contains(name) {
                    vars.push(name.clone());
                }
            }
            Expr::Const(_) | Expr::Constant(_) => {}
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) | Expr::Pow(l, r) => {
                l.collect_variables(vars);
                r.collect_variables(vars);
            }
            Expr::Neg(inner) | Expr::Func(_, inner) => inner.collect_variables(vars),
            Expr::Piecewise(branches) => {
                for (e, cond) in branches {
                    e.collect_variables(vars);
                    if let Condition::Compare(lhs, _, rhs) = cond {
                        lhs.collect_variables(vars);
                        rhs.collect_variables(vars);
                    }
                }
            }
        }
    }

    /// number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::Constant(_) => 1,
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) | Expr::Pow(l, r) => {
                1 + l.node_count() + r.node_count()
            }
            Expr::Neg(inner) | Expr::Func(_, inner) => 1 + inner.node_count(),
            Expr::Piecewise(branches) => {
                1 + branches
                    .iter()
                    .map(|(e, cond)| {
                        e.node_count()
                            + match cond {
                                Condition::Always => 1,
                                Condition::Compare(l, _, r) => 1 + l.node_count() + r.node_count(),
                            }
                    })
                    .sum::<usize>()
            }
        }
    }

    /// visits every function call node, outermost first
    pub fn for_each_call<F>(&self, visit: &mut F)
    where
        F: FnMut(&Expr),
    {
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::Constant(_) => {}
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                l.for_each_call(visit);
                r.for_each_call(visit);
            }
            Expr::Pow(l, r) => {
                visit(self);
                l.for_each_call(visit);
                r.for_each_call(visit);
            }
            Expr::Neg(inner) => inner.for_each_call(visit),
            Expr::Func(_, inner) => {
                visit(self);
                inner.for_each_call(visit);
            }
            Expr::Piecewise(branches) => {
                visit(self);
                for (e, cond) in branches {
                    e.for_each_call(visit);
                    if let Condition::Compare(l, _, r) = cond {
                        l.for_each_call(visit);
                        r.for_each_call(visit);
                    }
                }
            }
        }
    }
}
