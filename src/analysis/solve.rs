// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Real zeros and sign sets of single-variable expressions.
//!
//! `real_zeros` applies the zero rules: rational functions are solved exactly (numerator
//! after the common factors with the denominator are removed), products and quotients split
//! into their factors, and functions with a known zero set reduce to an equation on their
//! argument. Whatever cannot be solved in closed form is reported as `ZeroSet::Unsolved` so
//! the caller can fall back to a numeric scan or list the condition as unresolved.
//!
//! `solve_inequality` finds the set where a rational function is positive, negative or
//! zero by testing one rational point in every cell between consecutive roots and poles.
//!
//! Candidates returned by `real_zeros` are zeros of some factor; callers still have to
//! check that the whole expression is defined there.
use crate::analysis::budget::Budget;
use crate::analysis::error::AnalysisError;
use crate::analysis::intervals::{Endpoint, Interval, IntervalSet};
use crate::numerical::root_finding::{RootFindingConfig, ScalarRootFinder, SymbolicFunction};
use crate::symbolic::polynomial::{RationalFunction, RealValue, sort_and_dedup};
use crate::symbolic::symbolic_engine::{Condition, Expr, Function, Relation};
use crate::symbolic::symbolic_simplify::{FoldError, ZERO_TOLERANCE};
use crate::symbolic::utils::recognise_rational;
use log::debug;
use num::rational::BigRational;
use num_traits::{Signed, Zero};
use std::cmp::Ordering;

// numeric roots are checked against fractions up to this denominator
const RECOGNISE_MAX_DENOMINATOR: i64 = 1000;
const RECOGNISE_TOLERANCE: f64 = 1e-9;

/// real solutions of expr = 0
#[derive(Debug, Clone)]
pub enum ZeroSet {
    /// every real solution, ascending
    Finite(Vec<RealValue>),
    /// the expression vanishes identically
    Everywhere,
    /// no closed form, with the reason
    Unsolved(String),
}

/// Value of a single-variable expression at x. `Ok(None)` when the expression is undefined
/// or not real there; only an exhausted budget is an error.
pub fn value_at(
    expr: &Expr,
    var: &str,
    x: &RealValue,
    budget: &mut Budget,
) -> Result<Option<RealValue>, AnalysisError> {
    match &x.exact {
        Some(point) => match expr.substitute_variable(var, point).fold(budget) {
            Ok(v) => {
                let v = RealValue::from_expr(v);
                Ok(if v.approx.is_finite() || v.as_rational().is_some() {
                    Some(v)
                } else {
                    None
                })
            }
            Err(FoldError::Exhausted(err)) => Err(err),
            Err(_) => Ok(None),
        },
        None => {
            let v = expr.eval_f64(x.approx);
            Ok(if v.is_finite() {
                Some(RealValue::numeric(v))
            } else {
                None
            })
        }
    }
}

/// sign of a real value, exact for rationals
pub fn sign_of(v: &RealValue) -> Ordering {
    match v.as_rational() {
        Some(q) => q.cmp(&BigRational::zero()),
        None if v.approx.abs() < ZERO_TOLERANCE => Ordering::Equal,
        None => v.approx.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
    }
}

/// does the Piecewise condition hold at x; an undefined side counts as false
pub fn condition_holds_at(
    cond: &Condition,
    var: &str,
    x: &RealValue,
    budget: &mut Budget,
) -> Result<bool, AnalysisError> {
    match cond {
        Condition::Always => Ok(true),
        Condition::Compare(lhs, rel, rhs) => {
            let diff = Expr::Sub(lhs.clone(), rhs.clone());
            Ok(value_at(&diff, var, x, budget)?.is_some_and(|v| rel.holds(sign_of(&v))))
        }
    }
}

/// index of the branch that gives the value at x
pub fn active_branch(
    branches: &[(Expr, Condition)],
    var: &str,
    x: &RealValue,
    budget: &mut Budget,
) -> Result<Option<usize>, AnalysisError> {
    for (i, (_, cond)) in branches.iter().enumerate() {
        if condition_holds_at(cond, var, x, budget)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

fn union_zeros(a: ZeroSet, b: ZeroSet) -> ZeroSet {
    match (a, b) {
        (ZeroSet::Everywhere, _) | (_, ZeroSet::Everywhere) => ZeroSet::Everywhere,
        (ZeroSet::Unsolved(reason), _) | (_, ZeroSet::Unsolved(reason)) => {
            ZeroSet::Unsolved(reason)
        }
        (ZeroSet::Finite(mut a), ZeroSet::Finite(b)) => {
            a.extend(b);
            sort_and_dedup(&mut a);
            ZeroSet::Finite(a)
        }
    }
}

/// Real solutions of `expr = 0` in `var`.
pub fn real_zeros(expr: &Expr, var: &str, budget: &mut Budget) -> Result<ZeroSet, AnalysisError> {
    if !expr.contains_variable(var) {
        return match expr.fold(budget) {
            Ok(v) if sign_of(&RealValue::from_expr(v.clone())) == Ordering::Equal => Ok(ZeroSet::Everywhere),
            Ok(_) => Ok(ZeroSet::Finite(Vec::new())),
            Err(FoldError::Exhausted(err)) => Err(err),
            Err(_) => Ok(ZeroSet::Finite(Vec::new())),
        };
    }
    if let Some(rf) = RationalFunction::from_expr(expr, var, budget)? {
        if rf.numer.is_zero() {
            return Ok(ZeroSet::Everywhere);
        }
        let roots = rf.numer.real_roots(budget)?;
        debug!("zeros of {} from its numerator {:?}", expr, rf.numer.coeffs());
        return Ok(ZeroSet::Finite(roots));
    }
    let unsolved = || ZeroSet::Unsolved(format!("{} = 0 has no closed form solution", expr));
    let zeros = match expr {
        Expr::Mul(l, r) => union_zeros(real_zeros(l, var, budget)?, real_zeros(r, var, budget)?),
        Expr::Div(l, _) => real_zeros(l, var, budget)?,
        Expr::Neg(inner) => real_zeros(inner, var, budget)?,
        Expr::Pow(base, exp) => match &**exp {
            Expr::Const(q) if q.is_positive() => real_zeros(base, var, budget)?,
            Expr::Const(_) => ZeroSet::Finite(Vec::new()),
            _ if !base.contains_variable(var) => ZeroSet::Finite(Vec::new()),
            _ => unsolved(),
        },
        Expr::Func(func, arg) => match func {
            Function::Sqrt
            | Function::Abs
            | Function::Sinh
            | Function::Tanh
            | Function::Asin
            | Function::Atan
            | Function::Asinh
            | Function::Atanh => real_zeros(arg, var, budget)?,
            Function::Log | Function::Acos | Function::Acosh => {
                let shifted = Expr::Sub(arg.clone(), Expr::one().boxed());
                real_zeros(&shifted, var, budget)?
            }
            Function::Exp | Function::Cosh | Function::Sec | Function::Csc => {
                ZeroSet::Finite(Vec::new())
            }
            Function::Sin | Function::Cos | Function::Tan | Function::Cot => ZeroSet::Unsolved(
                format!("{} = 0 has infinitely many solutions", expr),
            ),
            Function::Floor | Function::Ceiling => {
                ZeroSet::Unsolved(format!("{} vanishes on a whole interval", expr))
            }
        },
        Expr::Piecewise(branches) => piecewise_zeros(branches, var, budget)?,
        _ => unsolved(),
    };
    Ok(zeros)
}

/// a numeric root as an exact fraction when the expression vanishes exactly there
pub fn refine_numeric_root(
    expr: &Expr,
    var: &str,
    root: f64,
    budget: &mut Budget,
) -> Result<RealValue, AnalysisError> {
    if let Some(q) = recognise_rational(root, RECOGNISE_MAX_DENOMINATOR, RECOGNISE_TOLERANCE) {
        let candidate = RealValue::rational(q);
        let vanishes = value_at(expr, var, &candidate, budget)?
            .and_then(|v| v.as_rational().map(|q| q.is_zero()))
            .unwrap_or(false);
        if vanishes {
            return Ok(candidate);
        }
    }
    Ok(RealValue::numeric(root))
}

/// Zeros of `expr` found by the sign-change scan of the configured window, exact where
/// they turn out to be rational. `SolverFailure` when the expression vanishes on a whole
/// piece of the window.
pub fn numeric_zeros(
    expr: &Expr,
    var: &str,
    config: &RootFindingConfig,
    budget: &mut Budget,
) -> Result<Vec<RealValue>, AnalysisError> {
    let finder = ScalarRootFinder::with_config(config.clone());
    let function = SymbolicFunction::from_expr(expr);
    let mut found = Vec::new();
    for root in finder.scan(&function, budget)? {
        found.push(refine_numeric_root(expr, var, root, budget)?);
    }
    sort_and_dedup(&mut found);
    Ok(found)
}

/// zeros of every branch, kept where that branch is the active one
fn piecewise_zeros(
    branches: &[(Expr, Condition)],
    var: &str,
    budget: &mut Budget,
) -> Result<ZeroSet, AnalysisError> {
    let mut found = Vec::new();
    for (i, (branch, _)) in branches.iter().enumerate() {
        match real_zeros(branch, var, budget)? {
            ZeroSet::Finite(candidates) => {
                for c in candidates {
                    if active_branch(branches, var, &c, budget)? == Some(i) {
                        found.push(c);
                    }
                }
            }
            ZeroSet::Everywhere => {
                return Ok(ZeroSet::Unsolved(format!(
                    "the branch {} vanishes on a whole interval",
                    branch
                )));
            }
            unsolved @ ZeroSet::Unsolved(_) => return Ok(unsolved),
        }
    }
    sort_and_dedup(&mut found);
    Ok(ZeroSet::Finite(found))
}

/// a rational number strictly between two neighbouring critical values
pub fn rational_between(lo: Option<&RealValue>, hi: Option<&RealValue>) -> BigRational {
    if let (Some(a), Some(b)) = (
        lo.and_then(|v| v.as_rational()),
        hi.and_then(|v| v.as_rational()),
    ) {
        return (a + b) / BigRational::from_integer(2.into());
    }
    let t = match (lo, hi) {
        (Some(a), Some(b)) => 0.5 * (a.approx + b.approx),
        (Some(a), None) => a.approx.floor() + 1.0,
        (None, Some(b)) => b.approx.ceil() - 1.0,
        (None, None) => 0.0,
    };
    BigRational::from_float(t).unwrap_or_else(BigRational::zero)
}

/// set where a Piecewise condition holds, None when it cannot be solved exactly
pub fn condition_set(
    cond: &Condition,
    var: &str,
    budget: &mut Budget,
) -> Result<Option<IntervalSet>, AnalysisError> {
    match cond {
        Condition::Always => Ok(Some(IntervalSet::all_reals())),
        Condition::Compare(lhs, rel, rhs) => {
            let g = Expr::Sub(lhs.clone(), rhs.clone());
            solve_inequality(&g, *rel, var, budget)
        }
    }
}

fn product_sign(a: Ordering, b: Ordering) -> Ordering {
    match (a, b) {
        (Ordering::Equal, _) | (_, Ordering::Equal) => Ordering::Equal,
        (x, y) if x == y => Ordering::Greater,
        _ => Ordering::Less,
    }
}

/// Set where `g rel 0` holds (poles of g excluded). None when g is not a rational function
/// of `var`.
pub fn solve_inequality(
    g: &Expr,
    rel: Relation,
    var: &str,
    budget: &mut Budget,
) -> Result<Option<IntervalSet>, AnalysisError> {
    let Some(rf) = RationalFunction::from_expr(g, var, budget)? else {
        return Ok(None);
    };
    let poles = rf.denom.real_roots(budget)?;
    if rf.numer.is_zero() {
        let set = if rel.holds(Ordering::Equal) {
            IntervalSet::all_reals().remove_points(&poles)
        } else {
            IntervalSet::empty()
        };
        return Ok(Some(set));
    }
    let roots = rf.numer.real_roots(budget)?;
    let mut points = roots.clone();
    points.extend(poles.iter().cloned());
    sort_and_dedup(&mut points);

    let mut pieces = Vec::new();
    for k in 0..=points.len() {
        let lo = if k == 0 { None } else { points.get(k - 1) };
        let hi = points.get(k);
        let t = rational_between(lo, hi);
        let sign = product_sign(rf.numer.sign_at(&t), rf.denom.sign_at(&t));
        if rel.holds(sign) {
            let lo = lo.map_or_else(Endpoint::infinite, |v| Endpoint::open(v.clone()));
            let hi = hi.map_or_else(Endpoint::infinite, |v| Endpoint::open(v.clone()));
            pieces.push(Interval::new(lo, hi));
        }
    }
    if rel.holds(Ordering::Equal) {
        pieces.extend(roots.into_iter().map(Interval::point));
    }
    Ok(Some(IntervalSet::from_intervals(pieces)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse;
    use approx::assert_relative_eq;

    fn zeros(text: &str) -> ZeroSet {
        let e = parse(text).unwrap();
        real_zeros(&e.expr, "x", &mut Budget::unlimited()).unwrap()
    }

    fn finite(text: &str) -> Vec<String> {
        match zeros(text) {
            ZeroSet::Finite(v) => v.iter().map(|r| r.to_string()).collect(),
            other => panic!("expected finite zeros of {}, got {:?}", text, other),
        }
    }

    fn inequality(text: &str, rel: Relation) -> String {
        let e = parse(text).unwrap();
        solve_inequality(&e.expr, rel, "x", &mut Budget::unlimited())
            .unwrap()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_rational_zeros() {
        assert_eq!(finite("x**2"), vec!["0"]);
        assert_eq!(finite("(x^2 - 1)/(x - 1)"), vec!["-1"]);
        assert_eq!(finite("(x-1)/(x+2)"), vec!["1"]);
        assert!(finite("1/x").is_empty());
        assert_eq!(finite("x^2 - 2").len(), 2);
        assert!(matches!(zeros("x - x"), ZeroSet::Everywhere));
    }

    #[test]
    fn test_constant_zeros() {
        let mut budget = Budget::unlimited();
        let zero = Expr::int(2) - Expr::int(2);
        assert!(matches!(real_zeros(&zero, "x", &mut budget), Ok(ZeroSet::Everywhere)));
        let three = Expr::int(1) + Expr::int(2);
        assert!(matches!(real_zeros(&three, "x", &mut budget), Ok(ZeroSet::Finite(v)) if v.is_empty()));
    }

    #[test]
    fn test_structural_zeros() {
        assert_eq!(finite("x*log(x)"), vec!["0", "1"]);
        assert_eq!(finite("sqrt(x + 1)"), vec!["-1"]);
        assert!(finite("exp(x)").is_empty());
        assert_eq!(finite("acos(x/2)"), vec!["2"]);
        assert!(finite("x^(-1/2)").is_empty());
        assert!(matches!(zeros("sin(x)"), ZeroSet::Unsolved(_)));
        assert!(matches!(zeros("sin(x) - x/2"), ZeroSet::Unsolved(_)));
    }

    #[test]
    fn test_piecewise_zeros() {
        // x - 1 vanishes at 1 but that branch is only used below 0
        assert!(finite("Piecewise((x - 1, x < 0), (x^2 + 1, True))").is_empty());
        assert_eq!(finite("Piecewise((x + 1, x < 0), (x - 2, True))"), vec!["-1", "2"]);
    }

    #[test]
    fn test_inequalities() {
        assert_eq!(inequality("x + 1", Relation::Ge), "[-1, ∞)");
        assert_eq!(inequality("x", Relation::Gt), "(0, ∞)");
        assert_eq!(inequality("1 - x^2", Relation::Ge), "[-1, 1]");
        assert_eq!(inequality("x^2 - 1", Relation::Ge), "(-∞, -1] ∪ [1, ∞)");
        assert_eq!(inequality("1/x", Relation::Ge), "(0, ∞)");
        assert_eq!(inequality("x^2", Relation::Ge), "(-∞, ∞)");
        assert_eq!(inequality("x^2", Relation::Gt), "(-∞, 0) ∪ (0, ∞)");
        assert_eq!(inequality("x^2 + 1", Relation::Lt), "∅");
    }

    #[test]
    fn test_value_at() {
        let e = parse("sqrt(x)").unwrap();
        let mut budget = Budget::unlimited();
        let four = RealValue::rational(BigRational::from_integer(4.into()));
        let v = value_at(&e.expr, "x", &four, &mut budget).unwrap().unwrap();
        assert_eq!(v.to_string(), "2");
        let minus = RealValue::rational(BigRational::from_integer((-4).into()));
        assert!(value_at(&e.expr, "x", &minus, &mut budget).unwrap().is_none());
        let approx = value_at(&e.expr, "x", &RealValue::numeric(2.0), &mut budget)
            .unwrap()
            .unwrap();
        assert_relative_eq!(approx.approx, 2f64.sqrt());
    }
}
