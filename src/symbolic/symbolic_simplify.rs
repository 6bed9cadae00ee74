// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Symbolic Expression Simplification Module
//!
//! Exact simplification of expression trees with rational constants.
//!
//! ## Simplification Strategy
//!
//! 1. **Constant Folding**: arithmetic on `Const` nodes is done exactly with `BigRational`
//! 2. **Algebraic Identities**: x + 0 = x, x * 1 = x, 0 * x = 0, x^1 = x, x^0 = 1
//! 3. **Radicals**: rational powers of rational constants are reduced to a rational
//!    coefficient times the smallest possible radicand, sqrt(8) = 2*sqrt(2)
//! 4. **Special values**: exp(0), log(1), trigonometric functions at rational multiples of pi,
//!    inverse functions at 0 and ±1
//! 5. **Real-domain checks**: a zero denominator, an even root of a negative number, the log
//!    of zero, a pole of tan, ... stop the folding with a `FoldError` that says which kind of
//!    failure happened, so callers can tell "undefined" from "not real"
//!
//! Nodes that still contain the variable are only rebuilt with the identities, no
//! real-domain checks are made on them.
//!
//! ## Fractions
//!
//! `as_fraction` turns any expression into a numerator/denominator pair without cancelling
//! anything, `together` returns that pair as a single quotient. Both are used for the
//! "combine fractions" step of the evaluator and by the domain analysis, whose critical
//! points are the zeros of that denominator.
use crate::analysis::budget::{Budget, Operation};
use crate::analysis::error::AnalysisError;
use crate::symbolic::symbolic_engine::{Condition, Expr, Function, MathConst};
use crate::symbolic::utils::{extract_rational_root, rational_powi};
use num::bigint::BigInt;
use num::integer::Integer;
use num::rational::BigRational;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

/// symbolic constants closer to zero than this are treated as zero
pub const ZERO_TOLERANCE: f64 = 1e-12;
// exact integer powers above this stay symbolic
const MAX_EXACT_EXPONENT: u64 = 4096;

/// why a constant expression has no real value
#[derive(Debug, Clone, PartialEq)]
pub enum FoldError {
    /// a denominator is zero
    DivisionByZero(String),
    /// even root of a negative number, log of a negative number, asin(2), ...
    NonReal(String),
    /// pole or undefined form: log(0), tan(pi/2), no Piecewise branch applies
    Undefined(String),
    /// the budget ran out
    Exhausted(AnalysisError),
}

impl fmt::Display for FoldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FoldError::DivisionByZero(what) => write!(f, "division by zero in {}", what),
            FoldError::NonReal(what) => write!(f, "{} is not a real number", what),
            FoldError::Undefined(what) => write!(f, "{} is undefined", what),
            FoldError::Exhausted(err) => write!(f, "{}", err),
        }
    }
}

impl From<AnalysisError> for FoldError {
    fn from(err: AnalysisError) -> Self {
        FoldError::Exhausted(err)
    }
}

fn rational(n: i64, d: i64) -> BigRational {
    BigRational::new(BigInt::from(n), BigInt::from(d))
}

fn has_variable(e: &Expr) -> bool {
    match e {
        Expr::Var(_) => true,
        Expr::Const(_) | Expr::Constant(_) => false,
        Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) | Expr::Pow(l, r) => {
            has_variable(l) || has_variable(r)
        }
        Expr::Neg(inner) | Expr::Func(_, inner) => has_variable(inner),
        Expr::Piecewise(_) => !e.extract_variables().is_empty(),
    }
}

/// splits c*T into (c, T); a bare constant is (c, 1)
fn split_coefficient(e: &Expr) -> (BigRational, Expr) {
    match e {
        Expr::Const(q) => (q.clone(), Expr::one()),
        Expr::Mul(l, r) => match (&**l, &**r) {
            (Expr::Const(q), t) | (t, Expr::Const(q)) => (q.clone(), t.clone()),
            _ => (BigRational::one(), e.clone()),
        },
        Expr::Neg(inner) => {
            let (c, t) = split_coefficient(inner);
            (-c, t)
        }
        _ => (BigRational::one(), e.clone()),
    }
}

/// rebuilds c*T with the obvious identities
fn with_coefficient(c: BigRational, t: Expr) -> Expr {
    if c.is_zero() {
        Expr::zero()
    } else if t.is_one() {
        Expr::Const(c)
    } else if c.is_one() {
        t
    } else if c == -BigRational::one() {
        Expr::Neg(t.boxed())
    } else {
        Expr::Mul(Expr::Const(c).boxed(), t.boxed())
    }
}

/// k for an expression of the form k*pi
fn pi_multiple(e: &Expr) -> Option<BigRational> {
    match e {
        Expr::Constant(MathConst::Pi) => Some(BigRational::one()),
        Expr::Mul(l, r) => match (&**l, &**r) {
            (Expr::Const(k), inner) | (inner, Expr::Const(k)) => {
                pi_multiple(inner).map(|m| m * k)
            }
            _ => None,
        },
        Expr::Div(l, r) => match &**r {
            Expr::Const(d) if !d.is_zero() => pi_multiple(l).map(|m| m / d),
            _ => None,
        },
        Expr::Neg(inner) => pi_multiple(inner).map(|m| -m),
        _ => None,
    }
}

fn pi_times(k: BigRational) -> Expr {
    let pi = Expr::Constant(MathConst::Pi);
    if k.is_one() {
        return pi;
    }
    if k == -BigRational::one() {
        return Expr::Neg(pi.boxed());
    }
    let numer = BigRational::from_integer(k.numer().clone());
    let denom = BigRational::from_integer(k.denom().clone());
    let top = with_coefficient(numer, pi);
    if denom.is_one() {
        top
    } else {
        Expr::Div(top.boxed(), Expr::Const(denom).boxed())
    }
}

/// reduces k modulo m into [0, m)
fn reduce_mod(k: &BigRational, m: &BigRational) -> BigRational {
    let quotient = (k / m).floor();
    k - quotient * m
}

/// sin(k*pi) when it is rational
fn sin_pi_multiple(k: &BigRational) -> Option<BigRational> {
    let r = reduce_mod(k, &BigRational::from_integer(BigInt::from(2)));
    let table: [(BigRational, BigRational); 8] = [
        (rational(0, 1), rational(0, 1)),
        (rational(1, 6), rational(1, 2)),
        (rational(1, 2), rational(1, 1)),
        (rational(5, 6), rational(1, 2)),
        (rational(1, 1), rational(0, 1)),
        (rational(7, 6), rational(-1, 2)),
        (rational(3, 2), rational(-1, 1)),
        (rational(11, 6), rational(-1, 2)),
    ];
    table
        .iter()
        .find(|(angle, _)| *angle == r)
        .map(|(_, value)| value.clone())
}

fn cos_pi_multiple(k: &BigRational) -> Option<BigRational> {
    sin_pi_multiple(&(k + rational(1, 2)))
}

/// tan(k*pi): Some(Some(v)) for a rational value, Some(None) at a pole
fn tan_pi_multiple(k: &BigRational) -> Option<Option<BigRational>> {
    let r = reduce_mod(k, &BigRational::one());
    if r.is_zero() {
        Some(Some(BigRational::zero()))
    } else if r == rational(1, 4) {
        Some(Some(BigRational::one()))
    } else if r == rational(3, 4) {
        Some(Some(-BigRational::one()))
    } else if r == rational(1, 2) {
        Some(None)
    } else {
        None
    }
}

/// compares two constant expressions, exactly when both are rational
pub fn compare_constants(a: &Expr, b: &Expr) -> Option<Ordering> {
    if let (Expr::Const(p), Expr::Const(q)) = (a, b) {
        return Some(p.cmp(q));
    }
    let d = a.approx() - b.approx();
    if d.is_nan() {
        None
    } else if d.abs() < ZERO_TOLERANCE {
        Some(Ordering::Equal)
    } else {
        d.partial_cmp(&0.0)
    }
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Exact simplification with real-domain checks on constant subtrees.
    ///
    /// ## Examples
    /// - `(2 - 1)/(2 + 2)` → `1/4`
    /// - `sqrt(8)` → `2*sqrt(2)`
    /// - `sin(pi/6)` → `1/2`
    /// - `1/(3 - 3)` → `Err(DivisionByZero)`
    /// - `sqrt(-2 + 1)` → `Err(NonReal)`
    pub fn fold(&self, budget: &mut Budget) -> Result<Expr, FoldError> {
        budget.charge(Operation::Simplify, 1)?;
        match self {
            Expr::Var(_) | Expr::Const(_) | Expr::Constant(_) => Ok(self.clone()),
            Expr::Add(lhs, rhs) => {
                let a = lhs.fold(budget)?;
                let b = rhs.fold(budget)?;
                Ok(fold_add(a, b))
            }
            Expr::Sub(lhs, rhs) => {
                let a = lhs.fold(budget)?;
                let b = rhs.fold(budget)?;
                Ok(fold_sub(a, b))
            }
            Expr::Mul(lhs, rhs) => {
                let a = lhs.fold(budget)?;
                let b = rhs.fold(budget)?;
                fold_mul(a, b, budget)
            }
            Expr::Div(lhs, rhs) => {
                let a = lhs.fold(budget)?;
                let b = rhs.fold(budget)?;
                fold_div(a, b, budget)
            }
            Expr::Pow(base, exp) => {
                let b = base.fold(budget)?;
                let e = exp.fold(budget)?;
                fold_pow(b, e, budget)
            }
            Expr::Neg(inner) => {
                let a = inner.fold(budget)?;
                Ok(fold_neg(a))
            }
            Expr::Func(func, arg) => {
                let a = arg.fold(budget)?;
                fold_function(*func, a, budget)
            }
            Expr::Piecewise(branches) => {
                if has_variable(self) {
                    return Ok(self.clone());
                }
                for (expr, cond) in branches {
                    let holds = match cond {
                        Condition::Always => true,
                        Condition::Compare(lhs, rel, rhs) => {
                            let l = lhs.fold(budget)?;
                            let r = rhs.fold(budget)?;
                            match compare_constants(&l, &r) {
                                Some(ordering) => rel.holds(ordering),
                                None => false,
                            }
                        }
                    };
                    if holds {
                        return expr.fold(budget);
                    }
                }
                Err(FoldError::Undefined(format!(
                    "{} (no branch applies)",
                    self
                )))
            }
        }
    }

    /// Identity-level cleanup for display, without any budget. Expressions whose constant
    /// parts have no real value are returned unchanged.
    pub fn simplify_(&self) -> Expr {
        self.fold(&mut Budget::unlimited())
            .unwrap_or_else(|_| self.clone())
    }

    //___________________________________FRACTIONS____________________________________

    /// Numerator and denominator of the expression written as a single fraction.
    /// Nothing is cancelled: the denominator keeps every factor any sub-term divides by.
    pub fn as_fraction(&self) -> (Expr, Expr) {
        match self {
            Expr::Const(q) if !q.denom().is_one() => (
                Expr::Const(BigRational::from_integer(q.numer().clone())),
                Expr::Const(BigRational::from_integer(q.denom().clone())),
            ),
            Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) => {
                let (na, da) = lhs.as_fraction();
                let (nb, db) = rhs.as_fraction();
                let combine = |l: Expr, r: Expr| match self {
                    Expr::Add(..) => Expr::Add(l.boxed(), r.boxed()),
                    _ => Expr::Sub(l.boxed(), r.boxed()),
                };
                if da.is_one() && db.is_one() {
                    (combine(na, nb), Expr::one())
                } else if da == db {
                    (combine(na, nb), da)
                } else {
                    (
                        combine(mul_clean(na, db.clone()), mul_clean(nb, da.clone())),
                        mul_clean(da, db),
                    )
                }
            }
            Expr::Mul(lhs, rhs) => {
                let (na, da) = lhs.as_fraction();
                let (nb, db) = rhs.as_fraction();
                (mul_clean(na, nb), mul_clean(da, db))
            }
            Expr::Div(lhs, rhs) => {
                let (na, da) = lhs.as_fraction();
                let (nb, db) = rhs.as_fraction();
                (mul_clean(na, db), mul_clean(da, nb))
            }
            Expr::Neg(inner) => {
                let (n, d) = inner.as_fraction();
                (Expr::Neg(n.boxed()), d)
            }
            Expr::Pow(base, exp) => match &**exp {
                Expr::Const(q) if q.is_integer() && !q.is_zero() => {
                    let (n, d) = base.as_fraction();
                    let power = |e: Expr, k: BigRational| {
                        if e.is_one() || k.is_one() {
                            e
                        } else {
                            Expr::Pow(e.boxed(), Expr::Const(k).boxed())
                        }
                    };
                    if q.is_positive() {
                        (power(n, q.clone()), power(d, q.clone()))
                    } else {
                        (power(d, -q.clone()), power(n, -q.clone()))
                    }
                }
                Expr::Const(q) if q.is_negative() => (
                    Expr::one(),
                    Expr::Pow(base.clone(), Expr::Const(-q.clone()).boxed()),
                ),
                _ => (self.clone(), Expr::one()),
            },
            _ => (self.clone(), Expr::one()),
        }
    }

    /// the expression as one quotient N/D (or N when D is 1)
    pub fn together(&self) -> Expr {
        let (n, d) = self.as_fraction();
        if d.is_one() {
            n
        } else {
            Expr::Div(n.boxed(), d.boxed())
        }
    }

    /// Divides out what the numerator and the denominator of a fraction have in common:
    /// the rational coefficients and equal factors with their integer powers.
    /// Nothing is folded: 6/4 → 3/2, (2*sqrt(3))/4 → sqrt(3)/2, (2*a^3)/(a*b) → (2*a^2)/b.
    /// Anything that is not a fraction, or has nothing in common, is returned unchanged.
    pub fn cancel(&self, budget: &mut Budget) -> Result<Expr, FoldError> {
        let Expr::Div(n, d) = self else {
            return Ok(self.clone());
        };
        let mut cn = BigRational::one();
        let mut num_factors = Vec::new();
        collect_factors(n, &mut cn, &mut num_factors);
        let mut cd = BigRational::one();
        let mut den_factors = Vec::new();
        collect_factors(d, &mut cd, &mut den_factors);
        if cd.is_zero() {
            return Err(FoldError::DivisionByZero(self.to_string()));
        }
        if cn.is_zero() {
            return Ok(self.clone());
        }
        budget.charge(Operation::Simplify, (num_factors.len() + den_factors.len()) as u64 + 1)?;
        let mut common = false;
        for (base, k) in num_factors.iter_mut() {
            if let Some((_, j)) = den_factors.iter_mut().find(|(b, j)| *j > 0 && b == base) {
                let m = (*k).min(*j);
                *k -= m;
                *j -= m;
                common = true;
            }
        }
        let c = &cn / &cd;
        let numer = BigRational::from_integer(c.numer().clone());
        let denom = BigRational::from_integer(c.denom().clone());
        if !common && numer == cn && denom == cd {
            return Ok(self.clone());
        }
        let top_part = product_of(num_factors);
        let bottom_part = product_of(den_factors);
        if top_part.is_one() && bottom_part.is_one() {
            return Ok(Expr::Const(c));
        }
        let top = with_coefficient(numer, top_part);
        let bottom = with_coefficient(denom, bottom_part);
        if bottom.is_one() {
            return Ok(top);
        }
        Ok(Expr::Div(top.boxed(), bottom.boxed()))
    }
}

/// rational coefficient and (base, positive integer power) factors of a product
fn collect_factors(e: &Expr, coefficient: &mut BigRational, factors: &mut Vec<(Expr, u32)>) {
    match e {
        Expr::Const(q) => *coefficient *= q,
        Expr::Neg(inner) => {
            *coefficient = -coefficient.clone();
            collect_factors(inner, coefficient, factors);
        }
        Expr::Mul(l, r) => {
            collect_factors(l, coefficient, factors);
            collect_factors(r, coefficient, factors);
        }
        _ => {
            let (base, k) = match e {
                Expr::Pow(b, k) => match k.as_rational() {
                    Some(q) if q.is_integer() && q.is_positive() => {
                        match q.to_integer().to_u32() {
                            Some(k) => ((**b).clone(), k),
                            None => (e.clone(), 1),
                        }
                    }
                    _ => (e.clone(), 1),
                },
                _ => (e.clone(), 1),
            };
            match factors.iter_mut().find(|(b, _)| *b == base) {
                Some((_, j)) => *j += k,
                None => factors.push((base, k)),
            }
        }
    }
}

fn product_of(factors: Vec<(Expr, u32)>) -> Expr {
    factors
        .into_iter()
        .filter(|(_, k)| *k > 0)
        .map(|(base, k)| if k == 1 { base } else { base.pow(Expr::int(k as i64)) })
        .fold(Expr::one(), mul_clean)
}

fn mul_clean(a: Expr, b: Expr) -> Expr {
    if a.is_one() {
        b
    } else if b.is_one() {
        a
    } else {
        Expr::Mul(a.boxed(), b.boxed())
    }
}

fn fold_add(a: Expr, b: Expr) -> Expr {
    if let (Expr::Const(p), Expr::Const(q)) = (&a, &b) {
        return Expr::Const(p + q);
    }
    if a.is_zero() {
        return b;
    }
    if b.is_zero() {
        return a;
    }
    let (ca, ta) = split_coefficient(&a);
    let (cb, tb) = split_coefficient(&b);
    if ta == tb {
        return with_coefficient(ca + cb, ta);
    }
    match b {
        Expr::Const(q) if q.is_negative() => Expr::Sub(a.boxed(), Expr::Const(-q).boxed()),
        Expr::Neg(inner) => Expr::Sub(a.boxed(), inner),
        _ => Expr::Add(a.boxed(), b.boxed()),
    }
}

fn fold_sub(a: Expr, b: Expr) -> Expr {
    if let (Expr::Const(p), Expr::Const(q)) = (&a, &b) {
        return Expr::Const(p - q);
    }
    if b.is_zero() {
        return a;
    }
    if a.is_zero() {
        return fold_neg(b);
    }
    let (ca, ta) = split_coefficient(&a);
    let (cb, tb) = split_coefficient(&b);
    if ta == tb {
        return with_coefficient(ca - cb, ta);
    }
    match b {
        Expr::Const(q) if q.is_negative() => Expr::Add(a.boxed(), Expr::Const(-q).boxed()),
        Expr::Neg(inner) => Expr::Add(a.boxed(), inner),
        _ => Expr::Sub(a.boxed(), b.boxed()),
    }
}

fn fold_neg(a: Expr) -> Expr {
    match a {
        Expr::Const(q) => Expr::Const(-q),
        Expr::Neg(inner) => *inner,
        Expr::Mul(l, r) if matches!(*l, Expr::Const(_)) => {
            let (c, t) = split_coefficient(&Expr::Mul(l, r));
            with_coefficient(-c, t)
        }
        other => Expr::Neg(other.boxed()),
    }
}

fn constant_radical(e: &Expr) -> Option<(&BigRational, &BigRational)> {
    match e {
        Expr::Pow(b, x) => match (&**b, &**x) {
            (Expr::Const(base), Expr::Const(exp)) if base.is_positive() => Some((base, exp)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_mul(a: Expr, b: Expr, budget: &mut Budget) -> Result<Expr, FoldError> {
    if let (Expr::Const(p), Expr::Const(q)) = (&a, &b) {
        return Ok(Expr::Const(p * q));
    }
    if a.is_zero() || b.is_zero() {
        return Ok(Expr::zero());
    }
    if a.is_one() {
        return Ok(b);
    }
    if b.is_one() {
        return Ok(a);
    }
    // sqrt(2)*sqrt(2) = 2, sqrt(2)*sqrt(3) = sqrt(6)
    if let (Some((ba, ea)), Some((bb, eb))) = (constant_radical(&a), constant_radical(&b)) {
        if ba == bb {
            let exp = ea + eb;
            return fold_pow(Expr::Const(ba.clone()), Expr::Const(exp), budget);
        }
        if ea == eb {
            let base = ba * bb;
            return fold_pow(Expr::Const(base), Expr::Const(ea.clone()), budget);
        }
    }
    let (ca, ta) = split_coefficient(&a);
    let (cb, tb) = split_coefficient(&b);
    let c = ca * cb;
    let t = if ta.is_one() {
        tb
    } else if tb.is_one() {
        ta
    } else {
        Expr::Mul(ta.boxed(), tb.boxed())
    };
    Ok(with_coefficient(c, t))
}

fn fold_div(a: Expr, b: Expr, budget: &mut Budget) -> Result<Expr, FoldError> {
    if b.is_zero() {
        return Err(FoldError::DivisionByZero(format!("{}/({})", a, b)));
    }
    if !has_variable(&b) && !matches!(b, Expr::Const(_)) && b.approx().abs() < ZERO_TOLERANCE {
        return Err(FoldError::DivisionByZero(format!("{}/({})", a, b)));
    }
    if let (Expr::Const(p), Expr::Const(q)) = (&a, &b) {
        return Ok(Expr::Const(p / q));
    }
    if b.is_one() {
        return Ok(a);
    }
    if a.is_zero() {
        return Ok(Expr::zero());
    }
    if a == b {
        return Ok(Expr::one());
    }
    if let Expr::Const(q) = &b {
        let (c, t) = split_coefficient(&a);
        if !c.is_one() {
            return Ok(with_coefficient(c / q, t));
        }
        return Ok(Expr::Div(a.boxed(), b.boxed()));
    }
    // p/sqrt(c) = p/c*sqrt(c)
    if let Some((base, exp)) = constant_radical(&b) {
        if *exp == rational(1, 2) {
            let (c, t) = split_coefficient(&a);
            let radical = Expr::Pow(Expr::Const(base.clone()).boxed(), Expr::Const(exp.clone()).boxed());
            let numerator = fold_mul(t, radical, budget)?;
            return Ok(with_coefficient(c / base, numerator));
        }
    }
    let (ca, ta) = split_coefficient(&a);
    let (cb, tb) = split_coefficient(&b);
    let c = ca / cb;
    let quotient = if ta == tb {
        Expr::one()
    } else {
        Expr::Div(ta.boxed(), tb.boxed())
    };
    Ok(with_coefficient(c, quotient))
}

fn exact_integer_power(q: &BigRational, n: &BigInt, budget: &mut Budget) -> Result<Option<BigRational>, FoldError> {
    let magnitude = match n.abs().to_u64() {
        Some(m) if m <= MAX_EXACT_EXPONENT => m,
        _ => return Ok(None),
    };
    let bits = q.numer().bits().max(q.denom().bits()).max(1);
    budget.charge(Operation::Simplify, (bits * magnitude) / 64 + 1)?;
    Ok(n.to_i64().and_then(|exponent| rational_powi(q, exponent)))
}

fn fold_pow(b: Expr, e: Expr, budget: &mut Budget) -> Result<Expr, FoldError> {
    let rebuilt = |b: Expr, e: Expr| Expr::Pow(b.boxed(), e.boxed());
    if let Expr::Const(q) = &e {
        if q.is_zero() {
            return Ok(Expr::one());
        }
        if q.is_one() {
            return Ok(b);
        }
        if q.is_integer() {
            let n = q.numer();
            if let Expr::Const(base) = &b {
                if base.is_zero() && n.is_negative() {
                    return Err(FoldError::DivisionByZero(format!("0^({})", q)));
                }
                return Ok(match exact_integer_power(base, n, budget)? {
                    Some(value) => Expr::Const(value),
                    None => rebuilt(b, e),
                });
            }
            if has_variable(&b) {
                return Ok(rebuilt(b, e));
            }
            // (c^r)^n = c^(r*n) for c > 0
            if let Some((base, exp)) = constant_radical(&b) {
                return fold_pow(Expr::Const(base.clone()), Expr::Const(exp * q), budget);
            }
            if let Expr::Neg(inner) = &b {
                let power = fold_pow((**inner).clone(), e.clone(), budget)?;
                return Ok(if n.is_odd() { fold_neg(power) } else { power });
            }
            let (c, t) = split_coefficient(&b);
            if !c.is_one() && !t.is_one() {
                let coefficient = match exact_integer_power(&c, n, budget)? {
                    Some(value) => value,
                    None => return Ok(rebuilt(b, e)),
                };
                let rest = fold_pow(t, e.clone(), budget)?;
                return fold_mul(Expr::Const(coefficient), rest, budget);
            }
            if b.approx() == 0.0 && n.is_negative() {
                return Err(FoldError::DivisionByZero(format!("({})^({})", b, q)));
            }
            return Ok(rebuilt(b, e));
        }
        // rational exponent p/r with r > 1
        let root_degree = q.denom().to_u32();
        if let Expr::Const(base) = &b {
            if base.is_zero() {
                return if q.is_positive() {
                    Ok(Expr::zero())
                } else {
                    Err(FoldError::DivisionByZero(format!("0^({})", q)))
                };
            }
            if base.is_negative() {
                if q.denom().is_even() {
                    return Err(FoldError::NonReal(format!("({})^({})", base, q)));
                }
                // real odd root of a negative base
                let magnitude = fold_pow(Expr::Const(-base.clone()), e.clone(), budget)?;
                return Ok(if q.numer().is_odd() { fold_neg(magnitude) } else { magnitude });
            }
            let k = match root_degree {
                Some(k) if k <= 64 => k,
                _ => return Ok(rebuilt(b, e)),
            };
            let powered = match exact_integer_power(base, q.numer(), budget)? {
                Some(value) => value,
                None => return Ok(rebuilt(b, e)),
            };
            let (coefficient, radicand) = extract_rational_root(&powered, k);
            if radicand.is_one() {
                return Ok(Expr::Const(coefficient));
            }
            let radical = Expr::Pow(
                Expr::Const(BigRational::from_integer(radicand)).boxed(),
                Expr::Const(BigRational::new(BigInt::one(), BigInt::from(k))).boxed(),
            );
            return Ok(with_coefficient(coefficient, radical));
        }
        if has_variable(&b) {
            return Ok(rebuilt(b, e));
        }
        if let Some((base, exp)) = constant_radical(&b) {
            return fold_pow(Expr::Const(base.clone()), Expr::Const(exp * q), budget);
        }
        let value = b.approx();
        if value < -ZERO_TOLERANCE && q.denom().is_even() {
            return Err(FoldError::NonReal(format!("({})^({})", b, q)));
        }
        if value.abs() < ZERO_TOLERANCE && q.is_negative() {
            return Err(FoldError::DivisionByZero(format!("({})^({})", b, q)));
        }
        return Ok(rebuilt(b, e));
    }
    if has_variable(&b) || has_variable(&e) {
        return Ok(rebuilt(b, e));
    }
    // constant base, irrational constant exponent
    let value = b.approx();
    if value < -ZERO_TOLERANCE {
        return Err(FoldError::NonReal(format!("({})^({})", b, e)));
    }
    if value.abs() < ZERO_TOLERANCE {
        return if e.approx() > 0.0 {
            Ok(Expr::zero())
        } else {
            Err(FoldError::Undefined(format!("({})^({})", b, e)))
        };
    }
    Ok(rebuilt(b, e))
}

fn fold_function(func: Function, a: Expr, budget: &mut Budget) -> Result<Expr, FoldError> {
    let call = |a: Expr| Expr::Func(func, a.boxed());
    if has_variable(&a) {
        return Ok(call(a));
    }
    let described = call(a.clone()).to_string();
    if let Expr::Const(q) = &a {
        let zero = q.is_zero();
        let one = q.is_one();
        let minus_one = *q == -BigRational::one();
        match func {
            Function::Sqrt if q.is_negative() => return Err(FoldError::NonReal(described)),
            Function::Sqrt => {
                return fold_pow(a.clone(), Expr::Const(rational(1, 2)), budget);
            }
            Function::Abs => return Ok(Expr::Const(q.abs())),
            Function::Floor => return Ok(Expr::Const(q.floor())),
            Function::Ceiling => return Ok(Expr::Const(q.ceil())),
            Function::Exp if zero => return Ok(Expr::one()),
            Function::Log => {
                if zero {
                    return Err(FoldError::Undefined(described));
                }
                if q.is_negative() {
                    return Err(FoldError::NonReal(described));
                }
                if one {
                    return Ok(Expr::zero());
                }
            }
            Function::Sin | Function::Tan | Function::Sinh | Function::Tanh if zero => {
                return Ok(Expr::zero());
            }
            Function::Asinh | Function::Atan if zero => return Ok(Expr::zero()),
            Function::Cos | Function::Sec | Function::Cosh if zero => return Ok(Expr::one()),
            Function::Cot | Function::Csc if zero => {
                return Err(FoldError::Undefined(described));
            }
            Function::Asin | Function::Acos => {
                if q.abs() > BigRational::one() {
                    return Err(FoldError::NonReal(described));
                }
                let asin_value = if zero {
                    Some(BigRational::zero())
                } else if one {
                    Some(rational(1, 2))
                } else if minus_one {
                    Some(rational(-1, 2))
                } else if *q == rational(1, 2) {
                    Some(rational(1, 6))
                } else if *q == rational(-1, 2) {
                    Some(rational(-1, 6))
                } else {
                    None
                };
                if let Some(k) = asin_value {
                    // acos(v) = pi/2 - asin(v)
                    let k = if func == Function::Acos { rational(1, 2) - k } else { k };
                    return Ok(if k.is_zero() { Expr::zero() } else { pi_times(k) });
                }
            }
            Function::Atan if one || minus_one => {
                return Ok(pi_times(if one { rational(1, 4) } else { rational(-1, 4) }));
            }
            Function::Acosh => {
                if *q < BigRational::one() {
                    return Err(FoldError::NonReal(described));
                }
                if one {
                    return Ok(Expr::zero());
                }
            }
            Function::Atanh => {
                if zero {
                    return Ok(Expr::zero());
                }
                if one || minus_one {
                    return Err(FoldError::Undefined(described));
                }
                if q.abs() > BigRational::one() {
                    return Err(FoldError::NonReal(described));
                }
            }
            _ => {}
        }
        return Ok(call(a));
    }
    // trigonometric functions at rational multiples of pi
    if let Some(k) = pi_multiple(&a) {
        match func {
            Function::Sin => {
                if let Some(v) = sin_pi_multiple(&k) {
                    return Ok(Expr::Const(v));
                }
            }
            Function::Cos => {
                if let Some(v) = cos_pi_multiple(&k) {
                    return Ok(Expr::Const(v));
                }
            }
            Function::Tan => match tan_pi_multiple(&k) {
                Some(Some(v)) => return Ok(Expr::Const(v)),
                Some(None) => return Err(FoldError::Undefined(described)),
                None => {}
            },
            Function::Cot => match tan_pi_multiple(&k) {
                Some(Some(v)) if v.is_zero() => return Err(FoldError::Undefined(described)),
                Some(Some(v)) => return Ok(Expr::Const(v.recip())),
                Some(None) => return Ok(Expr::zero()),
                None => {}
            },
            Function::Sec | Function::Csc => {
                let v = if func == Function::Sec {
                    cos_pi_multiple(&k)
                } else {
                    sin_pi_multiple(&k)
                };
                if let Some(v) = v {
                    if v.is_zero() {
                        return Err(FoldError::Undefined(described));
                    }
                    return Ok(Expr::Const(v.recip()));
                }
            }
            _ => {}
        }
    }
    // inverse pairs
    match (&func, &a) {
        (Function::Log, Expr::Constant(MathConst::E)) => return Ok(Expr::one()),
        (Function::Exp, Expr::Func(Function::Log, inner)) => return Ok((**inner).clone()),
        (Function::Log, Expr::Func(Function::Exp, inner)) => return Ok((**inner).clone()),
        (Function::Log, Expr::Pow(base, exp)) if **base == Expr::Constant(MathConst::E) => {
            return Ok((**exp).clone());
        }
        _ => {}
    }
    // real-domain checks on the floating value of the argument
    let v = a.approx();
    if v.is_nan() {
        return Err(FoldError::NonReal(described));
    }
    match func {
        Function::Sqrt if v < -ZERO_TOLERANCE => return Err(FoldError::NonReal(described)),
        Function::Sqrt => {
            return fold_pow(a, Expr::Const(rational(1, 2)), budget);
        }
        Function::Log if v.abs() <= ZERO_TOLERANCE => {
            return Err(FoldError::Undefined(described));
        }
        Function::Log if v < 0.0 => return Err(FoldError::NonReal(described)),
        Function::Asin | Function::Acos if v.abs() > 1.0 + ZERO_TOLERANCE => {
            return Err(FoldError::NonReal(described));
        }
        Function::Acosh if v < 1.0 - ZERO_TOLERANCE => return Err(FoldError::NonReal(described)),
        Function::Atanh if (v.abs() - 1.0).abs() <= ZERO_TOLERANCE => {
            return Err(FoldError::Undefined(described));
        }
        Function::Atanh if v.abs() > 1.0 => return Err(FoldError::NonReal(described)),
        Function::Tan | Function::Sec if v.cos().abs() < ZERO_TOLERANCE => {
            return Err(FoldError::Undefined(described));
        }
        Function::Cot | Function::Csc if v.sin().abs() < ZERO_TOLERANCE => {
            return Err(FoldError::Undefined(described));
        }
        Function::Abs => {
            return Ok(if v < 0.0 { fold_neg(a) } else { a });
        }
        Function::Floor | Function::Ceiling => {
            let nearest = v.round();
            if (v - nearest).abs() > 1e-9 && v.abs() < 1e15 {
                let integer = if func == Function::Floor { v.floor() } else { v.ceil() };
                if let Some(n) = BigInt::from_f64(integer) {
                    return Ok(Expr::Const(BigRational::from_integer(n)));
                }
            }
        }
        _ => {}
    }
    Ok(call(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(e: &Expr) -> Result<Expr, FoldError> {
        e.fold(&mut Budget::unlimited())
    }

    #[test]
    fn test_constant_folding() {
        let e = (Expr::int(2) - Expr::int(1)) / (Expr::int(2) + Expr::int(2));
        assert_eq!(fold(&e).unwrap(), Expr::ratio(1, 4));
        let e = Expr::int(2).pow(Expr::int(10)) - Expr::int(24);
        assert_eq!(fold(&e).unwrap(), Expr::int(1000));
        let e = Expr::ratio(2, 3).pow(Expr::int(-2));
        assert_eq!(fold(&e).unwrap(), Expr::ratio(9, 4));
    }

    #[test]
    fn test_zero_division_detected() {
        let e = Expr::int(1) / (Expr::int(3) - Expr::int(3));
        assert!(matches!(fold(&e), Err(FoldError::DivisionByZero(_))));
        let e = Expr::int(0).pow(Expr::int(-1));
        assert!(matches!(fold(&e), Err(FoldError::DivisionByZero(_))));
        let two = Expr::int(2);
        let surd = two.clone().pow(Expr::ratio(1, 2));
        let e = Expr::one() / (surd.pow(Expr::int(2)) - two);
        assert!(matches!(fold(&e), Err(FoldError::DivisionByZero(_))));
    }

    #[test]
    fn test_radicals() {
        let e = Expr::func(Function::Sqrt, Expr::int(8));
        assert_eq!(fold(&e).unwrap().to_string(), "2*sqrt(2)");
        let e = Expr::func(Function::Sqrt, Expr::int(4));
        assert_eq!(fold(&e).unwrap(), Expr::int(2));
        let e = Expr::int(-8).pow(Expr::ratio(1, 3));
        assert_eq!(fold(&e).unwrap(), Expr::int(-2));
        let e = Expr::func(Function::Sqrt, Expr::int(-1));
        assert!(matches!(fold(&e), Err(FoldError::NonReal(_))));
        let e = Expr::func(Function::Sqrt, Expr::ratio(1, 8));
        assert_eq!(fold(&e).unwrap().to_string(), "1/4*sqrt(2)");
        let s2 = Expr::func(Function::Sqrt, Expr::int(2));
        let e = s2.clone() * s2;
        assert_eq!(fold(&e).unwrap(), Expr::int(2));
        let e = Expr::one() / Expr::func(Function::Sqrt, Expr::int(2));
        assert_eq!(fold(&e).unwrap().to_string(), "1/2*sqrt(2)");
    }

    #[test]
    fn test_special_values() {
        let pi = Expr::Constant(MathConst::Pi);
        let e = Expr::func(Function::Sin, pi.clone() / Expr::int(6));
        assert_eq!(fold(&e).unwrap(), Expr::ratio(1, 2));
        let e = Expr::func(Function::Cos, pi.clone());
        assert_eq!(fold(&e).unwrap(), Expr::int(-1));
        let e = Expr::func(Function::Tan, pi.clone() / Expr::int(2));
        assert!(matches!(fold(&e), Err(FoldError::Undefined(_))));
        let e = Expr::func(Function::Log, Expr::zero());
        assert!(matches!(fold(&e), Err(FoldError::Undefined(_))));
        let e = Expr::func(Function::Log, Expr::int(-3));
        assert!(matches!(fold(&e), Err(FoldError::NonReal(_))));
        let e = Expr::func(Function::Asin, Expr::int(2));
        assert!(matches!(fold(&e), Err(FoldError::NonReal(_))));
        let e = Expr::func(Function::Acos, Expr::zero());
        assert_eq!(fold(&e).unwrap().to_string(), "pi/2");
        let e = Expr::func(Function::Exp, Expr::func(Function::Log, Expr::int(5)));
        assert_eq!(fold(&e).unwrap(), Expr::int(5));
        let e = Expr::func(Function::Floor, Expr::ratio(-7, 2));
        assert_eq!(fold(&e).unwrap(), Expr::int(-4));
    }

    #[test]
    fn test_symbolic_constants_checked_numerically() {
        // sqrt(1 - sqrt(5)) is not real
        let inner = Expr::int(1) - Expr::func(Function::Sqrt, Expr::int(5));
        let e = Expr::func(Function::Sqrt, inner);
        assert!(matches!(fold(&e), Err(FoldError::NonReal(_))));
        let e = Expr::func(Function::Sin, Expr::int(2));
        assert_eq!(fold(&e).unwrap().to_string(), "sin(2)");
    }

    #[test]
    fn test_identities_with_variable() {
        let x = Expr::var("x");
        let e = Expr::one() * (x.clone() + Expr::zero());
        assert_eq!(fold(&e).unwrap(), x.clone());
        let e = x.clone() + Expr::int(-3);
        assert_eq!(fold(&e).unwrap().to_string(), "x - 3");
        let e = Expr::int(2) * x.clone() + Expr::int(3) * x.clone();
        assert_eq!(fold(&e).unwrap().to_string(), "5*x");
    }

    #[test]
    fn test_as_fraction_keeps_all_denominators() {
        let x = Expr::var("x");
        let f = Expr::one() / x.clone() + Expr::one() / (x.clone() + Expr::one());
        let (n, d) = f.as_fraction();
        assert_eq!(n.to_string(), "x + 1 + x");
        assert_eq!(d.to_string(), "x*(x + 1)");
        let g = (x.clone().pow(Expr::int(2)) - Expr::one()) / (x.clone() - Expr::one());
        let (_, d) = g.as_fraction();
        assert_eq!(d.to_string(), "x - 1");
        let h = x.clone().pow(Expr::ratio(-1, 2));
        let (n, d) = h.as_fraction();
        assert!(n.is_one());
        assert_eq!(d.to_string(), "x^(1/2)");
    }

    #[test]
    fn test_together_and_cancel() {
        let half = Expr::ratio(1, 2);
        let e = half.clone() + Expr::one();
        assert_eq!(e.together().to_string(), "(1 + 2)/2");
        let mut budget = Budget::unlimited();
        // nothing in common, the sum is left for the fold
        assert_eq!(e.together().cancel(&mut budget).unwrap(), e.together());
        let e = (Expr::int(2) * Expr::func(Function::Sqrt, Expr::int(3))) / Expr::int(4);
        assert_eq!(e.cancel(&mut budget).unwrap().to_string(), "sqrt(3)/2");
        let six_quarters = Expr::Div(Expr::int(6).boxed(), Expr::int(4).boxed());
        assert_eq!(six_quarters.cancel(&mut budget).unwrap(), Expr::ratio(3, 2));
        let a = Expr::func(Function::Sqrt, Expr::int(5));
        let b = Expr::func(Function::Log, Expr::int(3));
        let e = (Expr::int(2) * a.clone().pow(Expr::int(3))) / (a.clone() * b.clone());
        assert_eq!(
            e.cancel(&mut budget).unwrap(),
            (Expr::int(2) * a.clone().pow(Expr::int(2))) / b.clone()
        );
        // not a fraction
        let s = Expr::func(Function::Sin, Expr::zero());
        assert_eq!(s.cancel(&mut budget).unwrap(), s);
    }

    #[test]
    fn test_piecewise_folding() {
        use crate::symbolic::symbolic_engine::Relation;
        let x = Expr::var("x");
        let pw = Expr::Piecewise(vec![
            (
                Expr::one() / x.clone(),
                Condition::Compare(Box::new(x.clone()), Relation::Gt, Box::new(Expr::zero())),
            ),
            (Expr::zero(), Condition::Always),
        ]);
        let at_zero = pw.set_variable("x", &BigRational::zero());
        assert_eq!(fold(&at_zero).unwrap(), Expr::zero());
        let at_two = pw.set_variable("x", &BigRational::from_integer(BigInt::from(2)));
        assert_eq!(fold(&at_two).unwrap(), Expr::ratio(1, 2));
        let partial = Expr::Piecewise(vec![(
            x.clone(),
            Condition::Compare(Box::new(x.clone()), Relation::Lt, Box::new(Expr::zero())),
        )]);
        let at_one = partial.set_variable("x", &BigRational::one());
        assert!(matches!(fold(&at_one), Err(FoldError::Undefined(_))));
    }

    #[test]
    fn test_budget_exhaustion() {
        let x = Expr::var("x");
        let mut e = x.clone();
        for _ in 0..50 {
            e = e + x.clone();
        }
        let mut budget = Budget::new(10, None);
        assert!(matches!(e.fold(&mut budget), Err(FoldError::Exhausted(_))));
    }
}
