// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Range analysis
//!
//! ## Rational functions
//! The domain is cut at every critical point (so a removable hole becomes an open end) and
//! on every continuity interval the image is the interval spanned by
//! - the values at the stationary points, the real roots of N'D - ND'
//! - the values or limits at the ends: the degree rule at ±∞, the sign of f just inside
//!   the interval next to a pole, the value of the reduced function at a hole
//!
//! An end contributes a value that is attained only when it is a closed end of a finite
//! interval or a stationary point, otherwise it only bounds the image.
//!
//! ## Compositions
//! When the variable occurs in a single chain of operations, the image is pushed through
//! every outer operation: affine maps, integer and rational powers, reciprocals and the
//! functions with known monotone pieces (`exp`, `log`, `sqrt`, `atan`, `abs`, `cosh`, ...).
//! `sin` and `cos` over a set spanning a whole period give [-1, 1].
//!
//! ## Piecewise
//! The union of the images of the branches, each over the part of the line where that
//! branch is in use.
//!
//! Anything else is `RangeDescriptor::NotDetermined`.
use crate::analysis::budget::{Budget, Operation};
use crate::analysis::domain::domain_with;
use crate::analysis::error::AnalysisError;
use crate::analysis::intervals::{Endpoint, Interval, IntervalSet};
use crate::analysis::solve::{ZeroSet, condition_set, rational_between, real_zeros};
use crate::numerical::root_finding::RootFindingConfig;
use crate::symbolic::parse_expr::Expression;
use crate::symbolic::polynomial::{RationalFunction, RealValue, sort_and_dedup};
use crate::symbolic::symbolic_engine::{Expr, Function, MathConst};
use crate::symbolic::symbolic_simplify::FoldError;
use log::{debug, info};
use num::integer::Integer;
use num::rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::f64::consts::PI;
use std::fmt;

// exact endpoint forms larger than this are replaced by their decimal value
const MAX_EXACT_NODES: usize = 15;

#[derive(Debug, Clone)]
pub enum RangeDescriptor {
    /// union of intervals and points
    Set(IntervalSet),
    /// no closed form, with the reason
    NotDetermined(String),
}

impl fmt::Display for RangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RangeDescriptor::Set(set) if set.is_empty() => write!(f, "empty"),
            RangeDescriptor::Set(set) => write!(f, "{}", set),
            RangeDescriptor::NotDetermined(reason) => write!(f, "not determined: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RangeReport {
    pub descriptor: RangeDescriptor,
    pub steps: Vec<String>,
}

/// bound of the image of one continuity interval
#[derive(Debug, Clone)]
enum Bound {
    NegInf,
    PosInf,
    /// value and whether it is attained
    Value(RealValue, bool),
}

/// image of an interval from the candidate bounds of a continuous function on it
fn image_from_bounds(bounds: &[Bound]) -> Option<Interval> {
    let values: Vec<(&RealValue, bool)> = bounds
        .iter()
        .filter_map(|b| match b {
            Bound::Value(v, attained) => Some((v, *attained)),
            _ => None,
        })
        .collect();
    let lo = if bounds.iter().any(|b| matches!(b, Bound::NegInf)) {
        Endpoint::infinite()
    } else {
        let min = values.iter().map(|(v, _)| *v).min_by(|a, b| a.cmp_value(b))?;
        let closed = values.iter().any(|(v, att)| *att && v.same_point(min));
        Endpoint {
            value: Some(min.clone()),
            closed,
        }
    };
    let hi = if bounds.iter().any(|b| matches!(b, Bound::PosInf)) {
        Endpoint::infinite()
    } else {
        let max = values.iter().map(|(v, _)| *v).max_by(|a, b| a.cmp_value(b))?;
        let closed = values.iter().any(|(v, att)| *att && v.same_point(max));
        Endpoint {
            value: Some(max.clone()),
            closed,
        }
    };
    Some(Interval::new(lo, hi))
}

/// limit of a map at ±∞ or at the edge of its domain, exact when it is an integer or ±pi/2
fn limit_value(y: f64) -> RealValue {
    let rounded = y.round();
    if (y - rounded).abs() < 1e-12 {
        if let Some(q) = BigRational::from_float(rounded) {
            return RealValue::rational(q);
        }
    }
    if (y.abs() - PI / 2.0).abs() < 1e-12 {
        let pi = Expr::Constant(MathConst::Pi);
        let half = if y < 0.0 {
            Expr::Div(Expr::Neg(pi.boxed()).boxed(), Expr::int(2).boxed())
        } else {
            Expr::Div(pi.boxed(), Expr::int(2).boxed())
        };
        return RealValue::from_expr(half);
    }
    RealValue::numeric(y)
}

/// t -> g(t) with the pieces of its domain on which it is monotone
struct PointMap {
    name: String,
    exact: Box<dyn Fn(Expr) -> Expr>,
    float: Box<dyn Fn(f64) -> f64>,
    /// (piece, increasing on it)
    pieces: Vec<(IntervalSet, bool)>,
}

fn ray(from: i64, closed: bool) -> IntervalSet {
    let v = RealValue::rational(BigRational::from_integer(from.into()));
    let lo = if closed { Endpoint::closed(v) } else { Endpoint::open(v) };
    IntervalSet::from_interval(Interval::new(lo, Endpoint::infinite()))
}

fn ray_below(to: i64, closed: bool) -> IntervalSet {
    let v = RealValue::rational(BigRational::from_integer(to.into()));
    let hi = if closed { Endpoint::closed(v) } else { Endpoint::open(v) };
    IntervalSet::from_interval(Interval::new(Endpoint::infinite(), hi))
}

fn segment(a: i64, b: i64, closed: bool) -> IntervalSet {
    ray(a, closed).intersect(&ray_below(b, closed))
}

impl PointMap {
    fn monotone(
        name: String,
        exact: Box<dyn Fn(Expr) -> Expr>,
        float: Box<dyn Fn(f64) -> f64>,
        domain: IntervalSet,
        increasing: bool,
    ) -> Self {
        Self {
            name,
            exact,
            float,
            pieces: vec![(domain, increasing)],
        }
    }

    /// decreasing below 0, increasing above (abs, cosh, even powers)
    fn valley(name: String, exact: Box<dyn Fn(Expr) -> Expr>, float: Box<dyn Fn(f64) -> f64>) -> Self {
        Self {
            name,
            exact,
            float,
            pieces: vec![(ray_below(0, true), false), (ray(0, true), true)],
        }
    }

    fn function(func: Function) -> Option<Self> {
        let exact: Box<dyn Fn(Expr) -> Expr> = Box::new(move |e: Expr| Expr::func(func, e));
        let float: Box<dyn Fn(f64) -> f64> = Box::new(move |t: f64| func.apply_f64(t));
        let name = func.to_string();
        let map = match func {
            Function::Exp
            | Function::Atan
            | Function::Tanh
            | Function::Sinh
            | Function::Asinh => Self::monotone(name, exact, float, IntervalSet::all_reals(), true),
            Function::Log => Self::monotone(name, exact, float, ray(0, false), true),
            Function::Sqrt => Self::monotone(name, exact, float, ray(0, true), true),
            Function::Asin => Self::monotone(name, exact, float, segment(-1, 1, true), true),
            Function::Acos => Self::monotone(name, exact, float, segment(-1, 1, true), false),
            Function::Acosh => Self::monotone(name, exact, float, ray(1, true), true),
            Function::Atanh => Self::monotone(name, exact, float, segment(-1, 1, false), true),
            Function::Abs | Function::Cosh => Self::valley(name, exact, float),
            _ => return None,
        };
        Some(map)
    }

    /// t^e for a rational exponent, negative t only when the root is odd
    fn power(e: &BigRational) -> Self {
        let exponent = e.clone();
        let ef = e.to_f64().unwrap_or(f64::NAN);
        let odd_numer = e.numer().is_odd();
        let exact: Box<dyn Fn(Expr) -> Expr> =
            Box::new(move |b: Expr| Expr::Pow(b.boxed(), Expr::Const(exponent.clone()).boxed()));
        let float: Box<dyn Fn(f64) -> f64> = Box::new(move |t: f64| {
            if t >= 0.0 {
                t.powf(ef)
            } else {
                let m = (-t).powf(ef);
                if odd_numer { -m } else { m }
            }
        });
        let positive = e.is_positive();
        let mut pieces = vec![(ray(0, positive), positive)];
        if e.denom().is_odd() {
            let increasing_below = if odd_numer { positive } else { !positive };
            pieces.push((ray_below(0, positive), increasing_below));
        }
        Self {
            name: format!("t^{}", Expr::Const(e.clone())),
            exact,
            float,
            pieces,
        }
    }

    /// t -> k/t
    fn reciprocal(k: Expr) -> Self {
        let kf = k.approx();
        let increasing = kf < 0.0;
        let name = format!("t -> {}/t", k);
        Self {
            name,
            exact: Box::new(move |t: Expr| Expr::Div(k.clone().boxed(), t.boxed())),
            float: Box::new(move |t: f64| kf / t),
            pieces: vec![(ray_below(0, false), increasing), (ray(0, false), increasing)],
        }
    }
}

struct RangeSolver<'a> {
    var: &'a str,
    budget: &'a mut Budget,
    steps: Vec<String>,
}

impl RangeSolver<'_> {
    /// exact value of an expression without the variable, decimal when the form is large
    fn settle(&mut self, e: Expr, fallback: f64) -> Result<RealValue, AnalysisError> {
        match e.fold(self.budget) {
            Ok(v) if v.node_count() <= MAX_EXACT_NODES => Ok(RealValue::from_expr(v)),
            Ok(_) => Ok(RealValue::numeric(fallback)),
            Err(FoldError::Exhausted(err)) => Err(err),
            Err(_) => Ok(RealValue::numeric(fallback)),
        }
    }

    /// image of `expr` with the variable restricted to `restrict`
    fn image(&mut self, expr: &Expr, restrict: &IntervalSet) -> Result<Option<IntervalSet>, AnalysisError> {
        self.budget.charge(Operation::Range, 1)?;
        if restrict.is_empty() {
            return Ok(Some(IntervalSet::empty()));
        }
        if !expr.contains_variable(self.var) {
            return match expr.fold(self.budget) {
                Ok(v) => Ok(Some(IntervalSet::point(RealValue::from_expr(v)))),
                Err(FoldError::Exhausted(err)) => Err(err),
                Err(_) => Ok(Some(IntervalSet::empty())),
            };
        }
        if let Some(rf) = RationalFunction::from_expr(expr, self.var, self.budget)? {
            return self.rational_image(expr, &rf, restrict);
        }
        if let Expr::Piecewise(branches) = expr {
            let mut covered = IntervalSet::empty();
            let mut result = IntervalSet::empty();
            for (branch, cond) in branches {
                let Some(cond_set) = condition_set(cond, self.var, self.budget)? else {
                    return Ok(None);
                };
                let active = restrict.intersect(&cond_set.intersect(&covered.complement()));
                covered = covered.union(&cond_set);
                match self.image(branch, &active)? {
                    Some(part) => result = result.union(&part),
                    None => return Ok(None),
                }
            }
            return Ok(Some(result));
        }
        let var = self.var;
        let constant = |e: &Expr| !e.contains_variable(var);
        let (inner, map) = match expr {
            Expr::Func(Function::Sin | Function::Cos, arg) => {
                return self.periodic(expr, arg, restrict);
            }
            Expr::Func(func, arg) => match PointMap::function(*func) {
                Some(map) => (&**arg, map),
                None => return Ok(None),
            },
            Expr::Neg(inner) => (
                &**inner,
                PointMap::monotone(
                    "t -> -t".to_string(),
                    Box::new(|t: Expr| Expr::Neg(t.boxed())),
                    Box::new(|t: f64| -t),
                    IntervalSet::all_reals(),
                    false,
                ),
            ),
            Expr::Add(l, r) | Expr::Sub(l, r) if constant(r) => {
                let k = (**r).clone();
                let kf = k.approx();
                let add = matches!(expr, Expr::Add(..));
                let shift = if add { kf } else { -kf };
                (
                    &**l,
                    PointMap::monotone(
                        format!("t {} {}", if add { "+" } else { "-" }, k),
                        Box::new(move |t: Expr| {
                            if add {
                                Expr::Add(t.boxed(), k.clone().boxed())
                            } else {
                                Expr::Sub(t.boxed(), k.clone().boxed())
                            }
                        }),
                        Box::new(move |t: f64| t + shift),
                        IntervalSet::all_reals(),
                        true,
                    ),
                )
            }
            Expr::Add(l, r) | Expr::Sub(l, r) if constant(l) => {
                let k = (**l).clone();
                let kf = k.approx();
                let add = matches!(expr, Expr::Add(..));
                (
                    &**r,
                    PointMap::monotone(
                        format!("t -> {} {} t", k, if add { "+" } else { "-" }),
                        Box::new(move |t: Expr| {
                            if add {
                                Expr::Add(k.clone().boxed(), t.boxed())
                            } else {
                                Expr::Sub(k.clone().boxed(), t.boxed())
                            }
                        }),
                        Box::new(move |t: f64| if add { kf + t } else { kf - t }),
                        IntervalSet::all_reals(),
                        add,
                    ),
                )
            }
            Expr::Mul(l, r) if constant(l) || constant(r) => {
                let (k, inner) = if constant(l) { (&**l, &**r) } else { (&**r, &**l) };
                let k = k.clone();
                let kf = k.approx();
                if kf == 0.0 {
                    return Ok(Some(IntervalSet::point(RealValue::rational(BigRational::zero()))));
                }
                (
                    inner,
                    PointMap::monotone(
                        format!("t -> {}*t", k),
                        Box::new(move |t: Expr| Expr::Mul(k.clone().boxed(), t.boxed())),
                        Box::new(move |t: f64| kf * t),
                        IntervalSet::all_reals(),
                        kf > 0.0,
                    ),
                )
            }
            Expr::Div(l, r) if constant(r) => {
                let k = (**r).clone();
                let kf = k.approx();
                (
                    &**l,
                    PointMap::monotone(
                        format!("t -> t/{}", k),
                        Box::new(move |t: Expr| Expr::Div(t.boxed(), k.clone().boxed())),
                        Box::new(move |t: f64| t / kf),
                        IntervalSet::all_reals(),
                        kf > 0.0,
                    ),
                )
            }
            Expr::Div(l, r) if constant(l) => (&**r, PointMap::reciprocal((**l).clone())),
            Expr::Pow(base, exp) => match &**exp {
                Expr::Const(e) => (&**base, PointMap::power(e)),
                _ if constant(base) => {
                    let c = (**base).clone();
                    let cf = c.approx();
                    if cf.is_nan() || cf <= 0.0 || cf == 1.0 {
                        return Ok(None);
                    }
                    (
                        &**exp,
                        PointMap::monotone(
                            format!("t -> {}^t", c),
                            Box::new(move |t: Expr| Expr::Pow(c.clone().boxed(), t.boxed())),
                            Box::new(move |t: f64| cf.powf(t)),
                            IntervalSet::all_reals(),
                            cf > 1.0,
                        ),
                    )
                }
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        let Some(inner_image) = self.image(inner, restrict)? else {
            return Ok(None);
        };
        let image = self.apply(&map, &inner_image)?;
        if let Some(image) = &image {
            self.steps.push(format!(
                "{}: {} ∈ {} gives {}",
                map.name, inner, inner_image, image
            ));
        }
        Ok(image)
    }

    fn apply(&mut self, map: &PointMap, set: &IntervalSet) -> Result<Option<IntervalSet>, AnalysisError> {
        let mut result = IntervalSet::empty();
        for (piece, increasing) in &map.pieces {
            for iv in set.intersect(piece).intervals() {
                let Some(lo) = self.map_end(map, &iv.lo, true)? else {
                    return Ok(None);
                };
                let Some(hi) = self.map_end(map, &iv.hi, false)? else {
                    return Ok(None);
                };
                let mapped = if *increasing {
                    Interval::new(lo, hi)
                } else {
                    Interval::new(hi, lo)
                };
                result = result.union(&IntervalSet::from_interval(mapped));
            }
        }
        Ok(Some(result))
    }

    fn map_end(
        &mut self,
        map: &PointMap,
        end: &Endpoint,
        lower: bool,
    ) -> Result<Option<Endpoint>, AnalysisError> {
        match &end.value {
            None => {
                let t = if lower { f64::NEG_INFINITY } else { f64::INFINITY };
                let y = (map.float)(t);
                if y.is_nan() {
                    return Ok(None);
                }
                Ok(Some(if y.is_infinite() {
                    Endpoint::infinite()
                } else {
                    Endpoint::open(limit_value(y))
                }))
            }
            Some(v) => {
                let y = (map.float)(v.approx);
                if y.is_nan() {
                    return Ok(None);
                }
                if y.is_infinite() {
                    return Ok(Some(Endpoint::infinite()));
                }
                let value = match &v.exact {
                    Some(e) => self.settle((map.exact)(e.clone()), y)?,
                    None => RealValue::numeric(y),
                };
                Ok(Some(Endpoint {
                    value: Some(value),
                    closed: end.closed,
                }))
            }
        }
    }

    /// sin and cos over a set spanning a whole period
    fn periodic(
        &mut self,
        expr: &Expr,
        arg: &Expr,
        restrict: &IntervalSet,
    ) -> Result<Option<IntervalSet>, AnalysisError> {
        let Some(inner) = self.image(arg, restrict)? else {
            return Ok(None);
        };
        let spans_period = inner.intervals().iter().any(|iv| match (&iv.lo.value, &iv.hi.value) {
            (Some(a), Some(b)) => b.approx - a.approx >= 2.0 * PI,
            _ => true,
        });
        if !spans_period {
            debug!("{} over {} does not cover a period", expr, inner);
            return Ok(None);
        }
        let set = segment(-1, 1, true);
        self.steps
            .push(format!("{} over {} covers a whole period: {}", expr, inner, set));
        Ok(Some(set))
    }

    fn rational_image(
        &mut self,
        expr: &Expr,
        rf: &RationalFunction,
        restrict: &IntervalSet,
    ) -> Result<Option<IntervalSet>, AnalysisError> {
        let var = self.var;
        let (_, denom) = expr.as_fraction();
        let critical = match real_zeros(&denom, var, self.budget)? {
            ZeroSet::Finite(points) => points,
            ZeroSet::Everywhere => return Ok(Some(IntervalSet::empty())),
            ZeroSet::Unsolved(_) => return Ok(None),
        };
        let pieces = restrict.remove_points(&critical);
        let slope = rf.derivative_numerator();
        if slope.is_zero() {
            // constant on its domain
            let value = rf.numer.leading() / rf.denom.leading();
            let set = if pieces.is_empty() {
                IntervalSet::empty()
            } else {
                IntervalSet::point(RealValue::rational(value))
            };
            self.steps.push(format!("{} is constant: {}", expr, set));
            return Ok(Some(set));
        }
        let stationary = slope.real_roots(self.budget)?;
        let mut events = rf.numer.real_roots(self.budget)?;
        events.extend(rf.denom.real_roots(self.budget)?);
        events.extend(stationary.iter().cloned());
        events.extend(critical.iter().cloned());
        for iv in pieces.intervals() {
            events.extend(iv.lo.value.iter().cloned());
            events.extend(iv.hi.value.iter().cloned());
        }
        sort_and_dedup(&mut events);

        let mut result = IntervalSet::empty();
        for iv in pieces.intervals() {
            self.budget.charge(Operation::Range, 1)?;
            let mut bounds = vec![
                self.end_bound(rf, &iv.lo, true, &events)?,
                self.end_bound(rf, &iv.hi, false, &events)?,
            ];
            for s in &stationary {
                if iv.contains_value(s) {
                    bounds.push(Bound::Value(self.value_of(rf, s)?, true));
                }
            }
            let Some(image) = image_from_bounds(&bounds) else {
                return Ok(None);
            };
            self.steps.push(format!("on {} the values fill {}", iv, image));
            result = result.union(&IntervalSet::from_interval(image));
        }
        Ok(Some(result))
    }

    fn value_of(&mut self, rf: &RationalFunction, x: &RealValue) -> Result<RealValue, AnalysisError> {
        if let Some(q) = x.as_rational() {
            if let Some(v) = rf.eval(q) {
                return Ok(RealValue::rational(v));
            }
        }
        let fallback = rf.eval_f64(x.approx);
        match &x.exact {
            Some(point) => {
                let f = Expr::Div(
                    rf.numer.to_expr(self.var).boxed(),
                    rf.denom.to_expr(self.var).boxed(),
                );
                self.settle(f.substitute_variable(self.var, point), fallback)
            }
            None => Ok(RealValue::numeric(fallback)),
        }
    }

    fn end_bound(
        &mut self,
        rf: &RationalFunction,
        end: &Endpoint,
        lower: bool,
        events: &[RealValue],
    ) -> Result<Bound, AnalysisError> {
        let Some(v) = &end.value else {
            return Ok(limit_at_infinity(rf, !lower));
        };
        let denom_vanishes = match v.as_rational() {
            Some(q) => rf.denom.eval(q).is_zero(),
            None => rf.denom.eval_f64(v.approx).abs() < 1e-9,
        };
        if !denom_vanishes {
            return Ok(Bound::Value(self.value_of(rf, v)?, end.closed));
        }
        // pole: the sign of f between the end and the next event inside the interval
        let neighbour = if lower {
            events.iter().find(|e| e.cmp_value(v) == Ordering::Greater)
        } else {
            events.iter().rev().find(|e| e.cmp_value(v) == Ordering::Less)
        };
        let t = if lower {
            rational_between(Some(v), neighbour)
        } else {
            rational_between(neighbour, Some(v))
        };
        let positive = rf.eval(&t).is_some_and(|y| y.is_positive());
        Ok(if positive { Bound::PosInf } else { Bound::NegInf })
    }
}

/// degree rule
fn limit_at_infinity(rf: &RationalFunction, positive: bool) -> Bound {
    if rf.numer.is_zero() {
        return Bound::Value(RealValue::rational(BigRational::zero()), false);
    }
    let dn = rf.numer.degree();
    let dd = rf.denom.degree();
    let ratio = rf.numer.leading() / rf.denom.leading();
    match dn.cmp(&dd) {
        Ordering::Less => Bound::Value(RealValue::rational(BigRational::zero()), false),
        Ordering::Equal => Bound::Value(RealValue::rational(ratio), false),
        Ordering::Greater => {
            let flip = !positive && (dn - dd) % 2 == 1;
            if ratio.is_positive() != flip {
                Bound::PosInf
            } else {
                Bound::NegInf
            }
        }
    }
}

/// Set of real values of f over its domain.
pub fn range(expression: &Expression, budget: &mut Budget) -> Result<RangeReport, AnalysisError> {
    range_with(expression, &RootFindingConfig::default(), budget)
}

/// `range` over the domain found with the given numeric scan settings
pub fn range_with(
    expression: &Expression,
    roots: &RootFindingConfig,
    budget: &mut Budget,
) -> Result<RangeReport, AnalysisError> {
    let var = expression.variable.as_str();
    let expr = &expression.expr;
    let dom = domain_with(expression, roots, budget)?;
    let mut steps = vec![format!("f({}) = {}", var, expr)];
    if dom.set.is_empty() {
        steps.push("the domain is empty".to_string());
        return Ok(RangeReport {
            descriptor: RangeDescriptor::Set(IntervalSet::empty()),
            steps,
        });
    }
    let mut solver = RangeSolver {
        var,
        budget,
        steps,
    };
    let image = solver.image(expr, &dom.set)?;
    let mut steps = solver.steps;
    let descriptor = match image {
        Some(set) => RangeDescriptor::Set(set),
        None => RangeDescriptor::NotDetermined(format!(
            "the values of {} cannot be described in closed form",
            expr
        )),
    };
    steps.push(format!("range: {}", descriptor));
    info!("range of {}: {}", expr, descriptor);
    Ok(RangeReport { descriptor, steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse;
    use approx::assert_relative_eq;

    fn range_of(text: &str) -> RangeDescriptor {
        range(&parse(text).unwrap(), &mut Budget::unlimited())
            .unwrap()
            .descriptor
    }

    fn shown(text: &str) -> String {
        range_of(text).to_string()
    }

    #[test]
    fn test_rational_functions() {
        assert_eq!(shown("x^2"), "[0, ∞)");
        assert_eq!(shown("1/x"), "(-∞, 0) ∪ (0, ∞)");
        assert_eq!(shown("(x-1)/(x+2)"), "(-∞, 1) ∪ (1, ∞)");
        assert_eq!(shown("(x^2 - 1)/(x - 1)"), "(-∞, 2) ∪ (2, ∞)");
        assert_eq!(shown("x/(x^2 + 1)"), "[-1/2, 1/2]");
        assert_eq!(shown("x^3 - 3*x"), "(-∞, ∞)");
        assert_eq!(shown("1/x^2"), "(0, ∞)");
        assert_eq!(shown("x/x"), "{1}");
        assert_eq!(shown("-x^2 + 4"), "(-∞, 4]");
    }

    #[test]
    fn test_compositions() {
        assert_eq!(shown("sqrt(x+1)"), "[0, ∞)");
        assert_eq!(shown("exp(x)"), "(0, ∞)");
        assert_eq!(shown("log(x)"), "(-∞, ∞)");
        assert_eq!(shown("sqrt(1 - x^2)"), "[0, 1]");
        assert_eq!(shown("2 + 3*exp(-x^2)"), "(2, 5]");
        assert_eq!(shown("sin(x)"), "[-1, 1]");
        assert_eq!(shown("sin(x)^2"), "[0, 1]");
        assert_eq!(shown("1/sin(x)"), "(-∞, -1] ∪ [1, ∞)");
        assert_eq!(shown("abs(x - 3)"), "[0, ∞)");
        assert_eq!(shown("x^(1/3)"), "(-∞, ∞)");
        assert_eq!(shown("2^x"), "(0, ∞)");
    }

    #[test]
    fn test_bounded_limits() {
        match range_of("atan(x)") {
            RangeDescriptor::Set(set) => {
                let iv = &set.intervals()[0];
                assert!(!iv.lo.closed && !iv.hi.closed);
                assert_relative_eq!(iv.hi.value.as_ref().unwrap().approx, PI / 2.0);
                assert_relative_eq!(iv.lo.value.as_ref().unwrap().approx, -PI / 2.0);
            }
            other => panic!("expected a set, got {:?}", other),
        }
        assert_eq!(shown("tanh(x)"), "(-1, 1)");
    }

    #[test]
    fn test_piecewise_and_undetermined() {
        assert_eq!(shown("Piecewise((x, x < 0), (x^2, True))"), "(-∞, ∞)");
        assert_eq!(shown("Piecewise((-1, x < 0), (1, True))"), "{-1} ∪ {1}");
        assert!(matches!(range_of("sin(x) + cos(x)"), RangeDescriptor::NotDetermined(_)));
        assert!(matches!(range_of("sin(x) - x/2"), RangeDescriptor::NotDetermined(_)));
        assert!(range_of("tan(x)").to_string().starts_with("not determined"));
    }

    #[test]
    fn test_budget() {
        let res = range(&parse("x/(x^2 + 1)").unwrap(), &mut Budget::new(5, None));
        assert!(matches!(res, Err(AnalysisError::Timeout(_))));
    }
}
