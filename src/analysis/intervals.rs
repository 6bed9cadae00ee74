// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Unions of real intervals with exact or floating endpoints.
//!
//! `IntervalSet` is kept normalized: intervals sorted by their lower end, pairwise disjoint,
//! and touching intervals merged when the shared end belongs to one of them, so
//! `(0, 1) ∪ [1, 2)` is stored as `(0, 2)`.
use crate::symbolic::polynomial::RealValue;
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt;

/// end of an interval; `value == None` is -∞ for a lower end and +∞ for an upper end
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub value: Option<RealValue>,
    pub closed: bool,
}

impl Endpoint {
    pub fn infinite() -> Self {
        Self {
            value: None,
            closed: false,
        }
    }

    pub fn closed(v: RealValue) -> Self {
        Self {
            value: Some(v),
            closed: true,
        }
    }

    pub fn open(v: RealValue) -> Self {
        Self {
            value: Some(v),
            closed: false,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.value.is_none()
    }

    fn flipped(&self) -> Self {
        Self {
            value: self.value.clone(),
            closed: !self.closed && self.value.is_some(),
        }
    }
}

fn closed_first(a: bool, b: bool) -> Ordering {
    match (a, b) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// order of lower ends: -∞ first, at the same value a closed end starts earlier
fn cmp_lower(a: &Endpoint, b: &Endpoint) -> Ordering {
    match (&a.value, &b.value) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp_value(y).then(closed_first(a.closed, b.closed)),
    }
}

/// order of upper ends: +∞ last, at the same value a closed end ends later
fn cmp_upper(a: &Endpoint, b: &Endpoint) -> Ordering {
    match (&a.value, &b.value) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp_value(y).then(closed_first(b.closed, a.closed)),
    }
}

#[derive(Debug, Clone)]
pub struct Interval {
    pub lo: Endpoint,
    pub hi: Endpoint,
}

impl Interval {
    pub fn new(lo: Endpoint, hi: Endpoint) -> Self {
        Self { lo, hi }
    }

    pub fn all_reals() -> Self {
        Self::new(Endpoint::infinite(), Endpoint::infinite())
    }

    pub fn point(v: RealValue) -> Self {
        Self::new(Endpoint::closed(v.clone()), Endpoint::closed(v))
    }

    pub fn is_point(&self) -> bool {
        match (&self.lo.value, &self.hi.value) {
            (Some(a), Some(b)) => self.lo.closed && self.hi.closed && a.same_point(b),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        match (&self.lo.value, &self.hi.value) {
            (Some(a), Some(b)) => match a.cmp_value(b) {
                Ordering::Greater => true,
                Ordering::Equal => !(self.lo.closed && self.hi.closed),
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        let above = match &self.lo.value {
            None => true,
            Some(v) if self.lo.closed => x >= v.approx,
            Some(v) => x > v.approx,
        };
        let below = match &self.hi.value {
            None => true,
            Some(v) if self.hi.closed => x <= v.approx,
            Some(v) => x < v.approx,
        };
        above && below
    }

    /// exact membership when both sides are rational
    pub fn contains_value(&self, x: &RealValue) -> bool {
        let above = match &self.lo.value {
            None => true,
            Some(v) => match x.cmp_value(v) {
                Ordering::Greater => true,
                Ordering::Equal => self.lo.closed,
                Ordering::Less => false,
            },
        };
        let below = match &self.hi.value {
            None => true,
            Some(v) => match x.cmp_value(v) {
                Ordering::Less => true,
                Ordering::Equal => self.hi.closed,
                Ordering::Greater => false,
            },
        };
        above && below
    }

    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let lo = if cmp_lower(&self.lo, &other.lo) == Ordering::Less {
            other.lo.clone()
        } else {
            self.lo.clone()
        };
        let hi = if cmp_upper(&self.hi, &other.hi) == Ordering::Greater {
            other.hi.clone()
        } else {
            self.hi.clone()
        };
        let result = Interval::new(lo, hi);
        if result.is_empty() { None } else { Some(result) }
    }

    /// do the two intervals overlap or touch at an end that belongs to one of them
    fn joins(&self, next: &Interval) -> bool {
        match (&self.hi.value, &next.lo.value) {
            (None, _) | (_, None) => true,
            (Some(a), Some(b)) => match a.cmp_value(b) {
                Ordering::Greater => true,
                Ordering::Equal => self.hi.closed || next.lo.closed,
                Ordering::Less => false,
            },
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_point() {
            if let Some(v) = &self.lo.value {
                return write!(f, "{{{}}}", v);
            }
        }
        let open = if self.lo.closed { "[" } else { "(" };
        let close = if self.hi.closed { "]" } else { ")" };
        let lo = match &self.lo.value {
            Some(v) => v.to_string(),
            None => "-∞".to_string(),
        };
        let hi = match &self.hi.value {
            Some(v) => v.to_string(),
            None => "∞".to_string(),
        };
        write!(f, "{}{}, {}{}", open, lo, hi, close)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all_reals() -> Self {
        Self {
            intervals: vec![Interval::all_reals()],
        }
    }

    pub fn from_interval(interval: Interval) -> Self {
        Self::from_intervals(vec![interval])
    }

    pub fn point(v: RealValue) -> Self {
        Self::from_interval(Interval::point(v))
    }

    /// normalizes: drops empty intervals, sorts, merges
    pub fn from_intervals(mut intervals: Vec<Interval>) -> Self {
        intervals.retain(|iv| !iv.is_empty());
        intervals.sort_by(|a, b| cmp_lower(&a.lo, &b.lo));
        let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
        for iv in intervals {
            match merged.last_mut() {
                Some(last) if last.joins(&iv) => {
                    if cmp_upper(&iv.hi, &last.hi) == Ordering::Greater {
                        last.hi = iv.hi;
                    }
                }
                _ => merged.push(iv),
            }
        }
        Self { intervals: merged }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_all_reals(&self) -> bool {
        self.intervals.len() == 1
            && self.intervals[0].lo.is_infinite()
            && self.intervals[0].hi.is_infinite()
    }

    pub fn contains(&self, x: f64) -> bool {
        self.intervals.iter().any(|iv| iv.contains(x))
    }

    pub fn contains_value(&self, x: &RealValue) -> bool {
        self.intervals.iter().any(|iv| iv.contains_value(x))
    }

    pub fn union(&self, other: &IntervalSet) -> IntervalSet {
        let mut all = self.intervals.clone();
        all.extend(other.intervals.iter().cloned());
        Self::from_intervals(all)
    }

    pub fn intersect(&self, other: &IntervalSet) -> IntervalSet {
        let mut result = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                if let Some(iv) = a.intersect(b) {
                    result.push(iv);
                }
            }
        }
        Self::from_intervals(result)
    }

    pub fn complement(&self) -> IntervalSet {
        let mut result = Vec::new();
        let mut lower = Endpoint::infinite();
        let mut open_above = true;
        for iv in &self.intervals {
            if !iv.lo.is_infinite() {
                result.push(Interval::new(lower.clone(), iv.lo.flipped()));
            }
            if iv.hi.is_infinite() {
                open_above = false;
                break;
            }
            lower = iv.hi.flipped();
        }
        if open_above {
            result.push(Interval::new(lower, Endpoint::infinite()));
        }
        Self::from_intervals(result)
    }

    /// the set with the given points taken out
    pub fn remove_points(&self, points: &[RealValue]) -> IntervalSet {
        let mut intervals = self.intervals.clone();
        for p in points {
            let mut next = Vec::with_capacity(intervals.len() + 1);
            for iv in intervals {
                if iv.contains_value(p) {
                    next.push(Interval::new(iv.lo.clone(), Endpoint::open(p.clone())));
                    next.push(Interval::new(Endpoint::open(p.clone()), iv.hi.clone()));
                } else {
                    next.push(iv);
                }
            }
            intervals = next;
        }
        Self::from_intervals(intervals)
    }

    /// smallest lower end and largest upper end, None for the empty set
    pub fn hull(&self) -> Option<Interval> {
        let first = self.intervals.first()?;
        let last = self.intervals.last()?;
        Some(Interval::new(first.lo.clone(), last.hi.clone()))
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "∅");
        }
        write!(f, "{}", self.intervals.iter().join(" ∪ "))
    }
}
