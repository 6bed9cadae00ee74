// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Univariate polynomials with rational coefficients
//!
//! Dense representation, coefficients in ascending order: `[c0, c1, c2]` is
//! `c0 + c1*x + c2*x^2`. Used by the domain analysis (zeros of a denominator), the
//! intersection finder (zeros of a numerator) and the range analysis (critical values).
//!
//! ## Real roots
//! `real_roots` returns every real root exactly once:
//! 1. the polynomial is made square-free, `p / gcd(p, p')`
//! 2. rational roots are found with the rational root theorem and divided out
//! 3. a remaining quadratic is solved exactly, roots are surds like `1 + sqrt(2)`
//! 4. a remaining factor of higher degree is isolated with a Sturm sequence and refined by
//!    bisection in exact rational arithmetic; such roots carry only a floating value
//!
//! Every step charges the `Budget`.
//!
//! `RationalFunction` is a pair N/D of polynomials with their common factors removed.
use crate::analysis::budget::{Budget, Operation};
use crate::analysis::error::AnalysisError;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{
    common_denominator, extract_rational_root, format_decimal, positive_divisors,
    rational_to_f64, recognise_rational,
};
use num::bigint::BigInt;
use num::rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

// integer powers of polynomials above this are not expanded
const MAX_EXPANDED_POWER: u64 = 64;
// the rational root theorem is skipped when it would test more candidates
const MAX_RATIONAL_CANDIDATES: usize = 20_000;
// bisection of an isolated root stops after this many halvings
const MAX_BISECTIONS: usize = 64;
// relative tolerance used when two floating roots are compared
const SAME_POINT_TOLERANCE: f64 = 1e-9;

/// A real number with an optional exact closed form and its floating approximation.
#[derive(Debug, Clone)]
pub struct RealValue {
    /// rational constant or a surd expression, None for roots known only numerically
    pub exact: Option<Expr>,
    pub approx: f64,
}

impl RealValue {
    pub fn rational(q: BigRational) -> Self {
        Self {
            approx: rational_to_f64(&q),
            exact: Some(Expr::Const(q)),
        }
    }

    pub fn numeric(v: f64) -> Self {
        Self {
            exact: None,
            approx: v,
        }
    }

    /// exact closed form, the approximation is computed from it
    pub fn from_expr(e: Expr) -> Self {
        Self {
            approx: e.approx(),
            exact: Some(e),
        }
    }

    pub fn as_rational(&self) -> Option<&BigRational> {
        self.exact.as_ref().and_then(|e| e.as_rational())
    }

    pub fn is_exact(&self) -> bool {
        self.exact.is_some()
    }

    /// exact comparison for rationals, tolerant floating comparison otherwise
    pub fn cmp_value(&self, other: &RealValue) -> Ordering {
        if let (Some(a), Some(b)) = (self.as_rational(), other.as_rational()) {
            return a.cmp(b);
        }
        if self.same_point(other) {
            return Ordering::Equal;
        }
        self.approx
            .partial_cmp(&other.approx)
            .unwrap_or(Ordering::Equal)
    }

    pub fn same_point(&self, other: &RealValue) -> bool {
        if let (Some(a), Some(b)) = (self.as_rational(), other.as_rational()) {
            return a == b;
        }
        let scale = self.approx.abs().max(1.0);
        (self.approx - other.approx).abs() <= SAME_POINT_TOLERANCE * scale
    }
}

impl fmt::Display for RealValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.exact {
            Some(e) => write!(f, "{}", e),
            None => write!(f, "≈{}", format_decimal(self.approx)),
        }
    }
}

/// sorts ascending and collapses values that denote the same point
pub fn sort_and_dedup(values: &mut Vec<RealValue>) {
    values.sort_by(|a, b| a.cmp_value(b));
    values.dedup_by(|a, b| a.same_point(b));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polynomial {
    coeffs: Vec<BigRational>,
}

impl Polynomial {
    pub fn new(coeffs: Vec<BigRational>) -> Self {
        let mut p = Self { coeffs };
        p.trim();
        p
    }

    fn trim(&mut self) {
        while self.coeffs.last().is_some_and(|c| c.is_zero()) {
            self.coeffs.pop();
        }
    }

    pub fn zero() -> Self {
        Self { coeffs: Vec::new() }
    }

    pub fn constant(q: BigRational) -> Self {
        Self::new(vec![q])
    }

    /// the polynomial x
    pub fn x() -> Self {
        Self::new(vec![BigRational::zero(), BigRational::one()])
    }

    pub fn coeffs(&self) -> &[BigRational] {
        &self.coeffs
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// degree, 0 for constants (including the zero polynomial)
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn is_constant(&self) -> bool {
        self.coeffs.len() <= 1
    }

    pub fn leading(&self) -> BigRational {
        self.coeffs.last().cloned().unwrap_or_else(BigRational::zero)
    }

    /// Horner evaluation in exact arithmetic
    pub fn eval(&self, x: &BigRational) -> BigRational {
        self.coeffs
            .iter()
            .rev()
            .fold(BigRational::zero(), |acc, c| acc * x + c)
    }

    pub fn eval_f64(&self, x: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * x + rational_to_f64(c))
    }

    pub fn sign_at(&self, x: &BigRational) -> Ordering {
        self.eval(x).cmp(&BigRational::zero())
    }

    pub fn derivative(&self) -> Self {
        Self::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| c * BigRational::from_integer(BigInt::from(k)))
                .collect(),
        )
    }

    pub fn scale(&self, q: &BigRational) -> Self {
        Self::new(self.coeffs.iter().map(|c| c * q).collect())
    }

    pub fn monic(&self) -> Self {
        if self.is_zero() {
            return self.clone();
        }
        self.scale(&self.leading().recip())
    }

    pub fn pow(&self, n: u32) -> Self {
        let mut result = Self::constant(BigRational::one());
        for _ in 0..n {
            result = &result * self;
        }
        result
    }

    /// quotient and remainder; division by the zero polynomial gives (0, self)
    pub fn div_rem(&self, divisor: &Polynomial) -> (Polynomial, Polynomial) {
        if divisor.is_zero() || self.is_zero() || self.degree() < divisor.degree() {
            return (Self::zero(), self.clone());
        }
        let dd = divisor.degree();
        let lc = divisor.leading();
        let mut rem = self.coeffs.clone();
        let n = self.degree();
        let mut quot = vec![BigRational::zero(); n - dd + 1];
        for i in (0..=n - dd).rev() {
            let c = &rem[i + dd] / &lc;
            if !c.is_zero() {
                for (j, d) in divisor.coeffs.iter().enumerate() {
                    rem[i + j] = &rem[i + j] - &c * d;
                }
            }
            quot[i] = c;
        }
        rem.truncate(dd);
        (Self::new(quot), Self::new(rem))
    }

    /// monic greatest common divisor
    pub fn gcd(&self, other: &Polynomial, budget: &mut Budget) -> Result<Polynomial, AnalysisError> {
        let mut a = self.monic();
        let mut b = other.monic();
        while !b.is_zero() {
            budget.charge(Operation::PolyOps, (a.degree() + 1) as u64)?;
            let r = a.div_rem(&b).1;
            a = b;
            b = r.monic();
        }
        Ok(a.monic())
    }

    /// the product of the distinct irreducible factors, p / gcd(p, p')
    pub fn squarefree(&self, budget: &mut Budget) -> Result<Polynomial, AnalysisError> {
        if self.degree() <= 1 {
            return Ok(self.clone());
        }
        let g = self.gcd(&self.derivative(), budget)?;
        Ok(self.div_rem(&g).0)
    }

    /// the polynomial in `var`, None when the expression is not a polynomial with rational
    /// coefficients
    pub fn from_expr(
        expr: &Expr,
        var: &str,
        budget: &mut Budget,
    ) -> Result<Option<Polynomial>, AnalysisError> {
        budget.charge(Operation::PolyOps, 1)?;
        let pair = |l: &Expr, r: &Expr, budget: &mut Budget| -> Result<Option<(Polynomial, Polynomial)>, AnalysisError> {
            match (Self::from_expr(l, var, budget)?, Self::from_expr(r, var, budget)?) {
                (Some(a), Some(b)) => Ok(Some((a, b))),
                _ => Ok(None),
            }
        };
        let p = match expr {
            Expr::Var(name) if name == var => Self::x(),
            Expr::Const(q) => Self::constant(q.clone()),
            Expr::Var(_) | Expr::Constant(_) | Expr::Func(..) | Expr::Piecewise(_) => {
                return Ok(None);
            }
            Expr::Add(l, r) => match pair(l, r, budget)? {
                Some((a, b)) => &a + &b,
                None => return Ok(None),
            },
            Expr::Sub(l, r) => match pair(l, r, budget)? {
                Some((a, b)) => &a - &b,
                None => return Ok(None),
            },
            Expr::Mul(l, r) => match pair(l, r, budget)? {
                Some((a, b)) => {
                    budget.charge(Operation::PolyOps, ((a.degree() + 1) * (b.degree() + 1)) as u64)?;
                    &a * &b
                }
                None => return Ok(None),
            },
            Expr::Div(l, r) => match pair(l, r, budget)? {
                Some((a, b)) if b.is_constant() && !b.is_zero() => a.scale(&b.leading().recip()),
                _ => return Ok(None),
            },
            Expr::Neg(inner) => match Self::from_expr(inner, var, budget)? {
                Some(a) => -&a,
                None => return Ok(None),
            },
            Expr::Pow(base, exp) => {
                let n = match &**exp {
                    Expr::Const(q) if q.is_integer() && !q.is_negative() => q.numer().to_u64(),
                    _ => None,
                };
                let n = match n {
                    Some(n) if n <= MAX_EXPANDED_POWER => n as u32,
                    _ => return Ok(None),
                };
                match Self::from_expr(base, var, budget)? {
                    Some(b) => {
                        budget.charge(Operation::PolyOps, (b.degree() as u64 + 1) * n as u64)?;
                        b.pow(n)
                    }
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(p))
    }

    /// descending form: x^2 - 3*x + 2
    pub fn to_expr(&self, var: &str) -> Expr {
        let mut result: Option<Expr> = None;
        for (k, c) in self.coeffs.iter().enumerate().rev() {
            if c.is_zero() {
                continue;
            }
            let magnitude = c.abs();
            let power = match k {
                0 => None,
                1 => Some(Expr::var(var)),
                _ => Some(Expr::var(var).pow(Expr::int(k as i64))),
            };
            let term = match power {
                None => Expr::Const(magnitude),
                Some(p) if magnitude.is_one() => p,
                Some(p) => Expr::Const(magnitude) * p,
            };
            result = Some(match result {
                None if c.is_negative() => match term {
                    Expr::Const(m) => Expr::Const(-m),
                    other => -other,
                },
                None => term,
                Some(acc) if c.is_negative() => acc - term,
                Some(acc) => acc + term,
            });
        }
        result.unwrap_or_else(Expr::zero)
    }

    //___________________________________REAL ROOTS____________________________________

    /// every real root once, ascending
    pub fn real_roots(&self, budget: &mut Budget) -> Result<Vec<RealValue>, AnalysisError> {
        if self.is_constant() {
            return Ok(Vec::new());
        }
        let mut rest = self.squarefree(budget)?;
        let mut roots = Vec::new();
        if rest.coeffs[0].is_zero() {
            roots.push(RealValue::rational(BigRational::zero()));
            rest = Self::new(rest.coeffs[1..].to_vec());
        }
        if rest.degree() >= 1 {
            let ints = integer_coefficients(&rest);
            if let Some(candidates) = rational_root_candidates(&ints) {
                for r in candidates {
                    if rest.degree() == 0 {
                        break;
                    }
                    budget.charge(Operation::RootIsolation, (rest.degree() + 1) as u64)?;
                    if rest.eval(&r).is_zero() {
                        rest = rest.deflate(&r);
                        roots.push(RealValue::rational(r));
                    }
                }
            }
        }
        match rest.degree() {
            0 => {}
            1 => {
                let r = -&rest.coeffs[0] / &rest.coeffs[1];
                roots.push(RealValue::rational(r));
            }
            2 => roots.extend(quadratic_roots(&rest)),
            _ => roots.extend(isolate_roots(&rest, budget)?),
        }
        sort_and_dedup(&mut roots);
        Ok(roots)
    }

    /// divides out the linear factor (x - r)
    fn deflate(&self, r: &BigRational) -> Polynomial {
        let linear = Self::new(vec![-r.clone(), BigRational::one()]);
        self.div_rem(&linear).0
    }
}

/// the coefficients multiplied by the common denominator
fn integer_coefficients(p: &Polynomial) -> Vec<BigInt> {
    let lcm = BigRational::from_integer(common_denominator(p.coeffs.iter()));
    p.coeffs.iter().map(|c| (c * &lcm).to_integer()).collect()
}

/// ±(divisor of a0)/(divisor of an), None when there would be too many to test
fn rational_root_candidates(ints: &[BigInt]) -> Option<Vec<BigRational>> {
    let a0 = ints.first()?;
    let an = ints.last()?;
    let ps = positive_divisors(a0)?;
    let qs = positive_divisors(an)?;
    if 2 * ps.len() * qs.len() > MAX_RATIONAL_CANDIDATES {
        return None;
    }
    let mut candidates: Vec<BigRational> = Vec::with_capacity(2 * ps.len() * qs.len());
    for p in &ps {
        for q in &qs {
            let r = BigRational::new(p.clone(), q.clone());
            candidates.push(-r.clone());
            candidates.push(r);
        }
    }
    candidates.sort();
    candidates.dedup();
    Some(candidates)
}

/// roots of a quadratic without rational roots: (-b ± sqrt(D))/(2a)
fn quadratic_roots(p: &Polynomial) -> Vec<RealValue> {
    let (c, b, a) = (&p.coeffs[0], &p.coeffs[1], &p.coeffs[2]);
    let two = BigRational::from_integer(BigInt::from(2));
    let four = BigRational::from_integer(BigInt::from(4));
    let discriminant = b * b - four * a * c;
    if discriminant.is_negative() {
        return Vec::new();
    }
    let center = -b / (&two * a);
    if discriminant.is_zero() {
        return vec![RealValue::rational(center)];
    }
    let (coef, radicand) = extract_rational_root(&discriminant, 2);
    let offset = (coef / (two * a)).abs();
    if radicand.is_one() {
        return vec![
            RealValue::rational(&center - &offset),
            RealValue::rational(&center + &offset),
        ];
    }
    let surd = Expr::Pow(
        Expr::Const(BigRational::from_integer(radicand.clone())).boxed(),
        Expr::ratio(1, 2).boxed(),
    );
    let surd_value = radicand.to_f64().unwrap_or(f64::NAN).sqrt();
    let term = |sign: i64| -> Expr {
        let k = &offset * BigRational::from_integer(BigInt::from(sign));
        if k.is_one() {
            surd.clone()
        } else if k == -BigRational::one() {
            -surd.clone()
        } else {
            Expr::Const(k) * surd.clone()
        }
    };
    let root = |sign: i64| -> RealValue {
        let approx = rational_to_f64(&center) + sign as f64 * rational_to_f64(&offset) * surd_value;
        let exact = if center.is_zero() {
            term(sign)
        } else if sign < 0 {
            Expr::Const(center.clone()) - term(1)
        } else {
            Expr::Const(center.clone()) + term(1)
        };
        RealValue {
            exact: Some(exact),
            approx,
        }
    };
    vec![root(-1), root(1)]
}

/// Sturm sequence p, p', -rem(p, p'), ... each member scaled to a monic form
fn sturm_chain(p: &Polynomial, budget: &mut Budget) -> Result<Vec<Polynomial>, AnalysisError> {
    let mut chain = vec![p.clone(), p.derivative()];
    loop {
        let n = chain.len();
        budget.charge(Operation::RootIsolation, (chain[n - 2].degree() + 1) as u64)?;
        let r = chain[n - 2].div_rem(&chain[n - 1]).1;
        if r.is_zero() {
            break;
        }
        // positive scaling keeps the signs
        let scale = r.leading().abs().recip();
        chain.push(-&r.scale(&scale));
    }
    Ok(chain)
}

fn sign_variations(chain: &[Polynomial], x: &BigRational, budget: &mut Budget) -> Result<usize, AnalysisError> {
    let mut variations = 0;
    let mut last: Option<Ordering> = None;
    for p in chain {
        budget.charge(Operation::RootIsolation, (p.degree() + 1) as u64)?;
        let s = p.sign_at(x);
        if s == Ordering::Equal {
            continue;
        }
        if last.is_some_and(|l| l != s) {
            variations += 1;
        }
        last = Some(s);
    }
    Ok(variations)
}

/// 1 + max |a_i/a_n|, every root lies strictly inside (-B, B)
fn cauchy_bound(p: &Polynomial) -> BigRational {
    let lc = p.leading();
    let max = p.coeffs[..p.degree()]
        .iter()
        .map(|c| (c / &lc).abs())
        .max()
        .unwrap_or_else(BigRational::zero);
    BigRational::one() + max
}

/// a split point of (lo, hi) that is not a root
fn split_point(p: &Polynomial, lo: &BigRational, hi: &BigRational) -> BigRational {
    let width = hi - lo;
    let fractions = [(1, 2), (3, 7), (4, 7), (2, 5), (3, 5)];
    for (n, d) in fractions {
        let t = BigRational::new(BigInt::from(n), BigInt::from(d));
        let m = lo + &width * t;
        if !p.eval(&m).is_zero() {
            return m;
        }
    }
    lo + width / BigRational::from_integer(BigInt::from(2))
}

/// the single root in (lo, hi] by exact bisection
fn refine_root(
    p: &Polynomial,
    mut lo: BigRational,
    mut hi: BigRational,
    budget: &mut Budget,
) -> Result<RealValue, AnalysisError> {
    if p.eval(&hi).is_zero() {
        return Ok(RealValue::rational(hi));
    }
    let lo_sign = p.sign_at(&lo);
    let two = BigRational::from_integer(BigInt::from(2));
    for _ in 0..MAX_BISECTIONS {
        budget.charge(Operation::RootIsolation, (p.degree() + 1) as u64)?;
        let mid = (&lo + &hi) / &two;
        let s = p.sign_at(&mid);
        if s == Ordering::Equal {
            return Ok(RealValue::rational(mid));
        }
        if s == lo_sign {
            lo = mid;
        } else {
            hi = mid;
        }
        let width = rational_to_f64(&(&hi - &lo));
        if width < 1e-14 * rational_to_f64(&lo).abs().max(1.0) {
            break;
        }
    }
    let approx = rational_to_f64(&((&lo + &hi) / &two));
    // numerically found roots that are small fractions are made exact
    if let Some(r) = recognise_rational(approx, 1000, 1e-12) {
        if p.eval(&r).is_zero() {
            return Ok(RealValue::rational(r));
        }
    }
    Ok(RealValue::numeric(approx))
}

fn isolate_roots(p: &Polynomial, budget: &mut Budget) -> Result<Vec<RealValue>, AnalysisError> {
    let chain = sturm_chain(p, budget)?;
    let bound = cauchy_bound(p);
    let lo = -bound.clone();
    let hi = bound;
    let v_lo = sign_variations(&chain, &lo, budget)?;
    let v_hi = sign_variations(&chain, &hi, budget)?;
    let mut stack = vec![(lo, hi, v_lo, v_hi, 0usize)];
    let mut roots = Vec::new();
    while let Some((lo, hi, v_lo, v_hi, depth)) = stack.pop() {
        let count = v_lo.saturating_sub(v_hi);
        if count == 0 {
            continue;
        }
        if count == 1 || depth > 200 {
            roots.push(refine_root(p, lo, hi, budget)?);
            continue;
        }
        let mid = split_point(p, &lo, &hi);
        let v_mid = sign_variations(&chain, &mid, budget)?;
        stack.push((lo, mid.clone(), v_lo, v_mid, depth + 1));
        stack.push((mid, hi, v_mid, v_hi, depth + 1));
    }
    log::debug!("Sturm isolation found {} roots of {:?}", roots.len(), p.coeffs);
    Ok(roots)
}

impl std::ops::Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let n = self.coeffs.len().max(rhs.coeffs.len());
        let zero = BigRational::zero();
        Polynomial::new(
            (0..n)
                .map(|i| self.coeffs.get(i).unwrap_or(&zero) + rhs.coeffs.get(i).unwrap_or(&zero))
                .collect(),
        )
    }
}

impl std::ops::Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        self + &(-rhs)
    }
}

impl std::ops::Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        Polynomial::new(self.coeffs.iter().map(|c| -c).collect())
    }
}

impl std::ops::Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::zero();
        }
        let mut coeffs = vec![BigRational::zero(); self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] = &coeffs[i + j] + a * b;
            }
        }
        Polynomial::new(coeffs)
    }
}

/// N/D with gcd(N, D) = 1 and a monic denominator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RationalFunction {
    pub numer: Polynomial,
    pub denom: Polynomial,
}

impl RationalFunction {
    /// None when the expression is not a ratio of polynomials in `var`
    pub fn from_expr(
        expr: &Expr,
        var: &str,
        budget: &mut Budget,
    ) -> Result<Option<RationalFunction>, AnalysisError> {
        match Self::collect(expr, var, budget)? {
            Some((n, d)) => Ok(Some(Self::reduced(n, d, budget)?)),
            None => Ok(None),
        }
    }

    fn collect(
        expr: &Expr,
        var: &str,
        budget: &mut Budget,
    ) -> Result<Option<(Polynomial, Polynomial)>, AnalysisError> {
        budget.charge(Operation::PolyOps, 1)?;
        let one = || Polynomial::constant(BigRational::one());
        let both = |l: &Expr, r: &Expr, budget: &mut Budget| -> Result<Option<((Polynomial, Polynomial), (Polynomial, Polynomial))>, AnalysisError> {
            match (Self::collect(l, var, budget)?, Self::collect(r, var, budget)?) {
                (Some(a), Some(b)) => Ok(Some((a, b))),
                _ => Ok(None),
            }
        };
        let result = match expr {
            Expr::Var(name) if name == var => (Polynomial::x(), one()),
            Expr::Const(q) => (Polynomial::constant(q.clone()), one()),
            Expr::Var(_) | Expr::Constant(_) | Expr::Func(..) | Expr::Piecewise(_) => {
                return Ok(None);
            }
            Expr::Add(l, r) | Expr::Sub(l, r) => match both(l, r, budget)? {
                Some(((na, da), (nb, db))) => {
                    let left = &na * &db;
                    let right = &nb * &da;
                    let numer = if matches!(expr, Expr::Add(..)) {
                        &left + &right
                    } else {
                        &left - &right
                    };
                    (numer, &da * &db)
                }
                None => return Ok(None),
            },
            Expr::Mul(l, r) => match both(l, r, budget)? {
                Some(((na, da), (nb, db))) => (&na * &nb, &da * &db),
                None => return Ok(None),
            },
            Expr::Div(l, r) => match both(l, r, budget)? {
                Some(((na, da), (nb, db))) => {
                    if nb.is_zero() {
                        return Ok(None);
                    }
                    (&na * &db, &da * &nb)
                }
                None => return Ok(None),
            },
            Expr::Neg(inner) => match Self::collect(inner, var, budget)? {
                Some((n, d)) => (-&n, d),
                None => return Ok(None),
            },
            Expr::Pow(base, exp) => {
                let k = match &**exp {
                    Expr::Const(q) if q.is_integer() => q.numer().to_i64(),
                    _ => None,
                };
                let k = match k {
                    Some(k) if k.unsigned_abs() <= MAX_EXPANDED_POWER => k,
                    _ => return Ok(None),
                };
                match Self::collect(base, var, budget)? {
                    Some((n, d)) => {
                        let m = k.unsigned_abs() as u32;
                        budget.charge(Operation::PolyOps, (n.degree() + d.degree() + 2) as u64 * m as u64)?;
                        if k >= 0 {
                            (n.pow(m), d.pow(m))
                        } else {
                            if n.is_zero() {
                                return Ok(None);
                            }
                            (d.pow(m), n.pow(m))
                        }
                    }
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(result))
    }

    /// removes the common factor and normalizes the denominator to be monic
    pub fn reduced(
        numer: Polynomial,
        denom: Polynomial,
        budget: &mut Budget,
    ) -> Result<RationalFunction, AnalysisError> {
        let g = numer.gcd(&denom, budget)?;
        let (numer, denom) = if g.is_zero() || g.is_constant() {
            (numer, denom)
        } else {
            (numer.div_rem(&g).0, denom.div_rem(&g).0)
        };
        let lc = denom.leading();
        if lc.is_zero() {
            return Ok(RationalFunction { numer, denom });
        }
        let inv = lc.recip();
        Ok(RationalFunction {
            numer: numer.scale(&inv),
            denom: denom.scale(&inv),
        })
    }

    pub fn is_polynomial(&self) -> bool {
        self.denom.is_constant()
    }

    pub fn eval(&self, x: &BigRational) -> Option<BigRational> {
        let d = self.denom.eval(x);
        if d.is_zero() {
            None
        } else {
            Some(self.numer.eval(x) / d)
        }
    }

    pub fn eval_f64(&self, x: f64) -> f64 {
        self.numer.eval_f64(x) / self.denom.eval_f64(x)
    }

    /// numerator of the derivative, N'D - ND'
    pub fn derivative_numerator(&self) -> Polynomial {
        &(&self.numer.derivative() * &self.denom) - &(&self.numer * &self.denom.derivative())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::utils::big_rational;
    use approx::assert_relative_eq;

    fn poly(coeffs: &[i64]) -> Polynomial {
        Polynomial::new(coeffs.iter().map(|&c| big_rational(c, 1)).collect())
    }

    fn budget() -> Budget {
        Budget::unlimited()
    }

    #[test]
    fn test_arithmetic() {
        let a = poly(&[-1, 1]); // x - 1
        let b = poly(&[1, 1]); // x + 1
        assert_eq!(&a * &b, poly(&[-1, 0, 1]));
        assert_eq!(&a + &b, poly(&[0, 2]));
        assert_eq!(&a - &a, Polynomial::zero());
        let (q, r) = poly(&[-1, 0, 1]).div_rem(&a);
        assert_eq!(q, b);
        assert!(r.is_zero());
        let (q, r) = poly(&[1, 0, 1]).div_rem(&a);
        assert_eq!(q, b);
        assert_eq!(r, poly(&[2]));
        assert_eq!(poly(&[1, 2, 3]).derivative(), poly(&[2, 6]));
    }

    #[test]
    fn test_gcd_and_squarefree() {
        let mut budget = budget();
        let p = poly(&[-1, 0, 1]); // (x-1)(x+1)
        let q = poly(&[1, -2, 1]); // (x-1)^2
        assert_eq!(p.gcd(&q, &mut budget).unwrap(), poly(&[-1, 1]));
        let cube = poly(&[-1, 3, -3, 1]); // (x-1)^3
        assert_eq!(cube.squarefree(&mut budget).unwrap().monic(), poly(&[-1, 1]));
    }

    #[test]
    fn test_from_expr_and_back() {
        let mut budget = budget();
        let x = Expr::var("x");
        let e = (x.clone() - Expr::int(1)) * (x.clone() + Expr::int(2)) / Expr::int(2);
        let p = Polynomial::from_expr(&e, "x", &mut budget).unwrap().unwrap();
        assert_eq!(
            p,
            Polynomial::new(vec![big_rational(-1, 1), big_rational(1, 2), big_rational(1, 2)])
        );
        let e = x.clone().pow(Expr::int(2)) - Expr::int(3) * x.clone() + Expr::int(2);
        let p = Polynomial::from_expr(&e, "x", &mut budget).unwrap().unwrap();
        assert_eq!(p.to_expr("x").to_string(), "x^2 - 3*x + 2");
        assert_eq!(poly(&[0, -1]).to_expr("x").to_string(), "-x");
        let not_poly = Expr::one() / x.clone();
        assert!(Polynomial::from_expr(&not_poly, "x", &mut budget).unwrap().is_none());
        let sqrt = x.clone().pow(Expr::ratio(1, 2));
        assert!(Polynomial::from_expr(&sqrt, "x", &mut budget).unwrap().is_none());
    }

    #[test]
    fn test_rational_roots() {
        let mut budget = budget();
        // 2x^3 - 3x^2 - 3x + 2 = (x - 2)(2x - 1)(x + 1)
        let p = poly(&[2, -3, -3, 2]);
        let roots = p.real_roots(&mut budget).unwrap();
        let exact: Vec<BigRational> = roots.iter().map(|r| r.as_rational().unwrap().clone()).collect();
        assert_eq!(exact, vec![big_rational(-1, 1), big_rational(1, 2), big_rational(2, 1)]);
        // x^2 has the single root 0
        let roots = poly(&[0, 0, 1]).real_roots(&mut budget).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].as_rational(), Some(&big_rational(0, 1)));
        // x^2 + 1 has none
        assert!(poly(&[1, 0, 1]).real_roots(&mut budget).unwrap().is_empty());
    }

    #[test]
    fn test_quadratic_surds() {
        let mut budget = budget();
        // x^2 - 2x - 1, roots 1 ± sqrt(2)
        let roots = poly(&[-1, -2, 1]).real_roots(&mut budget).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].to_string(), "1 - sqrt(2)");
        assert_eq!(roots[1].to_string(), "1 + sqrt(2)");
        assert_relative_eq!(roots[1].approx, 1.0 + 2f64.sqrt(), epsilon = 1e-12);
        // x^2 - 2
        let roots = poly(&[-2, 0, 1]).real_roots(&mut budget).unwrap();
        assert_eq!(roots[0].to_string(), "-sqrt(2)");
        assert_eq!(roots[1].to_string(), "sqrt(2)");
        assert_relative_eq!(roots[0].exact.as_ref().unwrap().approx(), -(2f64.sqrt()), epsilon = 1e-12);
    }

    #[test]
    fn test_sturm_isolation() {
        let mut budget = budget();
        // x^3 - 2x - 5 has one real root near 2.0945514815
        let roots = poly(&[-5, -2, 0, 1]).real_roots(&mut budget).unwrap();
        assert_eq!(roots.len(), 1);
        assert!(!roots[0].is_exact());
        assert_relative_eq!(roots[0].approx, 2.0945514815423265, epsilon = 1e-10);
        // x^5 - 5x + 1 has three real roots
        let p = poly(&[1, -5, 0, 0, 0, 1]);
        let roots = p.real_roots(&mut budget).unwrap();
        assert_eq!(roots.len(), 3);
        for r in &roots {
            assert!(p.eval_f64(r.approx).abs() < 1e-9);
        }
        assert!(roots.windows(2).all(|w| w[0].approx < w[1].approx));
    }

    #[test]
    fn test_roots_respect_budget() {
        let mut tight = Budget::new(20, None);
        let p = poly(&[1, -5, 0, 0, 0, 1]);
        assert!(matches!(p.real_roots(&mut tight), Err(AnalysisError::Timeout(_))));
    }

    #[test]
    fn test_rational_function_reduction() {
        let mut budget = budget();
        let x = Expr::var("x");
        // (x^2 - 1)/(x - 1) = x + 1
        let e = (x.clone().pow(Expr::int(2)) - Expr::int(1)) / (x.clone() - Expr::int(1));
        let rf = RationalFunction::from_expr(&e, "x", &mut budget).unwrap().unwrap();
        assert_eq!(rf.numer, poly(&[1, 1]));
        assert!(rf.is_polynomial());
        // 1/x + 1/(x+1) = (2x + 1)/(x^2 + x)
        let e = Expr::one() / x.clone() + Expr::one() / (x.clone() + Expr::one());
        let rf = RationalFunction::from_expr(&e, "x", &mut budget).unwrap().unwrap();
        assert_eq!(rf.numer, poly(&[1, 2]));
        assert_eq!(rf.denom, poly(&[0, 1, 1]));
        assert_eq!(rf.eval(&big_rational(1, 1)), Some(big_rational(3, 2)));
        assert_eq!(rf.eval(&big_rational(0, 1)), None);
        let e = x.clone().pow(Expr::int(-2));
        let rf = RationalFunction::from_expr(&e, "x", &mut budget).unwrap().unwrap();
        assert_eq!(rf.denom, poly(&[0, 0, 1]));
        // derivative numerator of x/(x^2+1) is 1 - x^2
        let e = x.clone() / (x.clone().pow(Expr::int(2)) + Expr::one());
        let rf = RationalFunction::from_expr(&e, "x", &mut budget).unwrap().unwrap();
        assert_eq!(rf.derivative_numerator(), poly(&[1, 0, -1]));
    }

    #[test]
    fn test_real_value_ordering() {
        let a = RealValue::rational(big_rational(1, 2));
        let b = RealValue::numeric(0.5 + 1e-12);
        assert!(a.same_point(&b));
        let mut values = vec![
            RealValue::rational(big_rational(2, 1)),
            a.clone(),
            b,
            RealValue::numeric(-1.0),
        ];
        sort_and_dedup(&mut values);
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].to_string(), "≈-1");
        assert_eq!(values[1].to_string(), "1/2");
    }
}
