// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
// the collection of utility functions for exact rational arithmetic and number formatting
use num::bigint::BigInt;
use num::integer::Integer;
use num::rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

// trial division stops here, larger prime factors stay under the radical
const TRIAL_DIVISION_LIMIT: u64 = 10_000;
// integers above this are not enumerated for divisors
const DIVISOR_ENUMERATION_LIMIT: u64 = 1_000_000_000_000;

pub fn linspace(start: f64, end: f64, num_values: usize) -> Vec<f64> {
    if num_values < 2 {
        return vec![start];
    }
    let mut values = Vec::with_capacity(num_values);
    let step = (end - start) / (num_values as f64 - 1.0);

    for i in 0..num_values {
        let value = start + (i as f64 * step);
        values.push(value);
    }

    values
}

pub fn rational_to_f64(q: &BigRational) -> f64 {
    q.to_f64().unwrap_or(f64::NAN)
}

pub fn big_rational(numer: i64, denom: i64) -> BigRational {
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

/// exact q^n for integer n; None for 0^negative
pub fn rational_powi(q: &BigRational, n: i64) -> Option<BigRational> {
    if n == 0 {
        return Some(BigRational::one());
    }
    if q.is_zero() {
        return if n > 0 { Some(BigRational::zero()) } else { None };
    }
    let magnitude = n.unsigned_abs();
    let numer = num::pow::pow(q.numer().clone(), magnitude as usize);
    let denom = num::pow::pow(q.denom().clone(), magnitude as usize);
    if n > 0 {
        Some(BigRational::new(numer, denom))
    } else {
        Some(BigRational::new(denom, numer))
    }
}

/// splits a non-negative integer n as coefficient^k * radicand with radicand free of small
/// k-th powers: 72 = 6^2 * 2 for k = 2
pub fn extract_integer_root(n: &BigInt, k: u32) -> (BigInt, BigInt) {
    if n.is_zero() || n.is_one() {
        return (n.clone(), BigInt::one());
    }
    let root = n.nth_root(k);
    if num::pow::pow(root.clone(), k as usize) == *n {
        return (root, BigInt::one());
    }
    let mut coefficient = BigInt::one();
    let mut radicand = n.clone();
    let mut p: u64 = 2;
    while p <= TRIAL_DIVISION_LIMIT {
        let p_big = BigInt::from(p);
        let p_k = num::pow::pow(p_big.clone(), k as usize);
        if p_k > radicand {
            break;
        }
        while (&radicand % &p_k).is_zero() {
            radicand /= &p_k;
            coefficient *= &p_big;
        }
        p += if p == 2 { 1 } else { 2 };
    }
    (coefficient, radicand)
}

/// q^(1/k) for q >= 0 written as coefficient * radicand^(1/k) with an integer radicand:
/// sqrt(1/8) = 1/4 * sqrt(2)
pub fn extract_rational_root(q: &BigRational, k: u32) -> (BigRational, BigInt) {
    // (n/d)^(1/k) = (n * d^(k-1))^(1/k) / d
    let d = q.denom().clone();
    let lifted = q.numer() * num::pow::pow(d.clone(), (k - 1) as usize);
    let (coef, radicand) = extract_integer_root(&lifted, k);
    (BigRational::new(coef, d), radicand)
}

/// positive divisors of |n|, None when |n| is too large to enumerate
pub fn positive_divisors(n: &BigInt) -> Option<Vec<BigInt>> {
    let m = n.abs().to_u64()?;
    if m == 0 || m > DIVISOR_ENUMERATION_LIMIT {
        return None;
    }
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut i: u64 = 1;
    while i * i <= m {
        if m % i == 0 {
            small.push(BigInt::from(i));
            if i != m / i {
                large.push(BigInt::from(m / i));
            }
        }
        i += 1;
    }
    large.reverse();
    small.extend(large);
    Some(small)
}

/// least common multiple of the denominators
pub fn common_denominator<'a, I>(values: I) -> BigInt
where
    I: IntoIterator<Item = &'a BigRational>,
{
    values
        .into_iter()
        .fold(BigInt::one(), |acc, q| acc.lcm(q.denom()))
}

/// small-denominator rational within `tolerance` of v, used to recognise numeric roots
pub fn recognise_rational(v: f64, max_denominator: i64, tolerance: f64) -> Option<BigRational> {
    if !v.is_finite() || v.abs() > 1e12 {
        return None;
    }
    for d in 1..=max_denominator {
        let scaled = v * d as f64;
        let n = scaled.round();
        if (scaled - n).abs() < tolerance * d as f64 {
            return Some(BigRational::new(BigInt::from(n as i64), BigInt::from(d)));
        }
    }
    None
}

/// human readable decimal: 0.25, 2, -0.3333333333, 1.5e-12
pub fn format_decimal(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "∞".to_string() } else { "-∞".to_string() };
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let magnitude = v.abs();
    if !(1e-6..1e15).contains(&magnitude) {
        return format!("{:e}", v);
    }
    let s = format!("{:.10}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(0.25), "0.25");
        assert_eq!(format_decimal(2.0), "2");
        assert_eq!(format_decimal(-1.0 / 3.0), "-0.3333333333");
        assert_eq!(format_decimal(f64::INFINITY), "∞");
        assert_eq!(format_decimal(1.5e-12), "1.5e-12");
    }

    #[test]
    fn test_extract_roots() {
        let (c, r) = extract_integer_root(&BigInt::from(72), 2);
        assert_eq!(c, BigInt::from(6));
        assert_eq!(r, BigInt::from(2));
        let (c, r) = extract_integer_root(&BigInt::from(27), 3);
        assert_eq!(c, BigInt::from(3));
        assert_eq!(r, BigInt::one());
        let (c, r) = extract_rational_root(&big_rational(1, 8), 2);
        assert_eq!(c, big_rational(1, 4));
        assert_eq!(r, BigInt::from(2));
    }

    #[test]
    fn test_powers_and_divisors() {
        assert_eq!(rational_powi(&big_rational(2, 3), -2), Some(big_rational(9, 4)));
        assert_eq!(rational_powi(&big_rational(0, 1), -1), None);
        let divs = positive_divisors(&BigInt::from(-12)).unwrap();
        let expected: Vec<BigInt> = [1, 2, 3, 4, 6, 12].iter().map(|&i| BigInt::from(i)).collect();
        assert_eq!(divs, expected);
        assert_eq!(
            common_denominator(&[big_rational(1, 4), big_rational(1, 6)]),
            BigInt::from(12)
        );
    }

    #[test]
    fn test_recognise_rational() {
        assert_eq!(recognise_rational(0.5000000000001, 12, 1e-9), Some(big_rational(1, 2)));
        assert_eq!(recognise_rational(-3.0, 12, 1e-9), Some(big_rational(-3, 1)));
        assert_eq!(recognise_rational(std::f64::consts::PI, 12, 1e-9), None);
    }
}
