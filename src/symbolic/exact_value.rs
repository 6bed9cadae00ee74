// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Reading the point at which the function is evaluated as an exact rational number.
//!
//! The text is normalized first: Unicode compatibility decomposition (NFKD, so full-width
//! digits become ASCII digits), every minus-sign look-alike becomes `-`, a comma decimal
//! separator becomes `.`, and all whitespace is removed. What remains must be
//! `[sign] mantissa [exponent] [/ [sign] mantissa [exponent]]`.
//! ```
//! use RustedFunAn::symbolic::exact_value::parse_value;
//! use RustedFunAn::symbolic::utils::big_rational;
//! assert_eq!(parse_value("0,25").unwrap(), big_rational(1, 4));
//! assert_eq!(parse_value("6/2").unwrap(), parse_value("3").unwrap());
//! ```
use crate::analysis::error::AnalysisError;
use num::bigint::BigInt;
use num::rational::BigRational;
use num_traits::{One, Zero};
use unicode_normalization::UnicodeNormalization;

/// exact rational value of the evaluation point
pub type ExactValue = BigRational;

// decimal exponents beyond this are rejected
const MAX_DECIMAL_EXPONENT: i64 = 1000;

const MINUS_VARIANTS: [char; 9] = [
    '\u{2212}', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}',
    '\u{FE63}', '\u{FF0D}',
];

/// NFKD, minus look-alikes to '-', ',' to '.', no whitespace
pub fn normalize_value_text(text: &str) -> String {
    text.nfkd()
        .map(|c| {
            if MINUS_VARIANTS.contains(&c) {
                '-'
            } else if c == ',' {
                '.'
            } else {
                c
            }
        })
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Exact value of a decimal literal: `12`, `-1.5`, `.5`, `3.`, `2e-3`, `+4E2`.
/// Returns None for anything else.
pub fn parse_rational_literal(s: &str) -> Option<BigRational> {
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
        None => (mantissa, ""),
    };
    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if int_part.len() + frac_part.len() == 0 || !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }
    let exponent: i64 = match exponent {
        Some(e) => {
            let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
            if digits.is_empty() || !all_digits(digits) || digits.len() > 6 {
                return None;
            }
            e.parse().ok()?
        }
        None => 0,
    };
    if exponent.abs() > MAX_DECIMAL_EXPONENT {
        return None;
    }
    let digits = format!("{}{}", int_part, frac_part);
    let mut numer = BigInt::parse_bytes(digits.as_bytes(), 10)?;
    if negative {
        numer = -numer;
    }
    let shift = exponent - frac_part.len() as i64;
    let ten = BigInt::from(10);
    let scale = num::pow::pow(ten, shift.unsigned_abs() as usize);
    Some(if shift >= 0 {
        BigRational::from_integer(numer * scale)
    } else {
        BigRational::new(numer, scale)
    })
}

/// Parses the evaluation point into an exact rational number.
///
/// Errors: `InvalidNumber` for text that is not a number or fraction,
/// `DivisionByZeroInValue` for a fraction with a zero denominator.
pub fn parse_value(text: &str) -> Result<ExactValue, AnalysisError> {
    let normalized = normalize_value_text(text);
    let invalid = || AnalysisError::InvalidNumber(text.trim().to_string());
    let parts: Vec<&str> = normalized.split('/').collect();
    let value = match parts.as_slice() {
        [single] => parse_rational_literal(single).ok_or_else(invalid)?,
        [numer, denom] => {
            let numer = parse_rational_literal(numer).ok_or_else(invalid)?;
            let denom = parse_rational_literal(denom).ok_or_else(invalid)?;
            if denom.is_zero() {
                return Err(AnalysisError::DivisionByZeroInValue);
            }
            numer / denom
        }
        _ => return Err(invalid()),
    };
    log::debug!("value '{}' read as {}", text, value);
    Ok(value)
}

/// true when the exact value is an integer (used to print `3` instead of `3/1`)
pub fn is_integer_value(value: &ExactValue) -> bool {
    value.denom().is_one()
}
