// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Evaluation at an exact point
//!
//! A linear sequence of stages, each of which may add a line to the step trail:
//! domain check, substitution, combining fractions, cancelling, simplification,
//! classification and the final exact and decimal read-out. A stage that leaves the form
//! unchanged records nothing, so consecutive steps always differ.
//!
//! The decimal value is computed once, from the exact result.
//! ```rust, ignore
//! use RustedFunAn::analysis::budget::Budget;
//! use RustedFunAn::analysis::evaluator::evaluate_text;
//! use RustedFunAn::symbolic::parse_expr::parse;
//! let f = parse("(x-1)/(x+2)").unwrap();
//! let result = evaluate_text(&f, "2", &mut Budget::default());
//! assert_eq!(result.decimal(), Some(0.25));
//! ```
use crate::analysis::budget::Budget;
use crate::analysis::error::AnalysisError;
use crate::symbolic::exact_value::{ExactValue, parse_value};
use crate::symbolic::parse_expr::Expression;
use crate::symbolic::symbolic_engine::{Expr, Function};
use crate::symbolic::symbolic_simplify::FoldError;
use crate::symbolic::utils::format_decimal;
use log::{debug, info, warn};
use num::bigint::BigInt;
use num_traits::{Signed, Zero};
use std::f64::consts::{LN_2, LN_10};

/// ordered human readable derivation
#[derive(Debug, Clone, Default)]
pub struct StepTrail {
    steps: Vec<String>,
    last_form: Option<Expr>,
}

impl StepTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// a step that does not carry a form of the expression
    pub fn note(&mut self, text: String) {
        debug!("step: {}", text);
        self.steps.push(text);
    }

    /// records `text` only when `form` differs from the last recorded form
    pub fn push_if_changed(&mut self, form: &Expr, text: String) -> bool {
        if self.last_form.as_ref() == Some(form) {
            return false;
        }
        self.last_form = Some(form.clone());
        self.note(text);
        true
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }
}

#[derive(Debug, Clone)]
pub enum EvaluationResult {
    Ok {
        /// value of f at the point: a rational or an exact closed form like `sqrt(3)/2`
        exact: Expr,
        /// infinite when the exact value is beyond the f64 range
        decimal: f64,
        /// the decimal value as shown, in scientific notation when `decimal` cannot hold it
        decimal_text: String,
        /// the evaluated point
        point: (ExactValue, f64),
        steps: Vec<String>,
    },
    Failed {
        reason: AnalysisError,
        steps: Vec<String>,
    },
}

impl EvaluationResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, EvaluationResult::Ok { .. })
    }

    pub fn steps(&self) -> &[String] {
        match self {
            EvaluationResult::Ok { steps, .. } | EvaluationResult::Failed { steps, .. } => steps,
        }
    }

    pub fn exact(&self) -> Option<&Expr> {
        match self {
            EvaluationResult::Ok { exact, .. } => Some(exact),
            EvaluationResult::Failed { .. } => None,
        }
    }

    pub fn decimal(&self) -> Option<f64> {
        match self {
            EvaluationResult::Ok { decimal, .. } => Some(*decimal),
            EvaluationResult::Failed { .. } => None,
        }
    }

    pub fn decimal_text(&self) -> Option<&str> {
        match self {
            EvaluationResult::Ok { decimal_text, .. } => Some(decimal_text),
            EvaluationResult::Failed { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&AnalysisError> {
        match self {
            EvaluationResult::Ok { .. } => None,
            EvaluationResult::Failed { reason, .. } => Some(reason),
        }
    }
}

/// failure of the fold on the substituted expression, before anything is simplified
fn domain_failure(err: FoldError, point: &str) -> AnalysisError {
    match err {
        FoldError::DivisionByZero(what) | FoldError::Undefined(what) => {
            AnalysisError::OutOfDomain(format!("{} ({})", point, what))
        }
        FoldError::NonReal(what) => AnalysisError::ComplexResult(format!("{} at {}", what, point)),
        FoldError::Exhausted(err) => err,
    }
}

/// failure of a simplification stage after the domain check passed
fn evaluation_failure(err: FoldError) -> AnalysisError {
    match err {
        FoldError::DivisionByZero(_) => AnalysisError::DivisionByZeroInEvaluation,
        FoldError::NonReal(what) => AnalysisError::ComplexResult(what),
        FoldError::Undefined(what) => AnalysisError::NonFinite(what),
        FoldError::Exhausted(err) => err,
    }
}

/// log10 of |n| for integers of any size
fn big_log10(n: &BigInt) -> Option<f64> {
    let digits = n.abs().to_string();
    let lead = digits.len().min(17);
    let leading: f64 = digits[..lead].parse().ok()?;
    Some(leading.log10() + (digits.len() - lead) as f64)
}

/// sign and log10 of the magnitude of a nonzero exact value, also when the value itself
/// does not fit an f64
fn magnitude(e: &Expr) -> Option<(f64, f64)> {
    let finite = |v: f64| v.is_finite().then_some(v);
    match e {
        Expr::Const(q) if !q.is_zero() => {
            let sign = if q.is_negative() { -1.0 } else { 1.0 };
            Some((sign, big_log10(q.numer())? - big_log10(q.denom())?))
        }
        Expr::Neg(inner) => magnitude(inner).map(|(s, l)| (-s, l)),
        Expr::Mul(a, b) => {
            let (sa, la) = magnitude(a)?;
            let (sb, lb) = magnitude(b)?;
            Some((sa * sb, la + lb))
        }
        Expr::Div(a, b) => {
            let (sa, la) = magnitude(a)?;
            let (sb, lb) = magnitude(b)?;
            Some((sa * sb, la - lb))
        }
        Expr::Pow(base, exp) => {
            let (sb, lb) = magnitude(base)?;
            if sb < 0.0 {
                return None;
            }
            Some((1.0, finite(exp.approx())? * lb))
        }
        Expr::Func(Function::Exp, arg) => Some((1.0, finite(arg.approx())? / LN_10)),
        Expr::Func(Function::Sqrt, arg) => {
            let (s, l) = magnitude(arg)?;
            (s > 0.0).then_some((1.0, l / 2.0))
        }
        // e^|t|/2 for large |t|
        Expr::Func(Function::Cosh, arg) => {
            Some((1.0, (finite(arg.approx())?.abs() - LN_2) / LN_10))
        }
        Expr::Func(Function::Sinh, arg) => {
            let t = finite(arg.approx())?;
            Some((t.signum(), (t.abs() - LN_2) / LN_10))
        }
        _ => {
            let v = e.approx();
            (v.is_finite() && v != 0.0).then(|| (v.signum(), v.abs().log10()))
        }
    }
}

/// decimal read-out of the exact value; scientific notation from the exact form when the
/// value overflows or underflows an f64
fn decimal_text(exact: &Expr, decimal: f64) -> String {
    if decimal.is_finite() && (decimal != 0.0 || exact.is_zero()) {
        return format_decimal(decimal);
    }
    match magnitude(exact) {
        Some((sign, log10)) => {
            let exponent = log10.floor();
            let mantissa = sign * 10f64.powf(log10 - exponent);
            format!("{}e{}", format_decimal(mantissa), exponent as i64)
        }
        None => format!("{} (no decimal form)", exact),
    }
}

fn failed(reason: AnalysisError, trail: StepTrail) -> EvaluationResult {
    warn!("evaluation failed: {}", reason);
    EvaluationResult::Failed {
        reason,
        steps: trail.into_steps(),
    }
}

/// Evaluates f at the exact value.
pub fn evaluate(expression: &Expression, value: &ExactValue, budget: &mut Budget) -> EvaluationResult {
    let var = expression.variable.as_str();
    let expr = &expression.expr;
    let shown_value = Expr::Const(value.clone());
    let point = format!("{} = {}", var, shown_value);
    let mut trail = StepTrail::new();
    trail.push_if_changed(expr, format!("f({}) = {}", var, expr));

    // 1. domain check on the substituted tree
    let substituted = expr.set_variable(var, value);
    if let Err(err) = substituted.fold(budget) {
        let reason = domain_failure(err, &point);
        if !matches!(reason, AnalysisError::Timeout(_)) {
            trail.note(format!("domain check failed: {}", reason));
        }
        return failed(reason, trail);
    }
    trail.note(format!("domain check passed: {} is in the domain", point));

    // 2. substitution
    trail.push_if_changed(
        &substituted,
        format!("f({}) = {}", shown_value, substituted),
    );

    // 3. combine fractions
    let together = substituted.together();
    trail.push_if_changed(&together, format!("combine fractions: {}", together));

    // 4. cancel common factors
    let cancelled = match together.cancel(budget) {
        Ok(e) => e,
        Err(err) => return failed(evaluation_failure(err), trail),
    };
    trail.push_if_changed(&cancelled, format!("cancel common factors: {}", cancelled));

    // 5. simplify
    let simplified = match cancelled.fold(budget) {
        Ok(e) => e,
        Err(err) => return failed(evaluation_failure(err), trail),
    };
    trail.push_if_changed(&simplified, format!("simplify: {}", simplified));

    // 6. classify: the exact fold above already rejected non-real, undefined and infinite
    // values, so an exact value that is too large for an f64 is still a finite result
    let decimal = simplified.approx();
    let text = decimal_text(&simplified, decimal);

    // 7. finalize
    trail.note(format!("exact value: f({}) = {}", shown_value, simplified));
    trail.note(format!("decimal value: f({}) ≈ {}", shown_value, text));
    let x = shown_value.approx();
    trail.note(format!("point: ({}, {})", decimal_text(&shown_value, x), text));
    info!("f({}) = {} ≈ {}", shown_value, simplified, text);
    EvaluationResult::Ok {
        exact: simplified,
        decimal,
        decimal_text: text,
        point: (value.clone(), x),
        steps: trail.into_steps(),
    }
}

/// Reads the value text and evaluates f there. A malformed value fails with the parse
/// error of the value.
pub fn evaluate_text(expression: &Expression, value_text: &str, budget: &mut Budget) -> EvaluationResult {
    match parse_value(value_text) {
        Ok(value) => evaluate(expression, &value, budget),
        Err(reason) => {
            let mut trail = StepTrail::new();
            trail.note(format!("reading the value '{}' failed: {}", value_text.trim(), reason));
            failed(reason, trail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::budget::Operation;
    use crate::symbolic::parse_expr::parse;
    use crate::symbolic::utils::big_rational;
    use approx::assert_relative_eq;

    fn eval(text: &str, value: &str) -> EvaluationResult {
        evaluate_text(&parse(text).unwrap(), value, &mut Budget::unlimited())
    }

    #[test]
    fn test_rational_value() {
        let result = eval("(x-1)/(x+2)", "2");
        assert!(result.is_ok());
        assert_eq!(result.exact().unwrap().to_string(), "1/4");
        assert_relative_eq!(result.decimal().unwrap(), 0.25);
        let steps = result.steps();
        assert_eq!(steps[0], "f(x) = (x - 1)/(x + 2)");
        assert!(steps.iter().any(|s| s == "f(2) = (2 - 1)/(2 + 2)"));
        assert!(steps.iter().any(|s| s == "exact value: f(2) = 1/4"));
        assert!(steps.iter().any(|s| s == "decimal value: f(2) ≈ 0.25"));
        assert_eq!(steps.last().unwrap(), "point: (2, 0.25)");
    }

    #[test]
    fn test_steps_never_repeat() {
        for (f, v) in [("(x-1)/(x+2)", "2"), ("x**2", "3"), ("1/x + 1/(x+1)", "1"), ("sqrt(x)", "8")] {
            let result = eval(f, v);
            assert!(result.is_ok(), "{} at {}", f, v);
            let steps = result.steps();
            for pair in steps.windows(2) {
                assert_ne!(pair[0], pair[1]);
            }
        }
    }

    #[test]
    fn test_combined_fractions_and_radicals() {
        let result = eval("1/x + 1/(x+1)", "1");
        assert_eq!(result.exact().unwrap().to_string(), "3/2");
        assert!(result.steps().iter().any(|s| s.starts_with("combine fractions:")));
        let result = eval("sqrt(x)", "8");
        assert_eq!(result.exact().unwrap().to_string(), "2*sqrt(2)");
        assert_relative_eq!(result.decimal().unwrap(), 8f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_domain() {
        for (f, v) in [("(x-1)/(x+2)", "-2"), ("1/(x-3)", "3"), ("1/(x-3)", "3/1"), ("log(x)", "0")] {
            let result = eval(f, v);
            assert!(
                matches!(result.reason(), Some(AnalysisError::OutOfDomain(_))),
                "{} at {}: {:?}",
                f,
                v,
                result
            );
            // nothing is simplified after the failed domain check
            assert_eq!(result.steps().len(), 2);
            assert!(result.steps()[1].starts_with("domain check failed"));
        }
    }

    #[test]
    fn test_complex_result() {
        let result = eval("sqrt(x+1)", "-2");
        assert!(matches!(result.reason(), Some(AnalysisError::ComplexResult(_))));
        assert!(!result.steps().is_empty());
        let result = eval("log(x)", "-1");
        assert!(matches!(result.reason(), Some(AnalysisError::ComplexResult(_))));
        // real odd root of a negative number
        let result = eval("x^(1/3)", "-8");
        assert_eq!(result.exact().unwrap().to_string(), "-2");
    }

    #[test]
    fn test_values_beyond_f64_are_finite() {
        let result = eval("exp(x)", "1000");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(result.exact().unwrap().to_string(), "exp(1000)");
        let text = result.decimal_text().unwrap();
        assert!(text.starts_with("1.97007") && text.ends_with("e434"), "{}", text);
        let result = eval("x^2", "1e1000");
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(result.decimal_text(), Some("1e2000"));
        assert_eq!(result.steps().last().unwrap(), "point: (1e1000, 1e2000)");
        let result = eval("1/x", "-1e400");
        assert_eq!(result.decimal_text(), Some("-1e-400"));
        let result = eval("(x-1)/(x+2)", "2");
        assert_eq!(result.decimal_text(), Some("0.25"));
    }

    #[test]
    fn test_stages_record_under_their_own_label() {
        let result = eval("(x-1)/(x+2)", "2");
        assert!(result.steps().iter().any(|s| s == "simplify: 1/4"));
        assert!(!result.steps().iter().any(|s| s.starts_with("cancel common factors")));
        let result = eval("sin(x)", "0");
        assert!(result.steps().iter().any(|s| s == "simplify: 0"));
        assert!(!result.steps().iter().any(|s| s.starts_with("cancel common factors")));
        // the common factor sqrt(3) is divided out before anything is folded
        let result = eval("x*sqrt(x)/(2*sqrt(x))", "3");
        let steps = result.steps();
        assert!(steps.iter().any(|s| s == "cancel common factors: 3/2"), "{:?}", steps);
        assert!(!steps.iter().any(|s| s.starts_with("simplify:")));
        assert_eq!(result.exact().unwrap().to_string(), "3/2");
    }

    #[test]
    fn test_malformed_value() {
        let result = eval("x", "abc");
        assert_eq!(result.reason(), Some(&AnalysisError::InvalidNumber("abc".to_string())));
        assert_eq!(result.steps().len(), 1);
        let result = eval("x", "1/0");
        assert_eq!(result.reason(), Some(&AnalysisError::DivisionByZeroInValue));
    }

    #[test]
    fn test_round_trip_and_timeout() {
        let f = parse("(x^2 + 1)/(x - 1)").unwrap();
        let v = big_rational(1, 3);
        let first = evaluate(&f, &v, &mut Budget::unlimited());
        let second = evaluate(&f, &v, &mut Budget::unlimited());
        assert_eq!(first.exact(), second.exact());
        assert_eq!(first.exact().unwrap().to_string(), "-5/3");
        let result = evaluate(&f, &v, &mut Budget::new(2, None));
        assert_eq!(result.reason(), Some(&AnalysisError::Timeout(Operation::Simplify)));
    }
}
