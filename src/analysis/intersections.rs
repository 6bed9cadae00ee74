// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Axis intersections
//!
//! The y-intercept is the evaluation at 0, so it exists exactly when 0 is in the domain and
//! f(0) is real. The x-intercepts are the real zeros of f (see `analysis::solve`) that lie
//! in the domain; when f = 0 has no closed form solution the zeros are searched numerically
//! in a window and reported as such.
//!
//! Neither side ever fails the whole request: a solver error or an exhausted budget is
//! reported as `XIntercepts::SolverFailure` or as a missing y-intercept with the reason in
//! the steps.
use crate::analysis::budget::Budget;
use crate::analysis::evaluator::{EvaluationResult, evaluate};
use crate::analysis::solve::{ZeroSet, numeric_zeros, real_zeros, value_at};
use crate::numerical::root_finding::RootFindingConfig;
use crate::symbolic::parse_expr::Expression;
use crate::symbolic::polynomial::{RealValue, sort_and_dedup};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::format_decimal;
use crate::analysis::error::AnalysisError;
use itertools::Itertools;
use log::{info, warn};
use num::rational::BigRational;
use num_traits::Zero;

#[derive(Debug, Clone)]
pub struct YIntercept {
    pub exact: Expr,
    pub decimal: f64,
}

#[derive(Debug, Clone)]
pub enum XIntercepts {
    /// every real zero, exact where a closed form exists
    Roots(Vec<RealValue>),
    /// zeros found by a numeric scan of the window, there may be more outside it
    Numeric {
        roots: Vec<RealValue>,
        window: (f64, f64),
    },
    /// f vanishes on its whole domain
    IdenticallyZero,
    SolverFailure(String),
}

impl XIntercepts {
    /// the roots as decimals, empty when there is no finite list
    pub fn decimals(&self) -> Vec<f64> {
        match self {
            XIntercepts::Roots(roots) | XIntercepts::Numeric { roots, .. } => {
                roots.iter().map(|r| r.approx).collect()
            }
            XIntercepts::IdenticallyZero | XIntercepts::SolverFailure(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InterceptSet {
    pub variable: String,
    pub y: Option<YIntercept>,
    pub y_steps: Vec<String>,
    pub x: XIntercepts,
    pub x_steps: Vec<String>,
}

impl InterceptSet {
    pub fn describe_y(&self) -> String {
        match &self.y {
            Some(y) => {
                let exact = format!("(0, {})", y.exact);
                let decimal = format!("(0, {})", format_decimal(y.decimal));
                if exact == decimal {
                    exact
                } else {
                    format!("{} ≈ {}", exact, decimal)
                }
            }
            None => {
                let reason = self.y_steps.last().cloned().unwrap_or_default();
                format!("none ({})", reason)
            }
        }
    }

    pub fn describe_x(&self) -> String {
        let var = &self.variable;
        let listed = |roots: &[RealValue]| -> String {
            roots
                .iter()
                .map(|r| {
                    if r.is_exact() && r.as_rational().is_none() {
                        format!("{} = {} ≈ {}", var, r, format_decimal(r.approx))
                    } else {
                        format!("{} = {}", var, r)
                    }
                })
                .join(", ")
        };
        match &self.x {
            XIntercepts::Roots(roots) if roots.is_empty() => "none".to_string(),
            XIntercepts::Roots(roots) => listed(roots),
            XIntercepts::Numeric { roots, window } if roots.is_empty() => format!(
                "none found numerically in [{}, {}]",
                format_decimal(window.0),
                format_decimal(window.1)
            ),
            XIntercepts::Numeric { roots, window } => format!(
                "{} (numeric search in [{}, {}])",
                listed(roots),
                format_decimal(window.0),
                format_decimal(window.1)
            ),
            XIntercepts::IdenticallyZero => {
                format!("f({}) = 0 on the whole domain", var)
            }
            XIntercepts::SolverFailure(reason) => format!("could not be determined: {}", reason),
        }
    }
}

fn in_domain(
    expr: &Expr,
    var: &str,
    candidates: Vec<RealValue>,
    steps: &mut Vec<String>,
    budget: &mut Budget,
) -> Result<Vec<RealValue>, AnalysisError> {
    let mut kept = Vec::with_capacity(candidates.len());
    for c in candidates {
        if value_at(expr, var, &c, budget)?.is_some() {
            kept.push(c);
        } else {
            steps.push(format!("{} = {} is not in the domain, discarded", var, c));
        }
    }
    sort_and_dedup(&mut kept);
    Ok(kept)
}

fn x_intercepts(
    expression: &Expression,
    roots_config: &RootFindingConfig,
    steps: &mut Vec<String>,
    budget: &mut Budget,
) -> Result<XIntercepts, AnalysisError> {
    let var = expression.variable.as_str();
    let expr = &expression.expr;
    steps.push(format!("solve {} = 0 over the reals", expr));
    match real_zeros(expr, var, budget)? {
        ZeroSet::Everywhere => {
            steps.push(format!("{} vanishes identically", expr));
            Ok(XIntercepts::IdenticallyZero)
        }
        ZeroSet::Finite(candidates) => {
            let roots = in_domain(expr, var, candidates, steps, budget)?;
            steps.push(format!("{} real roots in the domain", roots.len()));
            Ok(XIntercepts::Roots(roots))
        }
        ZeroSet::Unsolved(reason) => {
            steps.push(format!("{}, searching numerically", reason));
            let found = numeric_zeros(expr, var, roots_config, budget)?;
            let roots = in_domain(expr, var, found, steps, budget)?;
            steps.push(format!(
                "{} sign changes of f in [{}, {}]",
                roots.len(),
                format_decimal(roots_config.window.0),
                format_decimal(roots_config.window.1)
            ));
            Ok(XIntercepts::Numeric {
                roots,
                window: roots_config.window,
            })
        }
    }
}

/// Both intercepts of f. Never fails: problems are reported inside the result.
pub fn intersections(
    expression: &Expression,
    roots_config: &RootFindingConfig,
    budget: &mut Budget,
) -> InterceptSet {
    let zero = BigRational::zero();
    let (y, y_steps) = match evaluate(expression, &zero, budget) {
        EvaluationResult::Ok {
            exact,
            decimal,
            steps,
            ..
        } => (Some(YIntercept { exact, decimal }), steps),
        EvaluationResult::Failed { reason, mut steps } => {
            steps.push(format!("no y-intercept: {}", reason));
            (None, steps)
        }
    };
    let mut x_steps = Vec::new();
    let x = match x_intercepts(expression, roots_config, &mut x_steps, budget) {
        Ok(x) => x,
        Err(err) => {
            warn!("x-intercepts of {}: {}", expression.expr, err);
            x_steps.push(format!("solver failure: {}", err));
            XIntercepts::SolverFailure(err.to_string())
        }
    };
    let set = InterceptSet {
        variable: expression.variable.clone(),
        y,
        y_steps,
        x,
        x_steps,
    };
    info!(
        "intercepts of {}: y {}, x {}",
        expression.expr,
        set.describe_y(),
        set.describe_x()
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse;
    use approx::assert_relative_eq;

    fn intercepts(text: &str) -> InterceptSet {
        intersections(
            &parse(text).unwrap(),
            &RootFindingConfig::default(),
            &mut Budget::unlimited(),
        )
    }

    fn exact_roots(set: &InterceptSet) -> Vec<String> {
        match &set.x {
            XIntercepts::Roots(roots) => roots.iter().map(|r| r.to_string()).collect(),
            other => panic!("expected exact roots, got {:?}", other),
        }
    }

    #[test]
    fn test_parabola() {
        let set = intercepts("x**2");
        let y = set.y.as_ref().unwrap();
        assert_eq!(y.exact.to_string(), "0");
        assert_eq!(y.decimal, 0.0);
        assert_eq!(exact_roots(&set), vec!["0"]);
        assert_eq!(set.describe_y(), "(0, 0)");
        assert_eq!(set.describe_x(), "x = 0");
    }

    #[test]
    fn test_rational_function() {
        let set = intercepts("(x-1)/(x+2)");
        assert_eq!(set.describe_y(), "(0, -1/2) ≈ (0, -0.5)");
        assert_eq!(exact_roots(&set), vec!["1"]);
        let set = intercepts("(x^2 - 1)/(x - 1)");
        assert_eq!(exact_roots(&set), vec!["-1"]);
        let set = intercepts("1/x");
        assert!(set.y.is_none());
        assert!(set.describe_y().starts_with("none"));
        assert!(exact_roots(&set).is_empty());
    }

    #[test]
    fn test_roots_filtered_by_domain() {
        let set = intercepts("x*log(x)");
        assert_eq!(exact_roots(&set), vec!["1"]);
        assert!(set.x_steps.iter().any(|s| s.contains("x = 0 is not in the domain")));
        let set = intercepts("sqrt(x+1)");
        assert_eq!(set.y.as_ref().unwrap().exact.to_string(), "1");
        assert_eq!(exact_roots(&set), vec!["-1"]);
        let set = intercepts("x^2 - 2");
        assert_eq!(set.describe_x(), "x = -sqrt(2) ≈ -1.4142135624, x = sqrt(2) ≈ 1.4142135624");
    }

    #[test]
    fn test_numeric_fallback() {
        let set = intercepts("sin(x) - x/2");
        match &set.x {
            XIntercepts::Numeric { roots, window } => {
                assert_eq!(*window, (-10.0, 10.0));
                assert_eq!(roots.len(), 3);
                assert_eq!(roots[1].to_string(), "0");
                assert_relative_eq!(roots[2].approx, 1.895494267033981, epsilon = 1e-9);
            }
            other => panic!("expected numeric roots, got {:?}", other),
        }
        assert_eq!(intercepts("sin(x)").x.decimals().len(), 7);
    }

    #[test]
    fn test_identically_zero_and_failure() {
        assert!(matches!(intercepts("x - x").x, XIntercepts::IdenticallyZero));
        let set = intersections(
            &parse("sin(x) - x/2").unwrap(),
            &RootFindingConfig::default(),
            &mut Budget::new(200, None),
        );
        assert!(matches!(set.x, XIntercepts::SolverFailure(_)));
        assert!(set.y.is_some());
    }
}
