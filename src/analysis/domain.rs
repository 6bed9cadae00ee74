// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # Domain analysis
//!
//! The domain of f is found in three layers:
//! 1. the expression is written as a single fraction N/D without cancelling anything; the
//!    real zeros of D are the critical points and are excluded. When D = 0 has no closed
//!    form solution its zeros are searched numerically in the root finding window and the
//!    ones found are excluded as numeric critical points; the condition `D ≠ 0` is still
//!    listed as unresolved for the rest of the line
//! 2. every sub-term that restricts its operand adds a condition: `sqrt` and powers with an
//!    even root need a non-negative base, `log` a positive argument, `asin`/`acos` an
//!    argument in [-1, 1], ... When the operand is a rational function the condition is
//!    solved exactly and intersected into the domain, otherwise it is kept as an unresolved
//!    restriction
//! 3. `Piecewise` contributes, for every branch, the part of the line where that branch is
//!    the one in use intersected with the domain of the branch
//!
//! Membership of a single exact point is decided separately by `is_in_domain`, which folds
//! the substituted expression and therefore also catches what layers 2 and 3 could only
//! list as unresolved.
use crate::analysis::budget::Budget;
use crate::analysis::error::AnalysisError;
use crate::analysis::intervals::IntervalSet;
use crate::analysis::solve::{
    ZeroSet, condition_set, numeric_zeros, real_zeros, solve_inequality, value_at,
};
use crate::numerical::root_finding::RootFindingConfig;
use crate::symbolic::exact_value::ExactValue;
use crate::symbolic::parse_expr::Expression;
use crate::symbolic::polynomial::{RealValue, sort_and_dedup};
use crate::symbolic::symbolic_engine::{Condition, Expr, Function, Relation};
use crate::symbolic::symbolic_simplify::FoldError;
use log::{debug, info};
use num::integer::Integer;
use std::fmt;

#[derive(Debug, Clone)]
pub enum DomainDescriptor {
    AllReals,
    /// all reals except the listed critical values
    AllRealsExcept(Vec<RealValue>),
    Intervals(IntervalSet),
}

impl DomainDescriptor {
    pub fn describe(&self, var: &str) -> String {
        match self {
            DomainDescriptor::AllReals => "all real numbers".to_string(),
            DomainDescriptor::AllRealsExcept(points) => {
                let points: Vec<String> =
                    points.iter().map(|p| format!("{} = {}", var, p)).collect();
                format!("all reals except {}", points.join(", "))
            }
            DomainDescriptor::Intervals(set) if set.is_empty() => {
                "empty: the function is not defined for any real number".to_string()
            }
            DomainDescriptor::Intervals(set) => format!("{} ∈ {}", var, set),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DomainReport {
    pub variable: String,
    pub descriptor: DomainDescriptor,
    /// the domain as a set, restrictions that could not be solved are not applied
    pub set: IntervalSet,
    /// real zeros of the denominators, ascending
    pub critical_points: Vec<RealValue>,
    /// conditions without a closed form solution, like `cos(x) ≠ 0`
    pub unresolved: Vec<String>,
    pub steps: Vec<String>,
}

impl DomainReport {
    pub fn describe(&self) -> String {
        self.descriptor.describe(&self.variable)
    }

    fn nowhere(variable: &str, steps: Vec<String>) -> Self {
        Self {
            variable: variable.to_string(),
            descriptor: DomainDescriptor::Intervals(IntervalSet::empty()),
            set: IntervalSet::empty(),
            critical_points: Vec::new(),
            unresolved: Vec::new(),
            steps,
        }
    }
}

impl fmt::Display for DomainReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.describe())?;
        if !self.unresolved.is_empty() {
            write!(f, "; additionally requires {}", self.unresolved.join(", "))?;
        }
        Ok(())
    }
}

/// what one sub-expression contributes to the domain
struct DomainParts {
    allowed: IntervalSet,
    critical: Vec<RealValue>,
    unresolved: Vec<String>,
}

impl DomainParts {
    fn everywhere() -> Self {
        Self {
            allowed: IntervalSet::all_reals(),
            critical: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    fn merge(&mut self, other: DomainParts) {
        self.allowed = self.allowed.intersect(&other.allowed);
        self.critical.extend(other.critical);
        sort_and_dedup(&mut self.critical);
        for u in other.unresolved {
            if !self.unresolved.contains(&u) {
                self.unresolved.push(u);
            }
        }
    }
}

struct DomainSolver<'a> {
    var: &'a str,
    roots: &'a RootFindingConfig,
    budget: &'a mut Budget,
    steps: Vec<String>,
}

impl DomainSolver<'_> {
    fn parts(&mut self, expr: &Expr) -> Result<DomainParts, AnalysisError> {
        let mut parts = DomainParts::everywhere();
        let (_, denom) = expr.as_fraction();
        if denom.contains_variable(self.var) {
            match real_zeros(&denom, self.var, self.budget)? {
                ZeroSet::Finite(points) => {
                    if !points.is_empty() {
                        let listed: Vec<String> = points.iter().map(|p| p.to_string()).collect();
                        self.steps.push(format!(
                            "denominator {} = 0 at {} = {}",
                            denom,
                            self.var,
                            listed.join(", ")
                        ));
                    }
                    parts.critical.extend(points);
                }
                ZeroSet::Everywhere => {
                    self.steps
                        .push(format!("denominator {} is identically zero", denom));
                    parts.allowed = IntervalSet::empty();
                }
                ZeroSet::Unsolved(reason) => {
                    debug!("{}", reason);
                    match numeric_zeros(&denom, self.var, self.roots, self.budget) {
                        Ok(points) => {
                            if !points.is_empty() {
                                let listed: Vec<String> =
                                    points.iter().map(|p| p.to_string()).collect();
                                self.steps.push(format!(
                                    "denominator {} = 0 found numerically at {} = {}",
                                    denom,
                                    self.var,
                                    listed.join(", ")
                                ));
                            }
                            parts.critical.extend(points);
                        }
                        Err(AnalysisError::SolverFailure(why)) => debug!("{}", why),
                        Err(err) => return Err(err),
                    }
                    parts.unresolved.push(format!("{} ≠ 0", denom));
                }
            }
        }
        self.restrictions(expr, &mut parts)?;
        Ok(parts)
    }

    /// walks through the arithmetic nodes down to the nodes that restrict their operand
    fn restrictions(&mut self, expr: &Expr, parts: &mut DomainParts) -> Result<(), AnalysisError> {
        if !expr.contains_variable(self.var) {
            return Ok(());
        }
        match expr {
            Expr::Var(_) | Expr::Const(_) | Expr::Constant(_) => {}
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                self.restrictions(l, parts)?;
                self.restrictions(r, parts)?;
            }
            Expr::Neg(inner) => self.restrictions(inner, parts)?,
            Expr::Pow(base, exp) => match &**exp {
                Expr::Const(q) if q.is_integer() => self.restrictions(base, parts)?,
                Expr::Const(q) => {
                    let inner = self.parts(base)?;
                    parts.merge(inner);
                    if q.denom().is_even() {
                        self.require(base, Relation::Ge, "even root", parts)?;
                    }
                }
                _ => {
                    let inner = self.parts(base)?;
                    parts.merge(inner);
                    let inner = self.parts(exp)?;
                    parts.merge(inner);
                    if base.contains_variable(self.var) {
                        self.require(base, Relation::Gt, "variable exponent", parts)?;
                    } else if base.approx() <= 0.0 {
                        parts
                            .unresolved
                            .push(format!("{} is real", Expr::Pow(base.clone(), exp.clone())));
                    }
                }
            },
            Expr::Func(func, arg) => {
                let inner = self.parts(arg)?;
                parts.merge(inner);
                let one = || Expr::one().boxed();
                match func {
                    Function::Sqrt => self.require(arg, Relation::Ge, "sqrt", parts)?,
                    Function::Log => self.require(arg, Relation::Gt, "log", parts)?,
                    Function::Asin | Function::Acos => {
                        let upper = Expr::Sub(one(), arg.clone());
                        let lower = Expr::Add(arg.clone(), one());
                        self.require(&upper, Relation::Ge, &func.to_string(), parts)?;
                        self.require(&lower, Relation::Ge, &func.to_string(), parts)?;
                    }
                    Function::Acosh => {
                        let shifted = Expr::Sub(arg.clone(), one());
                        self.require(&shifted, Relation::Ge, "acosh", parts)?;
                    }
                    Function::Atanh => {
                        let upper = Expr::Sub(one(), arg.clone());
                        let lower = Expr::Add(arg.clone(), one());
                        self.require(&upper, Relation::Gt, "atanh", parts)?;
                        self.require(&lower, Relation::Gt, "atanh", parts)?;
                    }
                    Function::Tan | Function::Sec => parts
                        .unresolved
                        .push(format!("{} ≠ 0", Expr::func(Function::Cos, (**arg).clone()))),
                    Function::Cot | Function::Csc => parts
                        .unresolved
                        .push(format!("{} ≠ 0", Expr::func(Function::Sin, (**arg).clone()))),
                    _ => {}
                }
            }
            Expr::Piecewise(branches) => {
                let inner = self.piecewise(branches)?;
                parts.merge(inner);
            }
        }
        Ok(())
    }

    /// intersects the set where `g rel 0` into the allowed set
    fn require(
        &mut self,
        g: &Expr,
        rel: Relation,
        origin: &str,
        parts: &mut DomainParts,
    ) -> Result<(), AnalysisError> {
        match solve_inequality(g, rel, self.var, self.budget)? {
            Some(set) => {
                self.steps.push(format!(
                    "{} requires {} {} 0: {} ∈ {}",
                    origin, g, rel, self.var, set
                ));
                parts.allowed = parts.allowed.intersect(&set);
            }
            None => parts.unresolved.push(format!("{} {} 0", g, rel)),
        }
        Ok(())
    }

    fn piecewise(&mut self, branches: &[(Expr, Condition)]) -> Result<DomainParts, AnalysisError> {
        let mut covered = IntervalSet::empty();
        let mut out = DomainParts {
            allowed: IntervalSet::empty(),
            critical: Vec::new(),
            unresolved: Vec::new(),
        };
        for (branch, cond) in branches {
            let cond_set = match condition_set(cond, self.var, self.budget)? {
                Some(set) => set,
                None => {
                    out.unresolved
                        .push(format!("the condition {} could not be solved", cond));
                    IntervalSet::all_reals()
                }
            };
            let active = cond_set.intersect(&covered.complement());
            covered = covered.union(&cond_set);
            if active.is_empty() {
                continue;
            }
            let inner = self.parts(branch)?;
            out.allowed = out.allowed.union(&active.intersect(&inner.allowed));
            out.critical
                .extend(inner.critical.into_iter().filter(|c| active.contains_value(c)));
            out.unresolved.extend(
                inner
                    .unresolved
                    .into_iter()
                    .map(|u| format!("{} where {}", u, cond)),
            );
        }
        if !covered.is_all_reals() {
            self.steps.push(format!(
                "no Piecewise branch applies for {} ∈ {}",
                self.var,
                covered.complement()
            ));
        }
        sort_and_dedup(&mut out.critical);
        Ok(out)
    }
}

/// Domain of the function with its critical points, unresolved restrictions and the steps
/// that led to it. Denominators without closed form zeros are scanned in the default window.
pub fn domain(expression: &Expression, budget: &mut Budget) -> Result<DomainReport, AnalysisError> {
    domain_with(expression, &RootFindingConfig::default(), budget)
}

/// `domain` with the window and grid of the numeric scan given
pub fn domain_with(
    expression: &Expression,
    roots: &RootFindingConfig,
    budget: &mut Budget,
) -> Result<DomainReport, AnalysisError> {
    let var = expression.variable.as_str();
    let expr = &expression.expr;
    let mut steps = vec![format!("f({}) = {}", var, expr)];
    match expr.fold(budget) {
        Ok(_) => {}
        Err(FoldError::Exhausted(err)) => return Err(err),
        Err(err) => {
            steps.push(format!("{}, so f is not defined anywhere", err));
            return Ok(DomainReport::nowhere(var, steps));
        }
    }
    let together = expr.together();
    if &together != expr {
        steps.push(format!("as a single fraction: {}", together));
    }
    let mut solver = DomainSolver {
        var,
        roots,
        budget,
        steps,
    };
    let parts = solver.parts(expr)?;
    let mut steps = solver.steps;
    if parts.allowed.is_empty() {
        steps.push("the restrictions have no common solution".to_string());
    }
    let set = parts.allowed.remove_points(&parts.critical);
    let descriptor = if parts.allowed.is_all_reals() {
        if parts.critical.is_empty() {
            DomainDescriptor::AllReals
        } else {
            DomainDescriptor::AllRealsExcept(parts.critical.clone())
        }
    } else {
        DomainDescriptor::Intervals(set.clone())
    };
    steps.push(format!("domain: {}", descriptor.describe(var)));
    for u in &parts.unresolved {
        steps.push(format!("not solved in closed form: {}", u));
    }
    info!("domain of {}: {}", expr, descriptor.describe(var));
    Ok(DomainReport {
        variable: var.to_string(),
        descriptor,
        set,
        critical_points: parts.critical,
        unresolved: parts.unresolved,
        steps,
    })
}

/// Is f defined and real at the exact value. A budget that runs out is an error, never a
/// silent "yes".
pub fn is_in_domain(
    expression: &Expression,
    value: &ExactValue,
    budget: &mut Budget,
) -> Result<bool, AnalysisError> {
    let point = RealValue::rational(value.clone());
    Ok(value_at(&expression.expr, &expression.variable, &point, budget)?.is_some())
}

/// real zeros of the denominators of f, ascending
pub fn critical_points(
    expression: &Expression,
    budget: &mut Budget,
) -> Result<Vec<RealValue>, AnalysisError> {
    Ok(domain(expression, budget)?.critical_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::budget::Operation;
    use crate::symbolic::exact_value::parse_value;
    use crate::symbolic::parse_expr::parse;

    fn report(text: &str) -> DomainReport {
        domain(&parse(text).unwrap(), &mut Budget::unlimited()).unwrap()
    }

    fn member(text: &str, value: &str) -> bool {
        is_in_domain(
            &parse(text).unwrap(),
            &parse_value(value).unwrap(),
            &mut Budget::unlimited(),
        )
        .unwrap()
    }

    #[test]
    fn test_rational_function() {
        let r = report("(x-1)/(x+2)");
        assert_eq!(r.describe(), "all reals except x = -2");
        assert!(matches!(r.descriptor, DomainDescriptor::AllRealsExcept(_)));
        assert_eq!(r.critical_points.len(), 1);
        assert_eq!(r.set.to_string(), "(-∞, -2) ∪ (-2, ∞)");
        assert!(!member("(x-1)/(x+2)", "-2"));
        assert!(member("(x-1)/(x+2)", "2"));
    }

    #[test]
    fn test_removable_and_multiple_points() {
        assert_eq!(report("(x^2 - 1)/(x - 1)").describe(), "all reals except x = 1");
        let r = report("1/((x-1)*(x+2))");
        assert_eq!(r.describe(), "all reals except x = -2, x = 1");
        assert_eq!(report("x/(x^2 + 1)").describe(), "all real numbers");
        assert_eq!(report("x**2").describe(), "all real numbers");
        assert!(!member("(x^2 - 1)/(x - 1)", "1"));
        assert!(!member("1/(x-3)", "3/1"));
    }

    #[test]
    fn test_root_and_log_restrictions() {
        assert_eq!(report("sqrt(x+1)").describe(), "x ∈ [-1, ∞)");
        assert_eq!(report("log(x)").describe(), "x ∈ (0, ∞)");
        assert_eq!(report("1/log(x)").describe(), "x ∈ (0, 1) ∪ (1, ∞)");
        assert_eq!(report("x^(-1/2)").describe(), "x ∈ (0, ∞)");
        assert_eq!(report("x^(1/3)").describe(), "all real numbers");
        assert_eq!(report("asin(x)").describe(), "x ∈ [-1, 1]");
        assert_eq!(report("sqrt(1 - x^2)").describe(), "x ∈ [-1, 1]");
        assert_eq!(report("atanh(x)").describe(), "x ∈ (-1, 1)");
        assert!(!member("sqrt(x+1)", "-2"));
        assert!(member("sqrt(x+1)", "-1"));
    }

    #[test]
    fn test_denominator_zeros_found_numerically() {
        let r = report("1/(exp(x) - 1)");
        assert_eq!(r.describe(), "all reals except x = 0");
        assert_eq!(r.critical_points.len(), 1);
        assert!(r.critical_points[0].as_rational().is_some());
        assert!(!r.set.contains(0.0));
        assert!(!member("1/(exp(x) - 1)", "0"));
        // no closed form: the point is kept as a decimal
        let r = report("1/(exp(x) - 2)");
        assert_eq!(r.critical_points.len(), 1);
        assert!(!r.critical_points[0].is_exact());
        assert!((r.critical_points[0].approx - 2f64.ln()).abs() < 1e-9);
        assert!(r.describe().contains("≈0.69314"));
        // a denominator vanishing on a whole interval is only listed
        let r = report("1/floor(x)");
        assert!(r.critical_points.is_empty());
        assert_eq!(r.unresolved, vec!["floor(x) ≠ 0".to_string()]);
    }

    #[test]
    fn test_unresolved_restrictions() {
        let r = report("1/sin(x)");
        // the zeros in the scan window, -3pi to 3pi
        assert!(matches!(r.descriptor, DomainDescriptor::AllRealsExcept(_)));
        assert_eq!(r.critical_points.len(), 7);
        assert_eq!(r.critical_points[3].to_string(), "0");
        assert_eq!(r.unresolved, vec!["sin(x) ≠ 0".to_string()]);
        let r = report("tan(x)");
        assert_eq!(r.unresolved, vec!["cos(x) ≠ 0".to_string()]);
        assert!(r.to_string().contains("additionally requires cos(x) ≠ 0"));
        assert!(!member("1/sin(x)", "0"));
    }

    #[test]
    fn test_piecewise_and_constant_failures() {
        assert_eq!(
            report("Piecewise((sqrt(x), x >= 0), (1/x, True))").describe(),
            "all real numbers"
        );
        assert_eq!(report("Piecewise((x, x < 0))").describe(), "x ∈ (-∞, 0)");
        assert!(!member("Piecewise((x, x < 0))", "1"));
        let r = report("x + 1/0");
        assert!(r.set.is_empty());
        assert!(r.describe().starts_with("empty"));
    }

    #[test]
    fn test_critical_points_and_budget() {
        let e = parse("1/(x^2 - 2)").unwrap();
        let points = critical_points(&e, &mut Budget::unlimited()).unwrap();
        let shown: Vec<String> = points.iter().map(|p| p.to_string()).collect();
        assert_eq!(shown, vec!["-sqrt(2)", "sqrt(2)"]);
        let mut tight = Budget::new(3, None);
        assert!(matches!(
            domain(&e, &mut tight),
            Err(AnalysisError::Timeout(Operation::Simplify | Operation::PolyOps))
        ));
    }
}
