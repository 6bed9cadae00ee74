// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Numerical scalar root finding.
//!
//! Used as the fallback of the intersection finder when f(x) = 0 has no closed form
//! solution (`sin(x) - x/2`): the window is cut into cells, every cell whose ends have
//! opposite signs is refined by bisection, and candidates where the function does not
//! actually vanish (poles, jumps) are dropped.
use crate::analysis::budget::{Budget, Operation};
use crate::analysis::error::AnalysisError;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::Lambdified;
use log::{debug, info};
use std::fmt;

/// Error types for root finding methods
#[derive(Debug, Clone, PartialEq)]
pub enum RootFindingError {
    MaxIterationsReached,
    InvalidInterval,
    FunctionNotContinuous,
}

impl fmt::Display for RootFindingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RootFindingError::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            RootFindingError::InvalidInterval => write!(f, "Invalid interval for bisection method"),
            RootFindingError::FunctionNotContinuous => {
                write!(f, "Function is not continuous in the given interval")
            }
        }
    }
}

impl std::error::Error for RootFindingError {}

/// Trait for representing a nonlinear equation f(x) = 0
pub trait NonlinearFunction {
    /// Evaluate the function at point x
    fn evaluate(&self, x: f64) -> f64;

    /// Get function name for debugging/logging
    fn name(&self) -> &str {
        "unnamed_function"
    }
}

/// Simple function wrapper for closures
pub struct ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    func: F,
    name: String,
}

impl<F> ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    pub fn new(func: F, name: String) -> Self {
        Self { func, name }
    }
}

impl<F> NonlinearFunction for ClosureFunction<F>
where
    F: Fn(f64) -> f64,
{
    fn evaluate(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// lambdified symbolic expression
pub struct SymbolicFunction {
    name: String,
    func: Lambdified,
}

impl SymbolicFunction {
    pub fn from_expr(expr: &Expr) -> Self {
        Self {
            name: expr.to_string(),
            func: expr.lambdify1D(),
        }
    }
}

impl NonlinearFunction for SymbolicFunction {
    fn evaluate(&self, x: f64) -> f64 {
        (self.func)(x)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Result structure for root finding methods
#[derive(Debug, Clone)]
pub struct RootFindingResult {
    pub root: f64,
    pub function_value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Configuration for root finding methods
#[derive(Debug, Clone, PartialEq)]
pub struct RootFindingConfig {
    pub tolerance: f64,
    pub max_iterations: usize,
    /// scan window of the sign-change search
    pub window: (f64, f64),
    /// number of cells the window is cut into
    pub cells: usize,
    /// |f(root)| above this marks a pole or a jump rather than a root
    pub residual_tolerance: f64,
}

impl Default for RootFindingConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 200,
            window: (-10.0, 10.0),
            cells: 2000,
            residual_tolerance: 1e-6,
        }
    }
}

/// Main structure for scalar root finding methods
pub struct ScalarRootFinder {
    config: RootFindingConfig,
}

impl ScalarRootFinder {
    pub fn new() -> Self {
        Self {
            config: RootFindingConfig::default(),
        }
    }

    pub fn with_config(config: RootFindingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RootFindingConfig {
        &self.config
    }

    /// Bisection on [a, b], the ends must bracket a sign change
    pub fn bisection<F>(
        &self,
        function: &F,
        mut a: f64,
        mut b: f64,
    ) -> Result<RootFindingResult, RootFindingError>
    where
        F: NonlinearFunction,
    {
        if a > b {
            std::mem::swap(&mut a, &mut b);
        }
        let mut fa = function.evaluate(a);
        let fb = function.evaluate(b);
        if !fa.is_finite() || !fb.is_finite() {
            return Err(RootFindingError::FunctionNotContinuous);
        }
        if fa == 0.0 {
            return Ok(RootFindingResult {
                root: a,
                function_value: fa,
                iterations: 0,
                converged: true,
            });
        }
        if fb == 0.0 {
            return Ok(RootFindingResult {
                root: b,
                function_value: fb,
                iterations: 0,
                converged: true,
            });
        }
        if fa * fb > 0.0 {
            return Err(RootFindingError::InvalidInterval);
        }
        for iterations in 0..self.config.max_iterations {
            let c = 0.5 * (a + b);
            let fc = function.evaluate(c);
            if !fc.is_finite() {
                return Err(RootFindingError::FunctionNotContinuous);
            }
            if fc == 0.0 || (b - a) / 2.0 < self.config.tolerance * c.abs().max(1.0) {
                return Ok(RootFindingResult {
                    root: c,
                    function_value: fc,
                    iterations: iterations + 1,
                    converged: true,
                });
            }
            if fa * fc < 0.0 {
                b = c;
            } else {
                a = c;
                fa = fc;
            }
        }
        Err(RootFindingError::MaxIterationsReached)
    }

    /// All sign-change roots in the configured window, ascending.
    pub fn scan<F>(&self, function: &F, budget: &mut Budget) -> Result<Vec<f64>, AnalysisError>
    where
        F: NonlinearFunction,
    {
        let (lo, hi) = self.config.window;
        let cells = self.config.cells.max(1);
        let step = (hi - lo) / cells as f64;
        let mut roots: Vec<f64> = Vec::new();
        let push = |root: f64, roots: &mut Vec<f64>| {
            if roots.last().is_none_or(|last| (root - last).abs() > 1e-9 * root.abs().max(1.0)) {
                roots.push(root);
            }
        };
        let mut prev_x = lo;
        let mut prev_y = function.evaluate(lo);
        if prev_y == 0.0 {
            push(lo, &mut roots);
        }
        for i in 1..=cells {
            budget.charge(Operation::NumericScan, 1)?;
            let x = lo + step * i as f64;
            let y = function.evaluate(x);
            if y == 0.0 && prev_y == 0.0 {
                // two neighbouring grid points: f is zero on a whole piece of the line
                return Err(AnalysisError::SolverFailure(format!(
                    "{} vanishes on an interval around [{}, {}]",
                    function.name(),
                    prev_x,
                    x
                )));
            }
            if y == 0.0 {
                push(x, &mut roots);
            } else if prev_y.is_finite() && y.is_finite() && prev_y != 0.0 && prev_y * y < 0.0 {
                budget.charge(Operation::NumericScan, 64)?;
                match self.bisection(function, prev_x, x) {
                    Ok(result) if result.function_value.abs() <= self.config.residual_tolerance => {
                        push(result.root, &mut roots);
                    }
                    Ok(result) => debug!(
                        "sign change of {} near {} is a discontinuity, |f| = {}",
                        function.name(),
                        result.root,
                        result.function_value.abs()
                    ),
                    Err(e) => debug!("bisection on [{}, {}] failed: {}", prev_x, x, e),
                }
            }
            prev_x = x;
            prev_y = y;
        }
        info!(
            "numeric scan of {} over [{}, {}] found {} roots",
            function.name(),
            lo,
            hi,
            roots.len()
        );
        Ok(roots)
    }
}

impl Default for ScalarRootFinder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn bisection<F>(function: F, a: f64, b: f64, tolerance: f64) -> Result<f64, RootFindingError>
where
    F: Fn(f64) -> f64,
{
    let func = ClosureFunction::new(function, "bisection_function".to_string());
    let solver = ScalarRootFinder::with_config(RootFindingConfig {
        tolerance,
        ..RootFindingConfig::default()
    });
    let result = solver.bisection(&func, a, b)?;
    Ok(result.root)
}

/////////////////////////////////////////TESTS////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_bisection_simple_quadratic() {
        let root = bisection(|x| x * x - 4.0, 0.0, 5.0, 1e-12).unwrap();
        assert_relative_eq!(root, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_bisection_invalid_interval() {
        let res = bisection(|x| x * x + 1.0, -1.0, 1.0, 1e-12);
        assert_eq!(res, Err(RootFindingError::InvalidInterval));
    }

    #[test]
    fn test_bisection_root_at_endpoint() {
        let root = bisection(|x| x - 1.0, 1.0, 3.0, 1e-12).unwrap();
        assert_eq!(root, 1.0);
    }

    #[test]
    fn test_scan_trigonometric() {
        let f = ClosureFunction::new(|x: f64| x.sin(), "sin".to_string());
        let finder = ScalarRootFinder::new();
        let roots = finder.scan(&f, &mut Budget::unlimited()).unwrap();
        // -3pi, -2pi, ..., 3pi lie in [-10, 10]
        assert_eq!(roots.len(), 7);
        assert_relative_eq!(roots[0], -3.0 * PI, epsilon = 1e-9);
        assert_relative_eq!(roots[3], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_scan_skips_poles() {
        let f = ClosureFunction::new(|x: f64| 1.0 / (x - 0.3), "pole".to_string());
        let finder = ScalarRootFinder::new();
        assert!(finder.scan(&f, &mut Budget::unlimited()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_rejects_zero_runs() {
        let finder = ScalarRootFinder::new();
        let floor = ClosureFunction::new(|x: f64| x.floor(), "floor(x)".to_string());
        let res = finder.scan(&floor, &mut Budget::unlimited());
        assert!(matches!(res, Err(AnalysisError::SolverFailure(_))));
        let flat = ClosureFunction::new(
            |x: f64| if x < 1.0 { 0.0 } else { x - 1.0 },
            "flat then rising".to_string(),
        );
        assert!(matches!(
            finder.scan(&flat, &mut Budget::unlimited()),
            Err(AnalysisError::SolverFailure(_))
        ));
        // an isolated exact zero on the grid is still a single root
        let line = ClosureFunction::new(|x: f64| x, "x".to_string());
        let roots = finder.scan(&line, &mut Budget::unlimited()).unwrap();
        assert_eq!(roots.len(), 1);
        assert!(roots[0].abs() < 1e-9);
    }

    #[test]
    fn test_scan_symbolic_and_budget() {
        let x = Expr::var("x");
        let e = Expr::func(crate::symbolic::symbolic_engine::Function::Sin, x.clone())
            - x / Expr::int(2);
        let f = SymbolicFunction::from_expr(&e);
        let finder = ScalarRootFinder::new();
        let roots = finder.scan(&f, &mut Budget::unlimited()).unwrap();
        assert_eq!(roots.len(), 3);
        assert_relative_eq!(roots[2], 1.895494267033981, epsilon = 1e-9);
        let mut tight = Budget::new(100, None);
        assert!(matches!(
            finder.scan(&f, &mut tight),
            Err(AnalysisError::Timeout(Operation::NumericScan))
        ));
    }
}
