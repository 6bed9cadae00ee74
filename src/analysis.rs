//! the analysis capabilities built on the symbolic engine
/// errors of every stage
pub mod error;
/// step and time limits
pub mod budget;
/// unions of real intervals
pub mod intervals;
/// real zeros, sign analysis and inequalities
pub mod solve;
/// domain of f and its critical points
pub mod domain;
/// evaluation at an exact point with the step trail
pub mod evaluator;
/// y-intercept and x-intercepts
pub mod intersections;
/// range of f
pub mod range;
/// one request: all of the above and the text report
pub mod analyzer;
