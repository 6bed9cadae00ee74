/// a module turns a String expression into a validated symbolic expression of one variable
///
///# Example
/// ```rust, ignore
/// use RustedFunAn::symbolic::parse_expr::parse;
/// let f = parse("(x-1)/(x+2)").unwrap();
/// println!("{}", f);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
/// exact rational values typed by the user: integers, decimals, fractions
pub mod exact_value;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// the expression tree, whitelisted functions, substitution and printing
pub mod symbolic_engine;
/// exact constant folding, fractions and cancellation
pub mod symbolic_simplify;
/// turns a symbolic expression into a Rust function of x
pub mod symbolic_lambdify;
/// univariate polynomials and rational functions with rational coefficients, real roots
pub mod polynomial;
///______________________________________________________________________________________________________________________________________________
/// the collection of utility functions
/// _____________________________________________________________________________________________________________________________________________
pub mod utils;
#[cfg(test)]
mod symbolic_engine_tests;
