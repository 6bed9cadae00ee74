/// root finding for scalar functions: bisection and the sign change scan of a window
pub mod root_finding;
