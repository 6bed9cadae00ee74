// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
//! Analysis of a real function of one variable given as text: domain, range, axis
//! intersections and exact evaluation with a step by step trail.
/// configuration, logging, the task document parser and plot sample data
pub mod Utils;
/// domain, range, intersections, evaluation and the analysis request
pub mod analysis;
/// numeric root search
pub mod numerical;
/// expression parsing, the symbolic engine and exact arithmetic
pub mod symbolic;
