// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Error taxonomy shared by every stage of the analysis.
//!
//! Parse errors terminate a request. All other variants are reported per capability, so a
//! failure of the range analysis never hides a valid domain or intercept result.
use crate::analysis::budget::Operation;
use thiserror::Error;

/// Coarse grouping of errors for the message shown to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// the text of the expression or of the value is not acceptable
    BadInput,
    /// the function is not defined (or not real) at the requested point
    Undefined,
    /// the engine could not reach an answer
    Undetermined,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("the function cannot be empty")]
    EmptyExpression,
    #[error("syntax error near '{fragment}': {message}")]
    SyntaxError { fragment: String, message: String },
    #[error("symbol or function not permitted: '{0}' (only x and the listed functions are allowed)")]
    DisallowedSymbol(String),
    #[error("the function must contain the variable {0}")]
    MissingVariable(String),
    #[error("expression is too long: {len} characters, at most {max} allowed")]
    ExpressionTooLong { len: usize, max: usize },
    #[error("invalid number: '{0}'")]
    InvalidNumber(String),
    #[error("division by zero in the value")]
    DivisionByZeroInValue,
    #[error("the value is outside the domain: {0}")]
    OutOfDomain(String),
    #[error("the result is not a real number: {0}")]
    ComplexResult(String),
    #[error("the result is not finite: {0}")]
    NonFinite(String),
    #[error("division by zero during evaluation")]
    DivisionByZeroInEvaluation,
    #[error("solver failure: {0}")]
    SolverFailure(String),
    #[error("computation budget exhausted during {0}")]
    Timeout(Operation),
    #[error("configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::EmptyExpression
            | AnalysisError::SyntaxError { .. }
            | AnalysisError::DisallowedSymbol(_)
            | AnalysisError::MissingVariable(_)
            | AnalysisError::ExpressionTooLong { .. }
            | AnalysisError::InvalidNumber(_)
            | AnalysisError::DivisionByZeroInValue
            | AnalysisError::Config(_) => ErrorCategory::BadInput,
            AnalysisError::OutOfDomain(_)
            | AnalysisError::ComplexResult(_)
            | AnalysisError::NonFinite(_)
            | AnalysisError::DivisionByZeroInEvaluation => ErrorCategory::Undefined,
            AnalysisError::SolverFailure(_) | AnalysisError::Timeout(_) => {
                ErrorCategory::Undetermined
            }
        }
    }

    /// true for errors raised while reading the expression text
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::EmptyExpression
                | AnalysisError::SyntaxError { .. }
                | AnalysisError::DisallowedSymbol(_)
                | AnalysisError::MissingVariable(_)
                | AnalysisError::ExpressionTooLong { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            AnalysisError::EmptyExpression.category(),
            ErrorCategory::BadInput
        );
        assert_eq!(
            AnalysisError::OutOfDomain("x = -2".to_string()).category(),
            ErrorCategory::Undefined
        );
        assert_eq!(
            AnalysisError::Timeout(Operation::Simplify).category(),
            ErrorCategory::Undetermined
        );
        assert!(AnalysisError::DisallowedSymbol("y".to_string()).is_parse_error());
        assert!(!AnalysisError::InvalidNumber("abc".to_string()).is_parse_error());
    }

    #[test]
    fn test_messages() {
        let e = AnalysisError::ExpressionTooLong { len: 600, max: 500 };
        assert_eq!(
            e.to_string(),
            "expression is too long: 600 characters, at most 500 allowed"
        );
        assert_eq!(
            AnalysisError::Timeout(Operation::RootIsolation).to_string(),
            "computation budget exhausted during root isolation"
        );
    }
}
