// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Step and wall-clock budget charged by every potentially expensive operation.
//!
//! Symbolic folding, polynomial arithmetic, root isolation and numeric scans call
//! `Budget::charge`; when either the step limit or the deadline is exceeded the operation
//! fails closed with `AnalysisError::Timeout` instead of hanging.
//! ```
//! use RustedFunAn::analysis::budget::{Budget, Operation};
//! let mut budget = Budget::new(10, None);
//! assert!(budget.charge(Operation::Simplify, 5).is_ok());
//! assert!(budget.charge(Operation::Simplify, 6).is_err());
//! ```
use crate::analysis::error::AnalysisError;
use std::time::{Duration, Instant};
use strum_macros::Display;

/// what the budget is being spent on (reported in the timeout error)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Operation {
    #[strum(to_string = "simplification")]
    Simplify,
    #[strum(to_string = "polynomial arithmetic")]
    PolyOps,
    #[strum(to_string = "root isolation")]
    RootIsolation,
    #[strum(to_string = "numeric scan")]
    NumericScan,
    #[strum(to_string = "range analysis")]
    Range,
}

// the clock is read once per this many charged units
const CLOCK_CHECK_PERIOD: u64 = 256;

#[derive(Debug, Clone)]
pub struct Budget {
    max_steps: u64,
    used: u64,
    timeout: Option<Duration>,
    started: Instant,
    next_clock_check: u64,
}

impl Budget {
    /// `max_steps == 0` means no step limit
    pub fn new(max_steps: u64, timeout: Option<Duration>) -> Self {
        Self {
            max_steps,
            used: 0,
            timeout,
            started: Instant::now(),
            next_clock_check: CLOCK_CHECK_PERIOD,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0, None)
    }

    /// a fresh budget with the same limits, the clock restarts
    pub fn renewed(&self) -> Self {
        Self::new(self.max_steps, self.timeout)
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn charge(&mut self, op: Operation, units: u64) -> Result<(), AnalysisError> {
        self.used = self.used.saturating_add(units);
        if self.max_steps > 0 && self.used > self.max_steps {
            log::warn!(
                "step budget of {} exhausted during {}",
                self.max_steps,
                op
            );
            return Err(AnalysisError::Timeout(op));
        }
        if let Some(timeout) = self.timeout {
            if self.used >= self.next_clock_check {
                self.next_clock_check = self.used + CLOCK_CHECK_PERIOD;
                if self.started.elapsed() > timeout {
                    log::warn!("time budget of {:?} exhausted during {}", timeout, op);
                    return Err(AnalysisError::Timeout(op));
                }
            }
        }
        Ok(())
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(200_000, Some(Duration::from_millis(2000)))
    }
}
