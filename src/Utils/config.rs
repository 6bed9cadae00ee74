// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Settings of an analysis request. Every field has a default; a configuration document in
//! the task format overrides only the keys it names:
//! ```text
//! parser
//!   policy: strict
//!   max_length: 200
//! budget
//!   max_steps: 50000
//!   timeout_ms: 500
//! roots
//!   window: -20, 20
//! plot
//!   samples: 400
//! logging
//!   level: warn
//!   to_file: false
//! ```
//! Unknown sections and keys are rejected.
use crate::Utils::plot_data::PlotSettings;
use crate::Utils::task_parser::{SectionMap, Value, parse_document_as};
use crate::analysis::budget::Budget;
use crate::analysis::error::AnalysisError;
use crate::numerical::root_finding::RootFindingConfig;
use crate::symbolic::parse_expr::{ParserSettings, ValidationPolicy};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct BudgetSettings {
    /// 0 disables the step limit
    pub max_steps: u64,
    /// None disables the deadline
    pub timeout_ms: Option<u64>,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            max_steps: 200_000,
            timeout_ms: Some(2000),
        }
    }
}

impl BudgetSettings {
    /// a fresh budget, the clock starts now
    pub fn budget(&self) -> Budget {
        Budget::new(self.max_steps, self.timeout_ms.map(Duration::from_millis))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub to_file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisConfig {
    pub parser: ParserSettings,
    pub budget: BudgetSettings,
    pub roots: RootFindingConfig,
    pub plot: PlotSettings,
    pub logging: LoggingSettings,
}

/// typed access to the keys of one section
struct SectionReader<'a> {
    title: &'a str,
    section: &'a SectionMap,
}

impl<'a> SectionReader<'a> {
    fn check_keys(&self, known: &[&str]) -> Result<(), AnalysisError> {
        match self.section.keys().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(AnalysisError::Config(format!(
                "unknown key '{}' in section '{}'",
                key, self.title
            ))),
            None => Ok(()),
        }
    }

    fn values(&self, key: &str) -> Option<&'a [Value]> {
        self.section
            .get(key)
            .and_then(|v| v.as_ref())
            .map(|v| v.as_slice())
    }

    fn invalid(&self, key: &str, expected: &str) -> AnalysisError {
        AnalysisError::Config(format!("{}.{} must be {}", self.title, key, expected))
    }

    fn single(&self, key: &str, expected: &str) -> Result<Option<&'a Value>, AnalysisError> {
        match self.values(key) {
            None => Ok(None),
            Some([value]) => Ok(Some(value)),
            Some(_) => Err(self.invalid(key, expected)),
        }
    }

    fn float(&self, key: &str) -> Result<Option<f64>, AnalysisError> {
        self.single(key, "a number")?
            .map(|v| v.as_float().ok_or_else(|| self.invalid(key, "a number")))
            .transpose()
    }

    fn positive_float(&self, key: &str) -> Result<Option<f64>, AnalysisError> {
        match self.float(key)? {
            Some(v) if !(v > 0.0 && v.is_finite()) => Err(self.invalid(key, "a positive number")),
            other => Ok(other),
        }
    }

    fn unsigned(&self, key: &str) -> Result<Option<u64>, AnalysisError> {
        self.single(key, "a non-negative integer")?
            .map(|v| {
                v.as_integer()
                    .and_then(|i| u64::try_from(i).ok())
                    .ok_or_else(|| self.invalid(key, "a non-negative integer"))
            })
            .transpose()
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>, AnalysisError> {
        self.single(key, "true or false")?
            .map(|v| v.as_boolean().ok_or_else(|| self.invalid(key, "true or false")))
            .transpose()
    }

    fn text(&self, key: &str) -> Result<Option<String>, AnalysisError> {
        Ok(self.single(key, "a single word")?.map(|v| v.to_string_value()))
    }

    /// two numbers, lower first
    fn window(&self, key: &str) -> Result<Option<(f64, f64)>, AnalysisError> {
        match self.values(key) {
            None => Ok(None),
            Some([a, b]) => match (a.as_float(), b.as_float()) {
                (Some(a), Some(b)) if a < b && a.is_finite() && b.is_finite() => Ok(Some((a, b))),
                _ => Err(self.invalid(key, "two finite numbers, lower first")),
            },
            Some(_) => Err(self.invalid(key, "two finite numbers, lower first")),
        }
    }
}

impl AnalysisConfig {
    pub fn budget(&self) -> Budget {
        self.budget.budget()
    }

    /// defaults overridden by the document
    pub fn from_str(document: &str) -> Result<Self, AnalysisError> {
        let doc = parse_document_as(document)?;
        let mut config = AnalysisConfig::default();
        for (title, section) in &doc {
            let reader = SectionReader { title, section };
            match title.as_str() {
                "parser" => config.read_parser(&reader)?,
                "budget" => config.read_budget(&reader)?,
                "roots" => config.read_roots(&reader)?,
                "plot" => config.read_plot(&reader)?,
                "logging" => config.read_logging(&reader)?,
                other => {
                    return Err(AnalysisError::Config(format!("unknown section '{}'", other)));
                }
            }
        }
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_str(&text)
    }

    fn read_parser(&mut self, r: &SectionReader) -> Result<(), AnalysisError> {
        r.check_keys(&["max_length", "variable", "require_variable", "policy"])?;
        if let Some(n) = r.unsigned("max_length")? {
            if n == 0 {
                return Err(r.invalid("max_length", "positive"));
            }
            self.parser.max_length = n as usize;
        }
        if let Some(name) = r.text("variable")? {
            let valid = name.chars().next().is_some_and(|c| c.is_alphabetic())
                && name.chars().all(|c| c.is_alphanumeric() || c == '_');
            if !valid {
                return Err(r.invalid("variable", "an identifier"));
            }
            self.parser.variable = name;
        }
        if let Some(b) = r.boolean("require_variable")? {
            self.parser.require_variable = b;
        }
        if let Some(policy) = r.text("policy")? {
            self.parser.policy = ValidationPolicy::from_str(&policy.to_lowercase())
                .map_err(|_| r.invalid("policy", "extended or strict"))?;
        }
        Ok(())
    }

    fn read_budget(&mut self, r: &SectionReader) -> Result<(), AnalysisError> {
        r.check_keys(&["max_steps", "timeout_ms"])?;
        if let Some(n) = r.unsigned("max_steps")? {
            self.budget.max_steps = n;
        }
        if let Some(ms) = r.unsigned("timeout_ms")? {
            self.budget.timeout_ms = if ms == 0 { None } else { Some(ms) };
        }
        Ok(())
    }

    fn read_roots(&mut self, r: &SectionReader) -> Result<(), AnalysisError> {
        r.check_keys(&[
            "tolerance",
            "max_iterations",
            "window",
            "cells",
            "residual_tolerance",
        ])?;
        if let Some(v) = r.positive_float("tolerance")? {
            self.roots.tolerance = v;
        }
        if let Some(n) = r.unsigned("max_iterations")? {
            self.roots.max_iterations = n as usize;
        }
        if let Some(w) = r.window("window")? {
            self.roots.window = w;
        }
        if let Some(n) = r.unsigned("cells")? {
            if n == 0 {
                return Err(r.invalid("cells", "positive"));
            }
            self.roots.cells = n as usize;
        }
        if let Some(v) = r.positive_float("residual_tolerance")? {
            self.roots.residual_tolerance = v;
        }
        Ok(())
    }

    fn read_plot(&mut self, r: &SectionReader) -> Result<(), AnalysisError> {
        r.check_keys(&["enabled", "window", "samples", "cluster_width", "y_clip"])?;
        if let Some(b) = r.boolean("enabled")? {
            self.plot.enabled = b;
        }
        if let Some(w) = r.window("window")? {
            self.plot.window = w;
        }
        if let Some(n) = r.unsigned("samples")? {
            if n < 2 {
                return Err(r.invalid("samples", "at least 2"));
            }
            self.plot.samples = n as usize;
        }
        if let Some(v) = r.positive_float("cluster_width")? {
            self.plot.cluster_width = v;
        }
        if let Some(v) = r.positive_float("y_clip")? {
            self.plot.y_clip = v;
        }
        Ok(())
    }

    fn read_logging(&mut self, r: &SectionReader) -> Result<(), AnalysisError> {
        r.check_keys(&["level", "to_file"])?;
        if let Some(level) = r.text("level")? {
            crate::Utils::logger::level_filter(&level)?;
            self.logging.level = level.to_lowercase();
        }
        if let Some(b) = r.boolean("to_file")? {
            self.logging.to_file = b;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.parser.max_length, 500);
        assert_eq!(config.parser.policy, ValidationPolicy::Extended);
        assert_eq!(config.budget.max_steps, 200_000);
        assert_eq!(config.budget.timeout_ms, Some(2000));
        assert_eq!(config.roots.window, (-10.0, 10.0));
        assert_eq!(config.plot.samples, 800);
        assert_eq!(config.logging.level, "info");
        assert_eq!(AnalysisConfig::from_str("").unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let doc = r#"
        // stricter parsing, a shorter deadline
        parser
          policy: Strict
          variable: t
        budget
          max_steps: 0
          timeout_ms: 0
        roots
          window: -20, 20.5
          tolerance: 1e-10
        plot
          samples: 100
          enabled: false
        "#;
        let config = AnalysisConfig::from_str(doc).unwrap();
        assert_eq!(config.parser.policy, ValidationPolicy::Strict);
        assert_eq!(config.parser.variable, "t");
        assert_eq!(config.budget.max_steps, 0);
        assert_eq!(config.budget.timeout_ms, None);
        assert_eq!(config.roots.window, (-20.0, 20.5));
        assert_eq!(config.roots.tolerance, 1e-10);
        assert_eq!(config.roots.cells, 2000);
        assert_eq!(config.plot.samples, 100);
        assert!(!config.plot.enabled);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_invalid_documents() {
        for doc in [
            "colors\n background: red",
            "budget\n max_step: 10",
            "budget\n max_steps: -1",
            "roots\n window: 10, -10",
            "parser\n policy: loose",
            "plot\n samples: 1",
            "logging\n level: loud",
            "logging\n to_file: yes",
        ] {
            let res = AnalysisConfig::from_str(doc);
            assert!(matches!(res, Err(AnalysisError::Config(_))), "{}", doc);
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "budget").unwrap();
        writeln!(file, "  max_steps: 1000").unwrap();
        writeln!(file, "logging").unwrap();
        writeln!(file, "  level: debug").unwrap();
        let config = AnalysisConfig::from_file(file.path()).unwrap();
        assert_eq!(config.budget.max_steps, 1000);
        assert_eq!(config.logging.level, "debug");
        let missing = file.path().with_extension("missing");
        assert!(AnalysisConfig::from_file(missing).is_err());
    }
}
