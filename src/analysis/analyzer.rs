// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! # One analysis request
//!
//! The text is parsed once; a parse error ends the request. Domain, range, axis
//! intersections and the optional evaluation then run in parallel on the shared expression,
//! each with a budget of its own, and each result is kept whether or not the others
//! succeed. Plot data is sampled last, when the markers are known.
//! ```rust, ignore
//! use RustedFunAn::Utils::config::AnalysisConfig;
//! use RustedFunAn::analysis::analyzer::analyze;
//! let report = analyze("(x-1)/(x+2)", Some("2"), &AnalysisConfig::default()).unwrap();
//! println!("{}", report);
//! ```
use crate::Utils::config::AnalysisConfig;
use crate::Utils::logger::init_logger;
use crate::Utils::plot_data::{MarkerKind, PlotData, plot_data};
use crate::analysis::domain::{DomainReport, domain_with};
use crate::analysis::error::AnalysisError;
use crate::analysis::evaluator::{EvaluationResult, evaluate_text};
use crate::analysis::intersections::{InterceptSet, intersections};
use crate::analysis::range::{RangeReport, range_with};
use crate::symbolic::parse_expr::{Expression, parse_with};
use log::{info, warn};
use std::fmt;
use std::time::Instant;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub expression: Expression,
    pub domain: Result<DomainReport, AnalysisError>,
    pub range: Result<RangeReport, AnalysisError>,
    /// failures are reported inside the set
    pub intercepts: InterceptSet,
    /// present when a value was given
    pub evaluation: Option<EvaluationResult>,
    /// present when plotting is enabled
    pub plot: Option<PlotData>,
}

impl AnalysisReport {
    pub fn domain_text(&self) -> String {
        match &self.domain {
            Ok(report) => report.to_string(),
            Err(err) => format!("could not be determined: {}", err),
        }
    }

    pub fn range_text(&self) -> String {
        match &self.range {
            Ok(report) => report.descriptor.to_string(),
            Err(err) => format!("could not be determined: {}", err),
        }
    }

    pub fn evaluation_text(&self) -> Option<String> {
        self.evaluation.as_ref().map(|result| match result {
            EvaluationResult::Ok {
                exact, decimal_text, ..
            } => format!("{} ≈ {}", exact, decimal_text),
            EvaluationResult::Failed { reason, .. } => format!("{}", reason),
        })
    }

    /// one row per capability
    pub fn summary_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(vec!["".to_string(), format!("f({}) = {}", self.expression.variable, self.expression)]);
        builder.push_record(vec!["domain".to_string(), self.domain_text()]);
        builder.push_record(vec!["range".to_string(), self.range_text()]);
        builder.push_record(vec!["y-intercept".to_string(), self.intercepts.describe_y()]);
        builder.push_record(vec!["x-intercepts".to_string(), self.intercepts.describe_x()]);
        if let Some(evaluation) = self.evaluation_text() {
            builder.push_record(vec!["evaluation".to_string(), evaluation]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

fn write_steps(f: &mut fmt::Formatter, steps: &[String]) -> fmt::Result {
    for step in steps {
        writeln!(f, "  {}", step)?;
    }
    Ok(())
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "f({}) = {}", self.expression.variable, self.expression)?;
        writeln!(f, "=== Domain ===")?;
        writeln!(f, "{}", self.domain_text())?;
        if let Ok(report) = &self.domain {
            write_steps(f, &report.steps)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Range ===")?;
        writeln!(f, "{}", self.range_text())?;
        if let Ok(report) = &self.range {
            write_steps(f, &report.steps)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Y intersection ===")?;
        writeln!(f, "{}", self.intercepts.describe_y())?;
        write_steps(f, &self.intercepts.y_steps)?;
        writeln!(f)?;
        writeln!(f, "=== X intersections ===")?;
        writeln!(f, "{}", self.intercepts.describe_x())?;
        write_steps(f, &self.intercepts.x_steps)?;
        if let (Some(result), Some(text)) = (&self.evaluation, self.evaluation_text()) {
            writeln!(f)?;
            writeln!(f, "=== Evaluation ===")?;
            writeln!(f, "{}", text)?;
            write_steps(f, result.steps())?;
        }
        Ok(())
    }
}

/// critical points and the finite ends of the domain, where the curve needs more samples
fn refinement_points(domain: &Result<DomainReport, AnalysisError>) -> Vec<f64> {
    let Ok(report) = domain else {
        return Vec::new();
    };
    let mut points: Vec<f64> = report.critical_points.iter().map(|c| c.approx).collect();
    for iv in report.set.intervals() {
        points.extend(iv.lo.value.iter().map(|v| v.approx));
        points.extend(iv.hi.value.iter().map(|v| v.approx));
    }
    points
}

fn sampled_plot(
    expression: &Expression,
    domain: &Result<DomainReport, AnalysisError>,
    intercepts: &InterceptSet,
    evaluation: Option<&EvaluationResult>,
    config: &AnalysisConfig,
) -> PlotData {
    let mut plot = plot_data(expression, &refinement_points(domain), &config.plot);
    for x in intercepts.x.decimals() {
        plot.add_marker(MarkerKind::XIntercept, x, 0.0);
    }
    if let Some(y) = &intercepts.y {
        plot.add_marker(MarkerKind::YIntercept, 0.0, y.decimal);
    }
    if let Some(EvaluationResult::Ok { point, decimal, .. }) = evaluation {
        if point.1.is_finite() && decimal.is_finite() {
            plot.add_marker(MarkerKind::EvaluatedPoint, point.1, *decimal);
        }
    }
    plot
}

/// Analyzes an already validated expression
pub fn analyze_expression(
    expression: Expression,
    value: Option<&str>,
    config: &AnalysisConfig,
) -> AnalysisReport {
    let begin = Instant::now();
    let f = &expression;
    let ((domain, range), (intercepts, evaluation)) = rayon::join(
        || {
            rayon::join(
                || domain_with(f, &config.roots, &mut config.budget()),
                || range_with(f, &config.roots, &mut config.budget()),
            )
        },
        || {
            rayon::join(
                || intersections(f, &config.roots, &mut config.budget()),
                || value.map(|v| evaluate_text(f, v, &mut config.budget())),
            )
        },
    );
    if let Err(err) = &domain {
        warn!("domain of {}: {}", f, err);
    }
    if let Err(err) = &range {
        warn!("range of {}: {}", f, err);
    }
    let plot = if config.plot.enabled {
        Some(sampled_plot(f, &domain, &intercepts, evaluation.as_ref(), config))
    } else {
        None
    };
    let report = AnalysisReport {
        expression,
        domain,
        range,
        intercepts,
        evaluation,
        plot,
    };
    info!("\n \n ANALYSIS SUMMARY \n \n {}", report.summary_table());
    info!("analysis finished in {} ms", begin.elapsed().as_millis());
    report
}

/// Parses the text and analyzes it. Only a parse error of the expression fails the request.
pub fn analyze(
    text: &str,
    value: Option<&str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    let expression = parse_with(text, &config.parser).inspect_err(|err| {
        warn!("'{}' rejected: {}", text.trim(), err);
    })?;
    Ok(analyze_expression(expression, value, config))
}

/// `analyze` with the logger of the configuration installed first
pub fn analyze_logged(
    text: &str,
    value: Option<&str>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    init_logger(&config.logging.level, config.logging.to_file)?;
    let report = analyze(text, value, config);
    info!(" \n \n Program ended");
    report
}
