// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
//! Sample data for a plotting front end. Nothing is drawn here: the graph of f is returned as
//! x samples with optional y values (None is a gap in the curve) together with the points to
//! be marked on it.
//!
//! The x grid is a uniform grid over the window refined around every critical point, so the
//! curve can be drawn close to vertical asymptotes and domain boundaries. Samples where f is
//! undefined, not real, not finite or larger than the clip value in absolute value are gaps.
use crate::symbolic::parse_expr::Expression;
use crate::symbolic::utils::{format_decimal, linspace};
use log::debug;
use rayon::prelude::*;
use std::fmt;

// offsets of the refined samples around a critical point, in units of the cluster width
const CLUSTER_PATTERN: [f64; 5] = [10.0, 3.0, 1.0, 1.0 / 3.0, 0.1];

/// the `plot` section of the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    pub enabled: bool,
    pub window: (f64, f64),
    /// number of points of the uniform grid
    pub samples: usize,
    /// width of the refinement around critical points
    pub cluster_width: f64,
    /// |y| above this is a gap
    pub y_clip: f64,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window: (-10.0, 10.0),
            samples: 800,
            cluster_width: 1e-3,
            y_clip: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    XIntercept,
    YIntercept,
    EvaluatedPoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub x: f64,
    pub y: f64,
    pub label: String,
}

impl Marker {
    pub fn new(kind: MarkerKind, x: f64, y: f64) -> Self {
        let point = format!("({}, {})", format_decimal(x), format_decimal(y));
        let label = match kind {
            MarkerKind::XIntercept => format!("x-intercept {}", point),
            MarkerKind::YIntercept => format!("y-intercept {}", point),
            MarkerKind::EvaluatedPoint => format!("point {}", point),
        };
        Self { kind, x, y, label }
    }
}

#[derive(Debug, Clone)]
pub struct PlotData {
    /// legend of the curve, "f(x) = ..."
    pub label: String,
    pub xs: Vec<f64>,
    pub ys: Vec<Option<f64>>,
    pub markers: Vec<Marker>,
}

impl PlotData {
    /// the drawable pieces of the curve, split at the gaps
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut segments = Vec::new();
        let mut current: Vec<(f64, f64)> = Vec::new();
        for (x, y) in self.xs.iter().zip(&self.ys) {
            match y {
                Some(y) => current.push((*x, *y)),
                None => {
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
            }
        }
        if !current.is_empty() {
            segments.push(current);
        }
        segments
    }

    pub fn gaps(&self) -> usize {
        self.ys.iter().filter(|y| y.is_none()).count()
    }

    pub fn add_marker(&mut self, kind: MarkerKind, x: f64, y: f64) {
        self.markers.push(Marker::new(kind, x, y));
    }
}

impl fmt::Display for PlotData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {} samples, {} segments, {} markers",
            self.label,
            self.xs.len(),
            self.segments().len(),
            self.markers.len()
        )
    }
}

/// uniform grid plus the refinement around the critical points inside the window,
/// sorted and without duplicates
pub fn sample_grid(settings: &PlotSettings, critical: &[f64]) -> Vec<f64> {
    let (x_min, x_max) = settings.window;
    let mut xs = linspace(x_min, x_max, settings.samples);
    for &c in critical.iter().filter(|c| c.is_finite()) {
        for k in CLUSTER_PATTERN {
            let d = k * settings.cluster_width;
            xs.push(c - d);
            xs.push(c + d);
        }
    }
    xs.retain(|x| *x >= x_min && *x <= x_max);
    xs.sort_by(|a, b| a.total_cmp(b));
    xs.dedup();
    xs
}

/// Samples f over the window. The critical points refine the grid, markers are added by
/// the caller.
pub fn plot_data(expression: &Expression, critical: &[f64], settings: &PlotSettings) -> PlotData {
    let xs = sample_grid(settings, critical);
    let f = expression.expr.lambdify1D();
    let clip = settings.y_clip;
    let ys: Vec<Option<f64>> = xs
        .par_iter()
        .map(|&x| {
            let y = f(x);
            if y.is_finite() && y.abs() <= clip {
                Some(y)
            } else {
                None
            }
        })
        .collect();
    let data = PlotData {
        label: format!("f({}) = {}", expression.variable, expression.expr),
        xs,
        ys,
        markers: Vec::new(),
    };
    debug!("{}", data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::parse;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid() {
        let settings = PlotSettings::default();
        let xs = sample_grid(&settings, &[]);
        assert_eq!(xs.len(), 800);
        assert_relative_eq!(xs[0], -10.0);
        assert_relative_eq!(xs[799], 10.0);
        let refined = sample_grid(&settings, &[-2.0, 25.0]);
        assert_eq!(refined.len(), 810);
        assert!(refined.windows(2).all(|w| w[0] < w[1]));
        assert!(refined.iter().any(|x| (x + 2.0 - 1e-4).abs() < 1e-12));
    }

    #[test]
    fn test_gaps_at_pole_and_outside_domain() {
        let settings = PlotSettings::default();
        let f = parse("(x-1)/(x+2)").unwrap();
        let data = plot_data(&f, &[-2.0], &settings);
        assert_eq!(data.label, "f(x) = (x - 1)/(x + 2)");
        assert!(data.segments().len() >= 2);
        assert!(data.gaps() > 0);
        let sqrt = parse("sqrt(x+1)").unwrap();
        let data = plot_data(&sqrt, &[], &settings);
        for (x, y) in data.xs.iter().zip(&data.ys) {
            assert_eq!(y.is_some(), *x >= -1.0, "x = {}", x);
        }
        assert_eq!(data.segments().len(), 1);
    }

    #[test]
    fn test_clip_and_markers() {
        let settings = PlotSettings {
            samples: 21,
            ..PlotSettings::default()
        };
        let mut data = plot_data(&parse("x^2").unwrap(), &[], &settings);
        // 8^2 and above are clipped
        assert_eq!(data.gaps(), 6);
        assert_eq!(data.segments().len(), 1);
        data.add_marker(MarkerKind::EvaluatedPoint, 2.0, 4.0);
        assert_eq!(data.markers[0].label, "point (2, 4)");
    }
}
