//! Numeric sampling of a function of x and rendering of the sampled curve into a PNG
//! with plotters.
use crate::Utils::config::PlotSettings;
use crate::analysis::analyzer::FunctionAnalyzer;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::Fn1D;
use crate::symbolic::utils::{format_g, linspace};
use itertools::{Itertools, MinMaxResult};
use log::{debug, info};
use plotters::prelude::*;
use rayon::prelude::*;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum PlotError {
    /// the expression cannot be compiled into a numeric function
    NotLambdifiable(String),
    InvalidWindow { xmin: f64, xmax: f64 },
    /// plotters failed to draw or write the image
    Render(String),
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlotError::NotLambdifiable(msg) => write!(f, "the function cannot be plotted: {}", msg),
            PlotError::InvalidWindow { xmin, xmax } => {
                write!(f, "invalid plot window [{}, {}]", xmin, xmax)
            }
            PlotError::Render(msg) => write!(f, "rendering the chart failed: {}", msg),
        }
    }
}

impl std::error::Error for PlotError {}

fn render_error(e: impl fmt::Display) -> PlotError {
    PlotError::Render(e.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotWindow {
    pub xmin: f64,
    pub xmax: f64,
}

impl PlotWindow {
    pub fn new(xmin: f64, xmax: f64) -> Result<Self, PlotError> {
        if xmin.is_finite() && xmax.is_finite() && xmin < xmax {
            Ok(PlotWindow { xmin, xmax })
        } else {
            Err(PlotError::InvalidWindow { xmin, xmax })
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        self.xmin <= x && x <= self.xmax
    }

    /// Grows only the side that misses `x0`, leaving `margin` beyond it.
    pub fn expanded_to(&self, x0: f64, margin: f64) -> PlotWindow {
        if !x0.is_finite() || self.contains(x0) {
            return *self;
        }
        let mut window = *self;
        if x0 < window.xmin {
            window.xmin = x0 - margin;
        } else {
            window.xmax = x0 + margin;
        }
        window
    }
}

/// Sampled curve plus the optional marked point.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotResult {
    /// finite samples in increasing x; discarded samples leave gaps
    pub samples: Vec<(f64, f64)>,
    pub window: PlotWindow,
    /// number of grid points the window was sampled at
    pub grid_size: usize,
    pub x_value: Option<f64>,
    pub y_value: Option<f64>,
}

impl PlotResult {
    pub fn marker(&self) -> Option<(f64, f64)> {
        match (self.x_value, self.y_value) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    fn grid_step(&self) -> f64 {
        (self.window.xmax - self.window.xmin) / (self.grid_size.max(2) - 1) as f64
    }

    /// Contiguous pieces of the curve: a new run starts wherever samples were discarded.
    pub fn runs(&self) -> Vec<Vec<(f64, f64)>> {
        let max_gap = 1.5 * self.grid_step();
        let mut runs: Vec<Vec<(f64, f64)>> = Vec::new();
        let mut current: Vec<(f64, f64)> = Vec::new();
        for &point in &self.samples {
            if let Some(&(last_x, _)) = current.last() {
                if point.0 - last_x > max_gap {
                    runs.push(std::mem::take(&mut current));
                }
            }
            current.push(point);
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    /// y extent of the samples and the marker, padded by 5%
    fn y_bounds(&self) -> (f64, f64) {
        let ys = self
            .samples
            .iter()
            .map(|&(_, y)| y)
            .chain(self.y_value);
        let (lo, hi) = match ys.minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => (-1.0, 1.0),
            MinMaxResult::OneElement(y) => (y, y),
            MinMaxResult::MinMax(lo, hi) => (lo, hi),
        };
        if (hi - lo).abs() < 1e-12 {
            return (lo - 1.0, hi + 1.0);
        }
        let pad = 0.05 * (hi - lo);
        (lo - pad, hi + pad)
    }
}

pub struct FunctionPlotter {
    analyzer: FunctionAnalyzer,
    func: Fn1D,
    settings: PlotSettings,
}

impl FunctionPlotter {
    pub fn new(expr: &Expr) -> Result<Self, PlotError> {
        Self::with_settings(expr, &PlotSettings::default())
    }

    pub fn with_settings(expr: &Expr, settings: &PlotSettings) -> Result<Self, PlotError> {
        let analyzer = FunctionAnalyzer::from_expr(expr);
        let func = analyzer
            .expr()
            .lambdify1D()
            .map_err(PlotError::NotLambdifiable)?;
        Ok(FunctionPlotter {
            analyzer,
            func,
            settings: settings.clone(),
        })
    }

    pub fn default_window(&self) -> Result<PlotWindow, PlotError> {
        PlotWindow::new(self.settings.xmin, self.settings.xmax)
    }

    /// Evaluates on an evenly spaced grid over the window and keeps finite values only.
    pub fn sample(&self, window: &PlotWindow) -> Vec<(f64, f64)> {
        let grid = linspace(window.xmin, window.xmax, self.settings.samples);
        let func = &self.func;
        let samples: Vec<(f64, f64)> = grid
            .par_iter()
            .filter_map(|&x| {
                let y = func(x);
                y.is_finite().then_some((x, y))
            })
            .collect();
        debug!(
            "{} of {} samples of {} kept",
            samples.len(),
            grid.len(),
            self.analyzer.expr()
        );
        samples
    }

    /// Curve over `window` (the configured one when `None`), widened to show `x_value`.
    pub fn make_figure(
        &self,
        x_value: Option<f64>,
        window: Option<PlotWindow>,
    ) -> Result<PlotResult, PlotError> {
        let base = match window {
            Some(w) => w,
            None => self.default_window()?,
        };
        let window = match x_value {
            Some(x0) => base.expanded_to(x0, self.settings.margin),
            None => base,
        };
        let samples = self.sample(&window);
        let y_value = x_value.and_then(|x0| {
            let y0 = self.analyzer.evaluate_at(x0).value();
            if y0.is_none() {
                info!("no marker at x = {}: f is not finite there", x0);
            }
            y0
        });
        Ok(PlotResult {
            samples,
            window,
            grid_size: self.settings.samples,
            x_value,
            y_value,
        })
    }

    /// Draws the figure: grid, labelled axes, zero lines, one line per run, marker.
    pub fn render_png(&self, figure: &PlotResult, path: &Path) -> Result<(), PlotError> {
        let size = (self.settings.width, self.settings.height);
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;
        let (xmin, xmax) = (figure.window.xmin, figure.window.xmax);
        let (ymin, ymax) = figure.y_bounds();
        let mut chart = ChartBuilder::on(&root)
            .caption("f(x)", ("sans-serif", 30))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(xmin..xmax, ymin..ymax)
            .map_err(render_error)?;
        chart
            .configure_mesh()
            .x_desc("x")
            .y_desc("f(x)")
            .draw()
            .map_err(render_error)?;

        let axis_style = BLACK.mix(0.6);
        if ymin <= 0.0 && 0.0 <= ymax {
            chart
                .draw_series(LineSeries::new(vec![(xmin, 0.0), (xmax, 0.0)], &axis_style))
                .map_err(render_error)?;
        }
        if figure.window.contains(0.0) {
            chart
                .draw_series(LineSeries::new(vec![(0.0, ymin), (0.0, ymax)], &axis_style))
                .map_err(render_error)?;
        }
        for run in figure.runs() {
            chart
                .draw_series(LineSeries::new(run, &BLUE))
                .map_err(render_error)?;
        }
        if let Some((x0, y0)) = figure.marker() {
            let label = format!("({}, {})", format_g(x0, 3), format_g(y0, 3));
            chart
                .draw_series(std::iter::once(
                    EmptyElement::at((x0, y0))
                        + Circle::new((0, 0), 5, RED.filled())
                        + Text::new(label, (10, -15), ("sans-serif", 15).into_font()),
                ))
                .map_err(render_error)?;
        }
        root.present().map_err(render_error)?;
        info!("chart of {} written to {}", self.analyzer.expr(), path.display());
        Ok(())
    }

    /// Samples and writes the chart in one call.
    pub fn save_png(
        &self,
        path: &Path,
        x_value: Option<f64>,
        window: Option<PlotWindow>,
    ) -> Result<PlotResult, PlotError> {
        let figure = self.make_figure(x_value, window)?;
        self.render_png(&figure, path)?;
        Ok(figure)
    }
}

/// Empty chart with axes and grid, shown when there is no function to draw.
pub fn render_blank_png(path: &Path, settings: &PlotSettings) -> Result<(), PlotError> {
    let window = PlotWindow::new(settings.xmin, settings.xmax)?;
    let root =
        BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("f(x)", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(window.xmin..window.xmax, -1.0..1.0)
        .map_err(render_error)?;
    chart
        .configure_mesh()
        .x_desc("x")
        .y_desc("f(x)")
        .draw()
        .map_err(render_error)?;
    root.present().map_err(render_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parse_expr::FunctionParser;
    use approx::assert_relative_eq;

    fn plotter(text: &str) -> FunctionPlotter {
        let parsed = FunctionParser::new().parse(text).unwrap();
        FunctionPlotter::new(&parsed.expr).unwrap()
    }

    #[test]
    fn test_window_expansion() {
        let w = PlotWindow::new(-10.0, 10.0).unwrap();
        assert_eq!(w.expanded_to(15.0, 2.0), PlotWindow { xmin: -10.0, xmax: 17.0 });
        assert_eq!(w.expanded_to(-12.5, 2.0), PlotWindow { xmin: -14.5, xmax: 10.0 });
        assert_eq!(w.expanded_to(3.0, 2.0), w);
        assert!(PlotWindow::new(1.0, 1.0).is_err());
        assert!(PlotWindow::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_x0_outside_window_expands_it() {
        let figure = plotter("x**2").make_figure(Some(15.0), None).unwrap();
        assert!(figure.window.xmax >= 17.0);
        assert_relative_eq!(figure.window.xmin, -10.0);
        assert_eq!(figure.marker(), Some((15.0, 225.0)));
        assert_relative_eq!(figure.samples.last().unwrap().0, 17.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reciprocal_samples_skip_the_pole() {
        let p = plotter("1/x");
        let window = PlotWindow::new(-10.0, 10.0).unwrap();
        // 1001 points put one sample exactly on x = 0
        let grid = linspace(-10.0, 10.0, 1001);
        assert!(grid.contains(&0.0));
        let settings = PlotSettings {
            samples: 1001,
            ..PlotSettings::default()
        };
        let p1001 = FunctionPlotter::with_settings(p.analyzer.expr(), &settings).unwrap();
        let samples = p1001.sample(&window);
        assert!(samples.len() < 1001);
        assert!(samples.iter().all(|&(x, y)| x != 0.0 && y.is_finite()));

        let figure = p.make_figure(None, None).unwrap();
        assert!(figure.samples.len() <= 1000);
        assert!(figure.samples.iter().all(|&(_, y)| y.is_finite()));
    }

    #[test]
    fn test_runs_split_at_gaps() {
        let settings = PlotSettings {
            samples: 1001,
            ..PlotSettings::default()
        };
        let p = FunctionPlotter::with_settings(&plotter("1/x").analyzer.expr().clone(), &settings)
            .unwrap();
        let figure = p.make_figure(None, None).unwrap();
        let runs = figure.runs();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].iter().all(|&(x, _)| x < 0.0));
        assert!(runs[1].iter().all(|&(x, _)| x > 0.0));

        let figure = plotter("sqrt(x)").make_figure(None, None).unwrap();
        assert_eq!(figure.runs().len(), 1);
        assert!(figure.samples.iter().all(|&(x, _)| x >= 0.0));
    }

    #[test]
    fn test_marker_failure_is_silent() {
        let figure = plotter("sin(x) + 1/x").make_figure(Some(0.0), None).unwrap();
        assert_eq!(figure.x_value, Some(0.0));
        assert_eq!(figure.y_value, None);
        assert!(figure.marker().is_none());
        assert!(!figure.samples.is_empty());

        let figure = plotter("sqrt(x)").make_figure(Some(-4.0), None).unwrap();
        assert!(figure.marker().is_none());
    }

    #[test]
    fn test_sampling_order_is_sequential() {
        let figure = plotter("x**3 - x").make_figure(None, None).unwrap();
        assert_eq!(figure.samples.len(), 1000);
        assert!(figure.samples.windows(2).all(|w| w[0].0 < w[1].0));
        assert_relative_eq!(figure.samples[0].1, -990.0, epsilon = 1e-9);
    }

    #[test]
    fn test_png_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        match plotter("x**2 - 4").save_png(&path, Some(1.0), None) {
            Ok(figure) => {
                assert!(path.exists());
                assert_eq!(figure.marker(), Some((1.0, -3.0)));
            }
            // headless machines may lack the fonts plotters draws text with
            Err(e) => assert!(matches!(e, PlotError::Render(_)), "{}", e),
        }
        let blank = dir.path().join("blank.png");
        match render_blank_png(&blank, &PlotSettings::default()) {
            Ok(()) => assert!(blank.exists()),
            Err(e) => assert!(matches!(e, PlotError::Render(_)), "{}", e),
        }
    }

    #[test]
    fn test_error_display() {
        let e = PlotError::NotLambdifiable("unexpected symbols y".to_string());
        assert_eq!(e.to_string(), "the function cannot be plotted: unexpected symbols y");
    }
}
