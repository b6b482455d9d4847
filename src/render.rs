//! Figures produced by the plotting functions and the sinks that draw them.

use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureKind {
    Line,
    Scatter,
    Histogram,
}

impl fmt::Display for FigureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FigureKind::Line => "line",
            FigureKind::Scatter => "scatter",
            FigureKind::Histogram => "histogram",
        };
        write!(f, "{}", name)
    }
}

/// A plot ready to hand to a [`RenderSink`]. Histograms carry bin centres in
/// `x` and counts in `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub kind: FigureKind,
    pub title: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Figure {
    pub fn line(title: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            kind: FigureKind::Line,
            title: title.into(),
            x,
            y,
        }
    }

    pub fn scatter(title: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            kind: FigureKind::Scatter,
            title: title.into(),
            x,
            y,
        }
    }

    /// Bin `values` into `bins` equal-width buckets between their extremes.
    /// The maximum falls into the last bucket.
    pub fn histogram(title: impl Into<String>, values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let (lo, hi) = values
            .iter()
            .fold(None, |range: Option<(f64, f64)>, &v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0.0, 1.0));
        let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };

        let mut counts = vec![0.0; bins];
        for v in values {
            let bin = (((v - lo) / width) as usize).min(bins - 1);
            counts[bin] += 1.0;
        }
        let centres = (0..bins)
            .map(|i| lo + width * (i as f64 + 0.5))
            .collect();
        Self {
            kind: FigureKind::Histogram,
            title: title.into(),
            x: centres,
            y: counts,
        }
    }
}

/// Plot size and title, changed by `setPlotDim`
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub width: usize,
    pub height: usize,
    pub title: Option<String>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 60,
            height: 20,
            title: None,
        }
    }
}

pub trait RenderSink {
    fn render(&mut self, figure: &Figure, layout: &LayoutOptions) -> Result<(), String>;
}

/// Draws figures as plain text: points as `x<TAB>y` rows, histograms as bars
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, figure: &Figure, layout: &LayoutOptions) -> std::io::Result<()> {
        let title = layout.title.as_deref().unwrap_or(&figure.title);
        writeln!(
            self.out,
            "{} '{}' ({}x{})",
            figure.kind, title, layout.width, layout.height
        )?;
        match figure.kind {
            FigureKind::Histogram => {
                let peak = figure.y.iter().cloned().fold(0.0, f64::max);
                for (centre, count) in figure.x.iter().zip(&figure.y) {
                    let bar = if peak > 0.0 {
                        ((count / peak) * layout.width as f64).round() as usize
                    } else {
                        0
                    };
                    writeln!(self.out, "{:>12.4} | {} {}", centre, "#".repeat(bar), count)?;
                }
            }
            FigureKind::Line | FigureKind::Scatter => {
                for (x, y) in figure.x.iter().zip(&figure.y).take(layout.height) {
                    writeln!(self.out, "{}\t{}", x, y)?;
                }
                if figure.x.len() > layout.height {
                    writeln!(self.out, "... {} more", figure.x.len() - layout.height)?;
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> RenderSink for TextSink<W> {
    fn render(&mut self, figure: &Figure, layout: &LayoutOptions) -> Result<(), String> {
        self.draw(figure, layout).map_err(|e| e.to_string())
    }
}
