use crate::dispatch::PlotType;
use crate::stats::{Bin, BoxSummary};
use crate::RenderOptions;
use anyhow::Result;

// =============================================================================
// Chart: backend-neutral description of one generated plot
// =============================================================================

/// An in-memory chart produced by the dispatcher.
///
/// Holds everything either drawing path needs; it is rendered and exported
/// on demand and never cached beyond the session's current-chart slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub plot_type: PlotType,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartKind {
    /// Line, scatter and bar plots: one series per Y column against one X column
    Cartesian {
        mark: Mark,
        x_axis: XAxis,
        series: Vec<Series>,
    },
    Histogram {
        series: Vec<HistogramSeries>,
    },
    /// Boxes are placed side by side at positions 1..=n
    Box {
        series: Vec<BoxSeries>,
    },
    Scatter3d(Scatter3d),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Line,
    Point,
    Bar,
}

/// How X values map onto the horizontal axis
#[derive(Debug, Clone, PartialEq)]
pub enum XAxis {
    Numeric,
    /// Non-numeric X: categories in first-appearance order, plotted at their index
    Categorical(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub label: String,
    pub bins: Vec<Bin>,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSeries {
    pub label: String,
    pub summary: BoxSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scatter3d {
    /// X1, X2 and Y column names, in that order
    pub axis_labels: [String; 3],
    pub label: String,
    pub points: Vec<(f64, f64, f64)>,
}

impl Chart {
    /// Axis labels in axis order: two for planar charts, three for 3D
    pub fn axis_labels(&self) -> Vec<&str> {
        match &self.kind {
            ChartKind::Scatter3d(s) => s.axis_labels.iter().map(String::as_str).collect(),
            _ => vec![self.x_label.as_str(), self.y_label.as_str()],
        }
    }

    pub fn series_labels(&self) -> Vec<&str> {
        match &self.kind {
            ChartKind::Cartesian { series, .. } => {
                series.iter().map(|s| s.label.as_str()).collect()
            }
            ChartKind::Histogram { series } => series.iter().map(|s| s.label.as_str()).collect(),
            ChartKind::Box { series } => series.iter().map(|s| s.label.as_str()).collect(),
            ChartKind::Scatter3d(s) => vec![s.label.as_str()],
        }
    }

    /// Draw the chart into an RGB pixel buffer
    pub fn render(&self, options: &RenderOptions) -> Result<crate::render::Pixels> {
        crate::render::render(self, options)
    }

    /// Render and encode as PNG bytes
    pub fn serialize_png(&self, options: &RenderOptions) -> Result<Vec<u8>> {
        self.render(options)?.encode_png()
    }
}
