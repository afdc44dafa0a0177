// Plot dispatcher: column selection + plot type -> Chart

use crate::chart::{BoxSeries, Chart, ChartKind, HistogramSeries, Mark, Scatter3d, Series, XAxis};
use crate::data::Table;
use crate::error::DispatchError;
use crate::stats::{self, HISTOGRAM_BINS};
use std::fmt;
use std::str::FromStr;

/// Overlay transparency for histogram series
pub const HISTOGRAM_ALPHA: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotType {
    Line,
    Scatter,
    Bar,
    Histogram,
    Box,
    Scatter3d,
}

impl PlotType {
    pub const ALL: [PlotType; 6] = [
        PlotType::Line,
        PlotType::Scatter,
        PlotType::Bar,
        PlotType::Histogram,
        PlotType::Box,
        PlotType::Scatter3d,
    ];

    /// Name shown in the plot-type selector and in chart titles
    pub fn label(&self) -> &'static str {
        match self {
            PlotType::Line => "Line Plot",
            PlotType::Scatter => "Scatter Plot",
            PlotType::Bar => "Bar Plot",
            PlotType::Histogram => "Histogram",
            PlotType::Box => "Box Plot",
            PlotType::Scatter3d => "3D Scatter Plot",
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            PlotType::Line => "line",
            PlotType::Scatter => "scatter",
            PlotType::Bar => "bar",
            PlotType::Histogram => "histogram",
            PlotType::Box => "box",
            PlotType::Scatter3d => "scatter3d",
        }
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PlotType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PlotType::ALL
            .iter()
            .copied()
            .find(|t| {
                t.label().eq_ignore_ascii_case(wanted)
                    || t.short_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| DispatchError::UnknownPlotType(s.to_string()))
    }
}

/// The user's column and plot-type selection
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub x_columns: Vec<String>,
    pub y_columns: Vec<String>,
    pub plot_type: PlotType,
}

impl PlotRequest {
    pub fn new<S: Into<String>>(
        x_columns: impl IntoIterator<Item = S>,
        y_columns: impl IntoIterator<Item = S>,
        plot_type: PlotType,
    ) -> Self {
        Self {
            x_columns: x_columns.into_iter().map(Into::into).collect(),
            y_columns: y_columns.into_iter().map(Into::into).collect(),
            plot_type,
        }
    }

    /// Check selection arity for the plot type, without looking at any data
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.x_columns.is_empty() || self.y_columns.is_empty() {
            return Err(DispatchError::MissingSelection);
        }
        if self.plot_type == PlotType::Scatter3d
            && (self.x_columns.len() != 2 || self.y_columns.len() != 1)
        {
            return Err(DispatchError::Arity);
        }
        Ok(())
    }
}

/// Build a chart for the requested selection
pub fn dispatch(table: &Table, request: &PlotRequest) -> Result<Chart, DispatchError> {
    request.validate()?;

    for name in request.x_columns.iter().chain(request.y_columns.iter()) {
        if table.column_index(name).is_none() {
            return Err(DispatchError::UnknownColumn(name.clone()));
        }
    }

    log::debug!(
        "Dispatching {} with x={:?} y={:?}",
        request.plot_type,
        request.x_columns,
        request.y_columns
    );

    match request.plot_type {
        PlotType::Line => cartesian_chart(table, request, Mark::Line),
        PlotType::Scatter => cartesian_chart(table, request, Mark::Point),
        PlotType::Bar => cartesian_chart(table, request, Mark::Bar),
        PlotType::Histogram => histogram_chart(table, request),
        PlotType::Box => box_chart(table, request),
        PlotType::Scatter3d => scatter3d_chart(table, request),
    }
}

/// Axis labels and title shared by all planar charts
fn planar_chart(request: &PlotRequest, kind: ChartKind) -> Chart {
    Chart {
        plot_type: request.plot_type,
        title: format!(
            "{} of {} vs {}",
            request.plot_type,
            request.y_columns.join(", "),
            request.x_columns.join(", ")
        ),
        x_label: request.x_columns.join(" & "),
        y_label: request.y_columns.join(" & "),
        kind,
    }
}

fn cartesian_chart(
    table: &Table,
    request: &PlotRequest,
    mark: Mark,
) -> Result<Chart, DispatchError> {
    let x_name = &request.x_columns[0];
    if request.x_columns.len() > 1 {
        log::debug!(
            "{} uses only the first X column '{}', ignoring {:?}",
            request.plot_type,
            x_name,
            &request.x_columns[1..]
        );
    }

    let (x_axis, x_positions) = x_positions(table, x_name)?;

    let mut series = Vec::with_capacity(request.y_columns.len());
    for y_name in &request.y_columns {
        let y_values = numeric_column(table, y_name)?;
        let points: Vec<(f64, f64)> = x_positions
            .iter()
            .zip(y_values.iter())
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .collect();

        if points.is_empty() {
            return Err(DispatchError::NoData(y_name.clone()));
        }

        series.push(Series {
            label: format!("{} vs {}", y_name, x_name),
            points,
        });
    }

    Ok(planar_chart(
        request,
        ChartKind::Cartesian {
            mark,
            x_axis,
            series,
        },
    ))
}

fn histogram_chart(table: &Table, request: &PlotRequest) -> Result<Chart, DispatchError> {
    let mut series = Vec::with_capacity(request.y_columns.len());
    for y_name in &request.y_columns {
        let values = present_values(table, y_name)?;
        series.push(HistogramSeries {
            label: y_name.clone(),
            bins: stats::histogram(&values, HISTOGRAM_BINS),
            alpha: HISTOGRAM_ALPHA,
        });
    }

    Ok(planar_chart(request, ChartKind::Histogram { series }))
}

fn box_chart(table: &Table, request: &PlotRequest) -> Result<Chart, DispatchError> {
    let mut series = Vec::with_capacity(request.y_columns.len());
    for y_name in &request.y_columns {
        let values = present_values(table, y_name)?;
        let summary =
            stats::box_summary(&values).ok_or_else(|| DispatchError::NoData(y_name.clone()))?;
        series.push(BoxSeries {
            label: y_name.clone(),
            summary,
        });
    }

    Ok(planar_chart(request, ChartKind::Box { series }))
}

fn scatter3d_chart(table: &Table, request: &PlotRequest) -> Result<Chart, DispatchError> {
    let (x0, x1, y) = (
        &request.x_columns[0],
        &request.x_columns[1],
        &request.y_columns[0],
    );

    let xs0 = numeric_column(table, x0)?;
    let xs1 = numeric_column(table, x1)?;
    let ys = numeric_column(table, y)?;

    let points: Vec<(f64, f64, f64)> = xs0
        .iter()
        .zip(xs1.iter())
        .zip(ys.iter())
        .filter_map(|((a, b), c)| Some(((*a)?, (*b)?, (*c)?)))
        .collect();

    if points.is_empty() {
        return Err(DispatchError::NoData(y.clone()));
    }

    let label = format!("{} vs {} and {}", y, x0, x1);
    Ok(Chart {
        plot_type: PlotType::Scatter3d,
        title: format!("{} of {}", PlotType::Scatter3d, label),
        x_label: x0.clone(),
        y_label: x1.clone(),
        kind: ChartKind::Scatter3d(Scatter3d {
            axis_labels: [x0.clone(), x1.clone(), y.clone()],
            label,
            points,
        }),
    })
}

/// Parse a column as numbers. Blank, NaN and infinite cells become `None`.
fn numeric_column(table: &Table, name: &str) -> Result<Vec<Option<f64>>, DispatchError> {
    let cells = table
        .column(name)
        .ok_or_else(|| DispatchError::UnknownColumn(name.to_string()))?;

    cells
        .into_iter()
        .enumerate()
        .map(|(row_idx, cell)| {
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map(|v| if v.is_finite() { Some(v) } else { None })
                .map_err(|_| DispatchError::NonNumeric {
                    column: name.to_string(),
                    row: row_idx + 1,
                    value: cell.to_string(),
                })
        })
        .collect()
}

fn present_values(table: &Table, name: &str) -> Result<Vec<f64>, DispatchError> {
    let values: Vec<f64> = numeric_column(table, name)?.into_iter().flatten().collect();
    if values.is_empty() {
        return Err(DispatchError::NoData(name.to_string()));
    }
    Ok(values)
}

/// Map X cells to axis positions: numeric when every non-blank cell parses,
/// categorical (first-appearance order) otherwise
fn x_positions(table: &Table, name: &str) -> Result<(XAxis, Vec<Option<f64>>), DispatchError> {
    if let Ok(values) = numeric_column(table, name) {
        return Ok((XAxis::Numeric, values));
    }

    let cells = table
        .column(name)
        .ok_or_else(|| DispatchError::UnknownColumn(name.to_string()))?;

    let mut categories: Vec<String> = Vec::new();
    let positions = cells
        .into_iter()
        .map(|cell| {
            if cell.trim().is_empty() {
                return None;
            }
            let idx = match categories.iter().position(|c| c == cell) {
                Some(idx) => idx,
                None => {
                    categories.push(cell.to_string());
                    categories.len() - 1
                }
            };
            Some(idx as f64)
        })
        .collect();

    Ok((XAxis::Categorical(categories), positions))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a test Table
    fn make_table(headers: Vec<&str>, rows: Vec<Vec<&str>>) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn sample_table() -> Table {
        make_table(
            vec!["t", "a", "b", "name"],
            vec![
                vec!["1", "10", "5", "x"],
                vec!["2", "20", "7", "y"],
                vec!["3", "15", "", "z"],
            ],
        )
    }

    #[test]
    fn test_plot_type_parsing() {
        assert_eq!("Line Plot".parse::<PlotType>().unwrap(), PlotType::Line);
        assert_eq!("3d scatter plot".parse::<PlotType>().unwrap(), PlotType::Scatter3d);
        assert_eq!("box".parse::<PlotType>().unwrap(), PlotType::Box);
        assert_eq!(
            "pie".parse::<PlotType>().unwrap_err(),
            DispatchError::UnknownPlotType("pie".to_string())
        );
    }

    #[test]
    fn test_missing_selection() {
        let table = sample_table();
        for plot_type in PlotType::ALL {
            let request = PlotRequest::new(Vec::<String>::new(), vec!["a".to_string()], plot_type);
            assert_eq!(dispatch(&table, &request).unwrap_err(), DispatchError::MissingSelection);
        }
        let request = PlotRequest::new(vec!["t"], Vec::<&str>::new(), PlotType::Histogram);
        assert_eq!(dispatch(&table, &request).unwrap_err(), DispatchError::MissingSelection);
    }

    #[test]
    fn test_scatter3d_rejects_single_x() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t"], vec!["a"], PlotType::Scatter3d);
        assert_eq!(dispatch(&table, &request).unwrap_err(), DispatchError::Arity);
    }

    #[test]
    fn test_scatter3d_rejects_extra_columns() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t", "a", "b"], vec!["a"], PlotType::Scatter3d);
        assert_eq!(dispatch(&table, &request).unwrap_err(), DispatchError::Arity);
        let request = PlotRequest::new(vec!["t", "a"], vec!["a", "b"], PlotType::Scatter3d);
        assert_eq!(dispatch(&table, &request).unwrap_err(), DispatchError::Arity);
    }

    #[test]
    fn test_scatter3d_axis_labels_in_order() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["a", "t"], vec!["b"], PlotType::Scatter3d);
        let chart = dispatch(&table, &request).unwrap();
        assert_eq!(chart.axis_labels(), vec!["a", "t", "b"]);
        match &chart.kind {
            ChartKind::Scatter3d(s) => {
                // Row 3 has a blank b and is dropped
                assert_eq!(s.points, vec![(10.0, 1.0, 5.0), (20.0, 2.0, 7.0)]);
                assert_eq!(s.label, "b vs a and t");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_line_one_series_per_y() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t"], vec!["a", "b"], PlotType::Line);
        let chart = dispatch(&table, &request).unwrap();
        assert_eq!(chart.title, "Line Plot of a, b vs t");
        assert_eq!(chart.y_label, "a & b");
        match &chart.kind {
            ChartKind::Cartesian { mark, x_axis, series } => {
                assert_eq!(*mark, Mark::Line);
                assert_eq!(*x_axis, XAxis::Numeric);
                assert_eq!(series.len(), 2);
                assert_eq!(series[0].label, "a vs t");
                assert_eq!(series[0].points, vec![(1.0, 10.0), (2.0, 20.0), (3.0, 15.0)]);
                assert_eq!(series[1].points.len(), 2);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_extra_x_columns_are_ignored() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t", "b"], vec!["a"], PlotType::Scatter);
        let chart = dispatch(&table, &request).unwrap();
        assert_eq!(chart.x_label, "t & b");
        match &chart.kind {
            ChartKind::Cartesian { series, .. } => {
                assert_eq!(series.len(), 1);
                assert_eq!(series[0].points[0], (1.0, 10.0));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_bar_with_categorical_x() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["name"], vec!["a"], PlotType::Bar);
        let chart = dispatch(&table, &request).unwrap();
        match &chart.kind {
            ChartKind::Cartesian { mark, x_axis, series } => {
                assert_eq!(*mark, Mark::Bar);
                assert_eq!(
                    *x_axis,
                    XAxis::Categorical(vec!["x".to_string(), "y".to_string(), "z".to_string()])
                );
                assert_eq!(series[0].points, vec![(0.0, 10.0), (1.0, 20.0), (2.0, 15.0)]);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_histogram_two_series_thirty_bins() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t"], vec!["a", "b"], PlotType::Histogram);
        let chart = dispatch(&table, &request).unwrap();
        match &chart.kind {
            ChartKind::Histogram { series } => {
                assert_eq!(series.len(), 2);
                assert!(series.iter().all(|s| s.bins.len() == 30));
                assert!(series.iter().all(|s| s.alpha == HISTOGRAM_ALPHA));
                assert_eq!(series[1].bins.iter().map(|b| b.count).sum::<usize>(), 2);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_box_one_box_per_y() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t"], vec!["a", "b"], PlotType::Box);
        let chart = dispatch(&table, &request).unwrap();
        assert_eq!(chart.series_labels(), vec!["a", "b"]);
        match &chart.kind {
            ChartKind::Box { series } => assert_eq!(series[0].summary.median, 15.0),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_y() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t"], vec!["name"], PlotType::Line);
        let err = dispatch(&table, &request).unwrap_err();
        assert_eq!(
            err,
            DispatchError::NonNumeric {
                column: "name".to_string(),
                row: 1,
                value: "x".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_column() {
        let table = sample_table();
        let request = PlotRequest::new(vec!["t"], vec!["nope"], PlotType::Line);
        assert_eq!(
            dispatch(&table, &request).unwrap_err(),
            DispatchError::UnknownColumn("nope".to_string())
        );
    }

    #[test]
    fn test_empty_y_column_has_no_data() {
        let table = make_table(vec!["x", "y"], vec![vec!["1", ""], vec!["2", " "]]);
        let request = PlotRequest::new(vec!["x"], vec!["y"], PlotType::Histogram);
        assert_eq!(
            dispatch(&table, &request).unwrap_err(),
            DispatchError::NoData("y".to_string())
        );
    }

    #[test]
    fn test_infinite_cells_are_skipped() {
        let table = make_table(
            vec!["x", "y"],
            vec![vec!["1", "1"], vec!["2", "inf"], vec!["3", "2"], vec!["4", "-Infinity"]],
        );

        let request = PlotRequest::new(vec!["x"], vec!["y"], PlotType::Histogram);
        let chart = dispatch(&table, &request).unwrap();
        match &chart.kind {
            ChartKind::Histogram { series } => {
                let bins = &series[0].bins;
                assert!(bins.iter().all(|b| b.lower.is_finite() && b.upper.is_finite()));
                assert_eq!(bins[0].lower, 1.0);
                assert_eq!(bins[29].upper, 2.0);
                assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert!(chart.serialize_png(&crate::RenderOptions::default()).is_ok());

        let request = PlotRequest::new(vec!["x"], vec!["y"], PlotType::Box);
        let chart = dispatch(&table, &request).unwrap();
        match &chart.kind {
            ChartKind::Box { series } => {
                assert_eq!(series[0].summary.median, 1.5);
                assert_eq!(series[0].summary.extent(), (1.0, 2.0));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_all_infinite_column_has_no_data() {
        let table = make_table(vec!["x", "y"], vec![vec!["1", "inf"], vec!["2", "-inf"]]);
        let request = PlotRequest::new(vec!["x"], vec!["y"], PlotType::Box);
        assert_eq!(
            dispatch(&table, &request).unwrap_err(),
            DispatchError::NoData("y".to_string())
        );
    }
}
