use crate::chart::{BoxSeries, Chart, ChartKind, HistogramSeries, Mark, Scatter3d, Series, XAxis};
use crate::RenderOptions;
use anyhow::{bail, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;

/// Total width of the bars at one X position, split between series
const BAR_WIDTH: f64 = 0.8;
const BOX_WIDTH: f64 = 0.5;

/// Series colors, cycled in order
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// A rendered chart as a packed RGB8 buffer
#[derive(Debug, Clone)]
pub struct Pixels {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl Pixels {
    /// Encode the buffer as PNG
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut png_bytes = Vec::new();
        {
            let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
            encoder
                .write_image(
                    &self.rgb,
                    self.width,
                    self.height,
                    image::ColorType::Rgb8,
                )
                .context("Failed to encode PNG")?;
        }

        Ok(png_bytes)
    }
}

/// Draw a chart into a fresh white canvas.
///
/// 3D scatter charts go through the projected 3D path; everything else is
/// drawn on a 2D cartesian grid.
pub fn render(chart: &Chart, options: &RenderOptions) -> Result<Pixels> {
    if options.width == 0 || options.height == 0 {
        bail!(
            "Cannot render a {}x{} image",
            options.width,
            options.height
        );
    }

    let mut buffer = vec![0u8; options.width as usize * options.height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;

        match &chart.kind {
            ChartKind::Cartesian { mark, x_axis, series } => {
                draw_cartesian(&root, chart, *mark, x_axis, series)?
            }
            ChartKind::Histogram { series } => draw_histogram(&root, chart, series)?,
            ChartKind::Box { series } => draw_boxes(&root, chart, series)?,
            ChartKind::Scatter3d(scatter) => draw_scatter3d(&root, chart, scatter)?,
        }

        root.present().context("Failed to present drawing")?;
    }

    Ok(Pixels {
        width: options.width,
        height: options.height,
        rgb: buffer,
    })
}

fn draw_cartesian(
    root: &Area<'_>,
    chart: &Chart,
    mark: Mark,
    x_axis: &XAxis,
    series: &[Series],
) -> Result<()> {
    let (x_min, x_max) = bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))?;
    let (y_min, y_max) = bounds(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)))?;

    let categories = match x_axis {
        XAxis::Categorical(categories) => Some(categories.as_slice()),
        XAxis::Numeric => None,
    };

    let x_range = match categories {
        Some(categories) => -0.5..(categories.len() as f64 - 0.5),
        None if mark == Mark::Bar => {
            padded_range(x_min - BAR_WIDTH / 2.0, x_max + BAR_WIDTH / 2.0)?
        }
        None => padded_range(x_min, x_max)?,
    };
    // Bars grow from zero, so keep zero in view
    let y_range = if mark == Mark::Bar {
        padded_range(y_min.min(0.0), y_max.max(0.0))?
    } else {
        padded_range(y_min, y_max)?
    };

    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    let category_formatter = |x: &f64| tick_label(categories.unwrap_or(&[]), *x, 0.0);
    {
        let mut mesh = ctx.configure_mesh();
        mesh.x_desc(&chart.x_label).y_desc(&chart.y_label);
        if let Some(categories) = categories {
            mesh.x_labels(categories.len())
                .x_label_formatter(&category_formatter);
        }
        mesh.draw().context("Failed to draw mesh")?;
    }

    let num_series = series.len() as f64;
    for (idx, s) in series.iter().enumerate() {
        let color = series_color(idx);
        let anno = match mark {
            Mark::Line => ctx.draw_series(LineSeries::new(
                s.points.iter().copied(),
                color.stroke_width(2),
            )),
            Mark::Point => ctx.draw_series(
                s.points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
            ),
            Mark::Bar => {
                // Side by side: each series gets its own slot at every X
                let slot = BAR_WIDTH / num_series;
                let offset = (idx as f64 - (num_series - 1.0) / 2.0) * slot;
                ctx.draw_series(s.points.iter().map(|&(x, y)| {
                    Rectangle::new(
                        [
                            (x + offset - slot / 2.0, 0.0),
                            (x + offset + slot / 2.0, y),
                        ],
                        color.filled(),
                    )
                }))
            }
        }
        .with_context(|| format!("Failed to draw series '{}'", s.label))?;

        anno.label(s.label.clone())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .context("Failed to draw legend")?;

    Ok(())
}

fn draw_histogram(root: &Area<'_>, chart: &Chart, series: &[HistogramSeries]) -> Result<()> {
    let (x_min, x_max) = bounds(
        series
            .iter()
            .flat_map(|s| s.bins.iter().flat_map(|b| [b.lower, b.upper])),
    )?;
    let max_count = series
        .iter()
        .flat_map(|s| s.bins.iter().map(|b| b.count))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(padded_range(x_min, x_max)?, 0.0..(max_count as f64 * 1.1))
        .context("Failed to build chart")?;

    ctx.configure_mesh()
        .x_desc(&chart.x_label)
        .y_desc(&chart.y_label)
        .draw()
        .context("Failed to draw mesh")?;

    for (idx, s) in series.iter().enumerate() {
        let color = series_color(idx).mix(s.alpha);
        ctx.draw_series(s.bins.iter().map(|b| {
            Rectangle::new([(b.lower, 0.0), (b.upper, b.count as f64)], color.filled())
        }))
        .with_context(|| format!("Failed to draw histogram '{}'", s.label))?
        .label(s.label.clone())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .context("Failed to draw legend")?;

    Ok(())
}

fn draw_boxes(root: &Area<'_>, chart: &Chart, series: &[BoxSeries]) -> Result<()> {
    let (y_min, y_max) = bounds(series.iter().flat_map(|s| {
        let (low, high) = s.summary.extent();
        [low, high]
    }))?;

    let labels: Vec<String> = series.iter().map(|s| s.label.clone()).collect();
    let x_range = 0.5..(series.len() as f64 + 0.5);

    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, padded_range(y_min, y_max)?)
        .context("Failed to build chart")?;

    let formatter = |x: &f64| tick_label(&labels, *x, 1.0);
    ctx.configure_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&formatter)
        .x_desc(&chart.x_label)
        .y_desc(&chart.y_label)
        .draw()
        .context("Failed to draw mesh")?;

    let half = BOX_WIDTH / 2.0;
    let cap = BOX_WIDTH / 4.0;

    for (idx, s) in series.iter().enumerate() {
        let color = series_color(idx);
        let x = idx as f64 + 1.0;
        let b = &s.summary;

        ctx.draw_series(std::iter::once(Rectangle::new(
            [(x - half, b.q1), (x + half, b.q3)],
            color.mix(0.2).filled(),
        )))
        .with_context(|| format!("Failed to draw box '{}'", s.label))?
        .label(s.label.clone())
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));

        ctx.draw_series(std::iter::once(Rectangle::new(
            [(x - half, b.q1), (x + half, b.q3)],
            color.stroke_width(1),
        )))
        .context("Failed to draw box outline")?;

        ctx.draw_series(vec![
            PathElement::new(
                vec![(x - half, b.median), (x + half, b.median)],
                color.stroke_width(2),
            ),
            PathElement::new(vec![(x, b.q3), (x, b.upper_whisker)], color.stroke_width(1)),
            PathElement::new(vec![(x, b.q1), (x, b.lower_whisker)], color.stroke_width(1)),
            PathElement::new(
                vec![(x - cap, b.upper_whisker), (x + cap, b.upper_whisker)],
                color.stroke_width(1),
            ),
            PathElement::new(
                vec![(x - cap, b.lower_whisker), (x + cap, b.lower_whisker)],
                color.stroke_width(1),
            ),
        ])
        .context("Failed to draw whiskers")?;

        ctx.draw_series(
            b.outliers
                .iter()
                .map(|&v| Circle::new((x, v), 3, color.stroke_width(1))),
        )
        .context("Failed to draw outliers")?;
    }

    Ok(())
}

fn draw_scatter3d(root: &Area<'_>, chart: &Chart, scatter: &Scatter3d) -> Result<()> {
    // Column order is (X1, X2, Y); plotters keeps its y axis vertical, so Y
    // goes there and X2 becomes depth.
    let x_range = padded(bounds(scatter.points.iter().map(|p| p.0))?)?;
    let depth_range = padded(bounds(scatter.points.iter().map(|p| p.1))?)?;
    let y_range = padded(bounds(scatter.points.iter().map(|p| p.2))?)?;

    let mut ctx = ChartBuilder::on(root)
        .margin(20)
        .caption(&chart.title, ("sans-serif", 20))
        .build_cartesian_3d(x_range.clone(), y_range.clone(), depth_range.clone())
        .context("Failed to build 3D chart")?;

    ctx.with_projection(|mut pb| {
        pb.yaw = 0.5;
        pb.pitch = 0.3;
        pb.scale = 0.85;
        pb.into_matrix()
    });

    ctx.configure_axes().draw().context("Failed to draw axes")?;

    let [x1_label, x2_label, y_label] = &scatter.axis_labels;
    let style = ("sans-serif", 16).into_font().color(&BLACK);
    ctx.draw_series([
        Text::new(x1_label.clone(), (x_range.end, y_range.start, depth_range.start), style.clone()),
        Text::new(y_label.clone(), (x_range.start, y_range.end, depth_range.start), style.clone()),
        Text::new(x2_label.clone(), (x_range.start, y_range.start, depth_range.end), style.clone()),
    ])
    .context("Failed to draw axis labels")?;

    let color = series_color(0);
    ctx.draw_series(
        scatter
            .points
            .iter()
            .map(|&(x1, x2, y)| Circle::new((x1, y, x2), 3, color.filled())),
    )
    .context("Failed to draw 3D scatter")?
    .label(scatter.label.clone())
    .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .context("Failed to draw legend")?;

    Ok(())
}

fn series_color(idx: usize) -> RGBColor {
    PALETTE[idx % PALETTE.len()]
}

/// Label for a tick at `value` when labels sit at `first`, `first + 1`, ...
fn tick_label(labels: &[String], value: f64, first: f64) -> String {
    let offset = value - first;
    let idx = offset.round();
    if (offset - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn bounds(values: impl Iterator<Item = f64>) -> Result<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        bail!("Cannot create chart with no data points");
    }
    Ok((min, max))
}

fn padded((min, max): (f64, f64)) -> Result<Range<f64>> {
    padded_range(min, max)
}

/// 5% padding on both sides; a single value gets +/- 1.
///
/// Plotters cannot lay out ticks over a span that overflows f64, so such
/// ranges are rejected.
fn padded_range(min: f64, max: f64) -> Result<Range<f64>> {
    let (start, end) = if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    };
    if !(end - start).is_finite() {
        bail!("Cannot plot values spanning {} to {}: range is too wide", min, max);
    }
    Ok(start..end)
}
