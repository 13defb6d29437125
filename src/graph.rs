#![cfg(feature = "web")]
use crate::aggregate::DateTotal;
use crate::config::validate_chart_size;
use crate::error::{DashboardError, Result};
use crate::figure::{Bar, ChartId, Figure, FigureData, PALETTE, Rgb, ScatterSeries, Slice};
use crate::orders::{OrderFilter, OrdersTable};
use chrono::Days;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::io::Cursor;
use std::path::{Path, PathBuf};

type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;
type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Pixel size of title text relative to the figure's nominal title size
const TITLE_SCALE: f64 = 1.5;

/// Configuration options for chart rendering
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 640,
            height: 420,
        }
    }
}

/// Renders a figure to PNG
///
/// The chart is drawn with plotters into an in-memory RGB buffer which is
/// then encoded as PNG.
///
/// # Arguments
/// * `figure` - The figure to draw
/// * `options` - Image dimensions
///
/// # Returns
/// * `Result<Vec<u8>>` - PNG bytes, `Config` when the image is too small or
///   too large to lay out, or `Render` when drawing or encoding fails
///
/// # Examples
/// ```no_run
/// use sales_dashboard::figure::{build_figure, ChartId};
/// use sales_dashboard::graph::{render_png, GraphOptions};
/// use sales_dashboard::loader::{load_orders, DEFAULT_SHEET};
/// use sales_dashboard::orders::OrderFilter;
///
/// let table = load_orders("Superstore_Sales.xlsx", DEFAULT_SHEET).unwrap();
/// let figure = build_figure(ChartId::RegionSales, &table, &OrderFilter::default());
/// let png = render_png(&figure, &GraphOptions::default()).unwrap();
/// println!("Rendered {} bytes", png.len());
/// ```
pub fn render_png(figure: &Figure, options: &GraphOptions) -> Result<Vec<u8>> {
    validate_chart_size(options.width, options.height)?;
    let mut pixels = vec![0u8; options.width as usize * options.height as usize * 3];
    draw_figure(figure, options, &mut pixels)
        .map_err(|e| DashboardError::Render(format!("{}: {}", figure.chart, e)))?;
    encode_png(pixels, options.width, options.height)
}

/// Renders a figure and writes the PNG to `path`
pub fn save_png(figure: &Figure, options: &GraphOptions, path: impl AsRef<Path>) -> Result<()> {
    let png = render_png(figure, options)?;
    std::fs::write(path, png)?;
    Ok(())
}

/// Renders every dashboard chart into `output_dir` as `<slug>.png`
///
/// Creates the directory if needed. The filter applies to the filtered
/// charts only, exactly as on the dashboard page.
///
/// # Returns
/// * A vector of (chart, file path) pairs in page order
pub fn render_all(
    table: &OrdersTable,
    filter: &OrderFilter,
    options: &GraphOptions,
    output_dir: impl AsRef<Path>,
) -> Result<Vec<(ChartId, PathBuf)>> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(ChartId::ALL.len());
    for chart in ChartId::ALL {
        let figure = crate::figure::build_figure(chart, table, filter);
        let path = output_dir.join(format!("{}.png", chart.slug()));
        save_png(&figure, options, &path)?;
        written.push((chart, path));
    }
    Ok(written)
}

fn encode_png(pixels: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
        DashboardError::Render("pixel buffer does not match image size".to_string())
    })?;

    let mut png = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(|e| DashboardError::Render(e.to_string()))?;
    Ok(png.into_inner())
}

fn draw_figure(figure: &Figure, options: &GraphOptions, pixels: &mut [u8]) -> DrawResult<()> {
    let root = BitMapBackend::with_buffer(pixels, (options.width, options.height))
        .into_drawing_area();
    root.fill(&WHITE)?;

    let title_px = (figure.title_size as f64 * TITLE_SCALE).round() as u32;
    let area = root.titled(&figure.title, ("sans-serif", title_px))?;

    if figure.is_empty() {
        draw_no_data(&area)?;
    } else {
        match &figure.data {
            FigureData::Bar { bars } => draw_bars(&area, figure, bars)?,
            FigureData::Pie { slices } => draw_pie(&area, slices)?,
            FigureData::Scatter { series } => draw_scatter(&area, figure, series)?,
            FigureData::Line { points } => draw_line(&area, figure, points)?,
        }
    }

    root.present()?;
    Ok(())
}

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn centered(size: u32) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font()).pos(Pos::new(HPos::Center, VPos::Center))
}

fn draw_no_data(area: &Area) -> DrawResult<()> {
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        "No data",
        ((w / 2) as i32, (h / 2) as i32),
        centered(20).color(&BLACK.mix(0.6)),
    ))?;
    Ok(())
}

/// Chart builder whose margins and axis areas shrink with small canvases
fn cartesian_builder<'a, 'b, 'c>(area: &'a Area<'b>) -> ChartBuilder<'a, 'c, BitMapBackend<'b>> {
    let (w, h) = area.dim_in_pixel();
    let mut builder = ChartBuilder::on(area);
    builder
        .margin((w.min(h) / 32).min(10) as i32)
        .x_label_area_size((h / 8).min(40) as i32)
        .y_label_area_size((w / 8).min(70) as i32);
    builder
}

fn draw_bars(area: &Area, figure: &Figure, bars: &[Bar]) -> DrawResult<()> {
    let (low, high) = bar_range(bars.iter().map(|b| b.value));

    let mut chart = cartesian_builder(area)
        .build_cartesian_2d((0..bars.len() as i32).into_segmented(), low..high)?;

    let x_label = |x: &SegmentValue<i32>| match x {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => bars
            .get(*i as usize)
            .map(|b| b.label.clone())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&x_label)
        .y_label_formatter(&|v| format_amount(*v))
        .x_desc(&figure.x_label)
        .y_desc(&figure.y_label)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        let i = i as i32;
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), bar.value),
            ],
            color(bar.color).filled(),
        );
        rect.set_margin(0, 0, 8, 8);
        rect
    }))?;

    let value_style = TextStyle::from(("sans-serif", 13).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(bars.iter().enumerate().map(|(i, bar)| {
        Text::new(
            format_amount(bar.value),
            (SegmentValue::CenterOf(i as i32), bar.value),
            value_style.clone(),
        )
    }))?;

    Ok(())
}

fn draw_pie(area: &Area, slices: &[Slice]) -> DrawResult<()> {
    let (w, h) = area.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = w.min(h) as f64 * 0.35;

    let sizes: Vec<f64> = slices.iter().map(|s| s.value.max(0.0)).collect();
    let colors: Vec<RGBColor> = slices.iter().map(|s| color(s.color)).collect();
    let labels: Vec<String> = slices.iter().map(|s| s.label.clone()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style(("sans-serif", 14).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 12).into_font().color(&BLACK));
    area.draw(&pie)?;
    Ok(())
}

fn draw_scatter(area: &Area, figure: &Figure, series: &[ScatterSeries]) -> DrawResult<()> {
    let (x_low, x_high) = padded_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
    let (y_low, y_high) = padded_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    let mut chart = cartesian_builder(area)
        .build_cartesian_2d(x_low..x_high, y_low..y_high)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|v| format_amount(*v))
        .y_label_formatter(&|v| format_amount(*v))
        .x_desc(&figure.x_label)
        .y_desc(&figure.y_label)
        .draw()?;

    for s in series {
        let c = color(s.color);
        chart
            .draw_series(
                s.points
                    .iter()
                    .map(move |&(x, y)| Circle::new((x, y), 4, c.filled())),
            )?
            .label(s.name.as_str())
            .legend(move |(x, y)| Circle::new((x, y), 4, c.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

fn draw_line(area: &Area, figure: &Figure, points: &[DateTotal]) -> DrawResult<()> {
    let first = points[0].date;
    let offset = |p: &DateTotal| (p.date - first).num_days() as f64;
    let span = points.last().map(offset).unwrap_or(0.0).max(1.0);
    let (y_low, y_high) = padded_range(points.iter().map(|p| p.value).chain([0.0]));

    let mut chart = cartesian_builder(area)
        .build_cartesian_2d(0.0..span, y_low..y_high)?;

    let date_label = |days: &f64| {
        first
            .checked_add_days(Days::new(days.max(0.0).round() as u64))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_labels(5)
        .x_label_formatter(&date_label)
        .y_label_formatter(&|v| format_amount(*v))
        .x_desc(&figure.x_label)
        .y_desc(&figure.y_label)
        .draw()?;

    let line = color(PALETTE[0]);
    chart.draw_series(LineSeries::new(
        points.iter().map(|p| (offset(p), p.value)),
        line.stroke_width(2),
    ))?;
    if points.len() == 1 {
        chart.draw_series(
            points
                .iter()
                .map(|p| Circle::new((offset(p), p.value), 4, line.filled())),
        )?;
    }

    Ok(())
}

/// Value axis for bars: always includes zero, with headroom for labels
fn bar_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = if max > min { max - min } else { 1.0 };
    let low = if min < 0.0 { min - span * 0.05 } else { 0.0 };
    (low, max + span * 0.12)
}

/// Axis range around the data with 5% padding on either side
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    if max == min {
        return (min - 1.0, max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}

/// Compact amount label: 741999.8 -> "742.0k", 14.62 -> "14.62"
fn format_amount(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if magnitude >= 1_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else {
        format!("{:.2}", value)
    }
}
