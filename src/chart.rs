// =============================================================================
// Price Chart — one-year close line rendered to PNG
// =============================================================================

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::market_data::series::PricePoint;
use crate::market_data::PriceSeries;
use crate::types::Ticker;

/// Line colour of the close series.
const LINE_COLOR: RGBColor = RGBColor(0x6c, 0x5c, 0xe7);

/// Draw the close-price line for `series` and write it as a PNG to `path`.
///
/// Needs at least two points; a single bar cannot form a line. When the
/// labelled chart cannot be drawn (typically no usable system font for the
/// caption and axis labels) the bare line is drawn instead.
pub fn render_price_chart(
    series: &PriceSeries,
    ticker: &Ticker,
    path: &Path,
    size: (u32, u32),
) -> Result<()> {
    anyhow::ensure!(
        series.len() >= 2,
        "not enough price data to draw a chart (minimum 2 points, have {})",
        series.len()
    );

    if let Err(e) = draw_labelled(series, ticker, path, size) {
        warn!(ticker = %ticker, error = %format!("{e:#}"), "labelled chart failed, drawing plain line");
        draw_plain(series, path, size)?;
    }

    debug!(ticker = %ticker, path = %path.display(), points = series.len(), "chart rendered");
    Ok(())
}

/// Time and price ranges of the plot, with 10% vertical padding.
fn plot_ranges(points: &[PricePoint]) -> (Range<DateTime<Utc>>, Range<f64>) {
    let min_price = points.iter().map(|p| p.close).fold(f64::INFINITY, f64::min);
    let max_price = points.iter().map(|p| p.close).fold(f64::NEG_INFINITY, f64::max);

    let padding = (max_price - min_price).max(1e-8) * 0.1;
    let y_min = (min_price - padding).max(0.0);
    let y_max = max_price + padding;

    (points[0].timestamp..points[points.len() - 1].timestamp, y_min..y_max)
}

fn draw_labelled(series: &PriceSeries, ticker: &Ticker, path: &Path, (width, height): (u32, u32)) -> Result<()> {
    let points = &series.points;
    let (x_range, y_range) = plot_ranges(points);

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("failed to fill canvas: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{ticker} Stock Price Over Last Year"),
            ("sans-serif", 28).into_font(),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| anyhow::anyhow!("failed to build chart: {e}"))?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Stock Price ($)")
        .x_label_formatter(&|d| d.format("%Y-%m").to_string())
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()
        .map_err(|e| anyhow::anyhow!("failed to draw mesh: {e}"))?;

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|p| (p.timestamp, p.close)),
            LINE_COLOR.stroke_width(2),
        ))
        .map_err(|e| anyhow::anyhow!("failed to draw price line: {e}"))?
        .label("Close Price")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], LINE_COLOR));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| anyhow::anyhow!("failed to draw legend: {e}"))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("failed to write chart to {}: {e}", path.display()))?;
    Ok(())
}

/// Line only: no text is drawn, so no font is needed.
fn draw_plain(series: &PriceSeries, path: &Path, (width, height): (u32, u32)) -> Result<()> {
    let points = &series.points;
    let (x_range, y_range) = plot_ranges(points);

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("failed to fill canvas: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| anyhow::anyhow!("failed to build chart: {e}"))?;

    chart
        .draw_series(LineSeries::new(
            points.iter().map(|p| (p.timestamp, p.close)),
            LINE_COLOR.stroke_width(2),
        ))
        .map_err(|e| anyhow::anyhow!("failed to draw price line: {e}"))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("failed to write chart to {}: {e}", path.display()))?;
    Ok(())
}

/// Unique scratch path for one render, so concurrent requests never share a
/// file.
pub fn scratch_path(dir: &Path, ticker: &Ticker) -> PathBuf {
    let safe: String = ticker
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    dir.join(format!("finddy_{}_{}.png", safe, uuid::Uuid::new_v4()))
}

/// Render to a scratch file under `dir`, read the PNG back and remove the
/// file.
pub fn price_chart_png(
    series: &PriceSeries,
    ticker: &Ticker,
    dir: &Path,
    size: (u32, u32),
) -> Result<Vec<u8>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create chart directory {}", dir.display()))?;

    let path = scratch_path(dir, ticker);
    let rendered = render_price_chart(series, ticker, &path, size);

    let bytes = rendered.and_then(|_| {
        std::fs::read(&path).with_context(|| format!("failed to read chart file {}", path.display()))
    });
    let _ = std::fs::remove_file(&path);

    bytes
}
