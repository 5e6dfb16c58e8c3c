use std::path::Path;

use anyhow::Result;
use dpu_bench::report::{BreakdownRow, ComprTaskletRow};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use crate::series::{self, PHASES, SpeedupLines, TradeoffGroups, category_label};

const PALETTE: [RGBColor; 7] = [
    RGBColor(0xc9, 0xb3, 0x95),
    RGBColor(0x5c, 0x48, 0x32),
    RGBColor(0x2e, 0x3d, 0x18),
    RGBColor(0x4e, 0x66, 0x25),
    RGBColor(0x80, 0xbe, 0x1b),
    RGBColor(0xcb, 0xd9, 0x70),
    RGBColor(0x62, 0x7c, 0x98),
];
const LINE: RGBColor = RGBColor(0x08, 0x31, 0x5a);
const SLOWDOWN: RGBColor = RGBColor(0xd3, 0x5e, 0x60);
const SPEEDUP: RGBColor = RGBColor(0x84, 0xba, 0x5b);

const SIZE: (u32, u32) = (680, 300);
const FONT: (&str, u32) = ("sans-serif", 14);

fn color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// Headroom above the tallest value.
fn upper(max: f64) -> f64 {
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

pub struct Labels<'a> {
    pub title: &'a str,
    pub x: &'a str,
    pub y: &'a str,
}

pub fn speedup(lines: &SpeedupLines, labels: &Labels, out: &Path) -> Result<()> {
    let points = lines.lines.values().flatten();
    let x_max = points.clone().map(|p| p.0).fold(0.0, f64::max);
    let y_max = points.map(|p| p.1).fold(lines.host, f64::max);

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.title, FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..upper(x_max), 0f64..upper(y_max))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(labels.x)
        .y_desc(labels.y)
        .draw()?;

    chart
        .draw_series(DashedLineSeries::new(
            vec![(0.0, lines.host), (upper(x_max), lines.host)],
            6,
            4,
            BLACK.stroke_width(1),
        ))?
        .label("Host")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    for (i, (version, points)) in lines.lines.iter().enumerate() {
        let c = color(i);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), c.stroke_width(2)))?
            .label(version.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], c.stroke_width(2)));
        chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, c.filled())))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

pub fn breakdown(rows: &[BreakdownRow], labels: &Labels, out: &Path) -> Result<()> {
    let dpus: Vec<u32> = rows.iter().map(|r| r.dpus).collect();
    let y_max = rows.iter().map(BreakdownRow::total).fold(0.0, f64::max);
    let n = rows.len().max(1) as f64;

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.title, FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..n - 0.5, 0f64..upper(y_max))?;

    let x_label = |x: &f64| category_label(&dpus, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(rows.len().max(1))
        .x_label_formatter(&x_label)
        .x_desc(labels.x)
        .y_desc(labels.y)
        .draw()?;

    for (phase, name) in PHASES.iter().enumerate() {
        let c = color(phase);
        chart
            .draw_series(rows.iter().enumerate().map(|(i, row)| {
                let (_, bottom, top) = series::stack(row)[phase];
                let x = i as f64;
                Rectangle::new([(x - 0.35, bottom), (x + 0.35, top)], c.filled())
            }))?
            .label(*name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], c.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

pub fn compr_tasklets(rows: &[ComprTaskletRow], labels: &Labels, out: &Path) -> Result<()> {
    let tasklets: Vec<u32> = rows.iter().map(|r| r.tasklets).collect();
    let time_max = rows.iter().map(|r| r.time).fold(0.0, f64::max);
    let ratio_max = rows.iter().map(|r| r.compratio).fold(0.0, f64::max);
    let n = rows.len().max(1) as f64;

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.title, FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .right_y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..n - 0.5, 0f64..upper(time_max))?
        .set_secondary_coord(-0.5f64..n - 0.5, 0f64..upper(ratio_max));

    let x_label = |x: &f64| category_label(&tasklets, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(rows.len().max(1))
        .x_label_formatter(&x_label)
        .x_desc(labels.x)
        .y_desc(labels.y)
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc("Compression Ratio")
        .draw()?;

    chart.draw_series(rows.iter().enumerate().map(|(i, row)| {
        let x = i as f64;
        Rectangle::new([(x - 0.45, 0.0), (x + 0.45, row.time)], PALETTE[6].filled())
    }))?;

    let ratio_points: Vec<(f64, f64)> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (i as f64, row.compratio))
        .collect();
    chart.draw_secondary_series(LineSeries::new(
        ratio_points.iter().copied(),
        LINE.stroke_width(2),
    ))?;
    chart.draw_secondary_series(
        ratio_points
            .iter()
            .map(|&p| Circle::new(p, 3, LINE.filled())),
    )?;

    root.present()?;
    Ok(())
}

pub fn tradeoff(groups: &TradeoffGroups, labels: &Labels, out: &Path) -> Result<()> {
    let y_max = groups
        .series
        .iter()
        .flat_map(|(_, bars)| bars.iter().copied())
        .fold(0.0, f64::max);
    let n = groups.dpus.len().max(1) as f64;
    let width = 0.8 / groups.series.len().max(1) as f64;

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.title, FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..n - 0.5, 0f64..upper(y_max))?;

    let x_label = |x: &f64| category_label(&groups.dpus, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(groups.dpus.len().max(1))
        .x_label_formatter(&x_label)
        .x_desc(labels.x)
        .y_desc(labels.y)
        .draw()?;

    for (s, (tasklets, bars)) in groups.series.iter().enumerate() {
        let c = color(s);
        let offset = -0.4 + s as f64 * width;
        chart
            .draw_series(bars.iter().enumerate().map(|(i, &v)| {
                let x = i as f64 + offset;
                Rectangle::new([(x, 0.0), (x + width, v)], c.filled())
            }))?
            .label(format!("{tasklets} Tasklets"))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], c.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Horizontal bars, red below zero, green above.
pub fn percent(bars: &[(String, f64)], labels: &Labels, out: &Path) -> Result<()> {
    let names: Vec<&str> = bars.iter().map(|(name, _)| name.as_str()).collect();
    let lo = bars.iter().map(|b| b.1).fold(0.0, f64::min);
    let hi = bars.iter().map(|b| b.1).fold(0.0, f64::max);
    let n = bars.len().max(1) as f64;
    let x_lo = if lo < 0.0 { lo * 1.1 } else { 0.0 };

    let root = SVGBackend::new(out, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.title, FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(x_lo..upper(hi), -0.5f64..n - 0.5)?;

    let y_label = |y: &f64| category_label(&names, *y);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(bars.len().max(1))
        .y_label_formatter(&y_label)
        .x_desc(labels.x)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, v))| {
        let y = i as f64;
        let c = if *v < 0.0 { SLOWDOWN } else { SPEEDUP };
        Rectangle::new([(0.0, y - 0.35), (*v, y + 0.35)], c.filled())
    }))?;

    root.present()?;
    Ok(())
}
