use crate::types::{DeltaSeries, EarthDataError, EarthDataResult};
use std::fmt;
use std::path::Path;

/// Layout and labelling of the delta area bar chart
#[derive(Debug, Clone)]
pub struct BarChartParams {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Bar width in date units
    pub bar_width: f64,
    pub bar_color: String,
    /// Stroke width of the white bar edge
    pub edge_width: f64,
}

impl Default for BarChartParams {
    fn default() -> Self {
        Self {
            width: 800,
            height: 500,
            title: "Area increment with respect to first year".to_string(),
            x_label: "year".to_string(),
            y_label: "area increment".to_string(),
            bar_width: 1.0,
            bar_color: "#1f77b4".to_string(),
            edge_width: 0.7,
        }
    }
}

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;

/// Linear map from a data interval to a pixel interval
#[derive(Debug, Clone, Copy)]
struct Scale {
    d0: f64,
    d1: f64,
    p0: f64,
    p1: f64,
}

impl Scale {
    fn map(&self, v: f64) -> f64 {
        self.p0 + (v - self.d0) / (self.d1 - self.d0) * (self.p1 - self.p0)
    }
}

/// Step of 1, 2 or 5 times a power of ten giving roughly `target` intervals over `span`
fn nice_step(span: f64, target: usize) -> f64 {
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Tick label for a percentage value, with as many decimals as the step needs
pub fn format_percent(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil() as usize
    };
    // avoid "-0%"
    let value = if value.abs() < step * 1e-9 { 0.0 } else { value };
    format!("{:.*}%", decimals, value)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Value range with zero included and a 5% margin on both ends
fn value_domain(percentages: &[f64]) -> (f64, f64) {
    let (lo, hi) = percentages
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo <= f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (
        if lo < 0.0 { lo - pad } else { lo },
        if hi > 0.0 { hi + pad } else { hi },
    )
}

/// SVG document for a bar chart of percentage deltas by year
pub fn bar_chart_svg(
    dates: &[i32],
    percentages: &[f64],
    params: &BarChartParams,
) -> EarthDataResult<String> {
    if dates.len() != percentages.len() {
        return Err(EarthDataError::InvalidInput(format!(
            "got {} dates for {} values",
            dates.len(),
            percentages.len()
        )));
    }

    let mut svg = String::new();
    write_chart(&mut svg, dates, percentages, params).map_err(|e| {
        EarthDataError::InvalidInput(format!("failed to format bar chart: {}", e))
    })?;
    Ok(svg)
}

fn write_chart(
    svg: &mut impl fmt::Write,
    dates: &[i32],
    percentages: &[f64],
    params: &BarChartParams,
) -> fmt::Result {
    let width = params.width as f64;
    let height = params.height as f64;
    let half_bar = params.bar_width / 2.0;

    let (first, last) = match (dates.iter().min(), dates.iter().max()) {
        (Some(&lo), Some(&hi)) => (lo as f64, hi as f64),
        _ => (0.0, 1.0),
    };
    let x = Scale {
        d0: first - half_bar - 0.5,
        d1: last + half_bar + 0.5,
        p0: MARGIN_LEFT,
        p1: width - MARGIN_RIGHT,
    };

    let (y_lo, y_hi) = value_domain(percentages);
    let y = Scale {
        d0: y_lo,
        d1: y_hi,
        p0: height - MARGIN_BOTTOM,
        p1: MARGIN_TOP,
    };

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = params.width,
        h = params.height
    )?;
    writeln!(svg, r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#, width, height)?;
    writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="16" text-anchor="middle">{}</text>"#,
        width / 2.0,
        MARGIN_TOP / 2.0 + 6.0,
        escape(&params.title)
    )?;

    // y grid and percentage ticks
    let y_step = nice_step(y_hi - y_lo, 6);
    let mut tick = (y_lo / y_step).ceil() * y_step;
    while tick <= y_hi + y_step * 1e-9 {
        let py = y.map(tick);
        writeln!(
            svg,
            r##"<line x1="{:.1}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="#dddddd" stroke-width="0.5"/>"##,
            MARGIN_LEFT,
            width - MARGIN_RIGHT,
            py = py
        )?;
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"#,
            MARGIN_LEFT - 6.0,
            py + 4.0,
            format_percent(tick, y_step)
        )?;
        tick += y_step;
    }

    // bars
    for (&date, &value) in dates.iter().zip(percentages) {
        if !value.is_finite() {
            log::warn!("Skipping non-finite value for {}", date);
            continue;
        }
        let x0 = x.map(date as f64 - half_bar);
        let x1 = x.map(date as f64 + half_bar);
        let top = y.map(value.max(0.0));
        let bottom = y.map(value.min(0.0));
        writeln!(
            svg,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="white" stroke-width="{}"><title>{}: {:.2}%</title></rect>"#,
            x0,
            top,
            x1 - x0,
            bottom - top,
            params.bar_color,
            params.edge_width,
            date,
            value
        )?;
    }

    // x ticks, thinned so labels do not overlap
    if !dates.is_empty() {
        let span = (last - first).max(1.0);
        let x_step = nice_step(span, 10).max(1.0) as i32;
        let mut year = first as i32;
        while year <= last as i32 {
            let px = x.map(year as f64);
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"#,
                px,
                height - MARGIN_BOTTOM + 16.0,
                year
            )?;
            year += x_step;
        }
    }

    // axes and zero baseline
    let zero = y.map(0.0);
    writeln!(
        svg,
        r#"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="black"/>"#,
        l = MARGIN_LEFT,
        t = MARGIN_TOP,
        b = height - MARGIN_BOTTOM
    )?;
    writeln!(
        svg,
        r#"<line x1="{:.1}" y1="{z:.1}" x2="{:.1}" y2="{z:.1}" stroke="black"/>"#,
        MARGIN_LEFT,
        width - MARGIN_RIGHT,
        z = zero
    )?;

    writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle">{}</text>"#,
        (MARGIN_LEFT + width - MARGIN_RIGHT) / 2.0,
        height - 15.0,
        escape(&params.x_label)
    )?;
    writeln!(
        svg,
        r#"<text x="18" y="{cy:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 18 {cy:.1})">{}</text>"#,
        escape(&params.y_label),
        cy = (MARGIN_TOP + height - MARGIN_BOTTOM) / 2.0
    )?;
    writeln!(svg, "</svg>")
}

/// Write the bar chart of `percentages` by year to an SVG file at `path`
pub fn render_delta_bar_chart<P: AsRef<Path>>(
    dates: &[i32],
    percentages: &[f64],
    path: P,
    params: &BarChartParams,
) -> EarthDataResult<()> {
    let svg = bar_chart_svg(dates, percentages, params)?;
    std::fs::write(path.as_ref(), svg)?;
    log::info!(
        "Rendered {} bars to {}",
        dates.len(),
        path.as_ref().display()
    );
    Ok(())
}

impl DeltaSeries<i32> {
    /// Render this series with [`render_delta_bar_chart`]
    pub fn render<P: AsRef<Path>>(&self, path: P, params: &BarChartParams) -> EarthDataResult<()> {
        render_delta_bar_chart(&self.dates, &self.percentages, path, params)
    }
}
