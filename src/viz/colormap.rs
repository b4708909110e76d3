//! Colormaps for single-band rendering.

use image::Rgb;

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
struct ColorStop {
    t: f64,
    color: [u8; 3],
}

impl ColorStop {
    const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self { t, color: [r, g, b] }
    }
}

/// Available colormaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// Dark purple -> teal -> yellow
    #[default]
    Viridis,
    /// Black -> white
    Grayscale,
}

const VIRIDIS_STOPS: &[ColorStop] = &[
    ColorStop::new(0.000, 68, 1, 84),
    ColorStop::new(0.125, 71, 44, 122),
    ColorStop::new(0.250, 59, 82, 139),
    ColorStop::new(0.375, 44, 114, 142),
    ColorStop::new(0.500, 33, 145, 140),
    ColorStop::new(0.625, 39, 173, 129),
    ColorStop::new(0.750, 94, 201, 98),
    ColorStop::new(0.875, 170, 220, 50),
    ColorStop::new(1.000, 253, 231, 37),
];

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

fn multi_stop(stops: &[ColorStop], t: f64) -> [u8; 3] {
    if t <= stops[0].t {
        return stops[0].color;
    }
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.t {
            let ratio = (t - lo.t) / (hi.t - lo.t);
            return [
                lerp(lo.color[0], hi.color[0], ratio),
                lerp(lo.color[1], hi.color[1], ratio),
                lerp(lo.color[2], hi.color[2], ratio),
            ];
        }
    }
    stops[stops.len() - 1].color
}

impl Colormap {
    /// Color at normalized position `t`; values outside [0, 1] are clamped, NaN maps to the low end
    pub fn evaluate(&self, t: f64) -> Rgb<u8> {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Viridis => Rgb(multi_stop(VIRIDIS_STOPS, t)),
            Colormap::Grayscale => {
                let v = (t * 255.0).round() as u8;
                Rgb([v, v, v])
            }
        }
    }
}
