use crate::types::{EarthDataError, EarthDataResult};
use crate::viz::colormap::Colormap;
use image::RgbImage;
use ndarray::{Array2, ArrayView2};
use std::path::Path;

/// Rendering parameters for single-band images
#[derive(Debug, Clone)]
pub struct RenderParams {
    /// Output pixels per matrix cell along each axis
    pub pixel_scale: u32,
    pub colormap: Colormap,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            pixel_scale: 4,
            colormap: Colormap::Viridis,
        }
    }
}

/// Finite value range of `matrix`, `None` if it holds no finite values
fn value_range(matrix: &ArrayView2<f64>) -> Option<(f64, f64)> {
    matrix
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Colorize `matrix` with nearest-neighbour upscaling.
///
/// Matrix index [row, col] maps to the image block starting at
/// (col * scale, row * scale). Values are normalized to the matrix's own range.
pub fn matrix_to_image(matrix: ArrayView2<f64>, params: &RenderParams) -> RgbImage {
    let (rows, cols) = matrix.dim();
    let scale = params.pixel_scale.max(1);
    let (lo, hi) = value_range(&matrix).unwrap_or((0.0, 0.0));
    let span = hi - lo;

    RgbImage::from_fn(cols as u32 * scale, rows as u32 * scale, |x, y| {
        let v = matrix[[(y / scale) as usize, (x / scale) as usize]];
        let t = if span > 0.0 { (v - lo) / span } else { 0.0 };
        params.colormap.evaluate(t)
    })
}

/// Render a flattened `rows x cols` matrix to a PNG at `path`.
///
/// Does nothing and returns `Ok(false)` when there is nothing to draw (empty
/// data or a zero dimension).
pub fn render_matrix<P: AsRef<Path>>(
    data: &[f64],
    rows: usize,
    cols: usize,
    path: P,
    params: &RenderParams,
) -> EarthDataResult<bool> {
    if data.is_empty() || rows == 0 || cols == 0 {
        log::debug!("Nothing to render ({} values, {}x{})", data.len(), rows, cols);
        return Ok(false);
    }

    let matrix = ArrayView2::from_shape((rows, cols), data).map_err(|e| {
        EarthDataError::InvalidInput(format!(
            "cannot reshape {} values into {}x{}: {}",
            data.len(),
            rows,
            cols,
            e
        ))
    })?;

    let img = matrix_to_image(matrix, params);
    img.save(path.as_ref())?;
    log::info!(
        "Rendered {}x{} matrix to {}",
        rows,
        cols,
        path.as_ref().display()
    );
    Ok(true)
}

/// Render an owned matrix to a PNG at `path`
pub fn render_array<P: AsRef<Path>>(
    matrix: &Array2<f64>,
    path: P,
    params: &RenderParams,
) -> EarthDataResult<bool> {
    let (rows, cols) = matrix.dim();
    let data: Vec<f64> = matrix.iter().copied().collect();
    render_matrix(&data, rows, cols, path, params)
}
