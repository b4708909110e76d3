//! Rendering of band matrices and delta area charts

pub mod bar_chart;
pub mod colormap;
pub mod matrix_image;

pub use bar_chart::{bar_chart_svg, render_delta_bar_chart, BarChartParams};
pub use colormap::Colormap;
pub use matrix_image::{matrix_to_image, render_array, render_matrix, RenderParams};
