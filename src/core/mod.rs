//! Core analysis of image series

pub mod area_delta;

pub use area_delta::{build_delta_series, compute_delta, count_nonzero};
