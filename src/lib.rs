//! earthdata: surface area change from satellite image time series
//!
//! Retrieves a band (e.g. a water mask) from a remote image collection,
//! crops every observation to a rectangle around a point, and measures how the
//! number of non-zero pixels changes with respect to the first observation.

pub mod types;
pub mod io;
pub mod core;
pub mod viz;
pub mod settings;

// Re-export main types and functions for easier access
pub use types::{
    CollectionQuery, DeltaSeries, EarthDataError, EarthDataResult, GeoPoint, ImageSeries, Matrix,
    Rectangle, SeriesEntry,
};

pub use crate::core::{build_delta_series, compute_delta, count_nonzero};
pub use io::{DatasetAccessor, ImageCollectionService, RestClient};
pub use settings::Settings;
