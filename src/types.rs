use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Single-band raster sampled from one observation (rows x cols)
pub type Matrix = Array2<f64>;

/// Geographic point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Geospatial rectangle, in the same degree units as the point it was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Rectangle {
    /// Rectangle of `width` x `height` degrees centered on `center`
    pub fn centered(center: GeoPoint, width: f64, height: f64) -> Self {
        Self {
            min_lon: center.lon - width / 2.0,
            min_lat: center.lat - height / 2.0,
            max_lon: center.lon + width / 2.0,
            max_lat: center.lat + height / 2.0,
        }
    }

    /// Corner coordinates as (xmin, ymin, xmax, ymax)
    pub fn coordinates(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

/// Filtered, time-sorted handle to a remote image collection.
///
/// `start` is inclusive and `end` exclusive, matching the service's date filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    pub dataset: String,
    pub band: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One observation of an image series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesEntry {
    /// Image id as reported by the service (e.g. `2000_02_24`)
    pub id: String,
    pub date: NaiveDate,
    /// Band values flattened in row-major order
    pub data: Vec<f64>,
}

impl SeriesEntry {
    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Ordered time series of cropped band matrices.
///
/// `rows`/`cols` are taken from the last processed observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSeries {
    pub entries: Vec<SeriesEntry>,
    pub rows: usize,
    pub cols: usize,
}

impl ImageSeries {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.entries.iter().map(SeriesEntry::year).collect()
    }

    /// Per-observation inputs as single-element year rows
    pub fn inputs(&self) -> Vec<[i32; 1]> {
        self.entries.iter().map(|e| [e.year()]).collect()
    }

    /// Reshape observation `index` into a `rows x cols` matrix
    pub fn matrix(&self, index: usize) -> EarthDataResult<Matrix> {
        let entry = self.entries.get(index).ok_or_else(|| {
            EarthDataError::InvalidInput(format!(
                "observation {} out of range (series has {})",
                index,
                self.entries.len()
            ))
        })?;

        Array2::from_shape_vec((self.rows, self.cols), entry.data.clone()).map_err(|e| {
            EarthDataError::InvalidInput(format!(
                "observation {} ({} values) does not fit {}x{}: {}",
                entry.id,
                entry.data.len(),
                self.rows,
                self.cols,
                e
            ))
        })
    }

    pub fn matrices(&self) -> EarthDataResult<Vec<Matrix>> {
        (0..self.entries.len()).map(|i| self.matrix(i)).collect()
    }
}

/// Percentage change series, index-aligned with its source dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaSeries<D> {
    pub dates: Vec<D>,
    pub percentages: Vec<f64>,
}

impl<D> DeltaSeries<D> {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&D, f64)> {
        self.dates.iter().zip(self.percentages.iter().copied())
    }
}

/// Error types for image series retrieval and analysis
#[derive(Debug, thiserror::Error)]
pub enum EarthDataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Service error {code} ({status}): {message}")]
    Service {
        code: u16,
        status: String,
        message: String,
    },

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    #[error("No dataset selected, call select_dataset() first")]
    DatasetNotSelected,

    #[error("Delta area is undefined: reference matrix has no non-zero pixels")]
    UndefinedDelta,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for earthdata operations
pub type EarthDataResult<T> = Result<T, EarthDataError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> ImageSeries {
        ImageSeries {
            entries: vec![
                SeriesEntry {
                    id: "2000_02_24".to_string(),
                    date: NaiveDate::from_ymd_opt(2000, 2, 24).unwrap(),
                    data: vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0],
                },
                SeriesEntry {
                    id: "2001_01_01".to_string(),
                    date: NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
                    data: vec![1.0; 6],
                },
            ],
            rows: 2,
            cols: 3,
        }
    }

    #[test]
    fn test_rectangle_centered() {
        let rect = Rectangle::centered(GeoPoint::new(-103.06, 20.24), 0.8, 0.3);
        let [xmin, ymin, xmax, ymax] = rect.coordinates();
        assert!((xmin - -103.46).abs() < 1e-9);
        assert!((ymin - 20.09).abs() < 1e-9);
        assert!((xmax - -102.66).abs() < 1e-9);
        assert!((ymax - 20.39).abs() < 1e-9);
    }

    #[test]
    fn test_series_years_and_inputs() {
        let series = series();
        assert_eq!(series.years(), vec![2000, 2001]);
        assert_eq!(series.inputs(), vec![[2000], [2001]]);
    }

    #[test]
    fn test_series_matrix_reshape() {
        let series = series();
        let matrix = series.matrix(0).unwrap();
        assert_eq!(matrix.dim(), (2, 3));
        assert_eq!(matrix[[1, 0]], 0.0);
        assert_eq!(matrix[[1, 2]], 1.0);

        assert!(matches!(series.matrix(5), Err(EarthDataError::InvalidInput(_))));
    }

    #[test]
    fn test_series_matrix_shape_mismatch() {
        let mut series = series();
        series.entries[1].data.pop();
        assert!(series.matrix(0).is_ok());
        assert!(series.matrices().is_err());
    }
}
