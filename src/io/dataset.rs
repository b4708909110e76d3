use crate::io::client::ImageCollectionService;
use crate::types::{
    CollectionQuery, EarthDataError, EarthDataResult, GeoPoint, ImageSeries, Rectangle,
    SeriesEntry,
};
use chrono::NaiveDate;
use serde_json::Value;

/// Accessor parameters
#[derive(Debug, Clone)]
pub struct AccessorParams {
    /// Sampling scale in meters
    pub scale: f64,
}

impl Default for AccessorParams {
    fn default() -> Self {
        Self { scale: 100.0 }
    }
}

/// Retrieves cropped band time series from an image collection service
pub struct DatasetAccessor<C> {
    client: C,
    params: AccessorParams,
    query: Option<CollectionQuery>,
}

impl<C: ImageCollectionService> DatasetAccessor<C> {
    /// Create an accessor over an initialized service client
    pub fn new(client: C) -> Self {
        Self::with_params(client, AccessorParams::default())
    }

    pub fn with_params(client: C, params: AccessorParams) -> Self {
        Self {
            client,
            params,
            query: None,
        }
    }

    /// Override the sampling scale
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.params.scale = scale;
        self
    }

    pub fn scale(&self) -> f64 {
        self.params.scale
    }

    /// Currently selected dataset, if any
    pub fn query(&self) -> Option<&CollectionQuery> {
        self.query.as_ref()
    }

    /// Select `band` of `dataset_name` between `start_date` (inclusive) and
    /// `end_date` (exclusive), sorted by acquisition time.
    pub fn select_dataset(
        &mut self,
        dataset_name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        band: &str,
    ) {
        log::info!(
            "Selected dataset {} band {} from {} to {}",
            dataset_name,
            band,
            start_date,
            end_date
        );
        self.query = Some(CollectionQuery {
            dataset: dataset_name.to_string(),
            band: band.to_string(),
            start: start_date,
            end: end_date,
        });
    }

    /// Images of the selected dataset cropped to a `width` x `height` degree
    /// rectangle centered on (`lat`, `lon`).
    ///
    /// Returns `Ok(None)` when the service reports no observations.
    /// Requires [`select_dataset`](Self::select_dataset) to have been called.
    pub fn fetch_series(
        &self,
        lat: f64,
        lon: f64,
        width: f64,
        height: f64,
    ) -> EarthDataResult<Option<ImageSeries>> {
        let query = self.query.as_ref().ok_or(EarthDataError::DatasetNotSelected)?;

        let point = GeoPoint::new(lon, lat);
        let region = Rectangle::centered(point, width, height);
        log::debug!("Crop region: {:?}", region);

        let table = self.client.get_region(query, &point, self.params.scale)?;
        if table.len() < 2 {
            log::warn!("No observations of {} at ({}, {})", query.dataset, lat, lon);
            return Ok(None);
        }

        let id_index = table[0]
            .iter()
            .position(|column| column.as_str() == Some("id"))
            .ok_or_else(|| {
                EarthDataError::MalformedResponse("region header has no 'id' column".to_string())
            })?;

        let mut entries = Vec::with_capacity(table.len() - 1);
        let mut rows = 0;
        let mut cols = 0;

        for row in &table[1..] {
            let id = row
                .get(id_index)
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    EarthDataError::MalformedResponse(format!("observation without id: {:?}", row))
                })?;
            let date = parse_image_date(id)?;

            let matrix = self.client.sample_rectangle(query, date, &region)?;
            let (r, c) = matrix_shape(&matrix)?;
            rows = r;
            cols = c;

            log::debug!("Observation {}: {}x{}", id, r, c);
            entries.push(SeriesEntry {
                id: id.to_string(),
                date,
                data: matrix.into_iter().flatten().collect(),
            });
        }

        log::info!(
            "Fetched {} observations of {} ({}x{})",
            entries.len(),
            query.band,
            rows,
            cols
        );

        Ok(Some(ImageSeries {
            entries,
            rows,
            cols,
        }))
    }
}

/// Image ids encode the acquisition date as `YYYY_MM_DD`
pub fn parse_image_date(id: &str) -> EarthDataResult<NaiveDate> {
    let date = id.replace('_', "-");
    NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
        EarthDataError::MalformedResponse(format!("image id '{}' is not a date: {}", id, e))
    })
}

fn matrix_shape(matrix: &[Vec<f64>]) -> EarthDataResult<(usize, usize)> {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);
    if let Some(bad) = matrix.iter().position(|row| row.len() != cols) {
        return Err(EarthDataError::MalformedResponse(format!(
            "ragged band matrix: row {} has {} values, expected {}",
            bad,
            matrix[bad].len(),
            cols
        )));
    }
    Ok((rows, cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::client::RegionTable;
    use serde_json::json;
    use std::cell::RefCell;

    /// Serves a fixed region table and one matrix per date
    struct FakeService {
        table: RegionTable,
        sampled: RefCell<Vec<NaiveDate>>,
    }

    impl FakeService {
        fn new(table: RegionTable) -> Self {
            Self {
                table,
                sampled: RefCell::new(Vec::new()),
            }
        }
    }

    impl ImageCollectionService for FakeService {
        fn get_region(
            &self,
            _query: &CollectionQuery,
            _point: &GeoPoint,
            _scale: f64,
        ) -> EarthDataResult<RegionTable> {
            Ok(self.table.clone())
        }

        fn sample_rectangle(
            &self,
            _query: &CollectionQuery,
            date: NaiveDate,
            _region: &Rectangle,
        ) -> EarthDataResult<Vec<Vec<f64>>> {
            self.sampled.borrow_mut().push(date);
            let fill = (date.format("%Y").to_string().parse::<i32>().unwrap() - 1999) as usize;
            let mut values = vec![0.0; 6];
            for v in values.iter_mut().take(fill) {
                *v = 1.0;
            }
            Ok(values.chunks(3).map(|c| c.to_vec()).collect())
        }
    }

    fn header() -> Vec<Value> {
        vec![json!("id"), json!("longitude"), json!("latitude"), json!("time"), json!("water_mask")]
    }

    fn row(id: &str) -> Vec<Value> {
        vec![json!(id), json!(-103.06), json!(20.24), json!(0), json!(1)]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fetch_requires_selection() {
        let accessor = DatasetAccessor::new(FakeService::new(vec![header()]));
        let result = accessor.fetch_series(20.24, -103.06, 0.8, 0.3);
        assert!(matches!(result, Err(EarthDataError::DatasetNotSelected)));
    }

    #[test]
    fn test_header_only_is_empty() {
        let mut accessor = DatasetAccessor::new(FakeService::new(vec![header()]));
        accessor.select_dataset("MODIS/006/MOD44W", date(2000, 1, 1), date(2015, 5, 1), "water_mask");
        assert!(accessor.fetch_series(20.24, -103.06, 0.8, 0.3).unwrap().is_none());
    }

    #[test]
    fn test_fetch_series() {
        let table = vec![header(), row("2000_02_24"), row("2001_01_01"), row("2002_01_01")];
        let mut accessor = DatasetAccessor::new(FakeService::new(table));
        accessor.select_dataset("MODIS/006/MOD44W", date(2000, 1, 1), date(2015, 5, 1), "water_mask");

        let series = accessor
            .fetch_series(20.24, -103.06, 0.8, 0.3)
            .unwrap()
            .expect("observations");
        assert_eq!(series.len(), 3);
        assert_eq!((series.rows, series.cols), (2, 3));
        assert_eq!(series.years(), vec![2000, 2001, 2002]);
        assert_eq!(series.entries[0].date, date(2000, 2, 24));
        assert_eq!(series.entries[2].data, vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_duplicate_rows_are_kept() {
        let table = vec![header(), row("2000_02_24"), row("2000_02_24")];
        let service = FakeService::new(table);
        let mut accessor = DatasetAccessor::new(&service);
        accessor.select_dataset("MODIS/006/MOD44W", date(2000, 1, 1), date(2015, 5, 1), "water_mask");

        let series = accessor.fetch_series(0.0, 0.0, 1.0, 1.0).unwrap().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(service.sampled.borrow().len(), 2);
    }

    #[test]
    fn test_missing_id_column() {
        let table = vec![vec![json!("longitude")], vec![json!(1.0)]];
        let mut accessor = DatasetAccessor::new(FakeService::new(table));
        accessor.select_dataset("X", date(2000, 1, 1), date(2001, 1, 1), "b");
        assert!(matches!(
            accessor.fetch_series(0.0, 0.0, 1.0, 1.0),
            Err(EarthDataError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_image_date() {
        assert_eq!(parse_image_date("2003_02_18").unwrap(), date(2003, 2, 18));
        assert!(parse_image_date("LC08_044034_20170614").is_err());
    }

    #[test]
    fn test_matrix_shape() {
        assert_eq!(matrix_shape(&[vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap(), (2, 2));
        assert_eq!(matrix_shape(&[]).unwrap(), (0, 0));
        assert!(matrix_shape(&[vec![1.0, 0.0], vec![0.0]]).is_err());
    }

    #[test]
    fn test_scale_override() {
        let accessor = DatasetAccessor::new(FakeService::new(vec![])).with_scale(250.0);
        assert_eq!(accessor.scale(), 250.0);
        assert!(accessor.query().is_none());
    }
}
