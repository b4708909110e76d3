use crate::types::{CollectionQuery, EarthDataError, EarthDataResult, GeoPoint, Rectangle};
use chrono::NaiveDate;
use serde_json::Value;

/// Region table: header row followed by one row per observation
pub type RegionTable = Vec<Vec<Value>>;

/// Query capability of a remote image collection service.
///
/// The accessor only depends on this trait, so a session handle (or a fake in
/// tests) is passed in explicitly instead of relying on global initialization.
pub trait ImageCollectionService {
    /// Per-observation metadata of `query` at `point`, sampled at `scale` meters
    fn get_region(
        &self,
        query: &CollectionQuery,
        point: &GeoPoint,
        scale: f64,
    ) -> EarthDataResult<RegionTable>;

    /// Band values of the first image of `query` acquired on `date`, cropped to `region`
    fn sample_rectangle(
        &self,
        query: &CollectionQuery,
        date: NaiveDate,
        region: &Rectangle,
    ) -> EarthDataResult<Vec<Vec<f64>>>;
}

impl<T: ImageCollectionService + ?Sized> ImageCollectionService for &T {
    fn get_region(
        &self,
        query: &CollectionQuery,
        point: &GeoPoint,
        scale: f64,
    ) -> EarthDataResult<RegionTable> {
        (**self).get_region(query, point, scale)
    }

    fn sample_rectangle(
        &self,
        query: &CollectionQuery,
        date: NaiveDate,
        region: &Rectangle,
    ) -> EarthDataResult<Vec<Vec<f64>>> {
        (**self).sample_rectangle(query, date, region)
    }
}

impl<T: ImageCollectionService + ?Sized> ImageCollectionService for Box<T> {
    fn get_region(
        &self,
        query: &CollectionQuery,
        point: &GeoPoint,
        scale: f64,
    ) -> EarthDataResult<RegionTable> {
        (**self).get_region(query, point, scale)
    }

    fn sample_rectangle(
        &self,
        query: &CollectionQuery,
        date: NaiveDate,
        region: &Rectangle,
    ) -> EarthDataResult<Vec<Vec<f64>>> {
        (**self).sample_rectangle(query, date, region)
    }
}

/// Decode a `getRegion` result into rows
pub fn parse_region_table(value: Value) -> EarthDataResult<RegionTable> {
    let rows = match value {
        Value::Array(rows) => rows,
        other => {
            return Err(EarthDataError::MalformedResponse(format!(
                "region table is not a list: {}",
                other
            )))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Array(cells) => Ok(cells),
            other => Err(EarthDataError::MalformedResponse(format!(
                "region row {} is not a list: {}",
                i, other
            ))),
        })
        .collect()
}

/// Decode a sampled band into a list of numeric rows
pub fn parse_band_matrix(value: Value) -> EarthDataResult<Vec<Vec<f64>>> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Null => {
            return Err(EarthDataError::MalformedResponse(
                "band not present in sampled image".to_string(),
            ))
        }
        other => {
            return Err(EarthDataError::MalformedResponse(format!(
                "band matrix is not a list: {}",
                other
            )))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(r, row)| {
            let cells = match row {
                Value::Array(cells) => cells,
                other => {
                    return Err(EarthDataError::MalformedResponse(format!(
                        "band row {} is not a list: {}",
                        r, other
                    )))
                }
            };
            cells
                .iter()
                .enumerate()
                .map(|(c, cell)| {
                    cell.as_f64().ok_or_else(|| {
                        EarthDataError::MalformedResponse(format!(
                            "band value at ({}, {}) is not numeric: {}",
                            r, c, cell
                        ))
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_region_table() {
        let table = parse_region_table(json!([
            ["id", "longitude", "latitude", "time", "water_mask"],
            ["2000_02_24", -103.06, 20.24, 951350400000u64, 1]
        ]))
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0][0], "id");
        assert_eq!(table[1][0], "2000_02_24");

        assert!(parse_region_table(json!({"id": 1})).is_err());
        assert!(parse_region_table(json!([["id"], "oops"])).is_err());
    }

    #[test]
    fn test_parse_band_matrix() {
        let matrix = parse_band_matrix(json!([[0, 1, 1], [1, 0, 0]])).unwrap();
        assert_eq!(matrix, vec![vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 0.0]]);

        assert!(matches!(
            parse_band_matrix(Value::Null),
            Err(EarthDataError::MalformedResponse(_))
        ));
        assert!(parse_band_matrix(json!([[0, null]])).is_err());
        assert!(parse_band_matrix(json!([0, 1])).is_err());
    }
}
