use crate::types::{DeltaSeries, EarthDataError, EarthDataResult, ImageSeries};
use ndarray::{ArrayBase, ArrayView1, Data, Dimension};
use num_traits::Zero;

/// Number of non-zero entries, used as a proxy for the area of a detected feature.
///
/// Shape is ignored; the array is treated as a flat collection of values.
pub fn count_nonzero<S, D>(matrix: &ArrayBase<S, D>) -> usize
where
    S: Data,
    S::Elem: Zero,
    D: Dimension,
{
    matrix.iter().filter(|v| !v.is_zero()).count()
}

/// Delta area `(area(desired) - area(reference)) / area(reference)` as a signed ratio.
///
/// Shapes are not compared. Fails with [`EarthDataError::UndefinedDelta`] when the
/// reference has no non-zero pixels.
pub fn compute_delta<S1, S2, D1, D2>(
    desired: &ArrayBase<S1, D1>,
    reference: &ArrayBase<S2, D2>,
) -> EarthDataResult<f64>
where
    S1: Data,
    S1::Elem: Zero,
    S2: Data,
    S2::Elem: Zero,
    D1: Dimension,
    D2: Dimension,
{
    let reference_area = count_nonzero(reference);
    if reference_area == 0 {
        return Err(EarthDataError::UndefinedDelta);
    }

    let desired_area = count_nonzero(desired);
    Ok((desired_area as f64 - reference_area as f64) / reference_area as f64)
}

/// Percentage delta area of every matrix with respect to the first one.
///
/// The reference stays `matrices[0]` for the whole series.
pub fn build_delta_series<D, S, Dim>(
    dates: &[D],
    matrices: &[ArrayBase<S, Dim>],
) -> EarthDataResult<DeltaSeries<D>>
where
    D: Clone,
    S: Data,
    S::Elem: Zero,
    Dim: Dimension,
{
    if dates.len() != matrices.len() {
        return Err(EarthDataError::InvalidInput(format!(
            "got {} dates for {} matrices",
            dates.len(),
            matrices.len()
        )));
    }

    let reference = matrices.first().ok_or_else(|| {
        EarthDataError::InvalidInput("delta series needs at least one matrix".to_string())
    })?;

    log::debug!(
        "Reference matrix has {} non-zero pixels",
        count_nonzero(reference)
    );

    let percentages = matrices
        .iter()
        .map(|matrix| compute_delta(matrix, reference).map(|delta| delta * 100.0))
        .collect::<EarthDataResult<Vec<f64>>>()?;

    Ok(DeltaSeries {
        dates: dates.to_vec(),
        percentages,
    })
}

impl ImageSeries {
    /// Yearly delta area series of this image series.
    ///
    /// Observations are counted as flat values, so they need not share the
    /// series' `rows x cols` shape.
    pub fn delta_series(&self) -> EarthDataResult<DeltaSeries<i32>> {
        let values: Vec<ArrayView1<f64>> = self
            .entries
            .iter()
            .map(|entry| ArrayView1::from(&entry.data[..]))
            .collect();
        build_delta_series(&self.years(), &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeriesEntry;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use ndarray::{Array1, Array2};

    /// 5x5 matrix whose first `count` entries are set
    fn mask(count: usize) -> Array2<u8> {
        let mut m = Array2::zeros((5, 5));
        for (i, v) in m.iter_mut().enumerate() {
            if i < count {
                *v = 1;
            }
        }
        m
    }

    #[test]
    fn test_count_nonzero() {
        let m = Array2::from_shape_vec((2, 3), vec![0.0, 2.5, -1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(count_nonzero(&m), 3);
        assert_eq!(count_nonzero(&Array1::<i32>::zeros(7)), 0);
    }

    #[test]
    fn test_self_delta_is_zero() {
        for count in 1..=25 {
            let m = mask(count);
            assert_eq!(compute_delta(&m, &m).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_delta_ratio() {
        let delta = compute_delta(&mask(12), &mask(10)).unwrap();
        assert_abs_diff_eq!(delta, 0.2, epsilon = 1e-12);

        let shrink = compute_delta(&mask(5), &mask(10)).unwrap();
        assert_abs_diff_eq!(shrink, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_delta_ignores_shape() {
        let flat = Array1::from(vec![1u8; 12]);
        let delta = compute_delta(&flat, &mask(10)).unwrap();
        assert_abs_diff_eq!(delta, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_reference_is_undefined() {
        let result = compute_delta(&mask(3), &mask(0));
        assert!(matches!(result, Err(EarthDataError::UndefinedDelta)));
    }

    #[test]
    fn test_series_percentages() {
        let matrices = vec![mask(10), mask(12)];
        let series = build_delta_series(&[2000, 2001], &matrices).unwrap();
        assert_eq!(series.dates, vec![2000, 2001]);
        assert_abs_diff_eq!(series.percentages[1], 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_series_fixed_reference() {
        let matrices = vec![mask(10), mask(10), mask(15)];
        let series = build_delta_series(&[2000, 2001, 2002], &matrices).unwrap();
        assert_eq!(series.percentages, vec![0.0, 0.0, 50.0]);

        // A rolling reference would report 0% for the last step here
        let matrices = vec![mask(10), mask(20), mask(20)];
        let series = build_delta_series(&[2000, 2001, 2002], &matrices).unwrap();
        assert_eq!(series.percentages, vec![0.0, 100.0, 100.0]);
    }

    #[test]
    fn test_constant_series_is_all_zero() {
        let matrices = vec![mask(7); 6];
        let dates: Vec<i32> = (2000..2006).collect();
        let series = build_delta_series(&dates, &matrices).unwrap();
        assert_eq!(series.len(), 6);
        assert_eq!(series.dates, dates);
        assert!(series.percentages.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn test_series_preconditions() {
        let empty: Vec<Array2<u8>> = Vec::new();
        assert!(matches!(
            build_delta_series::<i32, _, _>(&[], &empty),
            Err(EarthDataError::InvalidInput(_))
        ));
        assert!(matches!(
            build_delta_series(&[2000, 2001], &[mask(3)]),
            Err(EarthDataError::InvalidInput(_))
        ));
        assert!(matches!(
            build_delta_series(&[2000, 2001], &[mask(0), mask(3)]),
            Err(EarthDataError::UndefinedDelta)
        ));
    }

    #[test]
    fn test_image_series_delta() {
        let entry = |y: i32, count: usize| SeriesEntry {
            id: format!("{}_01_01", y),
            date: NaiveDate::from_ymd_opt(y, 1, 1).unwrap(),
            data: mask(count).iter().map(|v| *v as f64).collect(),
        };
        let series = ImageSeries {
            entries: vec![entry(2000, 10), entry(2001, 10), entry(2002, 15)],
            rows: 5,
            cols: 5,
        };

        let delta = series.delta_series().unwrap();
        assert_eq!(delta.dates, vec![2000, 2001, 2002]);
        assert_eq!(delta.percentages, vec![0.0, 0.0, 50.0]);
    }

    #[test]
    fn test_image_series_delta_with_unequal_observations() {
        let entry = |y: i32, data: Vec<f64>| SeriesEntry {
            id: format!("{}_01_01", y),
            date: NaiveDate::from_ymd_opt(y, 1, 1).unwrap(),
            data,
        };
        let series = ImageSeries {
            entries: vec![
                entry(2000, vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0]),
                entry(2001, vec![1.0, 1.0, 0.0, 1.0]),
            ],
            rows: 2,
            cols: 2,
        };

        // the first observation does not fit 2x2, counting still works
        assert!(series.matrices().is_err());
        let delta = series.delta_series().unwrap();
        assert_eq!(delta.percentages, vec![0.0, -25.0]);
    }
}
