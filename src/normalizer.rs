//! Feature standardization
//!
//! Column-wise z-scoring fitted on the run's own population:
//! - per-column mean and population standard deviation
//! - zero-variance columns map to 0.0 instead of dividing by zero
//!
//! Fitted parameters stay attached to the run; there is no cross-run state.

use ndarray::{Array1, Array2, Axis};

/// Fitted per-column standardization parameters
#[derive(Debug, Clone)]
pub struct Standardizer {
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl Standardizer {
    /// Fit per-column mean and population standard deviation.
    pub fn fit(matrix: &Array2<f64>) -> Self {
        let cols = matrix.ncols();
        if matrix.nrows() == 0 {
            return Self {
                means: Array1::zeros(cols),
                stds: Array1::zeros(cols),
            };
        }
        let means = matrix
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(cols));
        let stds = matrix.std_axis(Axis(0), 0.0);
        Self { means, stds }
    }

    /// Z-score every column using the fitted parameters.
    pub fn transform(&self, matrix: &Array2<f64>) -> Array2<f64> {
        let mut out = matrix.clone();
        for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
            let mean = self.means[j];
            let std = self.stds[j];
            for value in column.iter_mut() {
                *value = if std > 0.0 { (*value - mean) / std } else { 0.0 };
            }
        }
        out
    }

    /// Fit and transform in one step.
    pub fn fit_transform(matrix: &Array2<f64>) -> (Self, Array2<f64>) {
        let standardizer = Self::fit(matrix);
        let transformed = standardizer.transform(matrix);
        (standardizer, transformed)
    }

    /// Fitted per-column means.
    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    /// Fitted per-column standard deviations.
    pub fn stds(&self) -> &Array1<f64> {
        &self.stds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_transformed_columns_are_zero_mean_unit_variance() {
        let matrix = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let (_, z) = Standardizer::fit_transform(&matrix);

        for j in 0..z.ncols() {
            let column = z.column(j);
            let mean = column.mean().unwrap();
            let var = column.mapv(|v| (v - mean).powi(2)).mean().unwrap();
            assert!(mean.abs() < 1e-9);
            assert!((var - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let matrix = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let (standardizer, z) = Standardizer::fit_transform(&matrix);

        assert_eq!(standardizer.stds()[0], 0.0);
        assert!(z.column(0).iter().all(|v| *v == 0.0));
        assert!(z.column(1).iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_transform_reuses_fitted_parameters() {
        let train = array![[0.0], [2.0]];
        let standardizer = Standardizer::fit(&train);

        // mean 1, population std 1
        let z = standardizer.transform(&array![[3.0]]);
        assert!((z[[0, 0]] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_matrix_fits_without_panicking() {
        let empty = Array2::<f64>::zeros((0, 3));
        let standardizer = Standardizer::fit(&empty);
        assert_eq!(standardizer.means().len(), 3);
        assert_eq!(standardizer.stds().len(), 3);
    }
}
