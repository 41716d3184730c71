//! Column standardization shared by all three market models.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Per-column `(x - mean) / std` transform fitted on the training matrix.
///
/// Uses the population standard deviation. Columns with zero variance scale
/// by 1 so constant inputs map to 0 instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a row-per-sample matrix. Returns `None` for an empty matrix.
    pub fn fit(x: &Array2<f64>) -> Option<Self> {
        if x.nrows() == 0 {
            return None;
        }
        let means = x.mean_axis(Axis(0))?;
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std > f64::EPSILON { std } else { 1.0 });

        Some(Self {
            means: means.to_vec(),
            scales: scales.to_vec(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform_one(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let means = ArrayView1::from(&self.means[..]);
        let scales = ArrayView1::from(&self.scales[..]);
        (x - &means) / &scales
    }
}
