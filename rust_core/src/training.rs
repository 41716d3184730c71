//! Training-data provider port and the seeded synthetic provider.
//!
//! The synthetic provider is a placeholder pipeline: it stands in for
//! historical game outcomes until a real source is wired up.

use crate::error::ModelError;
use crate::models::{FeatureVector, FEATURE_COUNT};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};

/// Feature matrix plus the three parallel target vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingData {
    pub features: Vec<FeatureVector>,
    /// Home points minus away points
    pub point_diff: Vec<f64>,
    pub total_points: Vec<f64>,
    /// 1.0 when the home team won, else 0.0
    pub home_win: Vec<f64>,
}

impl TrainingData {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Check shape, label domain and sample count before fitting.
    pub fn validate(&self, min_samples: usize) -> Result<(), ModelError> {
        let n = self.features.len();
        if self.point_diff.len() != n || self.total_points.len() != n || self.home_win.len() != n
        {
            return Err(ModelError::MalformedTrainingData(format!(
                "target lengths ({}, {}, {}) do not match {} feature rows",
                self.point_diff.len(),
                self.total_points.len(),
                self.home_win.len(),
                n
            )));
        }
        if n < min_samples {
            return Err(ModelError::InsufficientData {
                got: n,
                required: min_samples,
            });
        }
        if self.home_win.iter().any(|&w| w != 0.0 && w != 1.0) {
            return Err(ModelError::MalformedTrainingData(
                "home_win targets must be 0 or 1".to_string(),
            ));
        }
        let finite = self
            .features
            .iter()
            .flat_map(|f| f.to_array())
            .chain(self.point_diff.iter().copied())
            .chain(self.total_points.iter().copied())
            .all(f64::is_finite);
        if !finite {
            return Err(ModelError::MalformedTrainingData(
                "non-finite value in training data".to_string(),
            ));
        }
        Ok(())
    }

    /// Row-per-game feature matrix in `FeatureVector::to_array` column order.
    pub(crate) fn matrix(&self) -> Array2<f64> {
        let mut x = Array2::zeros((self.len(), FEATURE_COUNT));
        for (mut row, f) in x.rows_mut().into_iter().zip(&self.features) {
            row.assign(&ndarray::aview1(&f.to_array()));
        }
        x
    }
}

/// Source of labelled historical games.
pub trait TrainingDataProvider: Send + Sync {
    fn training_data(&self) -> Result<TrainingData, ModelError>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

impl TrainingDataProvider for TrainingData {
    fn training_data(&self) -> Result<TrainingData, ModelError> {
        Ok(self.clone())
    }

    fn provider_name(&self) -> &str {
        "in_memory"
    }
}

/// Score noise standard deviation (points)
const NOISE_STD: f64 = 5.0;

/// Seeded generator of plausible basketball outcomes.
#[derive(Debug, Clone)]
pub struct SyntheticTrainingData {
    pub n_samples: usize,
    pub seed: u64,
}

impl SyntheticTrainingData {
    pub fn new(n_samples: usize, seed: u64) -> Self {
        Self { n_samples, seed }
    }
}

impl Default for SyntheticTrainingData {
    fn default() -> Self {
        Self::new(1000, 42)
    }
}

impl TrainingDataProvider for SyntheticTrainingData {
    fn training_data(&self) -> Result<TrainingData, ModelError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let win_pct = Uniform::new(0.2, 0.8);
        let points = Uniform::new(95.0, 120.0);
        let home_court = Uniform::new(1.0, 5.0);
        let noise = Normal::new(0.0, NOISE_STD)
            .map_err(|e| ModelError::MalformedTrainingData(e.to_string()))?;

        let mut data = TrainingData {
            features: Vec::with_capacity(self.n_samples),
            point_diff: Vec::with_capacity(self.n_samples),
            total_points: Vec::with_capacity(self.n_samples),
            home_win: Vec::with_capacity(self.n_samples),
        };

        for _ in 0..self.n_samples {
            let row: [f64; FEATURE_COUNT] = [
                win_pct.sample(&mut rng),
                win_pct.sample(&mut rng),
                points.sample(&mut rng),
                points.sample(&mut rng),
                points.sample(&mut rng),
                points.sample(&mut rng),
                home_court.sample(&mut rng),
                rng.gen_range(1..5) as f64,
                rng.gen_range(1..5) as f64,
            ];
            let f = FeatureVector::from_array(row);

            let home_points = f.home_team_ppg * 0.6
                + (120.0 - f.away_team_points_allowed) * 0.3
                + f.home_court_advantage * 2.0
                + f.days_rest_home * 0.5
                + noise.sample(&mut rng);
            let away_points = f.away_team_ppg * 0.6
                + (120.0 - f.home_team_points_allowed) * 0.3
                - f.home_court_advantage * 0.5
                + f.days_rest_away * 0.5
                + noise.sample(&mut rng);

            let diff = home_points - away_points;
            data.features.push(f);
            data.point_diff.push(diff);
            data.total_points.push(home_points + away_points);
            data.home_win.push(if diff > 0.0 { 1.0 } else { 0.0 });
        }

        Ok(data)
    }

    fn provider_name(&self) -> &str {
        "synthetic"
    }
}
