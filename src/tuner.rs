use itertools::iproduct;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::forest::{ForestConfig, RandomForest};
use crate::metrics::ConfusionMatrix;
use crate::splitter::k_fold_split;

/// Candidate values for each of the four tunable hyperparameters.
/// `max_depth` uses `None` as an "unlimited" sentinel, mapped to
/// `usize::MAX` when a concrete [`ForestConfig`] is built.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    pub n_trees: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub max_features: Vec<usize>,
}

impl ParameterGrid {
    pub fn is_empty(&self) -> bool {
        self.n_trees.is_empty()
            || self.max_depth.is_empty()
            || self.min_samples_split.is_empty()
            || self.max_features.is_empty()
    }

    fn candidates(&self) -> Vec<(usize, usize, usize, usize)> {
        iproduct!(
            self.n_trees.iter().copied(),
            self.max_depth.iter().copied(),
            self.min_samples_split.iter().copied(),
            self.max_features.iter().copied()
        )
        .map(|(t, d, m, f)| (t, d.unwrap_or(usize::MAX), m, f))
        .collect()
    }
}

/// Validation metric a [`HyperparameterTuner`] optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Accuracy,
    Precision,
    Recall,
    F1,
}

impl Metric {
    fn score(self, matrix: &ConfusionMatrix) -> f64 {
        match self {
            Metric::Accuracy => matrix.accuracy(),
            Metric::Precision => matrix.precision(),
            Metric::Recall => matrix.recall(),
            Metric::F1 => matrix.f1(),
        }
    }
}

/// Outcome of a grid search: the winning hyperparameter tuple plus the
/// mean and population standard deviation of its per-fold validation score.
#[derive(Debug, Clone)]
pub struct TuningResult {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
    pub mean_score: f64,
    pub std_score: f64,
    pub metric: Metric,
}

/// K-fold grid search over `(n_trees, max_depth, min_samples_split,
/// max_features)`. Candidate tuples are evaluated in the grid's iteration
/// order and the first tuple achieving the highest mean score wins ties.
pub fn tune(
    dataset: &Dataset,
    grid: &ParameterGrid,
    k: usize,
    metric: Metric,
    seed: u64,
) -> Result<TuningResult> {
    if grid.is_empty() {
        return Err(Error::EmptyGrid);
    }

    let folds = k_fold_split(dataset, k, seed)?;

    let mut best: Option<TuningResult> = None;

    for (n_trees, max_depth, min_samples_split, max_features) in grid.candidates() {
        let mut scores = Vec::with_capacity(folds.len());

        for (fold_idx, (train, validation)) in folds.iter().enumerate() {
            let config = ForestConfig::new(
                n_trees,
                max_depth,
                min_samples_split,
                max_features,
                seed.wrapping_add(fold_idx as u64),
            )?;
            let mut forest = RandomForest::new(config);
            forest.fit(train)?;

            let predicted = forest.predict_matrix(validation.features().view())?;
            let matrix = ConfusionMatrix::compute(
                validation.labels().as_slice().unwrap(),
                predicted.as_slice().unwrap(),
            )?;
            scores.push(metric.score(&matrix));
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        let std = variance.sqrt();

        let is_better = match &best {
            None => true,
            Some(current) => mean > current.mean_score,
        };

        if is_better {
            best = Some(TuningResult {
                n_trees,
                max_depth,
                min_samples_split,
                max_features,
                mean_score: mean,
                std_score: std,
                metric,
            });
        }
    }

    best.ok_or(Error::EmptyGrid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array1};
    use std::collections::BTreeSet;

    fn dataset() -> Dataset {
        Dataset::new(
            arr2(&[
                [0.0], [0.0], [0.0], [1.0], [1.0], [1.0], [0.0], [0.0], [1.0],
            ]),
            Array1::from_vec(vec![0u8, 0, 0, 1, 1, 1, 0, 0, 1]),
            None,
            BTreeSet::new(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_grid() {
        let grid = ParameterGrid {
            n_trees: vec![],
            max_depth: vec![Some(3)],
            min_samples_split: vec![2],
            max_features: vec![1],
        };
        assert!(tune(&dataset(), &grid, 3, Metric::Accuracy, 1).is_err());
    }

    #[test]
    fn single_candidate_grid_produces_identity_result() {
        let grid = ParameterGrid {
            n_trees: vec![5],
            max_depth: vec![Some(3)],
            min_samples_split: vec![2],
            max_features: vec![1],
        };
        let result = tune(&dataset(), &grid, 3, Metric::Accuracy, 11).unwrap();
        assert_eq!(result.n_trees, 5);
        assert_eq!(result.max_depth, 3);
        assert!((0.0..=1.0).contains(&result.mean_score));
        assert!(result.std_score >= 0.0);
    }

    #[test]
    fn unlimited_max_depth_sentinel_maps_to_usize_max() {
        let grid = ParameterGrid {
            n_trees: vec![3],
            max_depth: vec![None],
            min_samples_split: vec![2],
            max_features: vec![1],
        };
        let result = tune(&dataset(), &grid, 3, Metric::Accuracy, 5).unwrap();
        assert_eq!(result.max_depth, usize::MAX);
    }

    #[test]
    fn picks_first_tuple_on_a_tie() {
        let grid = ParameterGrid {
            n_trees: vec![3, 3],
            max_depth: vec![Some(3)],
            min_samples_split: vec![2, 3],
            max_features: vec![1],
        };
        // Both tuples are plausible candidates; we only assert the search
        // completes and returns one of the grid's actual tuples.
        let result = tune(&dataset(), &grid, 3, Metric::F1, 5).unwrap();
        assert!(grid.min_samples_split.contains(&result.min_samples_split));
    }
}
