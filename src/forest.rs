use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::metrics::accuracy;
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// Hyperparameters shared by every tree in a `RandomForest`.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
    pub seed: u64,
}

impl ForestConfig {
    pub fn new(
        n_trees: usize,
        max_depth: usize,
        min_samples_split: usize,
        max_features: usize,
        seed: u64,
    ) -> Result<Self> {
        if n_trees < 1 {
            return Err(Error::InvalidParameter("n_trees must be >= 1".into()));
        }
        if max_depth < 1 {
            return Err(Error::InvalidParameter("max_depth must be >= 1".into()));
        }
        if min_samples_split < 2 {
            return Err(Error::InvalidParameter(
                "min_samples_split must be >= 2".into(),
            ));
        }
        if max_features < 1 {
            return Err(Error::InvalidParameter("max_features must be >= 1".into()));
        }
        Ok(Self {
            n_trees,
            max_depth,
            min_samples_split,
            max_features,
            seed,
        })
    }
}

/// Bootstrap-aggregated ensemble of [`DecisionTree`]s.
///
/// Each tree is trained on an independently bootstrapped sample of the
/// training set using its own PRNG, seeded from a child seed the forest's
/// master PRNG derives *before* dispatching the per-tree work in parallel.
/// This keeps the fitted forest byte-identical across runs regardless of
/// how the thread pool interleaves tree construction.
#[derive(Debug)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        if self.config.max_features > dataset.n_features() {
            return Err(Error::InvalidParameter(format!(
                "max_features {} exceeds feature count {}",
                self.config.max_features,
                dataset.n_features()
            )));
        }

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let child_seeds: Vec<u64> = (0..self.config.n_trees)
            .map(|_| master_rng.gen::<u64>())
            .collect();

        let n = dataset.n_samples();
        let build_tree = |seed: u64| -> Result<DecisionTree> {
            let mut tree_rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
            let sample = dataset.subset(&bootstrap);

            let mut tree = DecisionTree::new(
                DecisionTreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    max_features: self.config.max_features,
                },
                tree_rng,
            )?;
            tree.fit(&sample)?;
            Ok(tree)
        };

        #[cfg(feature = "parallel")]
        let trees: Result<Vec<DecisionTree>> =
            child_seeds.into_par_iter().map(build_tree).collect();

        #[cfg(not(feature = "parallel"))]
        let trees: Result<Vec<DecisionTree>> =
            child_seeds.into_iter().map(build_tree).collect();

        self.trees = trees?;
        Ok(())
    }

    fn votes(&self, features: ArrayView1<f64>) -> Result<[usize; 2]> {
        if self.trees.is_empty() {
            return Err(Error::NotFitted);
        }
        let mut votes = [0usize; 2];
        for tree in &self.trees {
            votes[tree.predict(features)? as usize] += 1;
        }
        Ok(votes)
    }

    /// Majority-vote prediction. Ties (equal vote counts) favor class 1.
    pub fn predict(&self, features: ArrayView1<f64>) -> Result<u8> {
        let votes = self.votes(features)?;
        Ok(if votes[0] > votes[1] { 0 } else { 1 })
    }

    /// Predict every row of a feature matrix.
    pub fn predict_matrix(&self, features: ArrayView2<f64>) -> Result<Array1<u8>> {
        let mut out = Vec::with_capacity(features.nrows());
        for row in features.rows() {
            out.push(self.predict(row)?);
        }
        Ok(Array1::from_vec(out))
    }

    /// Laplace-smoothed P(class 1) estimate: `(votes_for_1 + 1) / (n_trees + 2)`.
    pub fn predict_proba(&self, features: ArrayView1<f64>) -> Result<f64> {
        let votes = self.votes(features)?;
        let t = self.trees.len() as f64;
        Ok((votes[1] as f64 + 1.0) / (t + 2.0))
    }

    /// Accuracy of this forest's predictions against `dataset`'s true labels.
    pub fn score(&self, dataset: &Dataset) -> Result<f64> {
        let predicted = self.predict_matrix(dataset.features().view())?;
        Ok(accuracy(dataset.labels().as_slice().unwrap(), predicted.as_slice().unwrap())?)
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// The fitted trees, in the i=0..T-1 order `fit` produced them. Empty
    /// before `fit` has been called.
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_trees_fitted(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array1 as A1};
    use std::collections::BTreeSet;

    fn trivial_dataset() -> Dataset {
        Dataset::new(
            arr2(&[
                [0.0, 0.0],
                [0.0, 1.0],
                [0.0, 0.0],
                [1.0, 1.0],
                [1.0, 0.0],
                [1.0, 1.0],
            ]),
            A1::from_vec(vec![0u8, 0, 0, 1, 1, 1]),
            None,
            BTreeSet::new(),
        )
        .unwrap()
    }

    #[test]
    fn construction_rejects_bad_hyperparameters() {
        assert!(ForestConfig::new(0, 3, 2, 1, 0).is_err());
        assert!(ForestConfig::new(3, 0, 2, 1, 0).is_err());
        assert!(ForestConfig::new(3, 3, 1, 1, 0).is_err());
        assert!(ForestConfig::new(3, 3, 2, 0, 0).is_err());
    }

    #[test]
    fn fit_then_predict_recovers_separable_labels() {
        let data = trivial_dataset();
        let config = ForestConfig::new(5, 3, 2, 2, 7).unwrap();
        let mut forest = RandomForest::new(config);
        forest.fit(&data).unwrap();

        for i in 0..data.n_samples() {
            assert_eq!(forest.predict(data.row(i)).unwrap(), data.label(i));
        }
    }

    #[test]
    fn fit_is_deterministic_for_a_fixed_seed() {
        let data = trivial_dataset();
        let config_a = ForestConfig::new(9, 3, 2, 2, 123).unwrap();
        let config_b = ForestConfig::new(9, 3, 2, 2, 123).unwrap();

        let mut forest_a = RandomForest::new(config_a);
        let mut forest_b = RandomForest::new(config_b);
        forest_a.fit(&data).unwrap();
        forest_b.fit(&data).unwrap();

        for i in 0..data.n_samples() {
            assert_eq!(
                forest_a.predict(data.row(i)).unwrap(),
                forest_b.predict(data.row(i)).unwrap()
            );
        }
    }

    #[test]
    fn predict_proba_is_laplace_smoothed_for_single_tree() {
        let data = trivial_dataset();
        let config = ForestConfig::new(1, 3, 2, 2, 3).unwrap();
        let mut forest = RandomForest::new(config);
        forest.fit(&data).unwrap();

        let p = forest.predict_proba(data.row(0)).unwrap();
        assert!(
            approx::relative_eq!(p, 1.0 / 3.0, epsilon = 1e-9)
                || approx::relative_eq!(p, 2.0 / 3.0, epsilon = 1e-9)
        );
    }

    #[test]
    fn predict_before_fit_errors() {
        let config = ForestConfig::new(3, 3, 2, 1, 1).unwrap();
        let forest = RandomForest::new(config);
        let x = arr2(&[[0.0, 0.0]]);
        assert!(forest.predict(x.row(0)).is_err());
    }

    #[test]
    fn score_matches_accuracy_on_training_data() {
        let data = trivial_dataset();
        let config = ForestConfig::new(7, 3, 2, 2, 11).unwrap();
        let mut forest = RandomForest::new(config);
        forest.fit(&data).unwrap();

        let score = forest.score(&data).unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
}
