use std::collections::BTreeSet;

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{Error, Result};

/// Immutable feature matrix + binary label vector + categorical-column set.
///
/// A `Dataset` never mutates after construction. `subset` produces a new,
/// logically independent `Dataset` whose row order follows the given index
/// list; samples may repeat (bootstrap sampling does exactly this).
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Array1<u8>,
    feature_names: Option<Vec<String>>,
    categorical: BTreeSet<usize>,
}

impl Dataset {
    /// Construct a new dataset, validating shape and label/categorical invariants.
    pub fn new(
        features: Array2<f64>,
        labels: Array1<u8>,
        feature_names: Option<Vec<String>>,
        categorical: BTreeSet<usize>,
    ) -> Result<Self> {
        let dataset = Self {
            features,
            labels,
            feature_names,
            categorical,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    fn validate(&self) -> Result<()> {
        if self.features.nrows() == 0 {
            return Err(Error::EmptyDataset);
        }
        if self.features.nrows() != self.labels.len() {
            return Err(Error::LengthMismatch {
                left: self.features.nrows(),
                right: self.labels.len(),
            });
        }
        for &label in self.labels.iter() {
            if label > 1 {
                return Err(Error::LabelOutOfRange(label as f64));
            }
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.features.ncols() {
                return Err(Error::InvalidDimensions {
                    expected: vec![self.features.ncols()],
                    got: vec![names.len()],
                });
            }
        }
        for &c in &self.categorical {
            if c >= self.features.ncols() {
                return Err(Error::InvalidParameter(format!(
                    "categorical index {c} out of range for {} features",
                    self.features.ncols()
                )));
            }
        }
        Ok(())
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<f64> {
        self.features.row(i)
    }

    pub fn label(&self, i: usize) -> u8 {
        self.labels[i]
    }

    pub fn labels(&self) -> &Array1<u8> {
        &self.labels
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    pub fn categorical(&self) -> &BTreeSet<usize> {
        &self.categorical
    }

    pub fn is_categorical(&self, attribute: usize) -> bool {
        self.categorical.contains(&attribute)
    }

    /// Produce a new `Dataset` containing only (and exactly) the given rows,
    /// in the given order. Indices may repeat (bootstrap sampling).
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        let n_features = self.n_features();
        let features = Array2::from_shape_vec(
            (indices.len(), n_features),
            indices
                .iter()
                .flat_map(|&i| self.features.row(i).to_vec())
                .collect(),
        )
        .expect("row length matches n_features by construction");

        let labels = Array1::from_vec(indices.iter().map(|&i| self.labels[i]).collect());

        Dataset {
            features,
            labels,
            feature_names: self.feature_names.clone(),
            categorical: self.categorical.clone(),
        }
    }
}
