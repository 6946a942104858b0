use std::fmt::Write as _;

use ndarray::ArrayView1;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::split_evaluator::{Split, SplitEvaluator, MIN_ENTROPY_STOP};

/// A node in a [`DecisionTree`]. Leaf and internal variants are disjoint by
/// construction: an internal node always carries exactly one active split
/// descriptor (numeric threshold xor category set), never both and never
/// neither.
#[derive(Debug)]
enum Node {
    Leaf {
        prediction: u8,
        n_samples: usize,
    },
    Internal {
        attribute: usize,
        split: Split,
        left: Box<Node>,
        right: Box<Node>,
        n_samples: usize,
    },
}

impl Node {
    fn n_samples(&self) -> usize {
        match self {
            Node::Leaf { n_samples, .. } => *n_samples,
            Node::Internal { n_samples, .. } => *n_samples,
        }
    }
}

/// Hyperparameters for a single [`DecisionTree`].
///
/// Mirrors the teacher's `DecisionTreeConfig` builder shape (`Default` plus
/// plain public fields) rather than a `with_*` fluent chain, since this
/// config has no optional knobs a chain would meaningfully shorten.
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub max_features: usize,
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: usize::MAX,
            min_samples_split: 2,
            max_features: usize::MAX,
        }
    }
}

/// Recursive binary decision tree over mixed numeric/categorical attributes.
///
/// Hyperparameters and the tree's private PRNG are fixed at construction.
/// A tree is built once by [`DecisionTree::fit`] and is read-only afterward.
#[derive(Debug)]
pub struct DecisionTree {
    config: DecisionTreeConfig,
    rng: ChaCha8Rng,
    root: Option<Node>,
}

impl DecisionTree {
    /// Construct a tree with an explicit, already-seeded PRNG. This is the
    /// constructor `RandomForest` uses so each tree owns a PRNG derived from
    /// a pre-generated child seed rather than a generator shared across trees.
    pub fn new(config: DecisionTreeConfig, rng: ChaCha8Rng) -> Result<Self> {
        if config.max_depth < 1 {
            return Err(Error::InvalidParameter("max_depth must be >= 1".into()));
        }
        if config.min_samples_split < 2 {
            return Err(Error::InvalidParameter(
                "min_samples_split must be >= 2".into(),
            ));
        }
        if config.max_features < 1 {
            return Err(Error::InvalidParameter("max_features must be >= 1".into()));
        }
        Ok(Self {
            config,
            rng,
            root: None,
        })
    }

    /// Construct a tree seeded from a plain `u64`, for standalone use
    /// outside a `RandomForest`.
    pub fn with_seed(config: DecisionTreeConfig, seed: u64) -> Result<Self> {
        use rand::SeedableRng;
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        if self.config.max_features > dataset.n_features() {
            return Err(Error::InvalidParameter(format!(
                "max_features {} exceeds feature count {}",
                self.config.max_features,
                dataset.n_features()
            )));
        }

        let mut evaluator = SplitEvaluator::new(dataset);
        let rows: Vec<usize> = (0..dataset.n_samples()).collect();
        let attrs: Vec<usize> = (0..dataset.n_features()).collect();
        self.root = Some(self.build_tree(&mut evaluator, rows, attrs, 0));
        Ok(())
    }

    fn build_tree(
        &mut self,
        evaluator: &mut SplitEvaluator,
        rows: Vec<usize>,
        attrs: Vec<usize>,
        depth: usize,
    ) -> Node {
        let h = evaluator.entropy(&rows);

        if attrs.is_empty()
            || h < MIN_ENTROPY_STOP
            || depth >= self.config.max_depth
            || rows.len() < self.config.min_samples_split
        {
            return Node::Leaf {
                prediction: evaluator.most_common(&rows),
                n_samples: rows.len(),
            };
        }

        let candidates: Vec<usize> = if attrs.len() > self.config.max_features {
            let mut shuffled = attrs.clone();
            shuffled.shuffle(&mut self.rng);
            shuffled.into_iter().take(self.config.max_features).collect()
        } else {
            attrs.clone()
        };

        let mut best_attr = None;
        let mut best_igr = 0.0f64;
        for &attr in &candidates {
            let igr = evaluator.compute_igr(attr, &rows, h);
            if igr > best_igr {
                best_igr = igr;
                best_attr = Some(attr);
            }
        }

        let Some(attr) = best_attr else {
            return Node::Leaf {
                prediction: evaluator.most_common(&rows),
                n_samples: rows.len(),
            };
        };

        let (left_rows, right_rows) = evaluator.split(attr, &rows);
        if left_rows.is_empty() || right_rows.is_empty() {
            return Node::Leaf {
                prediction: evaluator.most_common(&rows),
                n_samples: rows.len(),
            };
        }

        let mut remaining_attrs = attrs.clone();
        remaining_attrs.retain(|&a| a != attr);

        let n_samples = rows.len();
        let left = self.build_tree(evaluator, left_rows, remaining_attrs.clone(), depth + 1);
        let right = self.build_tree(evaluator, right_rows, remaining_attrs, depth + 1);

        if let (
            Node::Leaf {
                prediction: p_left, ..
            },
            Node::Leaf {
                prediction: p_right,
                ..
            },
        ) = (&left, &right)
        {
            if p_left == p_right {
                return Node::Leaf {
                    prediction: *p_left,
                    n_samples,
                };
            }
        }

        let split = evaluator
            .get_split(attr)
            .expect("attribute was just chosen by compute_igr, which memoises its descriptor");

        Node::Internal {
            attribute: attr,
            split,
            left: Box::new(left),
            right: Box::new(right),
            n_samples,
        }
    }

    /// Predict the class of a single sample.
    pub fn predict(&self, features: ArrayView1<f64>) -> Result<u8> {
        let root = self.root.as_ref().ok_or(Error::NotFitted)?;
        Ok(Self::predict_node(root, features))
    }

    fn predict_node(node: &Node, features: ArrayView1<f64>) -> u8 {
        match node {
            Node::Leaf { prediction, .. } => *prediction,
            Node::Internal {
                attribute,
                split,
                left,
                right,
                ..
            } => {
                let goes_left = match split {
                    Split::Numeric(threshold) => features[*attribute] <= *threshold,
                    Split::Categorical(categories) => {
                        categories.contains(&(features[*attribute].trunc() as i64))
                    }
                };
                if goes_left {
                    Self::predict_node(left, features)
                } else {
                    Self::predict_node(right, features)
                }
            }
        }
    }

    /// The chosen attribute and split descriptor at the root, if the root is
    /// an internal node. `None` if the tree hasn't been fitted or the root
    /// collapsed to a single leaf.
    pub fn root_split(&self) -> Option<(usize, &Split)> {
        match self.root.as_ref()? {
            Node::Internal {
                attribute, split, ..
            } => Some((*attribute, split)),
            Node::Leaf { .. } => None,
        }
    }

    /// Maximum number of edges on any root-to-leaf path.
    pub fn depth(&self) -> usize {
        fn go(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Internal { left, right, .. } => 1 + go(left).max(go(right)),
            }
        }
        self.root.as_ref().map(go).unwrap_or(0)
    }

    /// Emit a DOT (Graphviz) graph string. Read-only traversal, not part of
    /// the learning contract: downstream tooling renders this, this crate
    /// never writes it to disk.
    pub fn to_dot(&self, feature_names: Option<&[String]>) -> String {
        let mut out = String::new();
        out.push_str("digraph Tree {\n");
        if let Some(root) = &self.root {
            let mut counter = 0usize;
            Self::write_dot_node(root, feature_names, &mut out, &mut counter);
        }
        out.push_str("}\n");
        out
    }

    fn write_dot_node(
        node: &Node,
        feature_names: Option<&[String]>,
        out: &mut String,
        counter: &mut usize,
    ) -> usize {
        let id = *counter;
        *counter += 1;

        match node {
            Node::Leaf {
                prediction,
                n_samples,
            } => {
                let color = if *prediction == 0 { "lightblue" } else { "salmon" };
                let _ = writeln!(
                    out,
                    "  n{id} [label=\"class {prediction}\\nsamples = {n_samples}\", style=filled, fillcolor={color}];"
                );
            }
            Node::Internal {
                attribute,
                split,
                left,
                right,
                n_samples,
            } => {
                let feature_label = feature_names
                    .and_then(|names| names.get(*attribute))
                    .cloned()
                    .unwrap_or_else(|| format!("Feat {attribute}"));
                let condition = match split {
                    Split::Numeric(threshold) => format!("<= {threshold:.3}"),
                    Split::Categorical(categories) => {
                        let ids: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
                        format!("in {{{}}}", ids.join(","))
                    }
                };
                let _ = writeln!(
                    out,
                    "  n{id} [label=\"{feature_label} {condition}\\nsamples = {n_samples}\"];"
                );

                let left_id = Self::write_dot_node(left, feature_names, out, counter);
                let right_id = Self::write_dot_node(right, feature_names, out, counter);
                let _ = writeln!(out, "  n{id} -> n{left_id} [label=\"True\"];");
                let _ = writeln!(out, "  n{id} -> n{right_id} [label=\"False\"];");
            }
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, Array1};
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn config(max_depth: usize, min_samples_split: usize, max_features: usize) -> DecisionTreeConfig {
        DecisionTreeConfig {
            max_depth,
            min_samples_split,
            max_features,
        }
    }

    fn tree(max_depth: usize, min_samples_split: usize, max_features: usize) -> DecisionTree {
        DecisionTree::new(
            config(max_depth, min_samples_split, max_features),
            ChaCha8Rng::seed_from_u64(42),
        )
        .unwrap()
    }

    #[test]
    fn construction_rejects_bad_hyperparameters() {
        assert!(DecisionTree::new(config(0, 2, 1), ChaCha8Rng::seed_from_u64(0)).is_err());
        assert!(DecisionTree::new(config(1, 1, 1), ChaCha8Rng::seed_from_u64(0)).is_err());
        assert!(DecisionTree::new(config(1, 2, 0), ChaCha8Rng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn predict_without_fit_errors() {
        let t = tree(3, 2, 1);
        let x = arr2(&[[0.0]]);
        assert!(t.predict(x.row(0)).is_err());
    }

    #[test]
    fn trivial_separability_splits_on_threshold() {
        let data = Dataset::new(
            arr2(&[[0.0, 0.0], [0.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [1.0, 1.0]]),
            Array1::from_vec(vec![0u8, 0, 0, 1, 1, 1]),
            None,
            BTreeSet::new(),
        )
        .unwrap();

        let mut t = tree(3, 2, 2);
        t.fit(&data).unwrap();

        for i in 0..data.n_samples() {
            assert_eq!(t.predict(data.row(i)).unwrap(), data.label(i));
        }
    }

    #[test]
    fn depth_never_exceeds_configured_max() {
        let data = Dataset::new(
            arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]]),
            Array1::from_vec(vec![0u8, 1, 0, 1, 0, 1, 0, 1]),
            None,
            BTreeSet::new(),
        )
        .unwrap();

        let mut t = tree(2, 2, 1);
        t.fit(&data).unwrap();
        assert!(t.depth() <= 2);
    }

    #[test]
    fn categorical_grouping_produces_one_split() {
        let mut categorical = BTreeSet::new();
        categorical.insert(0);
        let data = Dataset::new(
            arr2(&[[0.0], [1.0], [2.0], [3.0]]),
            Array1::from_vec(vec![0u8, 0, 1, 1]),
            None,
            categorical,
        )
        .unwrap();

        let mut t = tree(2, 2, 1);
        t.fit(&data).unwrap();

        for i in 0..data.n_samples() {
            assert_eq!(t.predict(data.row(i)).unwrap(), data.label(i));
        }
        assert_eq!(t.depth(), 1);
    }

    #[test]
    fn to_dot_contains_feature_name_and_edges() {
        let data = Dataset::new(
            arr2(&[[0.0], [0.0], [1.0], [1.0]]),
            Array1::from_vec(vec![0u8, 0, 1, 1]),
            Some(vec!["x".to_string()]),
            BTreeSet::new(),
        )
        .unwrap();

        let mut t = tree(2, 2, 1);
        t.fit(&data).unwrap();
        let dot = t.to_dot(data.feature_names());

        assert!(dot.starts_with("digraph Tree {"));
        assert!(dot.contains("True"));
        assert!(dot.contains("False"));
        assert!(dot.contains('x'));
    }
}
