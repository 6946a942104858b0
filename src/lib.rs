//! Binary-classification random forest built from scratch: recursive tree
//! induction over mixed numeric/categorical attributes, bootstrap
//! aggregation across seeded trees, and K-fold grid-search tuning.
//!
//! This crate is the learning engine only. Reading labelled data in from a
//! CSV file, exposing a CLI, writing console progress, and persisting
//! reports or artifacts to disk are all left to callers — see
//! [`dataset::Dataset`] for the boundary this crate owns.

pub mod dataset;
pub mod error;
pub mod forest;
pub mod metrics;
pub mod split_evaluator;
pub mod splitter;
pub mod tree;
pub mod tuner;

pub use dataset::Dataset;
pub use error::{Error, Result};
pub use forest::{ForestConfig, RandomForest};
pub use metrics::ConfusionMatrix;
pub use split_evaluator::{Split, SplitEvaluator};
pub use splitter::{k_fold_split, train_test_split};
pub use tree::{DecisionTree, DecisionTreeConfig};
pub use tuner::{tune, Metric, ParameterGrid, TuningResult};
