use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::Dataset;
use crate::error::{Error, Result};

/// Shuffle row indices with a seeded PRNG and split off a test fraction,
/// returning `(train, test)`. `test_fraction` must be in `(0.0, 1.0)`.
pub fn train_test_split(dataset: &Dataset, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction <= 0.0 {
        return Err(Error::InvalidParameter(
            "test_fraction must be in (0.0, 1.0)".into(),
        ));
    }

    let n = dataset.n_samples();
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction).floor() as usize;
    let n_test = n_test.clamp(1, n.saturating_sub(1).max(1));
    let n_train = n - n_test;

    let (train_idx, test_idx) = indices.split_at(n_train);
    Ok((dataset.subset(train_idx), dataset.subset(test_idx)))
}

/// Partition `dataset` into `k` folds of near-equal size: the first `n mod
/// k` folds get `ceil(n/k)` rows, the rest get `floor(n/k)`. Returns, for
/// each fold, `(train, validation)` where `validation` is that fold and
/// `train` is every other fold concatenated (shuffled row order is stable
/// across folds so every row appears in exactly one validation set).
pub fn k_fold_split(dataset: &Dataset, k: usize, seed: u64) -> Result<Vec<(Dataset, Dataset)>> {
    let n = dataset.n_samples();
    if k < 2 || k > n {
        return Err(Error::InvalidFoldCount { k, n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let base = n / k;
    let remainder = n % k;

    let mut fold_bounds = Vec::with_capacity(k + 1);
    let mut start = 0;
    fold_bounds.push(0);
    for fold in 0..k {
        let size = if fold < remainder { base + 1 } else { base };
        start += size;
        fold_bounds.push(start);
    }

    let mut folds = Vec::with_capacity(k);
    for fold in 0..k {
        let val_range = fold_bounds[fold]..fold_bounds[fold + 1];
        let val_idx: Vec<usize> = indices[val_range.clone()].to_vec();
        let train_idx: Vec<usize> = indices[..val_range.start]
            .iter()
            .chain(indices[val_range.end..].iter())
            .copied()
            .collect();
        folds.push((dataset.subset(&train_idx), dataset.subset(&val_idx)));
    }

    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;
    use std::collections::BTreeSet;

    fn dataset(n: usize) -> Dataset {
        let features = Array1::from_vec((0..n).map(|i| i as f64).collect())
            .into_shape((n, 1))
            .unwrap();
        let labels = Array1::from_vec((0..n).map(|i| (i % 2) as u8).collect());
        Dataset::new(features, labels, None, BTreeSet::new()).unwrap()
    }

    #[test]
    fn train_test_split_covers_every_row_exactly_once() {
        let data = dataset(10);
        let (train, test) = train_test_split(&data, 0.3, 42).unwrap();
        assert_eq!(train.n_samples() + test.n_samples(), 10);
        assert_eq!(test.n_samples(), 3);
    }

    #[test]
    fn train_test_split_rejects_bad_fraction() {
        let data = dataset(10);
        assert!(train_test_split(&data, 0.0, 1).is_err());
        assert!(train_test_split(&data, 1.0, 1).is_err());
    }

    #[test]
    fn k_fold_split_assigns_first_remainder_folds_the_larger_size() {
        let data = dataset(10);
        let folds = k_fold_split(&data, 3, 7).unwrap();
        assert_eq!(folds.len(), 3);

        let sizes: Vec<usize> = folds.iter().map(|(_, v)| v.n_samples()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        for (train, val) in &folds {
            assert_eq!(train.n_samples() + val.n_samples(), 10);
        }
    }

    #[test]
    fn k_fold_split_rejects_invalid_k() {
        let data = dataset(4);
        assert!(k_fold_split(&data, 1, 0).is_err());
        assert!(k_fold_split(&data, 5, 0).is_err());
    }
}
