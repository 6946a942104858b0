use std::collections::{BTreeSet, HashMap};

use crate::dataset::Dataset;

/// The split a `SplitEvaluator` has memoised for a given attribute.
#[derive(Debug, Clone)]
pub enum Split {
    /// `value <= threshold` routes left.
    Numeric(f64),
    /// `value.trunc() as i64 ∈ categories` routes left.
    Categorical(BTreeSet<i64>),
}

/// Per-tree-build scratch space over a fixed `Dataset`.
///
/// Computes information-gain-ratio per attribute over a row index list,
/// memoising the winning split descriptor so the caller can retrieve it
/// via [`SplitEvaluator::split`] once it has committed to an attribute.
/// Scoped to a single tree build: never shared between trees or threads.
pub struct SplitEvaluator<'a> {
    dataset: &'a Dataset,
    best_split: HashMap<usize, Split>,
}

/// Entropy below this is treated as "pure enough" by the tree's stopping rule.
/// Arbitrary but fixed constant, preserved from the engine this was distilled from.
pub const MIN_ENTROPY_STOP: f64 = 0.01;

impl<'a> SplitEvaluator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            best_split: HashMap::new(),
        }
    }

    /// Laplace-smoothed (α=1) Shannon entropy, base 2, of the label
    /// distribution over `rows`. Empty `rows` has entropy 0.
    pub fn entropy(&self, rows: &[usize]) -> f64 {
        let mut counts = [0usize; 2];
        for &r in rows {
            counts[self.dataset.label(r) as usize] += 1;
        }
        entropy_from_counts(&counts)
    }

    pub fn is_categorical(&self, attribute: usize) -> bool {
        self.dataset.is_categorical(attribute)
    }

    pub fn get_split_threshold(&self, attribute: usize) -> Option<f64> {
        match self.best_split.get(&attribute) {
            Some(Split::Numeric(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn get_categorical_split(&self, attribute: usize) -> Option<&BTreeSet<i64>> {
        match self.best_split.get(&attribute) {
            Some(Split::Categorical(set)) => Some(set),
            _ => None,
        }
    }

    /// Best information-gain-ratio achievable on `attribute` over `rows`,
    /// given the parent entropy `parent_entropy`. Memoises the winning split
    /// descriptor for later retrieval via [`SplitEvaluator::split`]. Returns
    /// 0.0 (and memoises nothing) if no informative split exists.
    pub fn compute_igr(&mut self, attribute: usize, rows: &[usize], parent_entropy: f64) -> f64 {
        if self.dataset.is_categorical(attribute) {
            self.compute_igr_categorical(attribute, rows, parent_entropy)
        } else {
            self.compute_igr_numeric(attribute, rows, parent_entropy)
        }
    }

    fn compute_igr_numeric(&mut self, attribute: usize, rows: &[usize], h: f64) -> f64 {
        let n = rows.len();
        if n < 2 {
            return 0.0;
        }

        let mut order: Vec<usize> = rows.to_vec();
        order.sort_by(|&a, &b| {
            self.dataset.row(a)[attribute]
                .partial_cmp(&self.dataset.row(b)[attribute])
                .expect("feature values must be finite")
        });

        let mut right_counts = [0usize; 2];
        for &r in &order {
            right_counts[self.dataset.label(r) as usize] += 1;
        }
        let mut left_counts = [0usize; 2];
        let mut left_size = 0usize;
        let mut right_size = n;

        let mut best_gain_ratio = 0.0f64;
        let mut best_threshold: Option<f64> = None;

        for i in 0..n - 1 {
            let label = self.dataset.label(order[i]) as usize;
            left_counts[label] += 1;
            right_counts[label] -= 1;
            left_size += 1;
            right_size -= 1;

            let v_i = self.dataset.row(order[i])[attribute];
            let v_next = self.dataset.row(order[i + 1])[attribute];
            if v_i == v_next {
                continue;
            }

            let threshold = (v_i + v_next) / 2.0;
            let gain_ratio = gain_ratio_for_split(h, &left_counts, left_size, &right_counts, right_size, n);

            if gain_ratio > best_gain_ratio {
                best_gain_ratio = gain_ratio;
                best_threshold = Some(threshold);
            }
        }

        if let Some(t) = best_threshold {
            self.best_split.insert(attribute, Split::Numeric(t));
        }
        best_gain_ratio
    }

    fn compute_igr_categorical(&mut self, attribute: usize, rows: &[usize], h: f64) -> f64 {
        let n = rows.len();
        if n == 0 {
            return 0.0;
        }

        let mut per_category: HashMap<i64, [usize; 2]> = HashMap::new();
        for &r in rows {
            let cat = self.dataset.row(r)[attribute].trunc() as i64;
            let label = self.dataset.label(r) as usize;
            per_category.entry(cat).or_insert([0, 0])[label] += 1;
        }

        if per_category.len() < 2 {
            return 0.0;
        }

        let mut categories: Vec<i64> = per_category.keys().copied().collect();
        categories.sort_by(|&a, &b| {
            let purity_a = purity(&per_category[&a]);
            let purity_b = purity(&per_category[&b]);
            purity_a
                .partial_cmp(&purity_b)
                .unwrap()
                .then(a.cmp(&b))
        });

        let mut left_counts = [0usize; 2];
        let mut left_size = 0usize;
        let mut right_counts = [0usize; 2];
        let mut right_size = 0usize;
        for &cat in &categories {
            let c = per_category[&cat];
            right_counts[0] += c[0];
            right_counts[1] += c[1];
            right_size += c[0] + c[1];
        }

        let mut best_gain_ratio = 0.0f64;
        let mut best_prefix_len: Option<usize> = None;

        // Evaluate non-trivial prefixes: absorb one category at a time into
        // the left side, moving its counts out of the right side.
        for (idx, &cat) in categories.iter().enumerate() {
            let c = per_category[&cat];
            left_counts[0] += c[0];
            left_counts[1] += c[1];
            left_size += c[0] + c[1];
            right_counts[0] -= c[0];
            right_counts[1] -= c[1];
            right_size -= c[0] + c[1];

            let prefix_len = idx + 1;
            if prefix_len >= categories.len() {
                break;
            }

            let gain_ratio = gain_ratio_for_split(h, &left_counts, left_size, &right_counts, right_size, n);
            if gain_ratio > best_gain_ratio {
                best_gain_ratio = gain_ratio;
                best_prefix_len = Some(prefix_len);
            }
        }

        if let Some(prefix_len) = best_prefix_len {
            let left_set: BTreeSet<i64> = categories[..prefix_len].iter().copied().collect();
            self.best_split.insert(attribute, Split::Categorical(left_set));
        }
        best_gain_ratio
    }

    /// Partition `rows` using the split descriptor memoised for `attribute`
    /// by the most recent [`SplitEvaluator::compute_igr`] call on it.
    pub fn split(&self, attribute: usize, rows: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        match self.best_split.get(&attribute) {
            Some(Split::Numeric(threshold)) => {
                for &r in rows {
                    if self.dataset.row(r)[attribute] <= *threshold {
                        left.push(r);
                    } else {
                        right.push(r);
                    }
                }
            }
            Some(Split::Categorical(categories)) => {
                for &r in rows {
                    let cat = self.dataset.row(r)[attribute].trunc() as i64;
                    if categories.contains(&cat) {
                        left.push(r);
                    } else {
                        right.push(r);
                    }
                }
            }
            None => right.extend_from_slice(rows),
        }
        (left, right)
    }

    /// Retrieve the split descriptor memoised for `attribute`, if any.
    pub fn get_split(&self, attribute: usize) -> Option<Split> {
        self.best_split.get(&attribute).cloned()
    }

    /// Majority class over `rows`. Ties favor class 0 (deterministic).
    pub fn most_common(&self, rows: &[usize]) -> u8 {
        let mut counts = [0usize; 2];
        for &r in rows {
            counts[self.dataset.label(r) as usize] += 1;
        }
        if counts[0] >= counts[1] {
            0
        } else {
            1
        }
    }
}


fn purity(counts: &[usize; 2]) -> f64 {
    let total = (counts[0] + counts[1]) as f64;
    if total == 0.0 {
        return 0.0;
    }
    counts[0].max(counts[1]) as f64 / total
}

fn entropy_from_counts(counts: &[usize; 2]) -> f64 {
    let total = counts[0] + counts[1];
    if total == 0 {
        return 0.0;
    }
    let k = counts.iter().filter(|&&c| c > 0).count() as f64;
    let t = total as f64;
    let mut h = 0.0;
    for &c in counts.iter() {
        if c == 0 {
            continue;
        }
        let p = (c as f64 + 1.0) / (t + k);
        h -= p * p.log2();
    }
    h
}

fn gain_ratio_for_split(
    parent_entropy: f64,
    left_counts: &[usize; 2],
    left_size: usize,
    right_counts: &[usize; 2],
    right_size: usize,
    n: usize,
) -> f64 {
    let left_entropy = entropy_from_counts(left_counts);
    let right_entropy = entropy_from_counts(right_counts);
    let n = n as f64;
    let wl = left_size as f64 / n;
    let wr = right_size as f64 / n;
    let weighted = wl * left_entropy + wr * right_entropy;
    let info_gain = parent_entropy - weighted;

    let mut split_info = 0.0;
    if wl > 0.0 {
        split_info -= wl * wl.log2();
    }
    if wr > 0.0 {
        split_info -= wr * wr.log2();
    }

    if split_info == 0.0 {
        0.0
    } else {
        info_gain / split_info
    }
}
