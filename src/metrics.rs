use crate::error::{Error, Result};

/// Counts of true/false positives/negatives. Class `1` is treated as the
/// positive class throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn compute(actual: &[u8], predicted: &[u8]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(Error::LengthMismatch {
                left: actual.len(),
                right: predicted.len(),
            });
        }

        let mut matrix = ConfusionMatrix {
            true_positive: 0,
            false_positive: 0,
            true_negative: 0,
            false_negative: 0,
        };

        for (&a, &p) in actual.iter().zip(predicted.iter()) {
            match (a, p) {
                (1, 1) => matrix.true_positive += 1,
                (0, 1) => matrix.false_positive += 1,
                (0, 0) => matrix.true_negative += 1,
                (1, 0) => matrix.false_negative += 1,
                _ => return Err(Error::LabelOutOfRange(a.max(p) as f64)),
            }
        }

        Ok(matrix)
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.true_positive + self.false_positive + self.true_negative + self.false_negative;
        if total == 0 {
            return 0.0;
        }
        (self.true_positive + self.true_negative) as f64 / total as f64
    }

    pub fn precision(&self) -> f64 {
        let denom = self.true_positive + self.false_positive;
        if denom == 0 {
            return 0.0;
        }
        self.true_positive as f64 / denom as f64
    }

    pub fn recall(&self) -> f64 {
        let denom = self.true_positive + self.false_negative;
        if denom == 0 {
            return 0.0;
        }
        self.true_positive as f64 / denom as f64
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

/// Fraction of `predicted` entries equal to the corresponding `actual` entry.
pub fn accuracy(actual: &[u8], predicted: &[u8]) -> Result<f64> {
    Ok(ConfusionMatrix::compute(actual, predicted)?.accuracy())
}

pub fn precision(actual: &[u8], predicted: &[u8]) -> Result<f64> {
    Ok(ConfusionMatrix::compute(actual, predicted)?.precision())
}

pub fn recall(actual: &[u8], predicted: &[u8]) -> Result<f64> {
    Ok(ConfusionMatrix::compute(actual, predicted)?.recall())
}

pub fn f1(actual: &[u8], predicted: &[u8]) -> Result<f64> {
    Ok(ConfusionMatrix::compute(actual, predicted)?.f1())
}
