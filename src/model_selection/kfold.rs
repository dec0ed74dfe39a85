//! # K-Fold Cross-Validation Splits

use crate::error::ModelError;

/// Train/test row indices for one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Unshuffled K-fold splitter.
///
/// Each fold's test rows are a contiguous block; the first `n_samples % n_splits`
/// folds hold one extra row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
}

impl KFold {
    pub fn new(n_splits: usize) -> Result<Self, ModelError> {
        if n_splits < 2 {
            return Err(ModelError::invalid_param(
                "cv",
                format!("k-fold cross-validation requires at least 2 splits, got {n_splits}"),
            ));
        }
        Ok(KFold { n_splits })
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>, ModelError> {
        if self.n_splits > n_samples {
            return Err(ModelError::InsufficientData {
                required: self.n_splits,
                actual: n_samples,
            });
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for k in 0..self.n_splits {
            let size = base + usize::from(k < extra);
            let stop = start + size;
            folds.push(Fold {
                train: (0..start).chain(stop..n_samples).collect(),
                test: (start..stop).collect(),
            });
            start = stop;
        }
        Ok(folds)
    }
}
