//! # Random Forest
//!
//! Bagged CART trees; predictions are the mean over trees. Trees are grown in
//! parallel, each from its own seed drawn up front so results do not depend on
//! thread scheduling.

use super::tree::{clamp_seed, make_rng, validate_at_least, TreeGrower, TreeModel};
use super::{check_fit_input, check_predict_input, FitOptions, Regressor};
use crate::error::ModelError;
use crate::params::{ParamSet, ParamValue};
use crate::utils::parallel::map_maybe_parallel;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: Option<usize>,
    bootstrap: bool,
    random_state: Option<u64>,
    n_jobs: Option<usize>,
    trees: Vec<TreeModel>,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomForestRegressor {
    pub fn new() -> Self {
        RandomForestRegressor {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            random_state: None,
            n_jobs: None,
            trees: Vec::new(),
        }
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Result<Self, ModelError> {
        self.n_estimators = validate_at_least("n_estimators", n_estimators, 1)?;
        Ok(self)
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(clamp_seed(seed));
        self
    }

    /// Threads used to grow trees; `None` uses the global rayon pool.
    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Number of fitted trees (0 before `fit`).
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForestRegressor {
    fn name(&self) -> &'static str {
        "RandomForestRegressor"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, _options: &FitOptions) -> Result<(), ModelError> {
        check_fit_input(x, y, 1)?;
        let n = x.nrows();
        let grower = TreeGrower {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        };

        let mut master = make_rng(self.random_state);
        let seeds: Vec<u64> = (0..self.n_estimators).map(|_| master.gen()).collect();
        let bootstrap = self.bootstrap;

        self.trees = map_maybe_parallel(seeds, self.n_jobs, |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let indices: Vec<usize> = if bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            grower.grow(x, y, indices, &mut rng)
        })?;
        tracing::debug!(trees = self.trees.len(), samples = n, "random forest fitted");
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let first = self
            .trees
            .first()
            .ok_or(ModelError::NotFitted { model: self.name() })?;
        check_predict_input(x, first.n_features())?;
        let n_trees = self.trees.len() as f64;
        Ok(x.rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.n_estimators = validate_at_least(name, value.as_usize(name)?, 1)?,
                "max_depth" => self.max_depth = value.as_opt_usize(name)?,
                "min_samples_split" => self.min_samples_split = validate_at_least(name, value.as_usize(name)?, 2)?,
                "min_samples_leaf" => self.min_samples_leaf = validate_at_least(name, value.as_usize(name)?, 1)?,
                "max_features" => self.max_features = value.as_opt_usize(name)?,
                "bootstrap" => self.bootstrap = value.as_bool(name)?,
                "random_state" => self.random_state = value.as_opt_u64(name)?,
                "n_jobs" => self.n_jobs = value.as_opt_usize(name)?,
                _ => {
                    return Err(ModelError::UnknownParam {
                        model: self.name(),
                        name: name.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    fn get_params(&self) -> ParamSet {
        ParamSet::from([
            ("n_estimators".to_string(), ParamValue::from(self.n_estimators)),
            ("max_depth".to_string(), ParamValue::from(self.max_depth)),
            ("min_samples_split".to_string(), ParamValue::from(self.min_samples_split)),
            ("min_samples_leaf".to_string(), ParamValue::from(self.min_samples_leaf)),
            ("max_features".to_string(), ParamValue::from(self.max_features)),
            ("bootstrap".to_string(), ParamValue::Bool(self.bootstrap)),
            (
                "random_state".to_string(),
                ParamValue::from(self.random_state),
            ),
            ("n_jobs".to_string(), ParamValue::from(self.n_jobs)),
        ])
    }
}
