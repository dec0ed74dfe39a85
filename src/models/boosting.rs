//! # Gradient Boosting
//!
//! Least-squares gradient boosting: start from the target mean, then fit each
//! stage's tree to the current residuals and add it scaled by `learning_rate`.

use super::tree::{clamp_seed, make_rng, validate_at_least, TreeGrower, TreeModel};
use super::{check_fit_input, check_predict_input, FitOptions, Regressor};
use crate::error::ModelError;
use crate::params::{ParamSet, ParamValue};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoostedEnsemble {
    init: f64,
    learning_rate: f64,
    stages: Vec<TreeModel>,
    n_features: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: Option<usize>,
    min_samples_leaf: usize,
    subsample: f64,
    random_state: Option<u64>,
    /// 0 = silent, 1 = every 10th stage, 2+ = every stage.
    verbose: u8,
    ensemble: Option<BoostedEnsemble>,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientBoostingRegressor {
    pub fn new() -> Self {
        GradientBoostingRegressor {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: Some(3),
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: None,
            verbose: 0,
            ensemble: None,
        }
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Result<Self, ModelError> {
        self.n_estimators = validate_at_least("n_estimators", n_estimators, 1)?;
        Ok(self)
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Result<Self, ModelError> {
        self.learning_rate = validate_learning_rate(learning_rate)?;
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

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn n_stages(&self) -> usize {
        self.ensemble.as_ref().map_or(0, |e| e.stages.len())
    }
}

fn validate_learning_rate(lr: f64) -> Result<f64, ModelError> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(ModelError::invalid_param("learning_rate", format!("must be > 0, got {lr}")));
    }
    Ok(lr)
}

fn validate_subsample(subsample: f64) -> Result<f64, ModelError> {
    if !(subsample > 0.0 && subsample <= 1.0) {
        return Err(ModelError::invalid_param("subsample", format!("must be in (0, 1], got {subsample}")));
    }
    Ok(subsample)
}

impl Regressor for GradientBoostingRegressor {
    fn name(&self) -> &'static str {
        "GradientBoostingRegressor"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, options: &FitOptions) -> Result<(), ModelError> {
        check_fit_input(x, y, 1)?;
        let n = x.nrows();
        let verbose = options.verbose.unwrap_or(self.verbose);
        let grower = TreeGrower {
            max_depth: self.max_depth,
            min_samples_split: 2,
            min_samples_leaf: self.min_samples_leaf,
            max_features: None,
        };
        let mut rng = make_rng(self.random_state);
        let sample_size = ((self.subsample * n as f64).floor() as usize).clamp(1, n);

        let init = y.sum() / n as f64;
        let mut current = Array1::from_elem(n, init);
        let mut residual = Array1::<f64>::zeros(n);
        let mut stages = Vec::with_capacity(self.n_estimators);

        for stage in 0..self.n_estimators {
            residual.assign(&(&y - &current));
            let indices = if sample_size < n {
                rand::seq::index::sample(&mut rng, n, sample_size).into_vec()
            } else {
                (0..n).collect()
            };
            let tree = grower.grow(x, residual.view(), indices, &mut rng);
            for (i, row) in x.rows().into_iter().enumerate() {
                current[i] += self.learning_rate * tree.predict_row(row);
            }
            stages.push(tree);

            let report = match verbose {
                0 => false,
                1 => stage == 0 || (stage + 1) % 10 == 0,
                _ => true,
            };
            if report {
                let loss = y
                    .iter()
                    .zip(current.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n as f64;
                tracing::info!(stage = stage + 1, train_loss = loss, "boosting stage fitted");
            }
        }

        self.ensemble = Some(BoostedEnsemble {
            init,
            learning_rate: self.learning_rate,
            stages,
            n_features: x.ncols(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let ensemble = self
            .ensemble
            .as_ref()
            .ok_or(ModelError::NotFitted { model: self.name() })?;
        check_predict_input(x, ensemble.n_features)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                ensemble.init
                    + ensemble.learning_rate * ensemble.stages.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect())
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, value) in params {
            match name.as_str() {
                "n_estimators" => self.n_estimators = validate_at_least(name, value.as_usize(name)?, 1)?,
                "learning_rate" => self.learning_rate = validate_learning_rate(value.as_f64(name)?)?,
                "max_depth" => self.max_depth = value.as_opt_usize(name)?,
                "min_samples_leaf" => self.min_samples_leaf = validate_at_least(name, value.as_usize(name)?, 1)?,
                "subsample" => self.subsample = validate_subsample(value.as_f64(name)?)?,
                "random_state" => self.random_state = value.as_opt_u64(name)?,
                "verbose" => {
                    self.verbose = u8::try_from(value.as_usize(name)?)
                        .map_err(|_| ModelError::invalid_param(name.clone(), "must fit in 0..=255"))?
                }
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
            ("learning_rate".to_string(), ParamValue::Float(self.learning_rate)),
            ("max_depth".to_string(), ParamValue::from(self.max_depth)),
            ("min_samples_leaf".to_string(), ParamValue::from(self.min_samples_leaf)),
            ("subsample".to_string(), ParamValue::Float(self.subsample)),
            (
                "random_state".to_string(),
                ParamValue::from(self.random_state),
            ),
            ("verbose".to_string(), ParamValue::Int(i64::from(self.verbose))),
        ])
    }
}
