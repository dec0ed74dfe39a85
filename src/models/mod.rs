//! # Regression Models (`models`)
//!
//! Defines the [`Regressor`] trait every estimator implements, the built-in
//! estimators, and [`Model`], a serializable enum over all of them that can
//! live in a heterogeneous `models` mapping and be persisted after fitting.

use crate::error::ModelError;
use crate::metrics::r2_score;
use crate::params::ParamSet;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// --- Submodules ---
pub mod boosting;
pub mod forest;
pub mod linear;
pub mod neighbors;
pub mod tree;

// Re-export estimators
pub use boosting::GradientBoostingRegressor;
pub use forest::RandomForestRegressor;
pub use linear::{LinearRegression, Ridge};
pub use neighbors::{KNeighborsRegressor, Weights};
pub use tree::DecisionTreeRegressor;

// --- Fit Options ---

/// Per-call options passed to [`Regressor::fit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FitOptions {
    /// Overrides the estimator's own verbosity when set. `Some(0)` silences progress output.
    pub verbose: Option<u8>,
}

impl FitOptions {
    /// Options that suppress all progress output during fitting.
    pub fn silent() -> Self {
        FitOptions { verbose: Some(0) }
    }
}

// --- Core Trait: Regressor ---

/// Base trait for all regression estimators.
///
/// Estimators are configured through named hyperparameters so a grid search can
/// drive them generically, then fitted on a feature matrix `x` (`n_samples x n_features`)
/// and a target vector `y`.
pub trait Regressor: Debug + Send + Sync {
    /// Short estimator name used in messages.
    fn name(&self) -> &'static str;

    /// Fits the estimator, replacing any previous fit.
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, options: &FitOptions) -> Result<(), ModelError>;

    /// Predicts one target value per row of `x`.
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError>;

    /// Applies every entry of `params`. Unknown names and invalid values are errors;
    /// on error the estimator may be partially updated.
    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError>;

    /// Current hyperparameters.
    fn get_params(&self) -> ParamSet;

    /// R² of the predictions on `x` against `y`.
    fn score(&self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<f64, ModelError> {
        let pred = self.predict(x)?;
        r2_score(y, pred.view())
    }
}

// --- Input Validation ---

pub(crate) fn check_fit_input(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    min_samples: usize,
) -> Result<(), ModelError> {
    if x.nrows() != y.len() {
        return Err(ModelError::shape(format!(
            "x has {} rows but y has {} values",
            x.nrows(),
            y.len()
        )));
    }
    if x.ncols() == 0 {
        return Err(ModelError::shape("x has no feature columns"));
    }
    if x.nrows() < min_samples {
        return Err(ModelError::InsufficientData {
            required: min_samples,
            actual: x.nrows(),
        });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(ModelError::Fit("input contains NaN or infinity".to_string()));
    }
    Ok(())
}

pub(crate) fn check_predict_input(x: ArrayView2<f64>, n_features: usize) -> Result<(), ModelError> {
    if x.ncols() != n_features {
        return Err(ModelError::shape(format!(
            "x has {} features, but the estimator was fitted with {}",
            x.ncols(),
            n_features
        )));
    }
    Ok(())
}

// --- Model Enum ---

/// Any built-in estimator.
///
/// `Model` is what a training pipeline typically stores in its `models` mapping:
/// it mixes estimator types in one collection and, unlike `Box<dyn Regressor>`,
/// can be persisted with [`save_object`](crate::utils::save_object).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Model {
    LinearRegression(LinearRegression),
    Ridge(Ridge),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    KNeighbors(KNeighborsRegressor),
}

macro_rules! delegate {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            Model::LinearRegression($m) => $body,
            Model::Ridge($m) => $body,
            Model::DecisionTree($m) => $body,
            Model::RandomForest($m) => $body,
            Model::GradientBoosting($m) => $body,
            Model::KNeighbors($m) => $body,
        }
    };
}

impl Regressor for Model {
    fn name(&self) -> &'static str {
        delegate!(self, m => m.name())
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, options: &FitOptions) -> Result<(), ModelError> {
        delegate!(self, m => m.fit(x, y, options))
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        delegate!(self, m => m.predict(x))
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        delegate!(self, m => m.set_params(params))
    }

    fn get_params(&self) -> ParamSet {
        delegate!(self, m => m.get_params())
    }
}

macro_rules! impl_from_estimator {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Model {
                fn from(m: $ty) -> Self {
                    Model::$variant(m)
                }
            }
        )*
    };
}

impl_from_estimator!(
    LinearRegression(LinearRegression),
    Ridge(Ridge),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    KNeighbors(KNeighborsRegressor),
);
