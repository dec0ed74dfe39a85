//! # regsearch
//!
//! Model-selection utilities for regression training pipelines: cross-validated
//! grid search over named candidate models, held-out R² reporting, and binary
//! persistence of fitted objects.
//!
//! ```no_run
//! use regsearch::models::{Model, Ridge, GradientBoostingRegressor};
//! use regsearch::params::ParamGrid;
//! use regsearch::{best_model, evaluate_models, save_object};
//! use std::collections::BTreeMap;
//! # fn run(x_train: ndarray::Array2<f64>, y_train: ndarray::Array1<f64>,
//! #        x_test: ndarray::Array2<f64>, y_test: ndarray::Array1<f64>) -> Result<(), regsearch::PipelineError> {
//! let mut models = BTreeMap::from([
//!     ("Ridge".to_string(), Model::from(Ridge::new())),
//!     ("CatBoosting Regressor".to_string(), Model::from(GradientBoostingRegressor::new())),
//! ]);
//! let params = BTreeMap::from([
//!     ("Ridge".to_string(), ParamGrid::new().with("alpha", [0.1, 1.0, 10.0])),
//!     ("CatBoosting Regressor".to_string(), ParamGrid::new().with("n_estimators", [30_usize, 100])),
//! ]);
//! let report = evaluate_models(x_train.view(), y_train.view(), x_test.view(), y_test.view(), &mut models, &params)?;
//! if let Some((name, _)) = best_model(&report) {
//!     save_object("artifacts/model.bin", &models[name])?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod evaluate;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod params;
pub mod utils;

pub use config::{EvaluationConfig, SearchConfig};
pub use error::{ModelError, PipelineError, PipelineErrorKind};
pub use evaluate::{best_model, evaluate_models, ModelEvaluator, ModelReport};
pub use utils::{load_object, save_object};
