//! # Model Evaluation
//!
//! Tunes every named model with a cross-validated grid search, refits it on the
//! full training set with the winning parameters and reports its R² on the test set.

use crate::config::SearchConfig;
use crate::error::{ModelError, PipelineError, PipelineErrorKind};
use crate::metrics::r2_score;
use crate::model_selection::GridSearch;
use crate::models::{FitOptions, Regressor};
use crate::params::ParamGrid;
use ndarray::{ArrayView1, ArrayView2};
use std::collections::BTreeMap;

/// Test-set R² per model name.
pub type ModelReport = BTreeMap<String, f64>;

/// Model names containing this marker are searched and fitted with all
/// progress output suppressed.
pub const SILENT_FIT_MARKER: &str = "Cat";

/// Runs the evaluation with a [`SearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct ModelEvaluator {
    config: SearchConfig,
}

impl ModelEvaluator {
    pub fn new(config: SearchConfig) -> Self {
        ModelEvaluator { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Evaluates every model in `models` against its search space in `params`.
    ///
    /// # Arguments
    /// * `x_train`, `y_train`: Data used for the search and the final refit.
    /// * `x_test`, `y_test`: Held-out data the reported score is computed on.
    /// * `models`: Estimators by name. Each one is left refitted with its best parameters.
    /// * `params`: Search space by model name; every model needs an entry.
    ///
    /// The first failure aborts the whole evaluation and no report is returned.
    pub fn evaluate<M>(
        &self,
        x_train: ArrayView2<f64>,
        y_train: ArrayView1<f64>,
        x_test: ArrayView2<f64>,
        y_test: ArrayView1<f64>,
        models: &mut BTreeMap<String, M>,
        params: &BTreeMap<String, ParamGrid>,
    ) -> Result<ModelReport, PipelineError>
    where
        M: Regressor + Clone,
    {
        check_split(x_train, y_train, x_test, y_test)?;

        let mut report = ModelReport::new();
        for (name, model) in models.iter_mut() {
            let grid = params
                .get(name)
                .ok_or_else(|| PipelineErrorKind::MissingSearchSpace(name.clone()))?;

            let fit_options = if name.contains(SILENT_FIT_MARKER) {
                FitOptions::silent()
            } else {
                FitOptions::default()
            };

            let search = GridSearch::new(grid.clone())
                .cv(self.config.cv)
                .error_score(self.config.error_score)
                .n_jobs(self.config.n_jobs.or(Some(1)))
                .verbose(self.config.verbose)
                .refit(false)
                .fit_options(fit_options);
            let result = search.fit(&*model, x_train, y_train)?;

            model.set_params(result.best_params())?;
            model.fit(x_train, y_train, &fit_options)?;

            let y_train_pred = model.predict(x_train)?;
            let y_test_pred = model.predict(x_test)?;
            let train_score = r2_score(y_train, y_train_pred.view())?;
            let test_score = r2_score(y_test, y_test_pred.view())?;

            tracing::debug!(model = %name, train_score, "train score");
            tracing::info!(
                model = %name,
                best_params = ?result.best_params(),
                cv_score = result.best_score(),
                test_score,
                "model evaluated"
            );
            report.insert(name.clone(), test_score);
        }
        Ok(report)
    }
}

/// Evaluates `models` with the default search settings (3-fold cross-validation).
///
/// See [`ModelEvaluator::evaluate`].
pub fn evaluate_models<M>(
    x_train: ArrayView2<f64>,
    y_train: ArrayView1<f64>,
    x_test: ArrayView2<f64>,
    y_test: ArrayView1<f64>,
    models: &mut BTreeMap<String, M>,
    params: &BTreeMap<String, ParamGrid>,
) -> Result<ModelReport, PipelineError>
where
    M: Regressor + Clone,
{
    ModelEvaluator::default().evaluate(x_train, y_train, x_test, y_test, models, params)
}

/// The highest-scoring entry of a report; ties go to the first name in order.
pub fn best_model(report: &ModelReport) -> Option<(&str, f64)> {
    report
        .iter()
        .filter(|(_, score)| !score.is_nan())
        .fold(None, |best: Option<(&str, f64)>, (name, &score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((name.as_str(), score)),
        })
}

fn check_split(
    x_train: ArrayView2<f64>,
    y_train: ArrayView1<f64>,
    x_test: ArrayView2<f64>,
    y_test: ArrayView1<f64>,
) -> Result<(), ModelError> {
    if x_train.nrows() != y_train.len() {
        return Err(ModelError::shape(format!(
            "x_train has {} rows but y_train has {} values",
            x_train.nrows(),
            y_train.len()
        )));
    }
    if x_test.nrows() != y_test.len() {
        return Err(ModelError::shape(format!(
            "x_test has {} rows but y_test has {} values",
            x_test.nrows(),
            y_test.len()
        )));
    }
    if x_train.ncols() != x_test.ncols() {
        return Err(ModelError::shape(format!(
            "x_train has {} features but x_test has {}",
            x_train.ncols(),
            x_test.ncols()
        )));
    }
    Ok(())
}
