//! # Grid Search
//!
//! Exhaustive search over a [`ParamGrid`] with K-fold cross-validation, scoring
//! each candidate by its mean held-out R².

use super::kfold::{Fold, KFold};
use crate::error::ModelError;
use crate::models::{FitOptions, Regressor};
use crate::params::{ParamGrid, ParamSet};
use crate::utils::parallel::map_maybe_parallel;
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// What to do when fitting or scoring a candidate on a fold fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScore {
    /// Record the fold score as NaN, log a warning and keep going.
    #[default]
    Nan,
    /// Abort the search with the failure.
    Raise,
}

/// Cross-validation outcome for one candidate.
#[derive(Debug, Clone)]
pub struct CandidateResult {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    /// NaN if any fold failed.
    pub mean_score: f64,
    pub std_score: f64,
    /// 1 is best; ties share the lowest rank, NaN scores rank last.
    pub rank: usize,
}

/// Result of [`GridSearch::fit`].
#[derive(Debug, Clone)]
pub struct SearchResult<M> {
    pub candidates: Vec<CandidateResult>,
    pub best_index: usize,
    /// Clone of the base estimator refitted on all data with the best parameters,
    /// present when refitting is enabled.
    pub best_estimator: Option<M>,
}

impl<M> SearchResult<M> {
    pub fn best_params(&self) -> &ParamSet {
        &self.candidates[self.best_index].params
    }

    pub fn best_score(&self) -> f64 {
        self.candidates[self.best_index].mean_score
    }
}

/// Exhaustive cross-validated hyperparameter search.
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    cv: usize,
    error_score: ErrorScore,
    n_jobs: Option<usize>,
    refit: bool,
    fit_options: FitOptions,
    verbose: u8,
}

struct FoldOutcome {
    scores: Vec<f64>,
    failures: Vec<ModelError>,
}

impl GridSearch {
    /// A search over `grid` with 3 folds, NaN error scores, sequential
    /// evaluation and refitting enabled.
    pub fn new(grid: ParamGrid) -> Self {
        GridSearch {
            grid,
            cv: 3,
            error_score: ErrorScore::Nan,
            n_jobs: Some(1),
            refit: true,
            fit_options: FitOptions::default(),
            verbose: 0,
        }
    }

    pub fn cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    pub fn error_score(mut self, error_score: ErrorScore) -> Self {
        self.error_score = error_score;
        self
    }

    /// Candidates evaluated concurrently; `None` uses every core.
    pub fn n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    /// Logs a per-candidate summary at info level when greater than 0.
    pub fn verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Options forwarded to every `fit` call made by the search.
    pub fn fit_options(mut self, fit_options: FitOptions) -> Self {
        self.fit_options = fit_options;
        self
    }

    /// Runs the search for `estimator` on `(x, y)`. The estimator itself is not modified.
    pub fn fit<M>(&self, estimator: &M, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<SearchResult<M>, ModelError>
    where
        M: Regressor + Clone,
    {
        if x.nrows() != y.len() {
            return Err(ModelError::shape(format!(
                "x has {} rows but y has {} values",
                x.nrows(),
                y.len()
            )));
        }
        let candidates = self.grid.candidates()?;
        let folds = KFold::new(self.cv)?.split(x.nrows())?;
        tracing::debug!(
            estimator = estimator.name(),
            candidates = candidates.len(),
            folds = folds.len(),
            "starting grid search"
        );

        let jobs: Vec<(usize, ParamSet)> = candidates.into_iter().enumerate().collect();
        let outcomes = map_maybe_parallel(jobs, self.n_jobs, |(idx, params)| {
            let outcome = self.cross_validate(estimator, x, y, &folds, idx, &params);
            (params, outcome)
        })?;

        let total_fits = outcomes.len() * folds.len();
        let mut first_failure: Option<ModelError> = None;
        let mut n_failed = 0;
        let mut results = Vec::with_capacity(outcomes.len());
        for (params, outcome) in outcomes {
            let FoldOutcome { scores, failures } = outcome?;
            n_failed += failures.len();
            if first_failure.is_none() {
                first_failure = failures.into_iter().next();
            }
            let (mean_score, std_score) = mean_std(&scores);
            results.push(CandidateResult {
                params,
                fold_scores: scores,
                mean_score,
                std_score,
                rank: 0,
            });
        }

        if let Some(first) = first_failure {
            if n_failed == total_fits {
                return Err(ModelError::AllFitsFailed {
                    fits: total_fits,
                    first: Box::new(first),
                });
            }
            tracing::warn!(
                estimator = estimator.name(),
                failed = n_failed,
                total = total_fits,
                "some fits failed; their scores were set to NaN"
            );
        }

        assign_ranks(&mut results);
        let best_index = results.iter().position(|r| r.rank == 1).unwrap_or(0);
        if self.verbose > 0 {
            for (idx, r) in results.iter().enumerate() {
                tracing::info!(
                    estimator = estimator.name(),
                    candidate = idx,
                    params = ?r.params,
                    mean_score = r.mean_score,
                    std_score = r.std_score,
                    rank = r.rank,
                    "candidate evaluated"
                );
            }
        }

        let best_estimator = if self.refit {
            let mut best = estimator.clone();
            best.set_params(&results[best_index].params)?;
            best.fit(x, y, &self.fit_options)?;
            Some(best)
        } else {
            None
        };

        Ok(SearchResult {
            candidates: results,
            best_index,
            best_estimator,
        })
    }

    /// Scores one candidate on every fold. Under `ErrorScore::Raise` the first
    /// failure is returned as the error.
    fn cross_validate<M>(
        &self,
        estimator: &M,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        folds: &[Fold],
        idx: usize,
        params: &ParamSet,
    ) -> Result<FoldOutcome, ModelError>
    where
        M: Regressor + Clone,
    {
        let mut outcome = FoldOutcome {
            scores: Vec::with_capacity(folds.len()),
            failures: Vec::new(),
        };
        for (k, fold) in folds.iter().enumerate() {
            match self.fit_and_score(estimator, x, y, fold, params) {
                Ok(score) => {
                    tracing::debug!(candidate = idx, fold = k, score, "fold scored");
                    outcome.scores.push(score);
                }
                Err(err) => match self.error_score {
                    ErrorScore::Raise => return Err(err),
                    ErrorScore::Nan => {
                        tracing::warn!(candidate = idx, fold = k, error = %err, "fit failed");
                        outcome.scores.push(f64::NAN);
                        outcome.failures.push(err);
                    }
                },
            }
        }
        Ok(outcome)
    }

    fn fit_and_score<M>(
        &self,
        estimator: &M,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        fold: &Fold,
        params: &ParamSet,
    ) -> Result<f64, ModelError>
    where
        M: Regressor + Clone,
    {
        let x_train = x.select(Axis(0), &fold.train);
        let y_train = y.select(Axis(0), &fold.train);
        let x_test = x.select(Axis(0), &fold.test);
        let y_test = y.select(Axis(0), &fold.test);

        let mut model = estimator.clone();
        model.set_params(params)?;
        model.fit(x_train.view(), y_train.view(), &self.fit_options)?;
        model.score(x_test.view(), y_test.view())
    }
}

fn mean_std(scores: &[f64]) -> (f64, f64) {
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn assign_ranks(results: &mut [CandidateResult]) {
    let finite: Vec<f64> = results
        .iter()
        .map(|r| r.mean_score)
        .filter(|s| s.is_finite())
        .collect();
    for r in results.iter_mut() {
        r.rank = if r.mean_score.is_finite() {
            1 + finite.iter().filter(|&&s| s > r.mean_score).count()
        } else {
            1 + finite.len()
        };
    }
}
