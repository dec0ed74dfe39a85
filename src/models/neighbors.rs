//! # Nearest Neighbors Regression

use super::{check_fit_input, check_predict_input, FitOptions, Regressor};
use crate::error::ModelError;
use crate::params::{ParamSet, ParamValue};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// How neighbor targets are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weights {
    /// Plain mean of the neighbors.
    Uniform,
    /// Inverse-distance weighted mean; exact matches take precedence.
    Distance,
}

impl Weights {
    fn as_str(self) -> &'static str {
        match self {
            Weights::Uniform => "uniform",
            Weights::Distance => "distance",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Memorized {
    x: Array2<f64>,
    y: Array1<f64>,
}

/// Brute-force k-nearest-neighbors regression with Euclidean distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    n_neighbors: usize,
    weights: Weights,
    fitted: Option<Memorized>,
}

impl Default for KNeighborsRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl KNeighborsRegressor {
    pub fn new() -> Self {
        KNeighborsRegressor {
            n_neighbors: 5,
            weights: Weights::Uniform,
            fitted: None,
        }
    }

    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Result<Self, ModelError> {
        if n_neighbors == 0 {
            return Err(ModelError::invalid_param("n_neighbors", "must be >= 1"));
        }
        self.n_neighbors = n_neighbors;
        Ok(self)
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    fn predict_row(&self, fitted: &Memorized, row: ArrayView1<f64>) -> f64 {
        let mut dist: Vec<(f64, usize)> = fitted
            .x
            .rows()
            .into_iter()
            .enumerate()
            .map(|(i, train)| {
                let d2: f64 = train.iter().zip(row.iter()).map(|(a, b)| (a - b).powi(2)).sum();
                (d2.sqrt(), i)
            })
            .collect();
        let k = self.n_neighbors;
        if k < dist.len() {
            dist.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));
            dist.truncate(k);
        }

        match self.weights {
            Weights::Uniform => dist.iter().map(|&(_, i)| fitted.y[i]).sum::<f64>() / dist.len() as f64,
            Weights::Distance => {
                let exact: Vec<usize> = dist.iter().filter(|(d, _)| *d == 0.0).map(|&(_, i)| i).collect();
                if !exact.is_empty() {
                    return exact.iter().map(|&i| fitted.y[i]).sum::<f64>() / exact.len() as f64;
                }
                let (num, den) = dist.iter().fold((0.0, 0.0), |(num, den), &(d, i)| {
                    (num + fitted.y[i] / d, den + 1.0 / d)
                });
                num / den
            }
        }
    }
}

impl Regressor for KNeighborsRegressor {
    fn name(&self) -> &'static str {
        "KNeighborsRegressor"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, _options: &FitOptions) -> Result<(), ModelError> {
        check_fit_input(x, y, self.n_neighbors)?;
        self.fitted = Some(Memorized {
            x: x.to_owned(),
            y: y.to_owned(),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(ModelError::NotFitted { model: self.name() })?;
        check_predict_input(x, fitted.x.ncols())?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(fitted, row)).collect())
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, value) in params {
            match name.as_str() {
                "n_neighbors" => {
                    let k = value.as_usize(name)?;
                    if k == 0 {
                        return Err(ModelError::invalid_param(name.clone(), "must be >= 1"));
                    }
                    self.n_neighbors = k;
                }
                "weights" => {
                    self.weights = match value.as_str(name)? {
                        "uniform" => Weights::Uniform,
                        "distance" => Weights::Distance,
                        other => {
                            return Err(ModelError::invalid_param(
                                name.clone(),
                                format!("expected 'uniform' or 'distance', got '{other}'"),
                            ))
                        }
                    }
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
            ("n_neighbors".to_string(), ParamValue::from(self.n_neighbors)),
            ("weights".to_string(), ParamValue::from(self.weights.as_str())),
        ])
    }
}
