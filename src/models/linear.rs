//! # Linear Models
//!
//! Ordinary least squares and L2-penalized (ridge) least squares, both solved
//! through the normal equations on centered data.

use super::{check_fit_input, check_predict_input, FitOptions, Regressor};
use crate::error::ModelError;
use crate::params::{ParamSet, ParamValue};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

// --- Shared Solver ---

/// Learned coefficients of a linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinearFit {
    coef: Array1<f64>,
    intercept: f64,
}

impl LinearFit {
    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        check_predict_input(x, self.coef.len())?;
        Ok(x.dot(&self.coef) + self.intercept)
    }
}

/// Solves `(XᵀX + alpha·I) w = Xᵀy`, centering first when `fit_intercept` is set.
fn fit_least_squares(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    alpha: f64,
    fit_intercept: bool,
) -> Result<LinearFit, ModelError> {
    let (x_offset, y_offset) = if fit_intercept {
        // mean_axis only fails on an empty axis, which check_fit_input rules out.
        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::shape("cannot center an empty matrix"))?;
        let y_mean = y.mean().unwrap_or(0.0);
        (x_mean, y_mean)
    } else {
        (Array1::zeros(x.ncols()), 0.0)
    };

    let xc = &x - &x_offset;
    let yc = &y - y_offset;

    let mut gram = xc.t().dot(&xc);
    for i in 0..gram.nrows() {
        gram[[i, i]] += alpha;
    }
    let rhs = xc.t().dot(&yc);

    let coef = solve(gram, rhs)?;
    let intercept = y_offset - x_offset.dot(&coef);
    Ok(LinearFit { coef, intercept })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = b.len();
    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(1.0);
    let tol = scale * 1e-12;

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot, col]].abs() <= tol {
            return Err(ModelError::Singular);
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
            }
            b.swap(col, pivot);
        }
        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * w[k]).sum();
        w[row] = (b[row] - tail) / a[[row, row]];
    }
    Ok(w)
}

// --- Linear Regression ---

/// Ordinary least squares linear regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    fit_intercept: bool,
    fitted: Option<LinearFit>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        LinearRegression {
            fit_intercept: true,
            fitted: None,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Fitted coefficients, one per feature.
    pub fn coef(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.coef)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.intercept)
    }
}

impl Regressor for LinearRegression {
    fn name(&self) -> &'static str {
        "LinearRegression"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, _options: &FitOptions) -> Result<(), ModelError> {
        check_fit_input(x, y, 1)?;
        // Collinear features make the Gram matrix singular; a tiny ridge picks a
        // well-defined solution instead of failing.
        let fit = match fit_least_squares(x, y, 0.0, self.fit_intercept) {
            Err(ModelError::Singular) => fit_least_squares(x, y, 1e-10, self.fit_intercept)?,
            other => other?,
        };
        self.fitted = Some(fit);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.fitted
            .as_ref()
            .ok_or(ModelError::NotFitted { model: self.name() })?
            .predict(x)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, value) in params {
            match name.as_str() {
                "fit_intercept" => self.fit_intercept = value.as_bool(name)?,
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
        ParamSet::from([("fit_intercept".to_string(), ParamValue::Bool(self.fit_intercept))])
    }
}

// --- Ridge ---

/// Linear least squares with L2 regularization of strength `alpha`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ridge {
    alpha: f64,
    fit_intercept: bool,
    fitted: Option<LinearFit>,
}

impl Default for Ridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Ridge {
    pub fn new() -> Self {
        Ridge {
            alpha: 1.0,
            fit_intercept: true,
            fitted: None,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Result<Self, ModelError> {
        self.alpha = validate_alpha(alpha)?;
        Ok(self)
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn coef(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| &f.coef)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.intercept)
    }
}

fn validate_alpha(alpha: f64) -> Result<f64, ModelError> {
    if !alpha.is_finite() || alpha < 0.0 {
        return Err(ModelError::invalid_param("alpha", format!("must be >= 0, got {alpha}")));
    }
    Ok(alpha)
}

impl Regressor for Ridge {
    fn name(&self) -> &'static str {
        "Ridge"
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>, _options: &FitOptions) -> Result<(), ModelError> {
        check_fit_input(x, y, 1)?;
        self.fitted = Some(fit_least_squares(x, y, self.alpha, self.fit_intercept)?);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        self.fitted
            .as_ref()
            .ok_or(ModelError::NotFitted { model: self.name() })?
            .predict(x)
    }

    fn set_params(&mut self, params: &ParamSet) -> Result<(), ModelError> {
        for (name, value) in params {
            match name.as_str() {
                "alpha" => self.alpha = validate_alpha(value.as_f64(name)?)?,
                "fit_intercept" => self.fit_intercept = value.as_bool(name)?,
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
            ("alpha".to_string(), ParamValue::Float(self.alpha)),
            ("fit_intercept".to_string(), ParamValue::Bool(self.fit_intercept)),
        ])
    }
}
