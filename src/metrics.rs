//! # Regression Metrics

use crate::error::ModelError;
use ndarray::ArrayView1;

fn check_targets(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<(), ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::shape(format!(
            "y_true has {} samples but y_pred has {}",
            y_true.len(),
            y_pred.len()
        )));
    }
    Ok(())
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// Best possible score is 1.0; it can be arbitrarily negative. When `y_true` is
/// constant the score is 1.0 for a perfect prediction and 0.0 otherwise.
pub fn r2_score(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64, ModelError> {
    check_targets(y_true, y_pred)?;
    if y_true.len() < 2 {
        return Err(ModelError::InsufficientData {
            required: 2,
            actual: y_true.len(),
        });
    }

    let mean = y_true.sum() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

pub fn mean_squared_error(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64, ModelError> {
    check_targets(y_true, y_pred)?;
    if y_true.is_empty() {
        return Err(ModelError::InsufficientData { required: 1, actual: 0 });
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(sum / y_true.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn perfect_prediction_scores_one() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        assert_eq!(r2_score(y.view(), y.view()).unwrap(), 1.0);
    }

    #[test]
    fn mean_prediction_scores_zero() {
        let y = array![1.0, 2.0, 3.0];
        let pred = array![2.0, 2.0, 2.0];
        assert!(r2_score(y.view(), pred.view()).unwrap().abs() < 1e-12);
    }

    #[test]
    fn known_value() {
        let y = array![3.0, -0.5, 2.0, 7.0];
        let pred = array![2.5, 0.0, 2.0, 8.0];
        let score = r2_score(y.view(), pred.view()).unwrap();
        assert!((score - 0.948_608_137_044_967_9).abs() < 1e-12);
    }

    #[test]
    fn constant_target_is_finite() {
        let y = array![2.0, 2.0, 2.0];
        assert_eq!(r2_score(y.view(), y.view()).unwrap(), 1.0);
        let off = array![2.0, 2.5, 2.0];
        assert_eq!(r2_score(y.view(), off.view()).unwrap(), 0.0);
    }

    #[test]
    fn rejects_bad_input() {
        let one = array![1.0];
        assert!(matches!(
            r2_score(one.view(), one.view()),
            Err(ModelError::InsufficientData { .. })
        ));
        let a = array![1.0, 2.0];
        let b = array![1.0, 2.0, 3.0];
        assert!(matches!(r2_score(a.view(), b.view()), Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn mse() {
        let y = array![1.0, 2.0];
        let pred = array![2.0, 4.0];
        assert_eq!(mean_squared_error(y.view(), pred.view()).unwrap(), 2.5);
    }
}
