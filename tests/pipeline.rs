use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use pretty_assertions::assert_eq;
use regsearch::models::{
    DecisionTreeRegressor, FitOptions, GradientBoostingRegressor, KNeighborsRegressor, LinearRegression, Model,
    RandomForestRegressor, Regressor, Ridge,
};
use regsearch::params::{ParamGrid, ParamSet};
use regsearch::{
    evaluate_models, load_object, save_object, EvaluationConfig, ModelError, ModelEvaluator, PipelineErrorKind,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

fn linear_split() -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((48, 2), |(i, j)| if j == 0 { i as f64 } else { ((i * 7) % 11) as f64 });
    let y = x.map_axis(Axis(1), |r| 1.5 * r[0] - 0.25 * r[1] + 4.0);
    let train: Vec<usize> = (0..48).filter(|i| i % 4 != 0).collect();
    let test: Vec<usize> = (0..48).filter(|i| i % 4 == 0).collect();
    (
        x.select(Axis(0), &train),
        y.select(Axis(0), &train),
        x.select(Axis(0), &test),
        y.select(Axis(0), &test),
    )
}

fn candidate_models() -> BTreeMap<String, Model> {
    BTreeMap::from([
        ("Linear Regression".to_string(), Model::from(LinearRegression::new())),
        ("Ridge".to_string(), Model::from(Ridge::new())),
        (
            "Decision Tree".to_string(),
            Model::from(DecisionTreeRegressor::new().with_random_state(0)),
        ),
        (
            "Random Forest".to_string(),
            Model::from(RandomForestRegressor::new().with_random_state(0)),
        ),
        (
            "CatBoosting Regressor".to_string(),
            Model::from(GradientBoostingRegressor::new().with_random_state(0).with_verbose(1)),
        ),
        ("K-Neighbors".to_string(), Model::from(KNeighborsRegressor::new())),
    ])
}

fn candidate_params() -> BTreeMap<String, ParamGrid> {
    BTreeMap::from([
        ("Linear Regression".to_string(), ParamGrid::new()),
        ("Ridge".to_string(), ParamGrid::new().with("alpha", [0.01, 1.0])),
        ("Decision Tree".to_string(), ParamGrid::new().with("max_depth", [Some(3_usize), None])),
        ("Random Forest".to_string(), ParamGrid::new().with("n_estimators", [8_usize, 16])),
        (
            "CatBoosting Regressor".to_string(),
            ParamGrid::new()
                .with("n_estimators", [20_usize, 40])
                .with("learning_rate", [0.1, 0.3]),
        ),
        ("K-Neighbors".to_string(), ParamGrid::new().with("n_neighbors", [3_usize, 5])),
    ])
}

#[test]
fn report_keys_match_model_keys() {
    let (x_train, y_train, x_test, y_test) = linear_split();
    let mut models = candidate_models();
    let report = evaluate_models(
        x_train.view(),
        y_train.view(),
        x_test.view(),
        y_test.view(),
        &mut models,
        &candidate_params(),
    )
    .unwrap();

    let model_keys: BTreeSet<&String> = models.keys().collect();
    let report_keys: BTreeSet<&String> = report.keys().collect();
    assert_eq!(report_keys, model_keys);
    assert!(report.values().all(|s| s.is_finite()));
}

#[test]
fn perfectly_linear_data_scores_near_one() {
    let (x_train, y_train, x_test, y_test) = linear_split();
    let mut models = BTreeMap::from([("Linear Regression".to_string(), LinearRegression::new())]);
    let params = BTreeMap::from([(
        "Linear Regression".to_string(),
        ParamGrid::new().with("fit_intercept", [true]),
    )]);
    let report = evaluate_models(
        x_train.view(),
        y_train.view(),
        x_test.view(),
        y_test.view(),
        &mut models,
        &params,
    )
    .unwrap();
    assert!((report["Linear Regression"] - 1.0).abs() < 1e-9);
}

#[test]
fn silent_name_path_scores_like_default_path() {
    let (x_train, y_train, x_test, y_test) = linear_split();
    let booster = GradientBoostingRegressor::new().with_random_state(5).with_verbose(2);
    let grid = ParamGrid::new().with("n_estimators", [10_usize, 20]);

    let run = |name: &str| {
        let mut models = BTreeMap::from([(name.to_string(), booster.clone())]);
        let params = BTreeMap::from([(name.to_string(), grid.clone())]);
        let report = evaluate_models(
            x_train.view(),
            y_train.view(),
            x_test.view(),
            y_test.view(),
            &mut models,
            &params,
        )
        .unwrap();
        (report, models)
    };

    let (cat_report, cat_models) = run("CatBoost");
    let (plain_report, plain_models) = run("Gradient Boosting");
    assert_eq!(cat_report.len(), 1);
    assert_eq!(plain_report.len(), 1);
    assert_eq!(cat_report["CatBoost"], plain_report["Gradient Boosting"]);
    assert_eq!(
        cat_models["CatBoost"].get_params(),
        plain_models["Gradient Boosting"].get_params()
    );
}

/// Counts events whose message matches `message`.
struct MessageCounter {
    message: &'static str,
    seen: Arc<AtomicUsize>,
}

struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for MessageCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut field = MessageField(String::new());
        event.record(&mut field);
        if field.0 == self.message {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn silent_name_suppresses_stage_logging() {
    let (x_train, y_train, x_test, y_test) = linear_split();
    let booster = GradientBoostingRegressor::new().with_random_state(2).with_verbose(2);
    let grid = ParamGrid::new().with("n_estimators", [5_usize]);

    let stage_events = |name: &str| {
        let seen = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(MessageCounter {
            message: "boosting stage fitted",
            seen: Arc::clone(&seen),
        });
        let mut models = BTreeMap::from([(name.to_string(), booster.clone())]);
        let params = BTreeMap::from([(name.to_string(), grid.clone())]);
        tracing::subscriber::with_default(subscriber, || {
            evaluate_models(
                x_train.view(),
                y_train.view(),
                x_test.view(),
                y_test.view(),
                &mut models,
                &params,
            )
            .unwrap()
        });
        seen.load(Ordering::SeqCst)
    };

    // 5 stages on each of 3 folds, then 5 more for the refit.
    assert_eq!(stage_events("Gradient Boosting"), 3 * 5 + 5);
    assert_eq!(stage_events("CatBoosting Regressor"), 0);
}

#[derive(Debug, Clone)]
struct ExplodingRegressor;

impl Regressor for ExplodingRegressor {
    fn name(&self) -> &'static str {
        "ExplodingRegressor"
    }

    fn fit(&mut self, _x: ArrayView2<f64>, _y: ArrayView1<f64>, _options: &FitOptions) -> Result<(), ModelError> {
        Err(ModelError::Fit("exploded".to_string()))
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        Ok(Array1::zeros(x.nrows()))
    }

    fn set_params(&mut self, _params: &ParamSet) -> Result<(), ModelError> {
        Ok(())
    }

    fn get_params(&self) -> ParamSet {
        ParamSet::new()
    }
}

#[test]
fn failing_model_aborts_the_evaluation() {
    let (x_train, y_train, x_test, y_test) = linear_split();
    let mut models = BTreeMap::from([("Exploding".to_string(), ExplodingRegressor)]);
    let params = BTreeMap::from([("Exploding".to_string(), ParamGrid::new())]);

    let err = evaluate_models(
        x_train.view(),
        y_train.view(),
        x_test.view(),
        y_test.view(),
        &mut models,
        &params,
    )
    .unwrap_err();

    match err.kind() {
        PipelineErrorKind::Model(ModelError::AllFitsFailed { fits, first }) => {
            assert_eq!(*fits, 3);
            assert!(first.to_string().contains("exploded"));
        }
        other => panic!("unexpected error kind: {other}"),
    }
    assert!(err.to_string().starts_with("Error occurred in file ["));
}

#[test]
fn evaluator_honors_configured_folds() {
    let (x_train, y_train, x_test, y_test) = linear_split();
    let config = EvaluationConfig::from_toml_str(
        r#"
        [search]
        cv = 5
        error_score = "raise"

        [params.Ridge]
        alpha = [0.1, 1.0]
        "#,
    )
    .unwrap();
    let mut models = BTreeMap::from([("Ridge".to_string(), Ridge::new())]);
    let report = ModelEvaluator::new(config.search)
        .evaluate(
            x_train.view(),
            y_train.view(),
            x_test.view(),
            y_test.view(),
            &mut models,
            &config.params,
        )
        .unwrap();
    assert_eq!(report.len(), 1);
    assert!(report["Ridge"] > 0.99);
}

#[test]
fn fitted_model_survives_save_and_load() {
    let (x_train, y_train, x_test, _) = linear_split();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("artifacts").join("model.bin");

    for mut model in candidate_models().into_values() {
        model
            .fit(x_train.view(), y_train.view(), &FitOptions::silent())
            .unwrap();
        save_object(&path, &model).unwrap();
        let restored: Model = load_object(&path).unwrap();
        assert_eq!(restored.name(), model.name());
        assert_eq!(restored.get_params(), model.get_params());
        assert_eq!(
            restored.predict(x_test.view()).unwrap(),
            model.predict(x_test.view()).unwrap()
        );
    }
}

#[test]
fn plain_collections_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("new_dir").join("values.bin");
    assert!(!path.parent().unwrap().exists());

    let list = vec![1.5_f64, -2.0, 3.25];
    save_object(&path, &list).unwrap();
    assert!(path.parent().unwrap().is_dir());
    assert_eq!(load_object::<Vec<f64>, _>(&path).unwrap(), list);

    let map = BTreeMap::from([("a".to_string(), vec![1_u8]), ("b".to_string(), vec![])]);
    save_object(&path, &map).unwrap();
    assert_eq!(load_object::<BTreeMap<String, Vec<u8>>, _>(&path).unwrap(), map);
}
