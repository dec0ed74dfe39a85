use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use regsearch::model_selection::GridSearch;
use regsearch::models::{GradientBoostingRegressor, Ridge};
use regsearch::params::ParamGrid;

fn data(n: usize) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((n, 4), |(i, j)| ((i * (j + 3)) % 17) as f64 + i as f64 * 0.1);
    let y = x.rows().into_iter().map(|r| r.sum() * 0.5 + r[0].sin()).collect();
    (x, y)
}

fn bench_grid_search(c: &mut Criterion) {
    let (x, y) = data(300);

    let ridge_grid = ParamGrid::new().with("alpha", [0.01, 0.1, 1.0, 10.0]);
    c.bench_function("grid_search_ridge_4x3", |b| {
        b.iter(|| {
            GridSearch::new(ridge_grid.clone())
                .refit(false)
                .fit(&Ridge::new(), black_box(x.view()), black_box(y.view()))
        })
    });

    let boost_grid = ParamGrid::new()
        .with("n_estimators", [10_usize, 20])
        .with("max_depth", [2_usize, 3]);
    let booster = GradientBoostingRegressor::new().with_random_state(0);
    for n_jobs in [Some(1), None] {
        let name = format!("grid_search_boosting_4x3_jobs_{n_jobs:?}");
        c.bench_function(&name, |b| {
            b.iter(|| {
                GridSearch::new(boost_grid.clone())
                    .refit(false)
                    .n_jobs(n_jobs)
                    .fit(&booster, black_box(x.view()), black_box(y.view()))
            })
        });
    }
}

criterion_group!(benches, bench_grid_search);
criterion_main!(benches);
