use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use readmit::algorithm::model::{ElasticNet, Explanation, cross_validate, stratified_folds};

/// One informative column, one noise column, one constant column
fn dataset(n: usize) -> (Array2<f64>, Vec<bool>) {
    let mut rng = StdRng::seed_from_u64(11);
    let mut x = Array2::<f64>::zeros((n, 3));
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let signal: f64 = rng.random_range(-3.0..3.0);
        x[[i, 0]] = signal;
        x[[i, 1]] = rng.random_range(-1.0..1.0);
        x[[i, 2]] = 5.0;
        labels.push(signal + rng.random_range(-1.0..1.0) > 0.0);
    }
    (x, labels)
}

fn trainer() -> ElasticNet {
    ElasticNet {
        alpha: 0.01,
        l1_ratio: 0.5,
        max_iterations: 2_000,
        tolerance: 1e-6,
    }
}

#[test]
fn cross_validation_separates_an_informative_feature() {
    let (x, labels) = dataset(300);
    let report = cross_validate(&x, &labels, &trainer(), 5, 2025).unwrap();

    assert_eq!(report.folds.len(), 5);
    assert_eq!(report.folds.iter().map(|f| f.n_test).sum::<usize>(), 300);
    assert!(report.mean_auroc.unwrap() > 0.85);
    assert!(report.mean_brier < 0.2);

    let again = cross_validate(&x, &labels, &trainer(), 5, 2025).unwrap();
    assert_eq!(report, again);
}

#[test]
fn folds_cover_every_row_once() {
    let (_, labels) = dataset(101);
    let folds = stratified_folds(&labels, 4, 3);
    let mut rows: Vec<usize> = folds.concat();
    rows.sort_unstable();
    assert_eq!(rows, (0..101).collect::<Vec<_>>());
}

#[test]
fn explanation_ranks_the_informative_feature_first() {
    let (x, labels) = dataset(300);
    let y: Array1<f64> = labels.iter().map(|l| f64::from(u8::from(*l))).collect();
    let model = trainer().fit(x.view(), y.view());
    let explanation = Explanation::new(
        &model,
        x.view(),
        vec!["signal".into(), "noise".into(), "constant".into()],
    )
    .unwrap();

    let ranking = explanation.importance(&model);
    assert_eq!(ranking[0].feature, "signal");
    assert!(ranking[0].coefficient > 0.0);
    let constant = ranking.iter().find(|r| r.feature == "constant").unwrap();
    assert_eq!(constant.mean_abs_contribution, 0.0);
}
