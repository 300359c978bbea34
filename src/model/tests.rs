//! Tests for regressors and bundle persistence

use super::*;
use crate::types::FEATURE_NAMES;
use chrono::Utc;

fn table_from(rows: Vec<Vec<f64>>, names: &[&str]) -> FeatureTable {
    FeatureTable {
        names: names.iter().map(|n| n.to_string()).collect(),
        rows,
    }
}

/// y = 2*x1 + step(x2)
fn synthetic() -> (FeatureTable, Vec<f64>) {
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for i in 0..200 {
        let x1 = i as f64 / 10.0;
        let x2 = (i % 7) as f64;
        rows.push(vec![x1, x2]);
        targets.push(2.0 * x1 + if x2 > 3.0 { 5.0 } else { 0.0 });
    }
    (table_from(rows, &["x1", "x2"]), targets)
}

fn small_forest(seed: u64) -> RandomForestRegressor {
    RandomForestRegressor::new(ForestConfig {
        n_trees: 25,
        seed,
        ..Default::default()
    })
}

fn feature_vector() -> crate::types::FeatureVector {
    crate::types::FeatureVector {
        lag_1: 101.0,
        lag_7: 98.0,
        lag_30: 90.0,
        rolling_mean_7: 99.0,
        rolling_mean_30: 95.0,
        day_of_week: 2,
        month: 6,
    }
}

fn metadata(name: &str) -> BundleMetadata {
    BundleMetadata {
        model_name: name.to_string(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        trained_at: Utc::now(),
        training_rows: 10,
        evaluation: None,
    }
}

#[test]
fn test_tree_fits_step_function_exactly() {
    let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
    let targets: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 3.0 }).collect();
    let mut tree = RegressionTree::new(TreeConfig::default());
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(7);

    tree.fit_indices(&rows, &targets, (0..20).collect(), &mut rng).unwrap();

    assert_eq!(tree.n_leaves(), 2);
    assert_eq!(tree.predict_one(&[2.0]).unwrap(), 1.0);
    assert_eq!(tree.predict_one(&[15.0]).unwrap(), 3.0);
    assert!(tree.validate(1).is_ok());
    assert_eq!(tree.feature_importances(), &[1.0]);
}

#[test]
fn test_tree_respects_max_depth() {
    let (table, targets) = synthetic();
    let mut tree = RegressionTree::new(TreeConfig {
        max_depth: Some(1),
        ..Default::default()
    });
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(1);
    tree.fit_indices(&table.rows, &targets, (0..targets.len()).collect(), &mut rng)
        .unwrap();
    assert_eq!(tree.n_leaves(), 2);
}

#[test]
fn test_forest_learns_synthetic_relationship() {
    let (table, targets) = synthetic();
    let mut forest = small_forest(42);
    forest.fit(&table, &targets).unwrap();

    assert_eq!(forest.n_trees(), 25);
    let predictions = predict_all(&forest, &table).unwrap();
    let mae: f64 = predictions
        .iter()
        .zip(&targets)
        .map(|(p, y)| (p - y).abs())
        .sum::<f64>()
        / targets.len() as f64;
    assert!(mae < 1.0, "in-sample MAE too high: {mae}");

    let ranking = forest.feature_importance_ranking();
    assert_eq!(ranking[0].0, "x1");
    let total: f64 = forest.feature_importances().iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn test_forest_fit_is_reproducible() {
    let (table, targets) = synthetic();
    let mut a = small_forest(42);
    let mut b = small_forest(42);
    a.fit(&table, &targets).unwrap();
    b.fit(&table, &targets).unwrap();
    assert_eq!(a, b);

    // Refitting the same instance yields the same model
    let before = a.clone();
    a.fit(&table, &targets).unwrap();
    assert_eq!(a, before);

    let probe = [7.3, 5.0];
    assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
}

#[test]
fn test_forest_seed_changes_model() {
    let (table, targets) = synthetic();
    let mut a = small_forest(1);
    let mut b = small_forest(2);
    a.fit(&table, &targets).unwrap();
    b.fit(&table, &targets).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_forest_predict_errors() {
    let forest = small_forest(42);
    assert_eq!(forest.predict(&[1.0, 2.0]).unwrap_err().kind(), "prediction_failed");

    let (table, targets) = synthetic();
    let mut forest = small_forest(42);
    forest.fit(&table, &targets).unwrap();
    assert!(forest.predict(&[1.0]).is_err());
    assert!(forest.predict(&[f64::NAN, 1.0]).is_err());
}

#[test]
fn test_fit_rejects_mismatched_shapes() {
    let table = table_from(vec![vec![1.0, 2.0], vec![3.0]], &["a", "b"]);
    let mut forest = small_forest(42);
    assert!(forest.fit(&table, &[1.0, 2.0]).is_err());

    let table = table_from(vec![vec![1.0, 2.0]], &["a", "b"]);
    assert!(forest.fit(&table, &[1.0, 2.0]).is_err());

    let table = table_from(vec![], &["a", "b"]);
    assert!(forest.fit(&table, &[]).is_err());
}

#[test]
fn test_last_value_baseline() {
    let table = table_from(vec![vec![6.0, 100.0], vec![0.0, 101.0]], &["day_of_week", "lag_1"]);
    let mut baseline = LastValueRegressor::new();
    assert!(baseline.predict(&[1.0, 2.0]).is_err());

    baseline.fit(&table, &[101.0, 102.0]).unwrap();
    assert_eq!(baseline.predict(&[3.0, 250.5]).unwrap(), 250.5);
    assert_eq!(baseline.name(), "last_value");

    let no_lag = table_from(vec![vec![1.0]], &["month"]);
    assert!(LastValueRegressor::new().fit(&no_lag, &[1.0]).is_err());
}

#[test]
fn test_bundle_predict_reorders_columns() {
    // Fit the baseline on a table where lag_1 is the last column
    let names = ["month", "rolling_mean_7", "lag_1"];
    let table = table_from(vec![vec![1.0, 2.0, 3.0]], &names);
    let mut baseline = LastValueRegressor::new();
    baseline.fit(&table, &[3.0]).unwrap();

    let bundle = ModelBundle::new(
        baseline,
        names.iter().map(|n| n.to_string()).collect(),
        metadata("last_value"),
    );
    assert_eq!(bundle.predict(&feature_vector()).unwrap(), 101.0);
}

#[test]
fn test_bundle_save_and_load() {
    let (table, targets) = synthetic();
    let mut forest = small_forest(3);
    forest.fit(&table, &targets).unwrap();
    let bundle = ModelBundle::new(
        forest,
        vec!["lag_1".to_string(), "month".to_string()],
        metadata("random_forest"),
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("model.json");
    bundle.save(&path).unwrap();

    assert!(path.exists());
    assert!(!dir.path().join("nested").join("model.json.tmp").exists());

    let loaded: ModelBundle<RandomForestRegressor> = ModelBundle::load(&path).unwrap();
    assert_eq!(loaded, bundle);
    assert_eq!(
        loaded.predict(&feature_vector()).unwrap(),
        bundle.predict(&feature_vector()).unwrap()
    );
}

#[test]
fn test_bundle_load_optional_missing_or_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.json");
    assert!(ModelBundle::<RandomForestRegressor>::load_optional(&missing).is_none());

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, b"{not json").unwrap();
    assert!(ModelBundle::<RandomForestRegressor>::load_optional(&corrupt).is_none());
    assert_eq!(
        ModelBundle::<RandomForestRegressor>::load(&corrupt)
            .unwrap_err()
            .kind(),
        "model_unavailable"
    );
}

#[test]
fn test_bundle_load_rejects_unknown_features() {
    let mut baseline = LastValueRegressor::new();
    baseline
        .fit(&table_from(vec![vec![1.0]], &["lag_1"]), &[1.0])
        .unwrap();
    let bundle = ModelBundle::new(
        baseline,
        vec!["lag_1".to_string(), "lag_365".to_string()],
        metadata("last_value"),
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    bundle.save(&path).unwrap();
    assert!(ModelBundle::<LastValueRegressor>::load(&path).is_err());
}

/// Saved forest bundle as an editable JSON document
fn saved_forest_json() -> serde_json::Value {
    let (table, targets) = synthetic();
    let mut forest = small_forest(5);
    forest.fit(&table, &targets).unwrap();
    let bundle = ModelBundle::new(
        forest,
        vec!["lag_1".to_string(), "month".to_string()],
        metadata("random_forest"),
    );
    serde_json::to_value(&bundle).unwrap()
}

fn load_edited(doc: &serde_json::Value) -> Result<ModelBundle<RandomForestRegressor>> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, serde_json::to_vec(doc).unwrap()).unwrap();
    ModelBundle::load(&path)
}

#[test]
fn test_bundle_load_rejects_cyclic_tree() {
    let mut doc = saved_forest_json();
    assert!(load_edited(&doc).is_ok());

    doc["model"]["trees"][0]["nodes"][0] = serde_json::json!({
        "Split": { "feature": 0, "threshold": 1.0, "left": 0, "right": 0 }
    });
    let err = load_edited(&doc).unwrap_err();
    assert_eq!(err.kind(), "model_unavailable");
}

#[test]
fn test_bundle_load_rejects_out_of_range_split_feature() {
    let mut doc = saved_forest_json();
    assert!(doc["model"]["trees"][0]["nodes"][0]["Split"].is_object());
    doc["model"]["trees"][0]["nodes"][0]["Split"]["feature"] = serde_json::json!(9);

    let err = load_edited(&doc).unwrap_err();
    assert_eq!(err.kind(), "model_unavailable");
}

#[test]
fn test_bundle_load_rejects_feature_count_mismatch() {
    let mut doc = saved_forest_json();
    doc["features"] = serde_json::json!(["lag_1", "month", "lag_7"]);
    assert_eq!(load_edited(&doc).unwrap_err().kind(), "model_unavailable");
}

#[test]
fn test_tree_walk_is_bounded() {
    let tree: RegressionTree = serde_json::from_value(serde_json::json!({
        "config": TreeConfig::default(),
        "nodes": [{ "Split": { "feature": 0, "threshold": 1.0, "left": 0, "right": 0 } }],
        "n_features": 1,
        "feature_importances": [1.0]
    }))
    .unwrap();

    assert!(tree.validate(1).is_err());
    assert_eq!(tree.predict_one(&[0.5]).unwrap_err().kind(), "prediction_failed");
    assert_eq!(tree.predict_one(&[]).unwrap_err().kind(), "prediction_failed");
}

#[test]
fn test_canonical_names_are_known() {
    assert!(FEATURE_NAMES.iter().all(|n| feature_vector().get(n).is_some()));
}
