//! End-to-end checks against the model artifacts shipped in `models/`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sleeprisk::adapters::json_store::JsonArtifactStore;
use sleeprisk::application::DegradedWarning;
use sleeprisk::domain::{OutputSpace, RawRecord, RiskBand};
use sleeprisk::ports::ArtifactError;
use sleeprisk::{ModelBundle, PredictionService, ServiceConfig, SleepRiskError};

fn models_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models")
}

fn bundle() -> Arc<ModelBundle> {
    let store = JsonArtifactStore::new(models_dir()).require_manifest(true);
    Arc::new(ModelBundle::load(&store).expect("shipped artifacts load"))
}

fn service() -> PredictionService {
    PredictionService::new(bundle(), &ServiceConfig::default())
}

fn scenario() -> RawRecord {
    RawRecord::from_pairs([
        ("gender", 1.0),
        ("age", 70.0),
        ("education", 2.0),
        ("cesd", 12.0),
        ("cog", 10.0),
        ("lonely", 2.0),
        ("selfhealth", 3.0),
        ("lifesat", 3.0),
        ("chronum", 2.0),
        ("adl", 0.0),
        ("iadl", 0.0),
        ("hchild", 3.0),
    ])
}

#[test]
fn test_shipped_bundle_loads() {
    let bundle = bundle();
    assert_eq!(bundle.model_name(), "xgboost");
    assert_eq!(bundle.model().family(), "gradient_boosting");
    assert_eq!(bundle.features().len(), 12);
    assert_eq!(bundle.features().categorical().len(), 5);
}

#[test]
fn test_scenario_is_medium_risk() {
    let report = service().predict(&scenario()).expect("complete record");

    let p = report.prediction.probability;
    assert!((0.25..0.35).contains(&p), "probability {p}");
    assert!((p - 0.272_891_783_658_870_5).abs() < 1e-9);
    assert_eq!(report.prediction.risk_band, RiskBand::Medium);
    assert!(report.warnings.is_empty());
    assert_eq!(report.model_name, "xgboost");
}

#[test]
fn test_extra_keys_are_ignored() {
    let mut raw = scenario();
    raw.insert("smoke", 1.0);
    raw.insert("favourite_colour", 4.0);

    let with_extras = service().predict(&raw).expect("complete record");
    let plain = service().predict(&scenario()).expect("complete record");
    assert_eq!(
        with_extras.prediction.probability.to_bits(),
        plain.prediction.probability.to_bits()
    );
}

#[test]
fn test_missing_feature_is_reported_by_name() {
    let mut raw = scenario();
    raw.remove("cesd");

    match service().predict(&raw).expect_err("cesd missing") {
        SleepRiskError::Preprocess(e) => {
            assert_eq!(e.missing_features(), Some(&["cesd".to_string()][..]));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_encoded_columns_follow_selection() {
    let bundle = bundle();
    let vector = bundle.encode(&scenario()).expect("complete record");

    assert_eq!(vector.columns(), bundle.features().selected());
    // gender=1 → category index 1; selfhealth=3 → index 2; age → (70-62)/9
    assert_eq!(vector.values()[0], 1.0);
    assert_eq!(vector.values()[6], 2.0);
    assert!((vector.values()[1] - 8.0 / 9.0).abs() < 1e-12);
}

#[test]
fn test_waterfall_for_scenario() {
    let report = service().predict(&scenario()).expect("complete record");
    let explanation = report.explanation.expect("explanation present");
    let waterfall = &explanation.waterfall;

    assert_eq!(waterfall.space, OutputSpace::LogOdds);
    assert_eq!(waterfall.len(), 12);
    assert!((waterfall.baseline - (-1.0015)).abs() < 1e-9);

    let order: Vec<&str> = waterfall.segments.iter().map(|s| s.feature.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "cesd",
            "selfhealth",
            "chronum",
            "gender",
            "age",
            // untouched by any split, so zero and in selection order
            "education",
            "cog",
            "lonely",
            "lifesat",
            "adl",
            "iadl",
            "hchild",
        ]
    );

    let first = &waterfall.segments[0];
    assert_eq!(first.label, "Depression Score = 12.00");
    assert!(first.is_positive);
    assert!((first.delta - 0.462).abs() < 1e-9);
    assert_eq!(first.start_offset, waterfall.baseline);

    for pair in waterfall.segments.windows(2) {
        assert_eq!(pair[1].start_offset, pair[0].start_offset + pair[0].delta);
    }
    assert!((waterfall.final_value - (-0.98)).abs() < 1e-9);
    assert!(waterfall
        .check_consistency(report.prediction.probability, 1e-9)
        .is_ok());
}

#[test]
fn test_report_serializes() {
    let report = service().predict(&scenario()).expect("complete record");
    let json = serde_json::to_value(&report).expect("serializable");

    assert_eq!(json["prediction"]["risk_band"], "Medium");
    assert_eq!(json["explanation"]["waterfall"]["segments"][0]["feature"], "cesd");
    assert!(json["created_at"].is_string());
}

#[test]
fn test_untimed_attribution_matches_timed() {
    let untimed = PredictionService::new(
        bundle(),
        &ServiceConfig {
            attribution_timeout: None,
            ..ServiceConfig::default()
        },
    );
    let timed = PredictionService::new(
        bundle(),
        &ServiceConfig {
            attribution_timeout: Some(Duration::from_secs(10)),
            ..ServiceConfig::default()
        },
    );

    let a = untimed.predict(&scenario()).expect("complete record");
    let b = timed.predict(&scenario()).expect("complete record");
    assert_eq!(a.explanation, b.explanation);
}

#[test]
fn test_zero_tolerance_may_degrade_but_never_fails() {
    let strict = PredictionService::new(
        bundle(),
        &ServiceConfig {
            consistency_tolerance: 0.0,
            ..ServiceConfig::default()
        },
    );
    let report = strict.predict(&scenario()).expect("primary result still returned");
    assert_eq!(report.prediction.risk_band, RiskBand::Medium);
    match report.warnings.as_slice() {
        [] => assert!(report.explanation.is_some()),
        [DegradedWarning::InconsistentAttribution { .. }] => assert!(report.explanation.is_none()),
        other => panic!("unexpected warnings: {other:?}"),
    }
}

#[test]
fn test_tampered_artifact_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    for entry in std::fs::read_dir(models_dir()).expect("models dir") {
        let entry = entry.expect("entry");
        std::fs::copy(entry.path(), dir.path().join(entry.file_name())).expect("copy");
    }

    let scaler = dir.path().join("scaler_continuous.json");
    let text = std::fs::read_to_string(&scaler).expect("read scaler");
    std::fs::write(&scaler, text.replacen("62.0", "52.0", 1)).expect("write scaler");

    let err = ModelBundle::load(&JsonArtifactStore::new(dir.path())).expect_err("hash mismatch");
    assert!(matches!(err, ArtifactError::Integrity(ref f) if f == "scaler_continuous.json"));
}
