//! Property tests for encoding and waterfall invariants.

use proptest::prelude::*;

use sleeprisk::adapters::linear::LogisticModel;
use sleeprisk::adapters::sklearn::{OrdinalEncoder, StandardScaler};
use sleeprisk::application::encode;
use sleeprisk::domain::{
    Attribution, EncodedVector, FeatureCatalog, FeatureSet, OutputSpace, RawRecord, Waterfall,
};
use sleeprisk::ports::{Attributor, Classifier};

const IDS: [&str; 6] = ["gender", "age", "cesd", "selfhealth", "chronum", "cog"];

fn ids() -> Vec<String> {
    IDS.iter().map(|s| (*s).to_string()).collect()
}

fn features() -> FeatureSet {
    FeatureSet::new(
        ids(),
        vec!["gender".into(), "selfhealth".into()],
        vec!["age".into(), "cesd".into(), "chronum".into(), "cog".into()],
    )
    .expect("valid feature set")
}

fn encoder() -> OrdinalEncoder {
    OrdinalEncoder {
        categories: vec![vec![0.0, 1.0], vec![1.0, 2.0, 3.0, 4.0, 5.0]],
        unknown_value: None,
    }
}

fn scaler() -> StandardScaler {
    StandardScaler {
        mean: vec![62.0, 8.0, 2.0, 11.5],
        scale: vec![9.0, 6.0, 1.7, 4.2],
    }
}

prop_compose! {
    fn survey_record()(
        gender in 0u8..=1,
        age in 45u8..=120,
        cesd in 0u8..=30,
        selfhealth in 1u8..=5,
        chronum in 0u8..=14,
        cog in 0u8..=42,
    ) -> RawRecord {
        RawRecord::from_pairs([
            ("gender", f64::from(gender)),
            ("age", f64::from(age)),
            ("cesd", f64::from(cesd)),
            ("selfhealth", f64::from(selfhealth)),
            ("chronum", f64::from(chronum)),
            ("cog", f64::from(cog) / 2.0),
        ])
    }
}

fn contributions() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![(-2.0f64..2.0), Just(0.0), Just(0.25), Just(-0.25)],
        IDS.len(),
    )
}

fn waterfall_for(baseline: f64, values: Vec<f64>) -> Waterfall {
    let columns = ids();
    let vector = EncodedVector::new(columns.clone(), vec![0.0; IDS.len()], vec![1.0; IDS.len()])
        .expect("aligned columns");
    let attribution = Attribution::new(baseline, &columns, values, OutputSpace::LogOdds);
    Waterfall::build(&attribution, &vector, &features(), FeatureCatalog::standard())
        .expect("aligned attribution")
}

proptest! {
    #[test]
    fn encoding_is_deterministic_and_aligned(raw in survey_record()) {
        let a = encode(&raw, &features(), Some(&encoder()), Some(&scaler()))
            .expect("complete record");
        let b = encode(&raw, &features(), Some(&encoder()), Some(&scaler()))
            .expect("complete record");

        let feats = features();
        prop_assert_eq!(a.columns(), feats.selected());
        let bits = |v: &EncodedVector| v.values().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        prop_assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn linear_attribution_is_additive(
        raw in survey_record(),
        weights in prop::collection::vec(-0.5f64..0.5, IDS.len()),
        intercept in -2.0f64..2.0,
    ) {
        let model = LogisticModel {
            coefficients: weights,
            intercept,
            background_mean: Some(vec![0.5, 0.0, 0.0, 2.0, 0.0, 0.0]),
        };
        let vector = encode(&raw, &features(), Some(&encoder()), Some(&scaler()))
            .expect("complete record");

        let p = model.predict_probability(&vector).expect("valid shape");
        let attribution = model.explain(&vector).expect("background available");
        let margin = OutputSpace::LogOdds.from_probability(p);
        prop_assert!((attribution.total() - margin).abs() < 1e-6);
    }

    #[test]
    fn offsets_chain_from_baseline(baseline in -3.0f64..3.0, values in contributions()) {
        let waterfall = waterfall_for(baseline, values.clone());

        prop_assert_eq!(waterfall.segments[0].start_offset, baseline);
        for pair in waterfall.segments.windows(2) {
            prop_assert_eq!(pair[1].start_offset, pair[0].start_offset + pair[0].delta);
        }
        let last = waterfall.segments.last().expect("non-empty");
        prop_assert_eq!(waterfall.final_value, last.end_offset());
        let total: f64 = baseline + values.iter().sum::<f64>();
        prop_assert!((waterfall.final_value - total).abs() < 1e-9);
    }

    #[test]
    fn segments_sorted_and_ties_stable(baseline in -3.0f64..3.0, values in contributions()) {
        let waterfall = waterfall_for(baseline, values);
        let position = |id: &str| IDS.iter().position(|x| *x == id).expect("known id");

        for pair in waterfall.segments.windows(2) {
            let (a, b) = (pair[0].delta.abs(), pair[1].delta.abs());
            prop_assert!(a >= b);
            if a == b {
                prop_assert!(position(&pair[0].feature) < position(&pair[1].feature));
            }
            prop_assert_eq!(pair[0].is_positive, pair[0].delta > 0.0);
        }
    }
}
